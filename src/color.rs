//! Colors and color schemes.

use crate::errors::{DrwError, Result};
use crate::render::backend::Connection;

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("green", [0, 255, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("cyan", [0, 255, 255]),
    ("magenta", [255, 0, 255]),
    ("gray", [190, 190, 190]),
    ("grey", [190, 190, 190]),
    ("darkgray", [169, 169, 169]),
    ("darkgrey", [169, 169, 169]),
    ("lightgray", [211, 211, 211]),
    ("lightgrey", [211, 211, 211]),
    ("orange", [255, 165, 0]),
    ("purple", [160, 32, 240]),
    ("brown", [165, 42, 42]),
    ("navy", [0, 0, 128]),
    ("navyblue", [0, 0, 128]),
    ("steelblue", [70, 130, 180]),
    ("darkred", [139, 0, 0]),
    ("darkgreen", [0, 100, 0]),
    ("darkblue", [0, 0, 139]),
    ("gold", [255, 215, 0]),
    ("pink", [255, 192, 203]),
    ("silver", [192, 192, 192]),
];

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parses an X11 color specification.
    ///
    /// Accepts `#rgb`, `#rrggbb`, `#rrrgggbbb`, `#rrrrggggbbbb`, `rgb:r/g/b` with one to four
    /// hex digits per channel, and common color names.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();

        if let Some(hex) = name.strip_prefix('#') {
            if hex.is_empty() || hex.len() % 3 != 0 || hex.len() > 12 {
                return None;
            }
            let n = hex.len() / 3;
            let r = scale_channel(&hex[..n])?;
            let g = scale_channel(&hex[n..2 * n])?;
            let b = scale_channel(&hex[2 * n..])?;
            return Some(Self::rgb(r, g, b));
        }

        if let Some(spec) = name.strip_prefix("rgb:") {
            let mut parts = spec.split('/');
            let r = scale_channel(parts.next()?)?;
            let g = scale_channel(parts.next()?)?;
            let b = scale_channel(parts.next()?)?;
            if parts.next().is_some() {
                return None;
            }
            return Some(Self::rgb(r, g, b));
        }

        let key: String = name
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        NAMED_COLORS
            .iter()
            .find(|(n, _)| *n == key)
            .map(|(_, [r, g, b])| Self::rgb(*r, *g, *b))
    }

    /// Packs the color as `0xAARRGGBB`.
    pub fn pixel(&self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }
}

/// Scales a 1..=4 digit hex channel to 8 bits.
fn scale_channel(digits: &str) -> Option<u8> {
    if digits.is_empty() || digits.len() > 4 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let v = u32::from_str_radix(digits, 16).ok()?;
    let max = (1u32 << (4 * digits.len())) - 1;
    Some(((v * 255 + max / 2) / max) as u8)
}

/// An allocated color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    /// Backend pixel value.
    pub pixel: u32,
    pub rgba: Rgba,
}

impl Color {
    pub fn from_rgba(rgba: Rgba) -> Self {
        Self {
            pixel: rgba.pixel(),
            rgba,
        }
    }

    /// Channels as `0.0..=1.0` floats.
    pub fn to_f64(&self) -> (f64, f64, f64, f64) {
        (
            self.rgba.r as f64 / 255.0,
            self.rgba.g as f64 / 255.0,
            self.rgba.b as f64 / 255.0,
            self.rgba.a as f64 / 255.0,
        )
    }
}

/// Role of a color inside a scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorRole {
    Fg = 0,
    Bg = 1,
    Border = 2,
}

/// Colors indexed by [`ColorRole`].
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScheme {
    colors: Vec<Color>,
}

impl ColorScheme {
    /// Allocates every named color. A scheme needs at least foreground and background.
    pub fn create<S: AsRef<str>>(conn: &Connection, names: &[S]) -> Result<Self> {
        if names.len() < 2 {
            return Err(DrwError::SchemeTooSmall(names.len()));
        }

        let colors = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                conn.ws
                    .alloc_color(name)
                    .ok_or_else(|| DrwError::ColorAlloc(name.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { colors })
    }

    /// Builds a scheme from colors that were already allocated.
    pub fn from_colors(colors: Vec<Color>) -> Result<Self> {
        if colors.len() < 2 {
            return Err(DrwError::SchemeTooSmall(colors.len()));
        }
        Ok(Self { colors })
    }

    pub fn get(&self, role: ColorRole) -> Option<&Color> {
        self.colors.get(role as usize)
    }

    pub fn fg(&self) -> &Color {
        &self.colors[ColorRole::Fg as usize]
    }

    pub fn bg(&self) -> &Color {
        &self.colors[ColorRole::Bg as usize]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}
