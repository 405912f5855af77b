//! Font patterns in fontconfig name syntax.
//!
//! A pattern names one or more families plus optional properties:
//!
//! ```text
//! DejaVu Sans Mono,monospace-10:bold:antialias=true
//! ```
//!
//! Patterns are what font names are turned into before they are handed to the
//! backend for matching. Matching itself (fallback and substitution) is left to
//! the font collection the backend uses.

use crate::errors::{DrwError, Result};
use std::fmt;

/// Resolution used to turn point sizes into pixel sizes.
pub const DEFAULT_DPI: f64 = 96.0;
/// Point size used when a pattern carries neither `size` nor `pixelsize`.
pub const DEFAULT_POINT_SIZE: f64 = 12.0;

pub const WEIGHT_THIN: u16 = 100;
pub const WEIGHT_EXTRALIGHT: u16 = 200;
pub const WEIGHT_LIGHT: u16 = 300;
pub const WEIGHT_REGULAR: u16 = 400;
pub const WEIGHT_MEDIUM: u16 = 500;
pub const WEIGHT_DEMIBOLD: u16 = 600;
pub const WEIGHT_BOLD: u16 = 700;
pub const WEIGHT_EXTRABOLD: u16 = 800;
pub const WEIGHT_BLACK: u16 = 900;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slant {
    Roman,
    Italic,
    Oblique,
}

impl Slant {
    fn as_str(self) -> &'static str {
        match self {
            Slant::Roman => "roman",
            Slant::Italic => "italic",
            Slant::Oblique => "oblique",
        }
    }
}

/// A parsed font name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontPattern {
    /// Families in priority order.
    pub families: Vec<String>,
    /// Size in points.
    pub size: Option<f64>,
    /// Size in pixels. Wins over `size` when both are set.
    pub pixel_size: Option<f64>,
    /// CSS-style weight (100..=900).
    pub weight: Option<u16>,
    pub slant: Option<Slant>,
    pub antialias: Option<bool>,
    pub hinting: Option<bool>,
    pub autohint: Option<bool>,
    /// Properties we do not interpret, kept so the pattern prints back unchanged.
    pub extra: Vec<(String, Option<String>)>,
}

impl FontPattern {
    /// Pattern for a single family at a pixel size.
    pub fn with_family(family: &str, pixel_size: f64) -> Self {
        Self {
            families: vec![family.to_string()],
            pixel_size: Some(pixel_size),
            ..Default::default()
        }
    }

    /// Parses a fontconfig-style font name.
    pub fn parse(name: &str) -> Result<Self> {
        let bad = || DrwError::FontPattern(name.to_string());

        if name.trim().is_empty() {
            return Err(bad());
        }

        let mut sections = split_unescaped(name, ':').ok_or_else(bad)?.into_iter();
        let head = sections.next().unwrap_or_default();

        let mut pattern = FontPattern::default();

        // "family,family-size,size": only the first size counts
        let (families, sizes) = match find_unescaped(&head, '-') {
            Some(idx) => (&head[..idx], Some(&head[idx + 1..])),
            None => (head.as_str(), None),
        };

        for family in split_unescaped(families, ',').ok_or_else(bad)? {
            let family = unescape(&family);
            let family = family.trim();
            if !family.is_empty() {
                pattern.families.push(family.to_string());
            }
        }

        if let Some(sizes) = sizes {
            let first = sizes.split(',').next().unwrap_or_default().trim();
            pattern.size = Some(parse_size(first).ok_or_else(bad)?);
        }

        for prop in sections {
            let prop = prop.trim();
            if prop.is_empty() {
                continue;
            }
            match prop.split_once('=') {
                Some((key, value)) => pattern.set_property(key.trim(), value.trim()).ok_or_else(bad)?,
                None => pattern.set_constant(prop),
            }
        }

        Ok(pattern)
    }

    /// Pixel size the pattern asks for.
    pub fn pixel_size(&self) -> f64 {
        if let Some(px) = self.pixel_size {
            return px;
        }
        self.size.unwrap_or(DEFAULT_POINT_SIZE) * DEFAULT_DPI / 72.0
    }

    pub fn is_italic(&self) -> bool {
        matches!(self.slant, Some(Slant::Italic) | Some(Slant::Oblique))
    }

    fn set_property(&mut self, key: &str, value: &str) -> Option<()> {
        match key.to_ascii_lowercase().as_str() {
            "size" => self.size = Some(parse_size(value)?),
            "pixelsize" => self.pixel_size = Some(parse_size(value)?),
            "weight" => {
                self.weight = Some(match weight_constant(value) {
                    Some(w) => w,
                    None => value.parse::<u16>().ok().filter(|w| (1..=1000).contains(w))?,
                })
            }
            "slant" => self.slant = Some(slant_constant(value)?),
            "antialias" => self.antialias = Some(parse_bool(value)?),
            "hinting" => self.hinting = Some(parse_bool(value)?),
            "autohint" => self.autohint = Some(parse_bool(value)?),
            "family" => self.families.push(unescape(value)),
            _ => self.extra.push((key.to_string(), Some(value.to_string()))),
        }
        Some(())
    }

    fn set_constant(&mut self, name: &str) {
        if let Some(w) = weight_constant(name) {
            self.weight = Some(w);
        } else if let Some(s) = slant_constant(name) {
            self.slant = Some(s);
        } else {
            self.extra.push((name.to_string(), None));
        }
    }
}

impl fmt::Display for FontPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let families: Vec<String> = self.families.iter().map(|s| escape(s)).collect();
        write!(f, "{}", families.join(","))?;

        if let Some(size) = self.size {
            write!(f, ":size={}", size)?;
        }
        if let Some(px) = self.pixel_size {
            write!(f, ":pixelsize={}", px)?;
        }
        if let Some(weight) = self.weight {
            write!(f, ":weight={}", weight)?;
        }
        if let Some(slant) = self.slant {
            write!(f, ":slant={}", slant.as_str())?;
        }
        if let Some(aa) = self.antialias {
            write!(f, ":antialias={}", aa)?;
        }
        if let Some(hinting) = self.hinting {
            write!(f, ":hinting={}", hinting)?;
        }
        if let Some(autohint) = self.autohint {
            write!(f, ":autohint={}", autohint)?;
        }
        for (key, value) in &self.extra {
            match value {
                Some(v) => write!(f, ":{}={}", key, v)?,
                None => write!(f, ":{}", key)?,
            }
        }
        Ok(())
    }
}

fn weight_constant(s: &str) -> Option<u16> {
    Some(match s.to_ascii_lowercase().as_str() {
        "thin" => WEIGHT_THIN,
        "extralight" | "ultralight" => WEIGHT_EXTRALIGHT,
        "light" => WEIGHT_LIGHT,
        "regular" | "normal" | "book" => WEIGHT_REGULAR,
        "medium" => WEIGHT_MEDIUM,
        "demibold" | "semibold" => WEIGHT_DEMIBOLD,
        "bold" => WEIGHT_BOLD,
        "extrabold" | "ultrabold" => WEIGHT_EXTRABOLD,
        "black" | "heavy" => WEIGHT_BLACK,
        _ => return None,
    })
}

fn slant_constant(s: &str) -> Option<Slant> {
    match s.to_ascii_lowercase().as_str() {
        "roman" => Some(Slant::Roman),
        "italic" => Some(Slant::Italic),
        "oblique" => Some(Slant::Oblique),
        _ => None,
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_size(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite() && *v > 0.0)
}

/// Byte index of the first `sep` not preceded by a backslash escape.
fn find_unescaped(s: &str, sep: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            return Some(i);
        }
    }
    None
}

/// Splits on unescaped `sep`, leaving escapes in place. `None` on a dangling backslash.
fn split_unescaped(s: &str, sep: char) -> Option<Vec<String>> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut escaped = false;
    for c in s.chars() {
        if escaped {
            cur.push(c);
            escaped = false;
        } else if c == '\\' {
            cur.push(c);
            escaped = true;
        } else if c == sep {
            out.push(std::mem::take(&mut cur));
        } else {
            cur.push(c);
        }
    }
    if escaped {
        return None;
    }
    out.push(cur);
    Some(out)
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '-' | ':' | ',') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
