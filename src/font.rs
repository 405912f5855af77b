//! Fonts and font sets.

use crate::errors::{DrwError, Result};
use crate::pattern::FontPattern;
use crate::render::backend::{Connection, FontId, NativeFont};
use std::collections::VecDeque;

/// A font opened on the window system.
pub struct Font {
    conn: Connection,
    native: NativeFont,
    /// Pattern parsed from the name the font was opened with. `None` when opened from a
    /// caller-owned pattern.
    pattern: Option<FontPattern>,
    /// Line height: ascent + descent.
    h: u32,
}

impl Font {
    /// Opens a font either by name or from a pattern; one of the two must be given.
    pub fn create(conn: &Connection, name: Option<&str>, pattern: Option<&FontPattern>) -> Result<Self> {
        let (native, owned) = match (name, pattern) {
            (Some(name), _) => {
                let native = conn
                    .ws
                    .open_font_name(name)
                    .ok_or_else(|| DrwError::FontLoad(name.to_string()))?;

                // Keep the pattern parsed from the name: it is what gives the intended fallback
                // behaviour, the matched pattern alone does not.
                match FontPattern::parse(name) {
                    Ok(p) => (native, Some(p)),
                    Err(e) => {
                        conn.ws.close_font(native.id);
                        return Err(e);
                    }
                }
            }
            (None, Some(pattern)) => {
                let native = conn
                    .ws
                    .open_font_pattern(pattern)
                    .ok_or_else(|| DrwError::FontLoad(pattern.to_string()))?;
                (native, None)
            }
            (None, None) => return Err(DrwError::MissingFontArgument),
        };

        let h = (native.ascent + native.descent).max(0) as u32;

        Ok(Self {
            conn: conn.clone(),
            native,
            pattern: owned,
            h,
        })
    }

    pub fn from_name(conn: &Connection, name: &str) -> Result<Self> {
        Self::create(conn, Some(name), None)
    }

    pub fn from_pattern(conn: &Connection, pattern: &FontPattern) -> Result<Self> {
        Self::create(conn, None, Some(pattern))
    }

    pub fn id(&self) -> FontId {
        self.native.id
    }

    pub fn ascent(&self) -> i32 {
        self.native.ascent
    }

    pub fn descent(&self) -> i32 {
        self.native.descent
    }

    /// Line height in pixels.
    pub fn height(&self) -> u32 {
        self.h
    }

    /// Pattern the font was matched to by the window system.
    pub fn matched_pattern(&self) -> &FontPattern {
        &self.native.pattern
    }

    /// Pattern parsed from the font name, if the font was opened by name.
    pub fn pattern(&self) -> Option<&FontPattern> {
        self.pattern.as_ref()
    }
}

impl Drop for Font {
    fn drop(&mut self) {
        self.pattern.take();
        self.conn.ws.close_font(self.native.id);
    }
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("id", &self.native.id)
            .field("h", &self.h)
            .field("pattern", &self.pattern.as_ref().map(|p| p.to_string()))
            .finish()
    }
}

/// Fonts in priority order; the head is tried first.
#[derive(Debug, Default)]
pub struct FontSet {
    fonts: Vec<Font>,
}

impl FontSet {
    /// Opens every name that loads. Names that fail are logged and left out.
    pub fn create<S: AsRef<str>>(conn: &Connection, names: &[S]) -> Self {
        // Walk the names back to front and push each loaded font on the front: the set ends up
        // in the caller's order with the first loadable name at the head.
        let mut chain = VecDeque::with_capacity(names.len());
        for name in names.iter().rev() {
            let name = name.as_ref();
            match Font::from_name(conn, name) {
                Ok(font) => chain.push_front(font),
                Err(e) => log::warn!("skipping font: {}", e),
            }
        }

        if chain.is_empty() && !names.is_empty() {
            log::warn!("no font of {} could be loaded", names.len());
        }

        Self {
            fonts: chain.into(),
        }
    }

    /// First font of the set.
    pub fn head(&self) -> Option<&Font> {
        self.fonts.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Font> {
        self.fonts.iter()
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

impl<'a> IntoIterator for &'a FontSet {
    type Item = &'a Font;
    type IntoIter = std::slice::Iter<'a, Font>;

    fn into_iter(self) -> Self::IntoIter {
        self.fonts.iter()
    }
}
