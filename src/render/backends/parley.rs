//! Text shaping with Parley.
//!
//! Font descriptions are resolved through [`FontManager`] (fontique), and text is itemized and
//! shaped by building a single-line Parley layout. Each glyph run of the layout becomes one
//! [`GlyphRun`], with advances converted to layout units.
//!
//! Without the `parley_layout` feature, shaping falls back to a plain character map lookup with
//! skrifa: one run per string, no ligatures and no script itemization.

pub mod font_manager;

use crate::errors::{DrwError, Result};
use crate::pattern::{FontPattern, WEIGHT_REGULAR};
use crate::render::backend::{FontDescription, GlyphRun, PositionedGlyph, ShapedFont, Shaper};
use crate::text::units_from_px;
use font_manager::FontManager;
use parley::LayoutContext;
use std::cell::RefCell;

pub use font_manager::{attributes, generic_family};

/// Shaping engine backed by Parley.
pub struct ParleyShaper {
    fm: RefCell<FontManager>,
    #[allow(unused)]
    layout_cx: RefCell<LayoutContext<[u8; 4]>>,
}

impl ParleyShaper {
    pub fn new() -> Self {
        Self {
            fm: RefCell::new(FontManager::new()),
            layout_cx: RefCell::new(LayoutContext::new()),
        }
    }
}

impl Default for ParleyShaper {
    fn default() -> Self {
        Self::new()
    }
}

impl Shaper for ParleyShaper {
    fn name(&self) -> &str {
        "ParleyShaper"
    }

    fn description_from_pattern(&self, pattern: &FontPattern) -> Result<FontDescription> {
        let size = pattern.pixel_size() as f32;
        if !size.is_finite() || size <= 0.0 {
            return Err(DrwError::ShapingDescription(pattern.to_string()));
        }

        let families = if pattern.families.is_empty() {
            vec!["sans-serif".to_string()]
        } else {
            pattern.families.clone()
        };

        Ok(FontDescription {
            families,
            size,
            weight: pattern.weight.unwrap_or(WEIGHT_REGULAR) as f32,
            italic: pattern.is_italic(),
        })
    }

    fn load_font(&self, desc: &FontDescription) -> Result<ShapedFont> {
        let (face, family) = self
            .fm
            .borrow_mut()
            .resolve(&desc.families, attributes(desc.weight, desc.italic))
            .ok_or_else(|| DrwError::ShapingFontLoad(desc.families.join(",")))?;

        Ok(ShapedFont {
            family,
            size: desc.size,
            face: Some(face),
        })
    }

    #[cfg(feature = "parley_layout")]
    fn shape_runs(&self, desc: &FontDescription, text: &str) -> Result<Vec<GlyphRun>> {
        use parley::layout::PositionedLayoutItem;
        use parley::style::{FontFamily, FontStack, FontStyle, FontWeight, StyleProperty};
        use std::borrow::Cow;

        if text.is_empty() {
            return Ok(Vec::new());
        }

        let stack: Vec<FontFamily> = desc
            .families
            .iter()
            .map(|name| match generic_family(name) {
                Some(generic) => FontFamily::Generic(generic),
                None => FontFamily::Named(Cow::Borrowed(name.as_str())),
            })
            .collect();

        let mut fm = self.fm.borrow_mut();
        let mut layout_cx = self.layout_cx.borrow_mut();

        let mut builder = layout_cx.ranged_builder(fm.font_cx(), text, 1.0, true);
        builder.push_default(StyleProperty::FontSize(desc.size));
        builder.push_default(StyleProperty::FontStack(FontStack::List(stack.into())));
        builder.push_default(StyleProperty::FontWeight(FontWeight::new(desc.weight)));
        if desc.italic {
            builder.push_default(StyleProperty::FontStyle(FontStyle::Italic));
        }
        let mut layout = builder.build(text);

        // one unbounded line; the caller decides what fits
        layout.break_all_lines(None);

        let family = desc.families.first().cloned().unwrap_or_default();
        let mut out = Vec::new();
        for line in layout.lines() {
            for item in line.items() {
                let PositionedLayoutItem::GlyphRun(glyph_run) = item else {
                    continue;
                };
                let run = glyph_run.run();
                let range = run.text_range();

                let glyphs = glyph_run
                    .glyphs()
                    .map(|g| PositionedGlyph {
                        id: g.id as u32,
                        x_offset: units_from_px(g.x),
                        y_offset: units_from_px(g.y),
                        advance: units_from_px(g.advance),
                    })
                    .collect();

                out.push(GlyphRun {
                    offset: range.start,
                    length: range.end - range.start,
                    font: ShapedFont {
                        family: family.clone(),
                        size: run.font_size(),
                        face: Some(run.font().clone()),
                    },
                    rtl: run.is_rtl(),
                    glyphs,
                });
            }
        }

        // line items come in visual order
        out.sort_by_key(|run| run.offset);
        Ok(out)
    }

    #[cfg(not(feature = "parley_layout"))]
    fn shape_runs(&self, desc: &FontDescription, text: &str) -> Result<Vec<GlyphRun>> {
        use skrifa::MetadataProvider;

        if text.is_empty() {
            return Ok(Vec::new());
        }

        let font = self.load_font(desc)?;
        let face = font
            .face
            .as_ref()
            .ok_or_else(|| DrwError::ShapingFontLoad(desc.families.join(",")))?;
        let font_ref = to_font_ref(face).ok_or_else(|| DrwError::ShapingFontLoad(font.family.clone()))?;

        let charmap = font_ref.charmap();
        let size = skrifa::instance::Size::new(desc.size);
        let glyph_metrics = font_ref.glyph_metrics(size, skrifa::instance::LocationRef::default());

        let glyphs = text
            .chars()
            .map(|ch| {
                let gid = charmap.map(ch).unwrap_or_default();
                let advance = glyph_metrics.advance_width(gid).unwrap_or_default();
                PositionedGlyph {
                    id: gid.to_u32(),
                    x_offset: 0,
                    y_offset: 0,
                    advance: units_from_px(advance),
                }
            })
            .collect();

        Ok(vec![GlyphRun {
            offset: 0,
            length: text.len(),
            font,
            rtl: false,
            glyphs,
        }])
    }
}

/// Parses the face data of a Parley font with skrifa.
pub fn to_font_ref(font: &parley::Font) -> Option<skrifa::FontRef<'_>> {
    use skrifa::raw::FileRef;
    let file_ref = FileRef::new(font.data.as_ref()).ok()?;
    match file_ref {
        FileRef::Font(font) => Some(font),
        FileRef::Collection(collection) => collection.get(font.index).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::units_to_px;

    #[test]
    fn description_follows_the_pattern() {
        let shaper = ParleyShaper::new();
        let p = FontPattern::parse("DejaVu Sans Mono,monospace:pixelsize=14:bold:italic").unwrap();
        let desc = shaper.description_from_pattern(&p).unwrap();
        assert_eq!(desc.families, vec!["DejaVu Sans Mono".to_string(), "monospace".to_string()]);
        assert_eq!(desc.size, 14.0);
        assert_eq!(desc.weight, 700.0);
        assert!(desc.italic);
    }

    #[test]
    fn bad_sizes_cannot_be_described() {
        let shaper = ParleyShaper::new();
        let p = FontPattern {
            families: vec!["mono".into()],
            pixel_size: Some(f64::NAN),
            ..Default::default()
        };
        assert!(matches!(
            shaper.description_from_pattern(&p),
            Err(DrwError::ShapingDescription(_))
        ));
    }

    #[test]
    fn familyless_pattern_defaults_to_sans() {
        let shaper = ParleyShaper::new();
        let desc = shaper
            .description_from_pattern(&FontPattern::parse(":size=9").unwrap())
            .unwrap();
        assert_eq!(desc.families, vec!["sans-serif".to_string()]);
    }

    #[test]
    fn runs_cover_the_text_when_fonts_exist() {
        let shaper = ParleyShaper::new();
        let desc = shaper
            .description_from_pattern(&FontPattern::parse("monospace:pixelsize=16").unwrap())
            .unwrap();
        if shaper.load_font(&desc).is_err() {
            // no fonts installed
            return;
        }

        assert!(shaper.shape_runs(&desc, "").unwrap().is_empty());

        let text = "Hello, world";
        let runs = shaper.shape_runs(&desc, text).unwrap();
        assert!(!runs.is_empty());
        let covered: usize = runs.iter().map(|r| r.length).sum();
        assert_eq!(covered, text.len());

        let width: i32 = runs.iter().map(|r| units_to_px(r.extents().width)).sum();
        assert!(width > 0);
    }

    #[test]
    fn mixed_direction_runs_keep_text_order() {
        let shaper = ParleyShaper::new();
        let desc = shaper
            .description_from_pattern(&FontPattern::parse("sans:pixelsize=16").unwrap())
            .unwrap();
        if shaper.load_font(&desc).is_err() {
            return;
        }

        let text = "abc \u{5e9}\u{5dc}\u{5d5}\u{5dd} def";
        let runs = shaper.shape_runs(&desc, text).unwrap();
        let offsets: Vec<usize> = runs.iter().map(|r| r.offset).collect();
        let mut sorted = offsets.clone();
        sorted.sort();
        assert_eq!(offsets, sorted);

        let mut next = 0;
        for run in &runs {
            assert_eq!(run.offset, next);
            next += run.length;
        }
        assert_eq!(next, text.len());
    }
}
