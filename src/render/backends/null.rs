//! Null backend: a window system that draws nothing and records every request, plus a shaper
//! with fixed per-character advances.
//!
//! Useful for testing drawing code without a display or installed fonts. Glyph ids produced by
//! [`NullShaper`] are the code points of the characters they stand for, so recorded glyph runs
//! can be turned back into text.

use crate::color::{Color, Rgba};
use crate::cursor::CursorShape;
use crate::errors::{DrwError, Result};
use crate::pattern::FontPattern;
use crate::render::backend::{
    Connection, CursorId, Drawable, FontDescription, FontId, GcId, GlyphInfo, GlyphRun, LineAttributes, NativeFont,
    PixmapId, PositionedGlyph, Rect, ShapedFont, Shaper, WindowId, WindowSystem,
};
use crate::text::{units_from_px, units_to_px};
use hashbrown::HashMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A request the window system received.
#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    CreatePixmap { id: PixmapId, w: u32, h: u32 },
    FreePixmap { id: PixmapId },
    CreateGc { id: GcId },
    SetLineAttributes { gc: GcId, attrs: LineAttributes },
    SetForeground { gc: GcId, pixel: u32 },
    FreeGc { id: GcId },
    FillRectangle { dst: Drawable, rect: Rect, pixel: u32 },
    DrawRectangle { dst: Drawable, rect: Rect, pixel: u32 },
    CopyArea { src: Drawable, dst: Drawable, rect: Rect, dst_x: i32, dst_y: i32 },
    Sync,
    OpenFont { id: FontId, name: String },
    CloseFont { id: FontId },
    CreateCursor { id: CursorId, shape: CursorShape },
    FreeCursor { id: CursorId },
    RenderGlyphs { dst: Drawable, pixel: u32, x: i32, y: i32, text: String },
}

/// Window system that only records what it is asked to do.
#[derive(Default)]
pub struct NullWindowSystem {
    next_id: Cell<u64>,
    ops: RefCell<Vec<Op>>,
    foreground: RefCell<HashMap<GcId, u32>>,
    font_sizes: RefCell<HashMap<FontId, f32>>,
    fail_pixmaps: Cell<bool>,
}

impl NullWindowSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains the recorded requests.
    pub fn take_ops(&self) -> Vec<Op> {
        std::mem::take(&mut *self.ops.borrow_mut())
    }

    /// Makes every following `create_pixmap` fail, as when the server runs out of memory.
    pub fn set_fail_pixmaps(&self, fail: bool) {
        self.fail_pixmaps.set(fail);
    }

    fn id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn record(&self, op: Op) {
        self.ops.borrow_mut().push(op);
    }

    fn pixel(&self, gc: GcId) -> u32 {
        self.foreground.borrow().get(&gc).copied().unwrap_or(0)
    }

    fn open(&self, name: String, pattern: FontPattern) -> NativeFont {
        let px = pattern.pixel_size() as f32;
        let id = FontId(self.id());
        self.font_sizes.borrow_mut().insert(id, px);
        self.record(Op::OpenFont { id, name });

        NativeFont {
            id,
            ascent: (px * 0.75).round() as i32,
            descent: (px.round() - (px * 0.75).round()) as i32,
            pattern,
        }
    }
}

impl WindowSystem for NullWindowSystem {
    fn name(&self) -> &str {
        "NullWindowSystem"
    }

    fn create_pixmap(&self, _root: WindowId, w: u32, h: u32) -> Result<PixmapId> {
        if self.fail_pixmaps.get() {
            return Err(DrwError::Backend(format!("cannot allocate {}x{} pixmap", w, h)));
        }
        let id = PixmapId(self.id());
        self.record(Op::CreatePixmap { id, w, h });
        Ok(id)
    }

    fn free_pixmap(&self, pixmap: PixmapId) {
        self.record(Op::FreePixmap { id: pixmap });
    }

    fn create_gc(&self, _root: WindowId) -> Result<GcId> {
        let id = GcId(self.id());
        self.record(Op::CreateGc { id });
        Ok(id)
    }

    fn set_line_attributes(&self, gc: GcId, attrs: LineAttributes) {
        self.record(Op::SetLineAttributes { gc, attrs });
    }

    fn set_foreground(&self, gc: GcId, color: &Color) {
        self.foreground.borrow_mut().insert(gc, color.pixel);
        self.record(Op::SetForeground { gc, pixel: color.pixel });
    }

    fn free_gc(&self, gc: GcId) {
        self.foreground.borrow_mut().remove(&gc);
        self.record(Op::FreeGc { id: gc });
    }

    fn fill_rectangle(&self, dst: Drawable, gc: GcId, rect: Rect) {
        let pixel = self.pixel(gc);
        self.record(Op::FillRectangle { dst, rect, pixel });
    }

    fn draw_rectangle(&self, dst: Drawable, gc: GcId, rect: Rect) {
        let pixel = self.pixel(gc);
        self.record(Op::DrawRectangle { dst, rect, pixel });
    }

    fn copy_area(&self, src: Drawable, dst: Drawable, _gc: GcId, rect: Rect, dst_x: i32, dst_y: i32) {
        self.record(Op::CopyArea { src, dst, rect, dst_x, dst_y });
    }

    fn sync(&self) {
        self.record(Op::Sync);
    }

    /// Fails for names containing `bad`.
    fn open_font_name(&self, name: &str) -> Option<NativeFont> {
        if name.contains("bad") {
            return None;
        }
        let pattern = FontPattern::parse(name).unwrap_or_else(|_| FontPattern {
            families: vec![name.to_string()],
            ..Default::default()
        });
        Some(self.open(name.to_string(), pattern))
    }

    fn open_font_pattern(&self, pattern: &FontPattern) -> Option<NativeFont> {
        if pattern.families.iter().any(|f| f.contains("bad")) {
            return None;
        }
        Some(self.open(pattern.to_string(), pattern.clone()))
    }

    fn close_font(&self, font: FontId) {
        self.font_sizes.borrow_mut().remove(&font);
        self.record(Op::CloseFont { id: font });
    }

    fn text_extents(&self, font: FontId, text: &str) -> GlyphInfo {
        let size = self.font_sizes.borrow().get(&font).copied().unwrap_or(0.0);
        let units: i32 = text.chars().map(|c| advance_units(c, size)).sum();
        let x_off = units_to_px(units);
        GlyphInfo {
            width: x_off.max(0) as u32,
            height: size.round() as u32,
            x_off,
            ..Default::default()
        }
    }

    fn alloc_color(&self, name: &str) -> Option<Color> {
        Rgba::parse(name).map(Color::from_rgba)
    }

    fn create_cursor(&self, shape: CursorShape) -> Option<CursorId> {
        let id = CursorId(self.id());
        self.record(Op::CreateCursor { id, shape });
        Some(id)
    }

    fn free_cursor(&self, cursor: CursorId) {
        self.record(Op::FreeCursor { id: cursor });
    }

    fn render_glyphs(&self, dst: Drawable, color: &Color, run: &GlyphRun, x: i32, y: i32) {
        let text = run.glyphs.iter().filter_map(|g| char::from_u32(g.id)).collect();
        self.record(Op::RenderGlyphs {
            dst,
            pixel: color.pixel,
            x,
            y,
            text,
        });
    }
}

/// Zero-width characters shape to nothing.
fn is_zero_width(c: char) -> bool {
    matches!(c, '\u{200b}'..='\u{200d}' | '\u{2060}' | '\u{feff}' | '\u{0300}'..='\u{036f}')
}

/// CJK and friends are set at double width.
fn is_wide(c: char) -> bool {
    ('\u{2e80}'..='\u{a4cf}').contains(&c) || ('\u{ac00}'..='\u{d7a3}').contains(&c) || ('\u{ff00}'..='\u{ff60}').contains(&c)
}

/// Advance of a character at a pixel size: 0.6em for narrow, 1.2em for wide characters.
fn advance_units(c: char, size: f32) -> i32 {
    if is_zero_width(c) {
        0
    } else if is_wide(c) {
        units_from_px(size * 1.2)
    } else {
        units_from_px(size * 0.6)
    }
}

/// Shaper with fixed advances. Text is split into runs wherever it switches between narrow and
/// wide characters.
///
/// Description derivation fails for families containing `nodesc`; loading fails for families
/// containing `noshape`.
#[derive(Default)]
pub struct NullShaper;

impl NullShaper {
    pub fn new() -> Self {
        Self
    }
}

impl Shaper for NullShaper {
    fn name(&self) -> &str {
        "NullShaper"
    }

    fn description_from_pattern(&self, pattern: &FontPattern) -> Result<FontDescription> {
        if pattern.families.iter().any(|f| f.contains("nodesc")) {
            return Err(DrwError::ShapingDescription(pattern.to_string()));
        }
        let families = if pattern.families.is_empty() {
            vec!["monospace".to_string()]
        } else {
            pattern.families.clone()
        };
        Ok(FontDescription {
            families,
            size: pattern.pixel_size() as f32,
            weight: pattern.weight.unwrap_or(crate::pattern::WEIGHT_REGULAR) as f32,
            italic: pattern.is_italic(),
        })
    }

    fn load_font(&self, desc: &FontDescription) -> Result<ShapedFont> {
        if desc.families.iter().any(|f| f.contains("noshape")) {
            return Err(DrwError::ShapingFontLoad(desc.families.join(",")));
        }
        Ok(ShapedFont {
            family: desc.families[0].clone(),
            size: desc.size,
            face: None,
        })
    }

    fn shape_runs(&self, desc: &FontDescription, text: &str) -> Result<Vec<GlyphRun>> {
        let font = ShapedFont {
            family: desc.families.first().cloned().unwrap_or_default(),
            size: desc.size,
            face: None,
        };

        let mut runs: Vec<GlyphRun> = Vec::new();
        let mut wide: Option<bool> = None;

        for (offset, c) in text.char_indices() {
            let glyph = PositionedGlyph {
                id: c as u32,
                x_offset: 0,
                y_offset: 0,
                advance: advance_units(c, desc.size),
            };

            let class = is_wide(c);
            let same_run = is_zero_width(c) || wide.map_or(true, |w| w == class);
            match runs.last_mut() {
                Some(run) if same_run => {
                    run.length += c.len_utf8();
                    run.glyphs.push(glyph);
                }
                _ => {
                    runs.push(GlyphRun {
                        offset,
                        length: c.len_utf8(),
                        font: font.clone(),
                        rtl: false,
                        glyphs: vec![glyph],
                    });
                }
            }
            if !is_zero_width(c) {
                wide = Some(class);
            }
        }

        Ok(runs)
    }
}

/// Connection over a fresh [`NullWindowSystem`] and [`NullShaper`], with the window system
/// handed back for inspection.
pub fn recording_connection() -> (Connection, Rc<NullWindowSystem>) {
    let ws = Rc::new(NullWindowSystem::new());
    let conn = Connection::new(ws.clone(), Rc::new(NullShaper::new()), 0);
    (conn, ws)
}

/// Connection over the null backend.
pub fn test_connection() -> Connection {
    recording_connection().0
}
