//! Offscreen drawing surface.
//!
//! A [`DrawSurface`] owns one pixmap and one graphics context. Rectangles and text are drawn into
//! the pixmap using the active color scheme and font set, then copied onto a window with
//! [`DrawSurface::map`].

use crate::color::{Color, ColorRole, ColorScheme};
use crate::cursor::{Cursor, CursorShape};
use crate::errors::Result;
use crate::font::{Font, FontSet};
use crate::render::backend::{Connection, Drawable, GcId, LineAttributes, PixmapId, Rect, WindowId};
use crate::text;
use std::rc::Rc;

pub struct DrawSurface {
    conn: Connection,
    root: WindowId,
    w: u32,
    h: u32,
    drawable: PixmapId,
    gc: GcId,
    fonts: Option<Rc<FontSet>>,
    scheme: Option<Rc<ColorScheme>>,
}

impl DrawSurface {
    /// Creates a `w`x`h` surface for windows under `root`.
    pub fn new(conn: &Connection, root: WindowId, w: u32, h: u32) -> Result<Self> {
        let drawable = conn.ws.create_pixmap(root, w, h)?;
        let gc = match conn.ws.create_gc(root) {
            Ok(gc) => gc,
            Err(e) => {
                conn.ws.free_pixmap(drawable);
                return Err(e);
            }
        };
        conn.ws.set_line_attributes(gc, LineAttributes::default());

        log::debug!("created {}x{} surface on {}", w, h, conn.ws.name());

        Ok(Self {
            conn: conn.clone(),
            root,
            w,
            h,
            drawable,
            gc,
            fonts: None,
            scheme: None,
        })
    }

    /// Replaces the pixmap with one of the new size. Contents are lost; the GC is kept.
    /// On failure the old pixmap and size are kept.
    pub fn resize(&mut self, w: u32, h: u32) -> Result<()> {
        let drawable = self.conn.ws.create_pixmap(self.root, w, h)?;
        self.conn.ws.free_pixmap(std::mem::replace(&mut self.drawable, drawable));
        self.w = w;
        self.h = h;
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.w
    }

    pub fn height(&self) -> u32 {
        self.h
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn pixmap(&self) -> PixmapId {
        self.drawable
    }

    pub fn set_fontset(&mut self, set: Option<Rc<FontSet>>) {
        self.fonts = set;
    }

    pub fn fontset(&self) -> Option<&Rc<FontSet>> {
        self.fonts.as_ref()
    }

    pub fn set_scheme(&mut self, scheme: Option<Rc<ColorScheme>>) {
        self.scheme = scheme;
    }

    pub fn scheme(&self) -> Option<&Rc<ColorScheme>> {
        self.scheme.as_ref()
    }

    fn head_font(&self) -> Option<&Font> {
        self.fonts.as_deref().and_then(FontSet::head)
    }

    fn role(scheme: &ColorScheme, role: ColorRole) -> Color {
        scheme.get(role).copied().unwrap_or(*scheme.fg())
    }

    /// Draws a rectangle in the foreground color, or the background color when `invert` is set.
    /// Outlines stay inside the `w`x`h` box.
    pub fn rect(&self, x: i32, y: i32, w: u32, h: u32, filled: bool, invert: bool) {
        let Some(scheme) = self.scheme.as_deref() else {
            return;
        };

        let color = Self::role(scheme, if invert { ColorRole::Bg } else { ColorRole::Fg });
        self.conn.ws.set_foreground(self.gc, &color);

        let dst = Drawable::Pixmap(self.drawable);
        if filled {
            self.conn.ws.fill_rectangle(dst, self.gc, Rect::new(x, y, w, h));
        } else {
            let rect = Rect::new(x, y, w.saturating_sub(1), h.saturating_sub(1));
            self.conn.ws.draw_rectangle(dst, self.gc, rect);
        }
    }

    /// Width of `text` set in the head font of the active font set. 0 without fonts or text.
    pub fn measure_text(&self, text: &str) -> Result<u32> {
        let Some(font) = self.head_font() else {
            return Ok(0);
        };
        if text.is_empty() {
            return Ok(0);
        }
        text::measure(&self.conn, font, text)
    }

    /// Fills the box, then draws `text` left-padded by `lpad` and centered vertically.
    ///
    /// Returns the x just past the box, even when the text or padding overflows it, so adjacent
    /// boxes can be chained. Returns 0 when there is no scheme, font or text.
    #[allow(clippy::too_many_arguments)]
    pub fn render_text(&self, x: i32, y: i32, w: u32, h: u32, lpad: u32, text: &str, invert: bool) -> Result<i32> {
        let Some(scheme) = self.scheme.as_deref() else {
            return Ok(0);
        };
        let Some(font) = self.head_font() else {
            return Ok(0);
        };
        if text.is_empty() {
            return Ok(0);
        }

        let (bg, fg) = if invert {
            (ColorRole::Fg, ColorRole::Bg)
        } else {
            (ColorRole::Bg, ColorRole::Fg)
        };

        let dst = Drawable::Pixmap(self.drawable);
        self.conn.ws.set_foreground(self.gc, &Self::role(scheme, bg));
        self.conn.ws.fill_rectangle(dst, self.gc, Rect::new(x, y, w, h));

        // x + w stays the box's right edge whatever lpad and the text consume
        let mut cx = x.wrapping_add(lpad as i32);
        let mut cw = w.wrapping_sub(lpad);

        let ty = y + (h as i32 - font.height() as i32) / 2 + font.ascent();
        let end = text::render(&self.conn, font, &Self::role(scheme, fg), dst, cx, ty, text)?;

        let ew = end.wrapping_sub(cx) as u32;
        cx = cx.wrapping_add(ew as i32);
        cw = cw.wrapping_sub(ew);

        Ok(cx.wrapping_add(cw as i32))
    }

    /// Measures when the box is all zeros, otherwise renders. Backend failures are logged and
    /// yield 0.
    #[allow(clippy::too_many_arguments)]
    pub fn text(&self, x: i32, y: i32, w: u32, h: u32, lpad: u32, text: &str, invert: bool) -> i32 {
        let res = if x == 0 && y == 0 && w == 0 && h == 0 {
            self.measure_text(text).map(|w| w as i32)
        } else {
            self.render_text(x, y, w, h, lpad, text, invert)
        };

        res.unwrap_or_else(|e| {
            log::error!("cannot draw text {:?}: {}", text, e);
            0
        })
    }

    /// Width of `text` in the active font set; 0 when anything is missing.
    pub fn fontset_width(&self, text: &str) -> u32 {
        self.measure_text(text).unwrap_or_else(|e| {
            log::error!("cannot measure text {:?}: {}", text, e);
            0
        })
    }

    /// Advance width of the first `len` bytes of `text` as the window system sees it, and the
    /// font's line height. `len` is clamped down to a character boundary.
    pub fn font_extents(&self, font: &Font, text: &str, len: usize) -> (u32, u32) {
        let mut len = len.min(text.len());
        while !text.is_char_boundary(len) {
            len -= 1;
        }
        let ext = self.conn.ws.text_extents(font.id(), &text[..len]);
        (ext.x_off.max(0) as u32, font.height())
    }

    pub fn create_cursor(&self, shape: CursorShape) -> Option<Cursor> {
        Cursor::create(&self.conn, shape)
    }

    /// Copies a region of the surface to the same position on `win`, then waits for the window
    /// system to process everything drawn so far.
    pub fn map(&self, win: WindowId, x: i32, y: i32, w: u32, h: u32) {
        self.conn.ws.copy_area(
            Drawable::Pixmap(self.drawable),
            Drawable::Window(win),
            self.gc,
            Rect::new(x, y, w, h),
            x,
            y,
        );
        self.conn.ws.sync();
    }
}

impl Drop for DrawSurface {
    fn drop(&mut self) {
        self.conn.ws.free_pixmap(self.drawable);
        self.conn.ws.free_gc(self.gc);
        log::debug!("freed {}x{} surface", self.w, self.h);
    }
}

impl std::fmt::Debug for DrawSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawSurface")
            .field("w", &self.w)
            .field("h", &self.h)
            .field("drawable", &self.drawable)
            .field("fonts", &self.fonts.as_ref().map(|s| s.len()))
            .field("scheme", &self.scheme.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;
    use crate::render::backends::null::{recording_connection, NullWindowSystem, Op};

    const ROOT: WindowId = WindowId(1);

    fn setup(names: &[&str]) -> (DrawSurface, Rc<NullWindowSystem>) {
        let (conn, ws) = recording_connection();
        let mut drw = DrawSurface::new(&conn, ROOT, 200, 20).unwrap();
        drw.set_fontset(Some(Rc::new(FontSet::create(&conn, names))));
        drw.set_scheme(Some(Rc::new(ColorScheme::create(&conn, &["white", "black"]).unwrap())));
        ws.take_ops();
        (drw, ws)
    }

    const WHITE: u32 = 0xffffffff;
    const BLACK: u32 = 0xff000000;

    #[test]
    fn create_sets_thin_lines() {
        let (conn, ws) = recording_connection();
        let drw = DrawSurface::new(&conn, ROOT, 10, 10).unwrap();
        let ops = ws.take_ops();
        assert!(matches!(ops[0], Op::CreatePixmap { w: 10, h: 10, .. }));
        assert!(matches!(ops[1], Op::CreateGc { .. }));
        assert!(matches!(ops[2], Op::SetLineAttributes { attrs, .. } if attrs == LineAttributes::default()));
        assert_eq!(drw.width(), 10);
    }

    #[test]
    fn resize_recreates_pixmap_only() {
        let (mut drw, ws) = setup(&["mono"]);
        let old = drw.pixmap();
        drw.resize(300, 30).unwrap();
        let ops = ws.take_ops();
        assert!(matches!(ops[0], Op::CreatePixmap { w: 300, h: 30, .. }));
        assert_eq!(ops[1], Op::FreePixmap { id: old });
        assert_eq!(ops.len(), 2);
        assert_ne!(drw.pixmap(), old);
        assert_eq!((drw.width(), drw.height()), (300, 30));
    }

    #[test]
    fn failed_resize_keeps_the_old_pixmap() {
        let (mut drw, ws) = setup(&["mono"]);
        let old = drw.pixmap();
        ws.set_fail_pixmaps(true);
        assert!(drw.resize(300, 30).is_err());
        assert_eq!(drw.pixmap(), old);
        assert_eq!((drw.width(), drw.height()), (200, 20));
        assert!(ws.take_ops().is_empty());

        drop(drw);
        let freed: Vec<Op> = ws
            .take_ops()
            .into_iter()
            .filter(|op| matches!(op, Op::FreePixmap { .. }))
            .collect();
        assert_eq!(freed, vec![Op::FreePixmap { id: old }]);
    }

    #[test]
    fn drop_frees_pixmap_then_gc() {
        let (drw, ws) = setup(&["mono"]);
        let pm = drw.pixmap();
        drop(drw);
        let ops = ws.take_ops();
        assert_eq!(ops[0], Op::FreePixmap { id: pm });
        assert!(matches!(ops[1], Op::FreeGc { .. }));
    }

    #[test]
    fn outline_stays_inside_the_box() {
        let (drw, ws) = setup(&["mono"]);
        drw.rect(3, 4, 10, 5, false, false);
        let ops = ws.take_ops();
        let rect = ops
            .iter()
            .find_map(|op| match op {
                Op::DrawRectangle { rect, pixel, .. } => {
                    assert_eq!(*pixel, WHITE);
                    Some(*rect)
                }
                _ => None,
            })
            .unwrap();
        // X11 outlines cover x..=x+w, so the last pixel is 3+9, 4+4
        assert_eq!(rect, Rect::new(3, 4, 9, 4));
        assert_eq!(rect.x + rect.w as i32, 12);
        assert_eq!(rect.y + rect.h as i32, 8);
    }

    #[test]
    fn filled_inverted_rect_uses_background() {
        let (drw, ws) = setup(&["mono"]);
        drw.rect(0, 0, 10, 5, true, true);
        let ops = ws.take_ops();
        assert!(ops.contains(&Op::FillRectangle {
            dst: Drawable::Pixmap(drw.pixmap()),
            rect: Rect::new(0, 0, 10, 5),
            pixel: BLACK
        }));
    }

    #[test]
    fn rect_without_scheme_is_a_no_op() {
        let (mut drw, ws) = setup(&["mono"]);
        drw.set_scheme(None);
        drw.rect(0, 0, 10, 5, true, false);
        assert!(ws.take_ops().is_empty());
    }

    #[test]
    fn measure_mode_returns_the_width() {
        let (drw, ws) = setup(&["mono"]);
        let font = drw.fontset().unwrap().head().unwrap();
        let w = text::measure(drw.connection(), font, "Hi").unwrap();
        assert!(w > 0);
        assert_eq!(drw.text(0, 0, 0, 0, 0, "Hi", false), w as i32);
        assert_eq!(drw.fontset_width("Hi"), w);
        // measuring draws nothing
        assert!(ws.take_ops().is_empty());
    }

    #[test]
    fn status_box_end_to_end() {
        let (drw, ws) = setup(&["monospace:pixelsize=16"]);
        let ew = drw.fontset_width("Hi") as i32;

        let ret = drw.text(0, 0, 200, 20, 2, "Hi", false);
        // the box edge: x + lpad + ew + (200 - lpad - ew)
        assert_eq!(ret, 200);
        assert_eq!(ret, 2 + ew + (200 - 2 - ew));

        let ops = ws.take_ops();
        assert!(ops.contains(&Op::FillRectangle {
            dst: Drawable::Pixmap(drw.pixmap()),
            rect: Rect::new(0, 0, 200, 20),
            pixel: BLACK
        }));

        let font = drw.fontset().unwrap().head().unwrap();
        let baseline = (20 - font.height() as i32) / 2 + font.ascent();
        let drawn: Vec<&Op> = ops.iter().filter(|op| matches!(op, Op::RenderGlyphs { .. })).collect();
        assert_eq!(
            drawn,
            vec![&Op::RenderGlyphs {
                dst: Drawable::Pixmap(drw.pixmap()),
                pixel: WHITE,
                x: 2,
                y: baseline,
                text: "Hi".to_string()
            }]
        );
    }

    #[test]
    fn inverted_text_swaps_roles() {
        let (drw, ws) = setup(&["mono"]);
        drw.text(5, 0, 50, 20, 0, "x", true);
        let ops = ws.take_ops();
        assert!(ops.iter().any(|op| matches!(op, Op::FillRectangle { pixel, .. } if *pixel == WHITE)));
        assert!(ops.iter().any(|op| matches!(op, Op::RenderGlyphs { pixel, .. } if *pixel == BLACK)));
    }

    #[test]
    fn chained_boxes_line_up() {
        let (drw, _) = setup(&["mono"]);
        let a = drw.text(0, 0, 60, 20, 4, "tag", false);
        assert_eq!(a, 60);
        let b = drw.text(a, 0, 80, 20, 4, "title", false);
        assert_eq!(b, 140);
    }

    #[test]
    fn overflowing_text_still_returns_the_box_edge() {
        let (drw, _) = setup(&["mono"]);
        let ew = drw.fontset_width("a rather long title") as i32;
        assert!(ew > 10);
        assert_eq!(drw.text(7, 0, 10, 20, 2, "a rather long title", false), 17);
        // padding wider than the box
        assert_eq!(drw.text(7, 0, 1, 20, 4, "x", false), 8);
    }

    #[test]
    fn huge_boxes_do_not_overflow() {
        let (drw, _) = setup(&["mono"]);
        let ret = drw.text(10, 0, u32::MAX, 20, u32::MAX / 2, "x", false);
        assert_eq!(ret, 10i32.wrapping_add(u32::MAX as i32));
        assert_eq!(drw.text(i32::MAX - 1, 0, 4, 20, 2, "xy", false), (i32::MAX - 1).wrapping_add(4));
    }

    #[test]
    fn no_op_guards_return_zero() {
        let (mut drw, ws) = setup(&["mono"]);
        assert_eq!(drw.text(1, 1, 10, 10, 0, "", false), 0);
        assert_eq!(drw.text(0, 0, 0, 0, 0, "", false), 0);

        drw.set_scheme(None);
        assert_eq!(drw.text(1, 1, 10, 10, 0, "x", false), 0);
        // measuring does not need a scheme
        assert!(drw.text(0, 0, 0, 0, 0, "x", false) > 0);

        drw.set_fontset(None);
        assert_eq!(drw.text(0, 0, 0, 0, 0, "x", false), 0);
        assert_eq!(drw.fontset_width("x"), 0);
        assert!(ws.take_ops().is_empty());
    }

    #[test]
    fn empty_font_set_is_a_no_op() {
        let (drw, _) = setup(&["bad"]);
        assert!(drw.fontset().unwrap().is_empty());
        assert_eq!(drw.text(0, 0, 20, 20, 0, "x", false), 0);
    }

    #[test]
    fn only_the_head_font_is_used() {
        let (drw, _) = setup(&["mono:pixelsize=10", "mono:pixelsize=40"]);
        let head = drw.fontset().unwrap().head().unwrap();
        assert_eq!(head.height(), 10);
        assert_eq!(drw.fontset_width("abc"), text::measure(drw.connection(), head, "abc").unwrap());
        assert_eq!(drw.fontset_width("abc"), 18);
    }

    #[test]
    fn shaping_failure_is_logged_and_neutral() {
        let (drw, _) = setup(&["nodesc"]);
        assert_eq!(drw.text(0, 0, 0, 0, 0, "x", false), 0);
        assert!(drw.measure_text("x").unwrap_err().is_fatal());
        assert!(drw.render_text(0, 0, 10, 10, 0, "x", false).is_err());
    }

    #[test]
    fn font_extents_clamp_to_char_boundary() {
        let (drw, _) = setup(&["mono:pixelsize=10"]);
        let font = drw.fontset().unwrap().head().unwrap();
        assert_eq!(drw.font_extents(font, "abc", 2), (12, 10));
        // "é" is two bytes: 2 lands inside it
        assert_eq!(drw.font_extents(font, "aé", 2), (6, 10));
        assert_eq!(drw.font_extents(font, "ab", 99), (12, 10));
    }

    #[test]
    fn map_copies_then_syncs() {
        let (drw, ws) = setup(&["mono"]);
        drw.map(WindowId(42), 5, 0, 100, 20);
        let ops = ws.take_ops();
        assert_eq!(
            ops[0],
            Op::CopyArea {
                src: Drawable::Pixmap(drw.pixmap()),
                dst: Drawable::Window(WindowId(42)),
                rect: Rect::new(5, 0, 100, 20),
                dst_x: 5,
                dst_y: 0
            }
        );
        assert_eq!(ops[1], Op::Sync);
    }

    #[test]
    fn cursor_from_surface() {
        let (drw, _) = setup(&["mono"]);
        let cur = drw.create_cursor(CursorShape::FLEUR).unwrap();
        assert_eq!(cur.shape(), CursorShape::FLEUR);
    }

    #[test]
    fn scheme_colors_are_used_as_allocated() {
        let (drw, _) = setup(&["mono"]);
        assert_eq!(drw.scheme().unwrap().fg().rgba, Rgba::rgb(255, 255, 255));
    }
}
