use crate::color::{Color, Rgba};
use crate::cursor::CursorShape;
use crate::errors::{DrwError, Result};
use crate::pattern::{FontPattern, Slant, WEIGHT_REGULAR};
use crate::render::backend::{
    CursorId, Drawable, FontId, GcId, GlyphInfo, GlyphRun, LineAttributes, NativeFont, PixmapId, Rect, RgbaImage,
    WindowId, WindowSystem,
};
use crate::render::backends::parley::font_manager::{attributes, FontManager};
use crate::render::backends::parley::to_font_ref;
use crate::text::LAYOUT_SCALE;
use hashbrown::HashMap;
use skrifa::instance::{LocationRef, Size};
use skrifa::outline::{DrawSettings, OutlinePen};
use skrifa::MetadataProvider;
use std::cell::{Cell, RefCell};

struct GcState {
    fg: Color,
    line: LineAttributes,
}

struct OpenFont {
    face: parley::Font,
    size: f32,
}

#[derive(Default)]
struct Tables {
    pixmaps: HashMap<PixmapId, cairo::ImageSurface>,
    windows: HashMap<WindowId, cairo::ImageSurface>,
    gcs: HashMap<GcId, GcState>,
    fonts: HashMap<FontId, OpenFont>,
    cursors: HashMap<CursorId, CursorShape>,
}

/// Window system on top of cairo image surfaces.
///
/// Pixmaps and windows are both ARGB32 image surfaces; windows are registered by the host with
/// [`CairoWindowSystem::add_window`] and can be handed to a compositor or snapshotted. Fonts are
/// matched with fontique and glyphs are filled from their skrifa outlines.
pub struct CairoWindowSystem {
    next_id: Cell<u64>,
    tables: RefCell<Tables>,
    fm: RefCell<FontManager>,
}

impl CairoWindowSystem {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            tables: RefCell::new(Tables::default()),
            fm: RefCell::new(FontManager::new()),
        }
    }

    fn id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    /// Registers a `w`x`h` window surface.
    pub fn add_window(&self, w: u32, h: u32) -> Result<WindowId> {
        let surface = new_surface(w, h)?;
        let id = WindowId(self.id());
        self.tables.borrow_mut().windows.insert(id, surface);
        Ok(id)
    }

    pub fn remove_window(&self, win: WindowId) {
        self.tables.borrow_mut().windows.remove(&win);
    }

    /// The image surface behind a window.
    pub fn window_surface(&self, win: WindowId) -> Option<cairo::ImageSurface> {
        self.tables.borrow().windows.get(&win).cloned()
    }

    /// Cursor shape registered under `id`.
    pub fn cursor_shape(&self, id: CursorId) -> Option<CursorShape> {
        self.tables.borrow().cursors.get(&id).copied()
    }

    fn surface(&self, d: Drawable) -> Option<cairo::ImageSurface> {
        let tables = self.tables.borrow();
        match d {
            Drawable::Pixmap(id) => tables.pixmaps.get(&id).cloned(),
            Drawable::Window(id) => tables.windows.get(&id).cloned(),
        }
    }

    fn gc_state(&self, gc: GcId) -> Option<(Color, LineAttributes)> {
        self.tables.borrow().gcs.get(&gc).map(|s| (s.fg, s.line))
    }

    fn context(&self, d: Drawable) -> Option<cairo::Context> {
        let surface = self.surface(d)?;
        match cairo::Context::new(&surface) {
            Ok(cr) => Some(cr),
            Err(e) => {
                log::warn!("cannot create cairo context for {:?}: {}", d, e);
                None
            }
        }
    }

    /// Copies a drawable into an RGBA8 image, undoing cairo's premultiplied alpha.
    pub fn snapshot(&self, d: Drawable) -> Result<RgbaImage> {
        let surface = self
            .surface(d)
            .ok_or_else(|| DrwError::Backend(format!("unknown drawable {:?}", d)))?;
        surface.flush();

        let width = surface.width() as u32;
        let height = surface.height() as u32;
        let src_stride = surface.stride() as usize;
        let mut pixels = vec![0u8; (width * height * 4) as usize];

        surface
            .with_data(|data| {
                for y in 0..height as usize {
                    for x in 0..width as usize {
                        let off = y * src_stride + x * 4;
                        let p = u32::from_ne_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]]);
                        let a = (p >> 24) & 0xff;
                        let unmul = |c: u32| if a == 0 { 0 } else { ((c * 255 + a / 2) / a).min(255) as u8 };

                        let dst = (y * width as usize + x) * 4;
                        pixels[dst] = unmul((p >> 16) & 0xff);
                        pixels[dst + 1] = unmul((p >> 8) & 0xff);
                        pixels[dst + 2] = unmul(p & 0xff);
                        pixels[dst + 3] = a as u8;
                    }
                }
            })
            .map_err(|e| DrwError::Backend(e.to_string()))?;

        Ok(RgbaImage::from_raw(pixels, width, height, width * 4))
    }

    fn open(&self, pattern: &FontPattern) -> Option<NativeFont> {
        let px = pattern.pixel_size() as f32;
        let weight = pattern.weight.unwrap_or(WEIGHT_REGULAR) as f32;
        let (face, family) = self
            .fm
            .borrow_mut()
            .resolve(&pattern.families, attributes(weight, pattern.is_italic()))?;

        let metrics = to_font_ref(&face)?.metrics(Size::new(px), LocationRef::default());

        let id = FontId(self.id());
        self.tables.borrow_mut().fonts.insert(id, OpenFont { face, size: px });

        let matched = FontPattern {
            families: vec![family],
            pixel_size: Some(px as f64),
            weight: pattern.weight,
            slant: pattern.slant.or(Some(Slant::Roman)),
            antialias: pattern.antialias,
            hinting: pattern.hinting,
            autohint: pattern.autohint,
            ..Default::default()
        };

        Some(NativeFont {
            id,
            ascent: metrics.ascent.ceil() as i32,
            descent: (-metrics.descent).ceil() as i32,
            pattern: matched,
        })
    }
}

impl Default for CairoWindowSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn new_surface(w: u32, h: u32) -> Result<cairo::ImageSurface> {
    // cairo refuses zero-sized image surfaces
    cairo::ImageSurface::create(cairo::Format::ARgb32, w.max(1) as i32, h.max(1) as i32)
        .map_err(|e| DrwError::Backend(e.to_string()))
}

fn set_source(cr: &cairo::Context, color: &Color) {
    let (r, g, b, a) = color.to_f64();
    cr.set_source_rgba(r, g, b, a);
}

/// Feeds skrifa outlines into a cairo path, flipping y and translating to the pen.
struct CairoPen<'a> {
    cr: &'a cairo::Context,
    ox: f64,
    oy: f64,
    last: (f64, f64),
}

impl CairoPen<'_> {
    fn map(&self, x: f32, y: f32) -> (f64, f64) {
        (self.ox + x as f64, self.oy - y as f64)
    }
}

impl OutlinePen for CairoPen<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.cr.move_to(x, y);
        self.last = (x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.cr.line_to(x, y);
        self.last = (x, y);
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        // cairo has no quadratic segments; raise to cubic
        let (qx, qy) = self.map(cx0, cy0);
        let (x, y) = self.map(x, y);
        let (x0, y0) = self.last;
        self.cr.curve_to(
            x0 + 2.0 / 3.0 * (qx - x0),
            y0 + 2.0 / 3.0 * (qy - y0),
            x + 2.0 / 3.0 * (qx - x),
            y + 2.0 / 3.0 * (qy - y),
            x,
            y,
        );
        self.last = (x, y);
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        let (ax, ay) = self.map(cx0, cy0);
        let (bx, by) = self.map(cx1, cy1);
        let (x, y) = self.map(x, y);
        self.cr.curve_to(ax, ay, bx, by, x, y);
        self.last = (x, y);
    }

    fn close(&mut self) {
        self.cr.close_path();
    }
}

impl WindowSystem for CairoWindowSystem {
    fn name(&self) -> &str {
        "CairoWindowSystem"
    }

    fn create_pixmap(&self, _root: WindowId, w: u32, h: u32) -> Result<PixmapId> {
        let surface = new_surface(w, h)?;
        let id = PixmapId(self.id());
        self.tables.borrow_mut().pixmaps.insert(id, surface);
        Ok(id)
    }

    fn free_pixmap(&self, pixmap: PixmapId) {
        self.tables.borrow_mut().pixmaps.remove(&pixmap);
    }

    fn create_gc(&self, _root: WindowId) -> Result<GcId> {
        let id = GcId(self.id());
        self.tables.borrow_mut().gcs.insert(
            id,
            GcState {
                fg: Color::from_rgba(Rgba::rgb(0, 0, 0)),
                line: LineAttributes::default(),
            },
        );
        Ok(id)
    }

    fn set_line_attributes(&self, gc: GcId, attrs: LineAttributes) {
        if let Some(state) = self.tables.borrow_mut().gcs.get_mut(&gc) {
            state.line = attrs;
        }
    }

    fn set_foreground(&self, gc: GcId, color: &Color) {
        if let Some(state) = self.tables.borrow_mut().gcs.get_mut(&gc) {
            state.fg = *color;
        }
    }

    fn free_gc(&self, gc: GcId) {
        self.tables.borrow_mut().gcs.remove(&gc);
    }

    fn fill_rectangle(&self, dst: Drawable, gc: GcId, rect: Rect) {
        let (Some(cr), Some((fg, _))) = (self.context(dst), self.gc_state(gc)) else {
            return;
        };
        set_source(&cr, &fg);
        cr.rectangle(rect.x as f64, rect.y as f64, rect.w as f64, rect.h as f64);
        if let Err(e) = cr.fill() {
            log::warn!("fill_rectangle failed: {}", e);
        }
    }

    fn draw_rectangle(&self, dst: Drawable, gc: GcId, rect: Rect) {
        let (Some(cr), Some((fg, line))) = (self.context(dst), self.gc_state(gc)) else {
            return;
        };
        set_source(&cr, &fg);
        cr.set_antialias(cairo::Antialias::None);
        cr.set_line_width(line.width.max(1) as f64);
        cr.set_line_cap(cairo::LineCap::Butt);
        cr.set_line_join(cairo::LineJoin::Miter);
        // stroke through pixel centres so the outline covers x..=x+w, y..=y+h
        cr.rectangle(rect.x as f64 + 0.5, rect.y as f64 + 0.5, rect.w as f64, rect.h as f64);
        if let Err(e) = cr.stroke() {
            log::warn!("draw_rectangle failed: {}", e);
        }
    }

    fn copy_area(&self, src: Drawable, dst: Drawable, _gc: GcId, src_rect: Rect, dst_x: i32, dst_y: i32) {
        let (Some(source), Some(cr)) = (self.surface(src), self.context(dst)) else {
            return;
        };
        let res = cr
            .set_source_surface(&source, (dst_x - src_rect.x) as f64, (dst_y - src_rect.y) as f64)
            .and_then(|_| {
                cr.set_operator(cairo::Operator::Source);
                cr.rectangle(dst_x as f64, dst_y as f64, src_rect.w as f64, src_rect.h as f64);
                cr.fill()
            });
        if let Err(e) = res {
            log::warn!("copy_area failed: {}", e);
        }
    }

    fn sync(&self) {
        let tables = self.tables.borrow();
        for surface in tables.pixmaps.values().chain(tables.windows.values()) {
            surface.flush();
        }
    }

    fn open_font_name(&self, name: &str) -> Option<NativeFont> {
        let pattern = FontPattern::parse(name).ok()?;
        self.open(&pattern)
    }

    fn open_font_pattern(&self, pattern: &FontPattern) -> Option<NativeFont> {
        self.open(pattern)
    }

    fn close_font(&self, font: FontId) {
        self.tables.borrow_mut().fonts.remove(&font);
    }

    fn text_extents(&self, font: FontId, text: &str) -> GlyphInfo {
        let tables = self.tables.borrow();
        let Some(open) = tables.fonts.get(&font) else {
            return GlyphInfo::default();
        };
        let Some(font_ref) = to_font_ref(&open.face) else {
            return GlyphInfo::default();
        };

        let charmap = font_ref.charmap();
        let glyph_metrics = font_ref.glyph_metrics(Size::new(open.size), LocationRef::default());
        let x_off: i32 = text
            .chars()
            .map(|ch| {
                let gid = charmap.map(ch).unwrap_or_default();
                glyph_metrics.advance_width(gid).unwrap_or_default().round() as i32
            })
            .sum();

        GlyphInfo {
            width: x_off.max(0) as u32,
            height: open.size.ceil() as u32,
            x_off,
            ..Default::default()
        }
    }

    fn alloc_color(&self, name: &str) -> Option<Color> {
        Rgba::parse(name).map(Color::from_rgba)
    }

    fn create_cursor(&self, shape: CursorShape) -> Option<CursorId> {
        let id = CursorId(self.id());
        self.tables.borrow_mut().cursors.insert(id, shape);
        log::debug!("cursor {:?} is '{}'", id, shape.css_name());
        Some(id)
    }

    fn free_cursor(&self, cursor: CursorId) {
        self.tables.borrow_mut().cursors.remove(&cursor);
    }

    fn render_glyphs(&self, dst: Drawable, color: &Color, run: &GlyphRun, x: i32, y: i32) {
        let Some(face) = run.font.face.as_ref() else {
            log::debug!("run shaped without a face, nothing to draw");
            return;
        };
        let Some(font_ref) = to_font_ref(face) else {
            return;
        };
        let Some(cr) = self.context(dst) else {
            return;
        };

        let outlines = font_ref.outline_glyphs();
        let scale = LAYOUT_SCALE as f64;
        let mut pen_units = 0i32;

        for g in &run.glyphs {
            if let Some(glyph) = outlines.get(skrifa::GlyphId::new(g.id)) {
                let mut pen = CairoPen {
                    cr: &cr,
                    ox: x as f64 + (pen_units + g.x_offset) as f64 / scale,
                    oy: y as f64 + g.y_offset as f64 / scale,
                    last: (0.0, 0.0),
                };
                let settings = DrawSettings::unhinted(Size::new(run.font.size), LocationRef::default());
                if let Err(e) = glyph.draw(settings, &mut pen) {
                    log::debug!("cannot draw glyph {}: {}", g.id, e);
                }
            }
            pen_units += g.advance;
        }

        set_source(&cr, color);
        cr.set_fill_rule(cairo::FillRule::Winding);
        if let Err(e) = cr.fill() {
            log::warn!("render_glyphs failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorScheme;
    use crate::font::FontSet;
    use crate::render::backend::Connection;
    use crate::render::backends::parley::ParleyShaper;
    use crate::surface::DrawSurface;
    use std::rc::Rc;

    const ROOT: WindowId = WindowId(0);

    fn connection() -> (Connection, Rc<CairoWindowSystem>) {
        let ws = Rc::new(CairoWindowSystem::new());
        let conn = Connection::new(ws.clone(), Rc::new(ParleyShaper::new()), 0);
        (conn, ws)
    }

    fn surface_with_scheme(conn: &Connection, w: u32, h: u32) -> DrawSurface {
        let mut drw = DrawSurface::new(conn, ROOT, w, h).unwrap();
        drw.set_scheme(Some(Rc::new(ColorScheme::create(conn, &["#ff0000", "#000000"]).unwrap())));
        drw
    }

    #[test]
    fn outline_last_pixel_is_inside_the_box() {
        let (conn, ws) = connection();
        let drw = surface_with_scheme(&conn, 20, 10);
        drw.rect(2, 1, 10, 5, false, false);

        let img = ws.snapshot(Drawable::Pixmap(drw.pixmap())).unwrap();
        let red = [255, 0, 0, 255];
        assert_eq!(img.pixel(2, 1), Some(red));
        assert_eq!(img.pixel(11, 5), Some(red));
        assert_eq!(img.pixel(12, 5).map(|p| p[3]), Some(0));
        assert_eq!(img.pixel(11, 6).map(|p| p[3]), Some(0));
        // hollow
        assert_eq!(img.pixel(6, 3).map(|p| p[3]), Some(0));
    }

    #[test]
    fn map_copies_to_the_window() {
        let (conn, ws) = connection();
        let drw = surface_with_scheme(&conn, 20, 10);
        let win = ws.add_window(20, 10).unwrap();

        drw.rect(0, 0, 20, 10, true, true);
        drw.rect(4, 2, 4, 4, true, false);
        drw.map(win, 0, 0, 10, 10);

        let img = ws.snapshot(Drawable::Window(win)).unwrap();
        assert_eq!(img.pixel(5, 3), Some([255, 0, 0, 255]));
        assert_eq!(img.pixel(0, 0), Some([0, 0, 0, 255]));
        // outside the copied region
        assert_eq!(img.pixel(15, 0).map(|p| p[3]), Some(0));
    }

    #[test]
    fn cursors_are_tracked() {
        let (conn, ws) = connection();
        let drw = surface_with_scheme(&conn, 1, 1);
        let cur = drw.create_cursor(CursorShape::XTERM).unwrap();
        assert_eq!(ws.cursor_shape(cur.id()), Some(CursorShape::XTERM));
        let id = cur.id();
        drop(cur);
        assert_eq!(ws.cursor_shape(id), None);
    }

    #[test]
    fn text_renders_when_fonts_exist() {
        let (conn, ws) = connection();
        let mut drw = surface_with_scheme(&conn, 200, 20);
        let fonts = FontSet::create(&conn, &["monospace:pixelsize=14"]);
        if fonts.is_empty() {
            return;
        }
        drw.set_fontset(Some(Rc::new(fonts)));

        let ew = drw.fontset_width("Hi");
        assert!(ew > 0);
        assert_eq!(drw.text(0, 0, 0, 0, 0, "Hi", false), ew as i32);
        assert_eq!(drw.text(0, 0, 200, 20, 2, "Hi", false), 200);

        let img = ws.snapshot(Drawable::Pixmap(drw.pixmap())).unwrap();
        let inked = (2..2 + ew).any(|x| (0..20).any(|y| img.pixel(x, y).map(|p| p[0] > 0) == Some(true)));
        assert!(inked, "no glyph pixels drawn");
        // background to the right of the text
        assert_eq!(img.pixel(199, 0), Some([0, 0, 0, 255]));
    }

    #[test]
    fn snapshot_of_unknown_drawable_fails() {
        let ws = CairoWindowSystem::new();
        assert!(ws.snapshot(Drawable::Window(WindowId(77))).is_err());
    }
}
