use crate::color::Color;
use crate::cursor::CursorShape;
use crate::errors::Result;
use crate::pattern::FontPattern;
use std::path::Path;
use std::rc::Rc;

/// Identifier of a window the host created. Only ever a copy target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

/// Identifier of an offscreen pixmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixmapId(pub u64);

/// Identifier of a graphics context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GcId(pub u64);

/// Identifier of a font opened by the window system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FontId(pub u64);

/// Identifier of a cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CursorId(pub u64);

/// Anything that can be drawn into or copied onto.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Drawable {
    Pixmap(PixmapId),
    Window(WindowId),
}

/// Integer rectangle in surface coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapStyle {
    Butt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinStyle {
    Miter,
}

/// Line attributes of a graphics context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineAttributes {
    pub width: u32,
    pub style: LineStyle,
    pub cap: CapStyle,
    pub join: JoinStyle,
}

impl Default for LineAttributes {
    fn default() -> Self {
        Self {
            width: 1,
            style: LineStyle::Solid,
            cap: CapStyle::Butt,
            join: JoinStyle::Miter,
        }
    }
}

/// A font opened by the window system.
#[derive(Clone, Debug, PartialEq)]
pub struct NativeFont {
    pub id: FontId,
    pub ascent: i32,
    pub descent: i32,
    /// Fully resolved pattern of the matched font. Shaping descriptions are derived from this.
    pub pattern: FontPattern,
}

/// Glyph metrics the window system reports for a piece of text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GlyphInfo {
    pub width: u32,
    pub height: u32,
    pub x: i32,
    pub y: i32,
    /// Horizontal advance in pixels.
    pub x_off: i32,
    pub y_off: i32,
}

/// What the shaping engine needs to know to pick fonts for a piece of text.
#[derive(Clone, Debug, PartialEq)]
pub struct FontDescription {
    /// Families in priority order; generic names (`monospace`, `sans-serif`, `serif`) are allowed.
    pub families: Vec<String>,
    /// Size in pixels.
    pub size: f32,
    /// CSS-style weight.
    pub weight: f32,
    pub italic: bool,
}

/// A face the shaping engine actually uses.
#[derive(Clone)]
pub struct ShapedFont {
    /// Family the face was matched under.
    pub family: String,
    /// Size in pixels.
    pub size: f32,
    /// Font data, when the engine works with real font files.
    pub face: Option<parley::Font>,
}

impl std::fmt::Debug for ShapedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShapedFont")
            .field("family", &self.family)
            .field("size", &self.size)
            .field("has_face", &self.face.is_some())
            .finish()
    }
}

/// A positioned glyph. Offsets and advance are in layout units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PositionedGlyph {
    pub id: u32,
    /// Offset from the pen position along x.
    pub x_offset: i32,
    /// Offset from the baseline along y (down is positive).
    pub y_offset: i32,
    pub advance: i32,
}

/// Logical rectangle of a glyph run, in layout units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LogicalRect {
    pub x: i32,
    pub width: i32,
}

/// A run of text shaped with a single font and direction.
#[derive(Clone, Debug)]
pub struct GlyphRun {
    /// Byte offset of the run in the source string.
    pub offset: usize,
    /// Byte length of the run.
    pub length: usize,
    pub font: ShapedFont,
    pub rtl: bool,
    pub glyphs: Vec<PositionedGlyph>,
}

impl GlyphRun {
    /// Logical extents of the run: starts at the pen and spans the sum of advances.
    pub fn extents(&self) -> LogicalRect {
        LogicalRect {
            x: 0,
            width: self.glyphs.iter().map(|g| g.advance).sum(),
        }
    }
}

/// Windowing backend: drawables, graphics contexts, core fonts, colors and cursors.
///
/// All calls are synchronous and happen on the thread that owns the connection.
pub trait WindowSystem {
    /// Short name used in log output.
    fn name(&self) -> &str;

    fn create_pixmap(&self, root: WindowId, w: u32, h: u32) -> Result<PixmapId>;
    fn free_pixmap(&self, pixmap: PixmapId);

    fn create_gc(&self, root: WindowId) -> Result<GcId>;
    fn set_line_attributes(&self, gc: GcId, attrs: LineAttributes);
    fn set_foreground(&self, gc: GcId, color: &Color);
    fn free_gc(&self, gc: GcId);

    fn fill_rectangle(&self, dst: Drawable, gc: GcId, rect: Rect);
    /// Outlines `rect` the X11 way: the outline covers `x..=x+w` and `y..=y+h`.
    fn draw_rectangle(&self, dst: Drawable, gc: GcId, rect: Rect);
    /// Copies `src_rect` of `src` to `dst` at `(dst_x, dst_y)`.
    fn copy_area(&self, src: Drawable, dst: Drawable, gc: GcId, src_rect: Rect, dst_x: i32, dst_y: i32);
    /// Blocks until every request issued so far has been processed.
    fn sync(&self);

    fn open_font_name(&self, name: &str) -> Option<NativeFont>;
    fn open_font_pattern(&self, pattern: &FontPattern) -> Option<NativeFont>;
    fn close_font(&self, font: FontId);
    fn text_extents(&self, font: FontId, text: &str) -> GlyphInfo;

    fn alloc_color(&self, name: &str) -> Option<Color>;

    fn create_cursor(&self, shape: CursorShape) -> Option<CursorId>;
    fn free_cursor(&self, cursor: CursorId);

    /// Draws a shaped run with its pen at `(x, y)`, `y` being the baseline.
    fn render_glyphs(&self, dst: Drawable, color: &Color, run: &GlyphRun, x: i32, y: i32);
}

/// Text shaping engine.
pub trait Shaper {
    fn name(&self) -> &str;

    /// Derives the shaping description of a resolved font pattern.
    fn description_from_pattern(&self, pattern: &FontPattern) -> Result<FontDescription>;

    /// Loads the face the description resolves to.
    fn load_font(&self, desc: &FontDescription) -> Result<ShapedFont>;

    /// Itemizes `text` into runs and shapes every run. Runs come back sorted by byte offset, not reordered for display.
    fn shape_runs(&self, desc: &FontDescription, text: &str) -> Result<Vec<GlyphRun>>;
}

/// Backend context shared by everything that draws: one window system, one shaping engine.
#[derive(Clone)]
pub struct Connection {
    pub ws: Rc<dyn WindowSystem>,
    pub shaper: Rc<dyn Shaper>,
    pub screen: u32,
}

impl Connection {
    pub fn new(ws: Rc<dyn WindowSystem>, shaper: Rc<dyn Shaper>, screen: u32) -> Self {
        Self { ws, shaper, screen }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("ws", &self.ws.name())
            .field("shaper", &self.shaper.name())
            .field("screen", &self.screen)
            .finish()
    }
}

/// RGBA8 copy of a drawable.
#[derive(Clone)]
pub struct RgbaImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
}

impl RgbaImage {
    pub fn from_raw(pixels: Vec<u8>, width: u32, height: u32, stride: u32) -> Self {
        assert!(
            pixels.len() >= (height as usize) * (stride as usize),
            "pixel buffer too small for image dimensions"
        );

        Self {
            pixels,
            width,
            height,
            stride,
        }
    }

    /// RGBA of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let off = (y * self.stride + x * 4) as usize;
        let p = self.pixels.get(off..off + 4)?;
        Some([p[0], p[1], p[2], p[3]])
    }

    /// Encodes the image as a PNG file.
    pub fn write_png(&self, path: &Path) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)?;
        let w = std::io::BufWriter::new(file);

        let mut encoder = png::Encoder::new(w, self.width, self.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;

        let row = (self.width * 4) as usize;
        let mut data = Vec::with_capacity(row * self.height as usize);
        for y in 0..self.height as usize {
            let start = y * self.stride as usize;
            data.extend_from_slice(&self.pixels[start..start + row]);
        }
        writer.write_image_data(&data)?;
        Ok(())
    }
}

impl std::fmt::Debug for RgbaImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RgbaImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.pixels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(advances: &[i32]) -> GlyphRun {
        GlyphRun {
            offset: 0,
            length: advances.len(),
            font: ShapedFont {
                family: "mono".into(),
                size: 10.0,
                face: None,
            },
            rtl: false,
            glyphs: advances
                .iter()
                .enumerate()
                .map(|(i, a)| PositionedGlyph {
                    id: i as u32,
                    x_offset: 0,
                    y_offset: 0,
                    advance: *a,
                })
                .collect(),
        }
    }

    #[test]
    fn run_extents_sum_advances() {
        assert_eq!(run(&[]).extents(), LogicalRect { x: 0, width: 0 });
        assert_eq!(run(&[100, 250, 7]).extents(), LogicalRect { x: 0, width: 357 });
    }

    #[test]
    fn default_line_attributes_are_thin_solid() {
        let attrs = LineAttributes::default();
        assert_eq!(attrs.width, 1);
        assert_eq!(attrs.style, LineStyle::Solid);
        assert_eq!(attrs.cap, CapStyle::Butt);
        assert_eq!(attrs.join, JoinStyle::Miter);
    }

    #[test]
    fn image_pixel_lookup_and_png() {
        let mut pixels = vec![0u8; 2 * 2 * 4];
        pixels[12..16].copy_from_slice(&[1, 2, 3, 255]);
        let img = RgbaImage::from_raw(pixels, 2, 2, 8);
        assert_eq!(img.pixel(1, 1), Some([1, 2, 3, 255]));
        assert_eq!(img.pixel(2, 0), None);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.png");
        img.write_png(&path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
