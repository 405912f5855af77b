//! Text measurement and rendering.
//!
//! Both go through the same routine: derive the shaping description from the font's matched
//! pattern, itemize and shape the string into runs, then walk the runs left to right adding each
//! run's extent to a pen. Rendering additionally draws every run at the pen before advancing it.
//! Sharing the walk keeps `measure(f, s)` equal to the distance `render(f, .., s)` moves the pen.

use crate::color::Color;
use crate::errors::Result;
use crate::font::Font;
use crate::render::backend::{Connection, Drawable, FontDescription};

/// Layout units per pixel.
pub const LAYOUT_SCALE: i32 = 1024;

/// Converts pixels to layout units, rounding to the nearest unit.
pub fn units_from_px(px: f32) -> i32 {
    (px * LAYOUT_SCALE as f32).round() as i32
}

/// Converts layout units to whole pixels, rounding down.
pub fn units_to_px(units: i32) -> i32 {
    units.div_euclid(LAYOUT_SCALE)
}

struct Target<'a> {
    dst: Drawable,
    color: &'a Color,
    y: i32,
}

fn description(conn: &Connection, font: &Font) -> Result<FontDescription> {
    conn.shaper.description_from_pattern(font.matched_pattern())
}

/// Returns the pen position after `text`, starting at `x`.
fn advance(conn: &Connection, font: &Font, text: &str, x: i32, target: Option<Target<'_>>) -> Result<i32> {
    if text.is_empty() {
        return Ok(x);
    }

    let desc = description(conn, font)?;
    if target.is_some() {
        conn.shaper.load_font(&desc)?;
    }

    let mut pen = x;
    for run in conn.shaper.shape_runs(&desc, text)? {
        if let Some(t) = &target {
            conn.ws.render_glyphs(t.dst, t.color, &run, pen, t.y);
        }
        let ext = run.extents();
        pen = pen.wrapping_add(units_to_px(ext.x + ext.width));
    }

    Ok(pen)
}

/// Width of `text` in pixels. Empty text measures 0.
pub fn measure(conn: &Connection, font: &Font, text: &str) -> Result<u32> {
    let w = advance(conn, font, text, 0, None)?;
    Ok(w.max(0) as u32)
}

/// Draws `text` with its baseline at `y`, starting at `x`. Returns the pen position after the text.
pub fn render(conn: &Connection, font: &Font, color: &Color, dst: Drawable, x: i32, y: i32, text: &str) -> Result<i32> {
    advance(conn, font, text, x, Some(Target { dst, color, y }))
}
