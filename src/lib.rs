//! Minimal drawing layer for status bars and menus: font sets with fallback order, color
//! schemes, text measurement and rendering, and an offscreen surface that is copied onto windows.

pub mod color;
pub mod config;
pub mod cursor;
pub mod errors;
pub mod font;
pub mod pattern;
pub mod render;
pub mod surface;
pub mod text;

pub use color::{Color, ColorRole, ColorScheme, Rgba};
pub use config::DrwConfig;
pub use cursor::{Cursor, CursorShape};
pub use errors::{DrwError, Result};
pub use font::{Font, FontSet};
pub use pattern::FontPattern;
pub use render::{Connection, Drawable, RgbaImage};
pub use surface::DrawSurface;
