pub mod backend;

/// Window system and shaping backends.
pub mod backends {
    /// Cairo window system
    #[cfg(feature = "backend_cairo")]
    pub mod cairo;
    pub mod null;
    /// Parley shaping engine
    pub mod parley;
}

pub use backend::{Connection, Drawable, RgbaImage, Shaper, WindowSystem};
