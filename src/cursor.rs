use crate::render::backend::{Connection, CursorId};

/// Cursor shape, numbered like the X cursor font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorShape(pub u32);

impl CursorShape {
    pub const FLEUR: CursorShape = CursorShape(52);
    pub const HAND2: CursorShape = CursorShape(60);
    pub const LEFT_PTR: CursorShape = CursorShape(68);
    pub const SIZING: CursorShape = CursorShape(120);
    pub const WATCH: CursorShape = CursorShape(150);
    pub const XTERM: CursorShape = CursorShape(152);

    /// CSS cursor name for backends that look cursors up by name.
    pub fn css_name(&self) -> &'static str {
        match *self {
            CursorShape::FLEUR => "move",
            CursorShape::HAND2 => "pointer",
            CursorShape::LEFT_PTR => "default",
            CursorShape::SIZING => "nwse-resize",
            CursorShape::WATCH => "wait",
            CursorShape::XTERM => "text",
            _ => "default",
        }
    }
}

/// A cursor created on the window system. Freed on drop.
pub struct Cursor {
    conn: Connection,
    id: CursorId,
    shape: CursorShape,
}

impl Cursor {
    pub fn create(conn: &Connection, shape: CursorShape) -> Option<Self> {
        let id = conn.ws.create_cursor(shape)?;
        log::debug!("created cursor {:?} for shape {}", id, shape.0);
        Some(Self {
            conn: conn.clone(),
            id,
            shape,
        })
    }

    pub fn id(&self) -> CursorId {
        self.id
    }

    pub fn shape(&self) -> CursorShape {
        self.shape
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        self.conn.ws.free_cursor(self.id);
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("id", &self.id)
            .field("shape", &self.shape)
            .finish()
    }
}
