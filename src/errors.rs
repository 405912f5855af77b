#[derive(Debug, thiserror::Error)]
pub enum DrwError {
    #[error("no font specified")]
    MissingFontArgument,

    #[error("cannot load font from name: '{0}'")]
    FontLoad(String),

    #[error("cannot parse font name to pattern: '{0}'")]
    FontPattern(String),

    #[error("cannot allocate color '{0}'")]
    ColorAlloc(String),

    #[error("a color scheme needs at least two colors, got {0}")]
    SchemeTooSmall(usize),

    #[error("cannot derive a shaping description from pattern '{0}'")]
    ShapingDescription(String),

    #[error("cannot load a shaping font for '{0}'")]
    ShapingFontLoad(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl DrwError {
    /// Errors that mean the font or color installation is broken. Callers usually abort on these.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DrwError::MissingFontArgument
                | DrwError::ColorAlloc(_)
                | DrwError::ShapingDescription(_)
                | DrwError::ShapingFontLoad(_)
        )
    }
}

pub type Result<T, E = DrwError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_kinds() {
        assert!(DrwError::MissingFontArgument.is_fatal());
        assert!(DrwError::ColorAlloc("#zzz".into()).is_fatal());
        assert!(DrwError::ShapingDescription("x".into()).is_fatal());
        assert!(DrwError::ShapingFontLoad("x".into()).is_fatal());

        assert!(!DrwError::FontLoad("x".into()).is_fatal());
        assert!(!DrwError::FontPattern("x".into()).is_fatal());
        assert!(!DrwError::SchemeTooSmall(1).is_fatal());
        assert!(!DrwError::Backend("x".into()).is_fatal());
    }

    #[test]
    fn messages_name_the_offender() {
        let e = DrwError::ColorAlloc("nosuchcolor".into());
        assert_eq!(e.to_string(), "cannot allocate color 'nosuchcolor'");
    }
}
