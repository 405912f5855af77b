use crate::errors::Result;
use crate::font::FontSet;
use crate::color::ColorScheme;
use crate::render::backend::Connection;
use serde::{Deserialize, Serialize};

const DEFAULT_FONT: &str = "monospace:size=10";

/// Named list of colors, in [`crate::color::ColorRole`] order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeConfig {
    pub name: String,
    pub colors: Vec<String>,
}

/// Drawing configuration of a bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrwConfig {
    /// Font names in priority order.
    pub fonts: Vec<String>,
    pub schemes: Vec<SchemeConfig>,
    /// Horizontal text padding. Defaults to the head font's height.
    pub lpad: Option<u32>,
}

impl Default for DrwConfig {
    fn default() -> Self {
        Self {
            fonts: vec![DEFAULT_FONT.to_string()],
            schemes: vec![
                SchemeConfig {
                    name: "norm".to_string(),
                    colors: vec!["#bbbbbb".into(), "#222222".into(), "#444444".into()],
                },
                SchemeConfig {
                    name: "sel".to_string(),
                    colors: vec!["#eeeeee".into(), "#005577".into(), "#005577".into()],
                },
            ],
            lpad: None,
        }
    }
}

impl DrwConfig {
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn scheme(&self, name: &str) -> Option<&SchemeConfig> {
        self.schemes.iter().find(|s| s.name == name)
    }

    /// Loads the configured fonts.
    pub fn load_fonts(&self, conn: &Connection) -> FontSet {
        FontSet::create(conn, &self.fonts)
    }

    /// Allocates every configured scheme, in configuration order.
    pub fn load_schemes(&self, conn: &Connection) -> Result<Vec<(String, ColorScheme)>> {
        self.schemes
            .iter()
            .map(|s| Ok((s.name.clone(), ColorScheme::create(conn, &s.colors)?)))
            .collect()
    }

    /// Padding to use around text set in `fonts`.
    pub fn lpad(&self, fonts: &FontSet) -> u32 {
        self.lpad
            .unwrap_or_else(|| fonts.head().map(|f| f.height()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DrwError;
    use crate::render::backends::null::test_connection;

    #[test]
    fn defaults() {
        let cfg = DrwConfig::default();
        assert_eq!(cfg.fonts, vec!["monospace:size=10".to_string()]);
        assert_eq!(cfg.scheme("sel").unwrap().colors[1], "#005577");
        assert!(cfg.scheme("urgent").is_none());
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let cfg = DrwConfig::from_json(r#"{ "fonts": ["Terminus:pixelsize=12", "monospace"], "lpad": 4 }"#).unwrap();
        assert_eq!(cfg.fonts.len(), 2);
        assert_eq!(cfg.lpad, Some(4));
        assert_eq!(cfg.schemes, DrwConfig::default().schemes);

        assert!(DrwConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn loads_fonts_schemes_and_padding() {
        let conn = test_connection();
        let cfg = DrwConfig::default();

        let fonts = cfg.load_fonts(&conn);
        assert_eq!(fonts.len(), 1);
        // 10pt at 96 dpi
        assert_eq!(cfg.lpad(&fonts), 13);

        let schemes = cfg.load_schemes(&conn).unwrap();
        assert_eq!(schemes.len(), 2);
        assert_eq!(schemes[0].0, "norm");
    }

    #[test]
    fn bad_scheme_color_is_reported() {
        let conn = test_connection();
        let cfg = DrwConfig {
            schemes: vec![SchemeConfig {
                name: "broken".into(),
                colors: vec!["#fff".into(), "chartreuse-ish".into()],
            }],
            ..Default::default()
        };
        assert!(matches!(cfg.load_schemes(&conn), Err(DrwError::ColorAlloc(_))));
    }
}
