use fontique::{Attributes, FontStyle, FontWeight, GenericFamily, QueryFamily, QueryStatus};
use parley::{Font, FontContext};

/// Maps CSS/fontconfig generic family names onto fontique's generic families.
pub fn generic_family(name: &str) -> Option<GenericFamily> {
    Some(match name.to_ascii_lowercase().as_str() {
        "monospace" | "mono" => GenericFamily::Monospace,
        "sans" | "sans-serif" | "sansserif" => GenericFamily::SansSerif,
        "serif" => GenericFamily::Serif,
        "cursive" => GenericFamily::Cursive,
        "fantasy" => GenericFamily::Fantasy,
        "system-ui" => GenericFamily::SystemUi,
        "emoji" => GenericFamily::Emoji,
        _ => return None,
    })
}

/// Query attributes for a weight and slant.
pub fn attributes(weight: f32, italic: bool) -> Attributes {
    Attributes {
        weight: FontWeight::new(weight),
        style: if italic { FontStyle::Italic } else { FontStyle::Normal },
        ..Default::default()
    }
}

/// Font matching on top of fontique. Owns the font context so that layouts built from it and
/// faces resolved through it agree on what is installed.
pub struct FontManager {
    font_cx: FontContext,
}

impl FontManager {
    pub fn new() -> Self {
        Self {
            font_cx: FontContext::new(),
        }
    }

    pub fn font_cx(&mut self) -> &mut FontContext {
        &mut self.font_cx
    }

    /// Resolves the first matching face for `families`, falling back to the generic sans-serif
    /// family. Returns the face and the name of the family it belongs to.
    pub fn resolve(&mut self, families: &[String], attrs: Attributes) -> Option<(Font, String)> {
        let font_cx = &mut self.font_cx;

        let mut query_families: Vec<QueryFamily> = families
            .iter()
            .map(|name| match generic_family(name) {
                Some(generic) => QueryFamily::Generic(generic),
                None => QueryFamily::Named(name.as_str()),
            })
            .collect();
        query_families.push(GenericFamily::SansSerif.into());

        let mut chosen = None;
        {
            let mut q = font_cx.collection.query(&mut font_cx.source_cache);
            q.set_families(query_families);
            q.set_attributes(attrs);
            q.matches_with(|cand| {
                let (fam_id, _) = cand.family;
                chosen = Some((Font::new(cand.blob.clone(), cand.index), fam_id));
                QueryStatus::Stop
            });
        }

        let (font, fam_id) = chosen?;
        let name = font_cx
            .collection
            .family(fam_id)
            .map(|info| info.name().to_string())
            .unwrap_or_default();

        log::debug!("resolved {:?} to family '{}'", families, name);
        Some((font, name))
    }
}

impl Default for FontManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_names() {
        assert_eq!(generic_family("monospace"), Some(GenericFamily::Monospace));
        assert_eq!(generic_family("Sans"), Some(GenericFamily::SansSerif));
        assert_eq!(generic_family("DejaVu Sans"), None);
    }

    #[test]
    fn resolves_something_or_nothing_without_panicking() {
        let mut fm = FontManager::new();
        if let Some((_font, family)) = fm.resolve(&["monospace".to_string()], attributes(400.0, false)) {
            assert!(!family.is_empty());
        }
    }
}
