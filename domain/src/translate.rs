//! Message catalogs used to turn violation templates into readable text.

use std::collections::HashMap;

/// Resolves a message key to display text.
pub trait Translator: Send + Sync {
    fn translate(&self, key: &str) -> Option<&str>;
}

/// In-memory key to text map.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    entries: HashMap<String, String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default English texts for the messages shipped with this crate.
    pub fn english() -> Self {
        Self::new()
            .with("error.uniq_url", "This URL is already in use: %url%")
            .with("error.not_blank", "This value should not be blank.")
            .with("error.page_without_site", "The page is not linked to a Site")
    }

    pub fn with<K: Into<String>, V: Into<String>>(mut self, key: K, text: V) -> Self {
        self.entries.insert(key.into(), text.into());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Translator for Catalog {
    fn translate(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_catalog_covers_shipped_keys() {
        let c = Catalog::english();
        assert_eq!(c.translate("error.uniq_url"), Some("This URL is already in use: %url%"));
        assert!(c.translate("error.not_blank").is_some());
        assert!(c.translate("error.page_without_site").is_some());
        assert_eq!(c.translate("missing.key"), None);
    }

    #[test]
    fn later_entries_override() {
        let c = Catalog::english().with("error.uniq_url", "taken");
        assert_eq!(c.translate("error.uniq_url"), Some("taken"));
        assert_eq!(c.len(), 3);
    }
}
