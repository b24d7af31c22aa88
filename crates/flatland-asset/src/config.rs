//! Store configuration

use flatland_format::AssetPath;
use serde::{Deserialize, Serialize};

/// Tunables for a [`crate::Store`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Extension appended to saved paths and matched when scanning files
    ///
    /// `None` disables both.
    pub default_extension: Option<String>,
    /// Write indented JSON
    pub pretty: bool,
    /// Maximum nesting of loads (parents, references) before giving up
    pub max_depth: usize,
}

impl StoreConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With default extension
    #[inline]
    #[must_use]
    pub fn with_default_extension(mut self, extension: Option<&str>) -> Self {
        self.default_extension = extension.map(str::to_owned);
        self
    }

    /// With pretty printing
    #[inline]
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// With maximum load depth
    #[inline]
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse from TOML; missing keys keep their defaults
    ///
    /// # Errors
    /// Returns the TOML error for invalid documents.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply the default extension to a save path
    #[must_use]
    pub fn save_path(&self, path: &AssetPath) -> AssetPath {
        match &self.default_extension {
            Some(extension) => path.with_default_extension(extension),
            None => path.clone(),
        }
    }

    /// Whether a scanned file should be considered an asset
    #[must_use]
    pub fn is_asset_file(&self, path: &AssetPath) -> bool {
        match &self.default_extension {
            Some(extension) => path.extension() == Some(extension.as_str()),
            None => true,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_extension: Some("json".to_owned()),
            pretty: true,
            max_depth: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.default_extension.as_deref(), Some("json"));
        assert!(config.pretty);
        assert_eq!(config.max_depth, 64);
    }

    #[test]
    fn from_toml_partial() {
        let config = StoreConfig::from_toml("pretty = false\nmax_depth = 8\n").unwrap();
        assert!(!config.pretty);
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.default_extension.as_deref(), Some("json"));
    }

    #[test]
    fn from_toml_rejects_bad_types() {
        assert!(StoreConfig::from_toml("max_depth = \"deep\"").is_err());
    }

    #[test]
    fn save_path_appends_extension() {
        let config = StoreConfig::default();
        assert_eq!(config.save_path(&"units/orc".into()).as_str(), "units/orc.json");
        assert_eq!(config.save_path(&"units/orc.json".into()).as_str(), "units/orc.json");

        let bare = StoreConfig::default().with_default_extension(None);
        assert_eq!(bare.save_path(&"units/orc".into()).as_str(), "units/orc");
        assert!(bare.is_asset_file(&"notes.txt".into()));
    }

    #[test]
    fn asset_files_match_extension() {
        let config = StoreConfig::default();
        assert!(config.is_asset_file(&"a/b.json".into()));
        assert!(!config.is_asset_file(&"a/b.png".into()));
    }
}
