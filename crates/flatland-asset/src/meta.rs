//! Field metadata tags
//!
//! A tag is a `;`-separated list of `key:value` pairs or bare flags:
//!
//! ```text
//! inline ; desc:Child units spawned with this one ; filter:png,jpg
//! ```

/// Parsed view over a field's static tag string
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldMeta(&'static str);

impl FieldMeta {
    /// Field with no tags
    pub const NONE: Self = Self("");

    /// Wrap a raw tag string
    #[inline]
    #[must_use]
    pub const fn new(raw: &'static str) -> Self {
        Self(raw)
    }

    /// Raw tag string
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &'static str {
        self.0
    }

    /// Value for `key`; bare flags have the empty value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'static str> {
        self.0.split(';').find_map(|entry| {
            let entry = entry.trim();
            let (k, v) = entry.split_once(':').unwrap_or((entry, ""));
            (k.trim() == key).then(|| v.trim())
        })
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Sub-assets behind this field are stored inside the owner's file
    #[inline]
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.contains("inline")
    }

    /// Human description for editors
    #[inline]
    #[must_use]
    pub fn description(&self) -> Option<&'static str> {
        self.get("desc").filter(|d| !d.is_empty())
    }

    /// Path substrings an editor should offer for this field
    #[must_use]
    pub fn filter(&self) -> Vec<&'static str> {
        self.get("filter")
            .map(|f| f.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Whether `path` passes this field's filter (no filter passes everything)
    #[must_use]
    pub fn accepts_path(&self, path: &str) -> bool {
        let filter = self.filter();
        filter.is_empty() || filter.iter().any(|needle| path.contains(needle))
    }
}

/// Name and metadata of one persisted field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// Key the field is stored under
    pub name: &'static str,
    pub meta: FieldMeta,
}

impl FieldInfo {
    /// Label for editors: the description, else the stored name
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.meta.description().unwrap_or(self.name)
    }
}
