//! Paths used by the asset system
//!
//! Provides [`AssetPath`] for naming stored files and [`FieldPath`] for
//! addressing leaves inside a common-format tree.

use crate::error::FormatError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Slash-separated name of a stored asset, relative to its filesystem root
///
/// The empty path means "not persisted".
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetPath(String);

impl AssetPath {
    /// Create a new asset path
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Borrow the raw path
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the "not persisted" path
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Extension after the final `.` of the last segment, if any
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        name.rfind('.')
            .filter(|&idx| idx > 0)
            .map(|idx| &name[idx + 1..])
    }

    /// Last slash-separated segment
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// Append `.{extension}` unless the path already ends with it
    #[must_use]
    pub fn with_default_extension(&self, extension: &str) -> Self {
        if self.extension() == Some(extension) {
            self.clone()
        } else {
            Self(format!("{}.{extension}", self.0))
        }
    }

    /// Iterator over slash-separated segments
    #[inline]
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|seg| !seg.is_empty())
    }
}

impl Display for AssetPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetPath {
    fn from(path: &str) -> Self {
        Self(path.to_owned())
    }
}

impl From<String> for AssetPath {
    fn from(path: String) -> Self {
        Self(path)
    }
}

impl From<&AssetPath> for AssetPath {
    fn from(path: &AssetPath) -> Self {
        path.clone()
    }
}

impl AsRef<str> for AssetPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for AssetPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Dotted path to a leaf of a common-format mapping tree
///
/// # Examples
/// - `["Name"]` → `Name`
/// - `["Stats", "Health"]` → `Stats.Health`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Create new path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Create path from a single segment
    #[inline]
    #[must_use]
    pub fn single(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    /// Empty path (the tree root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is the root
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Check if this path is a prefix of another
    ///
    /// `Stats` is a prefix of `Stats.Health`; `Stat` is not.
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.0.len() <= other.0.len() && self.0 == other.0[..self.0.len()]
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl FromStr for FieldPath {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let segments = s
            .split('.')
            .map(|seg| {
                if seg.trim().is_empty() {
                    Err(FormatError::invalid_path(s, "empty segment"))
                } else {
                    Ok(seg.to_owned())
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self(segments))
    }
}

impl<S: Into<String>> FromIterator<S> for FieldPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_path_extension() {
        assert_eq!(AssetPath::from("units/orc.json").extension(), Some("json"));
        assert_eq!(AssetPath::from("units/orc").extension(), None);
        assert_eq!(AssetPath::from(".hidden").extension(), None);
        assert_eq!(AssetPath::from("a.b/orc").extension(), None);
    }

    #[test]
    fn asset_path_default_extension_appended_once() {
        let bare = AssetPath::from("units/orc");
        assert_eq!(bare.with_default_extension("json").as_str(), "units/orc.json");

        let done = AssetPath::from("units/orc.json");
        assert_eq!(done.with_default_extension("json").as_str(), "units/orc.json");
    }

    #[test]
    fn asset_path_segments_skip_empty() {
        let path = AssetPath::from("a//b/c.json");
        assert_eq!(path.segments().collect::<Vec<_>>(), vec!["a", "b", "c.json"]);
        assert_eq!(path.file_name(), "c.json");
    }

    #[test]
    fn field_path_from_str_valid() {
        let path = FieldPath::from_str("Stats.Health").unwrap();
        assert_eq!(path.segments(), &["Stats", "Health"]);
        assert_eq!(path.to_string(), "Stats.Health");
    }

    #[test]
    fn field_path_from_str_empty_is_root() {
        let path = FieldPath::from_str("").unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn field_path_from_str_rejects_empty_segment() {
        assert!(FieldPath::from_str("Stats..Health").is_err());
        assert!(FieldPath::from_str(".Health").is_err());
    }

    #[test]
    fn field_path_prefix() {
        let stats = FieldPath::single("Stats");
        let health = stats.child("Health");
        assert!(stats.is_prefix_of(&health));
        assert!(!health.is_prefix_of(&stats));
        assert!(FieldPath::root().is_prefix_of(&stats));
        assert!(!FieldPath::single("Stat").is_prefix_of(&health));
    }

    #[test]
    fn field_path_collects_from_segments() {
        let path: FieldPath = ["Child", "Name"].into_iter().collect();
        assert_eq!(path.len(), 2);
        assert_eq!(path.iter().collect::<Vec<_>>(), vec!["Child", "Name"]);
    }
}
