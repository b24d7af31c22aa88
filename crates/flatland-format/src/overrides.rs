//! Override sets: the per-child record of fields pinned against inheritance

use crate::diff::leaf_paths;
use crate::path::FieldPath;
use crate::tree::CommonFormat;
use std::collections::BTreeSet;

/// Set of dotted field paths a child keeps even when its parent changes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideSet(BTreeSet<FieldPath>);

impl OverrideSet {
    /// Create an empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from the leaves of a diff tree
    #[must_use]
    pub fn from_diff(diff: &CommonFormat) -> Self {
        Self(leaf_paths(diff).into_iter().collect())
    }

    /// Pin a path; returns false if it was already pinned
    pub fn insert(&mut self, path: FieldPath) -> bool {
        self.0.insert(path)
    }

    /// Unpin a path; returns false if it was not pinned
    pub fn remove(&mut self, path: &FieldPath) -> bool {
        self.0.remove(path)
    }

    /// True if exactly this path is pinned
    #[inline]
    #[must_use]
    pub fn contains(&self, path: &FieldPath) -> bool {
        self.0.contains(path)
    }

    /// True if this path or one of its ancestors is pinned
    #[must_use]
    pub fn protects(&self, path: &FieldPath) -> bool {
        self.0.iter().any(|pinned| pinned.is_prefix_of(path))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate pinned paths in sorted order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &FieldPath> {
        self.0.iter()
    }
}

impl FromIterator<FieldPath> for OverrideSet {
    fn from_iter<I: IntoIterator<Item = FieldPath>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a OverrideSet {
    type Item = &'a FieldPath;
    type IntoIter = std::collections::btree_set::Iter<'a, FieldPath>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
