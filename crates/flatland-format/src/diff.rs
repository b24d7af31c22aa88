//! Structural diff and merge over common-format trees
//!
//! [`diff`] computes the minimal tree that, merged over a parent with
//! [`merge`], reproduces the child. Mappings diff key by key; sequences are
//! atomic; everything else compares by value.
//!
//! Zero-valued leaves are dropped when the parent is absent or also zero,
//! and kept when they clear a non-zero parent value.

use crate::path::FieldPath;
use crate::tree::{CommonFormat, Mapping};

/// Minimal tree describing how `child` differs from `parent`
///
/// Returns `None` when nothing differs.
#[must_use]
pub fn diff(parent: Option<&CommonFormat>, child: &CommonFormat) -> Option<CommonFormat> {
    if let Some(parent) = parent {
        if parent.shape() != child.shape() {
            return keep_unless_zero(child);
        }
        if !parent.is_zero() && child.is_zero() {
            return Some(child.clone());
        }
    }
    if child.is_zero() {
        return None;
    }

    match child {
        CommonFormat::Sequence(items) => match parent {
            Some(CommonFormat::Sequence(parent_items)) if parent_items.len() == items.len() => {
                let differs = items
                    .iter()
                    .zip(parent_items)
                    .any(|(item, parent_item)| diff(Some(parent_item), item).is_some());
                differs.then(|| child.clone())
            }
            _ => Some(child.clone()),
        },
        CommonFormat::Mapping(fields) => {
            let parent_fields = parent.and_then(CommonFormat::as_mapping);
            let out: Mapping = fields
                .iter()
                .filter_map(|(key, value)| {
                    let parent_value = parent_fields.and_then(|p| p.get(key));
                    diff(parent_value, value).map(|d| (key.clone(), d))
                })
                .collect();
            (!out.is_empty()).then_some(CommonFormat::Mapping(out))
        }
        _ => match parent {
            Some(parent) if parent.same_value(child) => None,
            _ => Some(child.clone()),
        },
    }
}

fn keep_unless_zero(child: &CommonFormat) -> Option<CommonFormat> {
    (!child.is_zero()).then(|| child.clone())
}

/// Overlay `overlay` onto `base`
///
/// Mappings merge key-wise; any other overlay node replaces the base node.
#[must_use]
pub fn merge(base: CommonFormat, overlay: &CommonFormat) -> CommonFormat {
    match (base, overlay) {
        (CommonFormat::Mapping(mut fields), CommonFormat::Mapping(overlay_fields)) => {
            for (key, value) in overlay_fields {
                let merged = match fields.remove(key) {
                    Some(existing) => merge(existing, value),
                    None => value.clone(),
                };
                fields.insert(key.clone(), merged);
            }
            CommonFormat::Mapping(fields)
        }
        (_, overlay) => overlay.clone(),
    }
}

/// Dotted paths to every leaf of a mapping tree
///
/// A leaf is any non-mapping node. Nested mappings contribute their own
/// leaves; an empty nested mapping contributes nothing.
#[must_use]
pub fn leaf_paths(tree: &CommonFormat) -> Vec<FieldPath> {
    let mut out = Vec::new();
    collect_leaves(tree, &FieldPath::root(), &mut out);
    out
}

fn collect_leaves(tree: &CommonFormat, prefix: &FieldPath, out: &mut Vec<FieldPath>) {
    match tree {
        CommonFormat::Mapping(fields) => {
            for (key, value) in fields {
                collect_leaves(value, &prefix.child(key.as_str()), out);
            }
        }
        _ if prefix.is_empty() => {}
        _ => out.push(prefix.clone()),
    }
}

/// Subtree of `tree` containing only the nodes at `paths`
///
/// Paths missing from `tree` are skipped. Returns `None` when no path exists.
#[must_use]
pub fn extract<'a>(
    tree: &CommonFormat,
    paths: impl IntoIterator<Item = &'a FieldPath>,
) -> Option<CommonFormat> {
    let mut out: Option<CommonFormat> = None;
    for path in paths {
        if let Some(node) = tree.get_path(path) {
            out.get_or_insert_with(|| CommonFormat::Mapping(Mapping::new()))
                .insert_path(path, node.clone());
        }
    }
    out
}
