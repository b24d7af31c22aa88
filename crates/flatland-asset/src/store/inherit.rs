//! Parent edges, override pins and instancing

use super::Store;
use crate::asset::{type_name_of, AsAssetHandle, Asset, AssetHandle, Handle};
use crate::error::{AssetError, AssetResult};
use crate::meta::FieldMeta;
use flatland_format::{diff, extract, AssetPath, CommonFormat, FieldPath, Mapping, OverrideSet};
use std::collections::HashSet;
use tracing::debug;

impl Store {
    /// Make `parent` the parent of `child`
    ///
    /// On a first parent, every field where the child already disagrees
    /// with the parent is pinned; matching fields start tracking the
    /// parent. On re-parenting the existing pins are kept and the child is
    /// re-derived from the new parent.
    ///
    /// # Errors
    /// [`AssetError::NotLoaded`] when `parent` has no path,
    /// [`AssetError::Cycle`] when `parent` is `child` or descends from it.
    pub fn set_parent(
        &self,
        child: &impl AsAssetHandle,
        parent: &impl AsAssetHandle,
    ) -> AssetResult<()> {
        let child = child.as_asset_handle();
        let parent = parent.as_asset_handle();
        let parent_path = self
            .path_of(&parent)
            .ok_or_else(|| AssetError::NotLoaded(parent.type_name().to_owned()))?;
        if self.chain_reaches(&parent_path, &child) {
            return Err(AssetError::Cycle { path: parent_path });
        }

        let parent_tree = self.tree_of(&parent)?;
        let overrides = match self.parent_of(&child) {
            Some(_) => self.overrides_of(&child),
            None => diff(Some(&parent_tree), &self.tree_of(&child)?)
                .map(|differences| OverrideSet::from_diff(&differences)),
        };
        self.rederive(&child, &parent_tree, overrides.as_ref())?;
        debug!(
            parent = %parent_path,
            type_name = child.type_name(),
            pinned = overrides.as_ref().map_or(0, OverrideSet::len),
            "parent set"
        );
        self.record_parent(&child, parent_path, Some(overrides));
        Ok(())
    }

    /// Whether following parent edges from `start` reaches `target`
    fn chain_reaches(&self, start: &AssetPath, target: &AssetHandle) -> bool {
        let mut seen = HashSet::new();
        let mut next = Some(start.clone());
        while let Some(path) = next {
            if !seen.insert(path.clone()) {
                // already looping without passing through target
                return false;
            }
            let Some(asset) = self.cached(&path) else {
                return false;
            };
            if asset.ptr_eq(target) {
                return true;
            }
            next = self.parent_of(&asset);
        }
        false
    }

    /// Pin or unpin a field of `child` against parent propagation
    ///
    /// `field` is a dotted path such as `"Stats.Health"`. Unpinning
    /// immediately copies the parent's current value for that field into the
    /// child, except where a remaining pin still covers it; the override set
    /// is dropped once it is empty.
    ///
    /// # Errors
    /// [`AssetError::Format`] for an invalid field path, or any load error
    /// for the child's parent.
    pub fn set_override(
        &self,
        child: &impl AsAssetHandle,
        field: &str,
        enabled: bool,
    ) -> AssetResult<()> {
        let child = child.as_asset_handle();
        let path: FieldPath = field.parse()?;

        let (parent, remaining) = {
            let mut state = self.state.write();
            let record = state.record_mut(&child);
            if enabled {
                record
                    .overrides
                    .get_or_insert_with(OverrideSet::new)
                    .insert(path);
                return Ok(());
            }
            if let Some(overrides) = &mut record.overrides {
                overrides.remove(&path);
                if overrides.is_empty() {
                    record.overrides = None;
                }
            }
            (record.parent.clone(), record.overrides.clone().unwrap_or_default())
        };

        let Some(parent) = parent else {
            return Ok(());
        };
        if remaining.protects(&path) {
            debug!(%path, "override cleared, still covered by an ancestor pin");
            return Ok(());
        }
        let parent = self.load(parent)?;
        let update = unpinned_field(
            &self.tree_of(&child)?,
            &self.tree_of(&parent)?,
            &path,
            &remaining,
        );
        if let Some(update) = update {
            self.apply(&child, &update)?;
        }
        debug!(%path, type_name = child.type_name(), "override cleared");
        Ok(())
    }

    /// Fresh unpathed object seeded from `template`
    ///
    /// Referenced assets are shared with the template; inline sub-assets
    /// and plain values are copies. Default initializers run last.
    ///
    /// # Errors
    /// [`AssetError::UnknownType`] when the template's type is not registered.
    pub fn new_instance(&self, template: &impl AsAssetHandle) -> AssetResult<AssetHandle> {
        let template = template.as_asset_handle();
        let descriptor = self.descriptor(template.type_name())?;
        let tree = self.tree_of(&template)?;
        let instance = descriptor.allocate();
        self.apply(&instance, &tree)?;
        self.lock_for_write(&instance)?
            .walk_default_init(FieldMeta::NONE);
        Ok(instance)
    }

    /// Typed form of [`Store::new_instance`]
    ///
    /// # Errors
    /// As [`Store::new_instance`].
    pub fn new_instance_of<T: Asset>(&self, template: &Handle<T>) -> AssetResult<Handle<T>> {
        let instance = self.new_instance(template)?;
        instance
            .downcast::<T>()
            .ok_or_else(|| AssetError::type_mismatch(type_name_of::<T>(), instance.type_name()))
    }
}

/// Partial tree that resets `path` of a child to its parent's value
///
/// The whole top-level field holding `path` is rebuilt from the child's
/// current value, so containers such as maps are applied complete. Pins
/// below `path` keep the child's value. Returns `None` for the root path.
fn unpinned_field(
    child_tree: &CommonFormat,
    parent_tree: &CommonFormat,
    path: &FieldPath,
    remaining: &OverrideSet,
) -> Option<CommonFormat> {
    let top = FieldPath::single(path.segments().first()?.as_str());
    let mut field = extract(child_tree, [&top])
        .unwrap_or_else(|| CommonFormat::Mapping(Mapping::new()));
    match parent_tree.get_path(path) {
        Some(value) => field.insert_path(path, value.clone()),
        None => {
            field.remove_path(path);
        }
    }
    for pinned in remaining.iter().filter(|pinned| path.is_prefix_of(pinned)) {
        if let Some(value) = child_tree.get_path(pinned) {
            field.insert_path(pinned, value.clone());
        }
    }
    if field.get_path(&top).is_none() {
        // field gone on both sides: apply it as its zero value
        field.insert_path(&top, CommonFormat::Null);
    }
    Some(field)
}
