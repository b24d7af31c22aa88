//! Save side of the engine: live objects out to envelopes, then propagation

use super::load::stored_overrides;
use super::Store;
use crate::asset::{AsAssetHandle, AssetHandle};
use crate::error::{AssetError, AssetResult};
use crate::meta::FieldMeta;
use crate::persist::{ConvertContext, SavedPins};
use flatland_format::{
    diff, extract, merge, AssetPath, AssetReference, CommonFormat, Envelope, OverrideSet,
};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, warn};

impl Store {
    /// Save `asset` to `path` and push the change into every live child
    ///
    /// The default extension is appended when `path` has none; the final
    /// path is returned. The file holds only the diff against the asset's
    /// recorded parent, or the non-zero fields when it has no parent.
    ///
    /// Once written, the pins of the asset and of every inline sub-asset
    /// with a parent become exactly the fields the file stores, as a later
    /// load would see them.
    ///
    /// # Errors
    /// [`AssetError::NoWritableFileSystem`], [`AssetError::UnknownType`] for
    /// unregistered types, [`AssetError::Io`] when the sink fails.
    pub fn save(
        &self,
        path: impl Into<AssetPath>,
        asset: &impl AsAssetHandle,
    ) -> AssetResult<AssetPath> {
        let asset = asset.as_asset_handle();
        let path = self.config.save_path(&path.into());
        let sink = self
            .overlay
            .read()
            .sink()
            .cloned()
            .ok_or(AssetError::NoWritableFileSystem)?;

        let pins = SavedPins::default();
        let envelope = self.build_envelope(&asset, ConvertContext::saving(self, &pins))?;
        let bytes = envelope.encode(self.config.pretty)?;
        sink.write(&path, &bytes)
            .map_err(|err| AssetError::io_error(path.clone(), err))?;
        debug!(
            %path,
            type_name = asset.type_name(),
            parent = ?envelope.parent,
            bytes = bytes.len(),
            "saved asset"
        );

        self.remember(path.clone(), &asset);
        for (saved, parent, overrides) in pins.into_inner() {
            self.record_parent(&saved, parent, Some(overrides));
        }
        self.propagate(&path)?;
        Ok(path)
    }

    /// Envelope for a live object: its type, recorded parent and diff
    ///
    /// # Errors
    /// [`AssetError::UnknownType`] when the type is not registered.
    pub fn envelope_for(&self, asset: &impl AsAssetHandle) -> AssetResult<Envelope> {
        self.build_envelope(&asset.as_asset_handle(), ConvertContext::new(self))
    }

    fn build_envelope(&self, asset: &AssetHandle, cx: ConvertContext<'_>) -> AssetResult<Envelope> {
        let descriptor = self.descriptor(asset.type_name())?;
        let tree = self.tree_with(asset, cx)?;
        let parent = self.parent_of(asset);
        let parent_tree = match &parent {
            Some(parent) => Some(self.tree_of(&self.load(parent.clone())?)?),
            None => None,
        };
        let inner = diff(parent_tree.as_ref(), &tree);

        if let (Some(pins), Some(parent)) = (cx.saved_pins(), &parent) {
            let overrides = inner.as_ref().map(|inner| stored_overrides(&tree, inner));
            pins.borrow_mut().push((asset.clone(), parent.clone(), overrides));
        }

        let mut envelope = Envelope::new(descriptor.name());
        envelope.parent = parent;
        envelope.inner = inner;
        Ok(envelope)
    }

    /// Tree for a pointer field
    ///
    /// Inline fields embed the target's envelope; other targets must have a
    /// path and become references. Anything else is dropped with a warning.
    pub(crate) fn pointer_to_common(
        &self,
        target: &AssetHandle,
        cx: ConvertContext<'_>,
    ) -> AssetResult<CommonFormat> {
        if cx.field().is_inline() {
            let envelope = self.build_envelope(target, cx.for_field(FieldMeta::NONE))?;
            return Ok(CommonFormat::InlineContainer(Box::new(envelope)));
        }
        match self.path_of(target) {
            Some(path) => Ok(CommonFormat::AssetReference(AssetReference::new(
                target.type_name(),
                path,
            ))),
            None => {
                warn!(
                    type_name = target.type_name(),
                    "pointer to an asset with no path is not persistable, dropping it"
                );
                Ok(CommonFormat::Null)
            }
        }
    }

    /// Re-derive every live descendant of the asset saved at `saved`
    fn propagate(&self, saved: &AssetPath) -> AssetResult<()> {
        let mut queue = VecDeque::from([saved.clone()]);
        let mut visited = HashSet::from([saved.clone()]);
        let mut updated = 0_usize;

        while let Some(parent_path) = queue.pop_front() {
            let children = self.children_of(&parent_path);
            if children.is_empty() {
                continue;
            }
            let Some(parent) = self.cached(&parent_path) else {
                continue;
            };
            let parent_tree = self.tree_of(&parent)?;
            for (child, overrides) in children {
                self.rederive(&child, &parent_tree, overrides.as_ref())?;
                updated += 1;
                if let Some(child_path) = self.path_of(&child) {
                    if visited.insert(child_path.clone()) {
                        queue.push_back(child_path);
                    }
                }
            }
        }

        if updated > 0 {
            info!(path = %saved, updated, "propagated parent update to children");
        }
        Ok(())
    }

    /// Overlay a child's pinned fields onto the parent tree and apply the result
    pub(crate) fn rederive(
        &self,
        child: &AssetHandle,
        parent_tree: &CommonFormat,
        overrides: Option<&OverrideSet>,
    ) -> AssetResult<()> {
        let pinned = match overrides {
            Some(overrides) => extract(&self.tree_of(child)?, overrides),
            None => None,
        };
        let tree = match pinned {
            Some(pinned) => merge(parent_tree.clone(), &pinned),
            None => parent_tree.clone(),
        };
        self.apply(child, &tree)
    }
}
