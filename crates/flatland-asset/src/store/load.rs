//! Load side of the engine: envelopes in, live objects out

use super::Store;
use crate::asset::{type_name_of, Asset, AssetHandle, Handle};
use crate::error::{AssetError, AssetResult};
use crate::meta::FieldMeta;
use flatland_format::{
    leaf_paths, merge, AssetPath, AssetReference, CommonFormat, Envelope, FieldPath, OverrideSet,
};
use tracing::{debug, trace};

/// Options for [`Store::load_with_options`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Re-read the file even if the path is cached, updating the cached object in place
    pub force_reload: bool,
}

impl LoadOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set forced reload (builder pattern)
    #[must_use]
    pub fn with_force_reload(mut self, force_reload: bool) -> Self {
        self.force_reload = force_reload;
        self
    }
}

impl Store {
    /// Load the asset at `path`, returning the cached object if there is one
    ///
    /// # Errors
    /// [`AssetError::NotFound`], [`AssetError::UnknownType`],
    /// [`AssetError::MalformedWireData`], or a [`AssetError::Cycle`] when the
    /// file's parent or reference chain leads back to itself.
    pub fn load(&self, path: impl Into<AssetPath>) -> AssetResult<AssetHandle> {
        self.load_with_options(path, LoadOptions::default())
    }

    /// Load and downcast to `T`
    ///
    /// # Errors
    /// As [`Store::load`], plus [`AssetError::TypeMismatch`] when the file
    /// holds another type.
    pub fn load_as<T: Asset>(&self, path: impl Into<AssetPath>) -> AssetResult<Handle<T>> {
        let asset = self.load(path)?;
        asset
            .downcast::<T>()
            .ok_or_else(|| AssetError::type_mismatch(type_name_of::<T>(), asset.type_name()))
    }

    /// Load with explicit options
    ///
    /// A forced reload of a cached path updates the cached object in place,
    /// so every holder of the handle sees the new state.
    ///
    /// # Errors
    /// As [`Store::load`]; a forced reload whose file now names a different
    /// type fails with [`AssetError::TypeMismatch`].
    pub fn load_with_options(
        &self,
        path: impl Into<AssetPath>,
        options: LoadOptions,
    ) -> AssetResult<AssetHandle> {
        let path = path.into();
        let cached = self.cached(&path);
        if let Some(asset) = &cached {
            if !options.force_reload {
                trace!(%path, "cache hit");
                return Ok(asset.clone());
            }
        }

        let _loading = self.enter_loading(&path)?;
        let bytes = self.read_file(&path)?;
        let envelope = Envelope::decode(&bytes)?;
        if let Some(existing) = &cached {
            if existing.type_name() != envelope.type_name {
                return Err(AssetError::type_mismatch(
                    existing.type_name(),
                    envelope.type_name.as_str(),
                ));
            }
        }

        debug!(
            %path,
            type_name = %envelope.type_name,
            parent = ?envelope.parent,
            reload = cached.is_some(),
            "loading asset"
        );
        let asset = self.instantiate(&envelope, cached)?;
        self.remember(path, &asset);
        Ok(asset)
    }

    /// Build (or refresh) an object from an envelope
    ///
    /// `existing` is reused when its type matches. The object receives the
    /// full parent tree (or its type's default tree) overlaid with the
    /// envelope's diff, so fields the diff leaves out are reset rather than
    /// kept from a previous state.
    pub(crate) fn instantiate(
        &self,
        envelope: &Envelope,
        existing: Option<AssetHandle>,
    ) -> AssetResult<AssetHandle> {
        let descriptor = self.descriptor(&envelope.type_name)?;
        let asset = match existing {
            Some(existing) if existing.type_name() == descriptor.name() => existing,
            _ => descriptor.create(),
        };

        let parent = envelope.parent.clone().or_else(|| self.parent_of(&asset));
        let base = match &parent {
            Some(parent) => {
                let parent = self.load(parent.clone())?;
                self.tree_of(&parent)?
            }
            None => self.tree_of(&descriptor.create())?,
        };
        let tree = match &envelope.inner {
            Some(inner) => merge(base, inner),
            None => base,
        };
        self.apply(&asset, &tree)?;

        if let Some(parent) = &envelope.parent {
            let overrides = match &envelope.inner {
                Some(inner) => Some(stored_overrides(&self.tree_of(&asset)?, inner)),
                None => None,
            };
            self.record_parent(&asset, parent.clone(), Some(overrides));
        }
        Ok(asset)
    }

    /// Resolve a pointer field's tree to an object
    pub(crate) fn pointer_from_common(
        &self,
        tree: &CommonFormat,
        existing: Option<AssetHandle>,
        field: FieldMeta,
    ) -> AssetResult<Option<AssetHandle>> {
        match tree {
            CommonFormat::Null => Ok(None),
            CommonFormat::AssetReference(reference) => self.load_reference(reference).map(Some),
            CommonFormat::InlineContainer(envelope) => {
                self.instantiate(envelope, existing).map(Some)
            }
            // decoded JSON carries pointers as plain mappings
            CommonFormat::Mapping(_) if field.is_inline() => {
                let envelope = tree.as_envelope()?;
                self.instantiate(&envelope, existing).map(Some)
            }
            CommonFormat::Mapping(_) => {
                let reference = tree.as_reference()?;
                self.load_reference(&reference).map(Some)
            }
            other => Err(AssetError::malformed(format!(
                "expected an asset pointer, found {}",
                other.kind()
            ))),
        }
    }

    fn load_reference(&self, reference: &AssetReference) -> AssetResult<AssetHandle> {
        let asset = self.load(reference.path.clone())?;
        if !reference.type_name.is_empty() && reference.type_name != asset.type_name() {
            return Err(AssetError::type_mismatch(
                reference.type_name.as_str(),
                asset.type_name(),
            ));
        }
        Ok(asset)
    }
}

/// Override set for the fields a stored diff holds
///
/// Decoded JSON carries pointers as plain mappings, so a diff leaf such
/// as `Ref.Path` is cut back to `Ref`, the leaf in the object's own tree.
pub(super) fn stored_overrides(tree: &CommonFormat, inner: &CommonFormat) -> OverrideSet {
    leaf_paths(inner)
        .into_iter()
        .map(|path| clamp_to_leaf(tree, path))
        .collect()
}

/// Shorten `path` to the first node of `tree` that is not a mapping
fn clamp_to_leaf(tree: &CommonFormat, path: FieldPath) -> FieldPath {
    let mut node = tree;
    for (depth, segment) in path.iter().enumerate() {
        let Some(fields) = node.as_mapping() else {
            return FieldPath::new(path.segments()[..depth].to_vec());
        };
        match fields.get(segment) {
            Some(child) => node = child,
            None => break,
        }
    }
    path
}
