//! The asset store
//!
//! A [`Store`] owns everything that used to be process-wide state: the type
//! registry, the filesystem overlay, the path caches, parent edges and
//! override sets. Independent stores never share objects.
//!
//! All operations take `&self`. Internal locks are only held for short
//! bookkeeping sections, never across a recursive load or save.

mod inherit;
mod load;
mod save;

pub use load::LoadOptions;

use crate::asset::{AnyAsset, AsAssetHandle, Asset, AssetHandle, AssetId, WeakAssetHandle};
use crate::config::StoreConfig;
use crate::error::{AssetError, AssetResult};
use crate::filesystem::{
    EntryKind, FileSystemOverlay, ReadFileSystem, WalkControl, WalkVisitor, WritableFileSystem,
};
use crate::persist::ConvertContext;
use crate::registry::{AssetDescriptor, TypeRegistry};
use flatland_format::{AssetPath, CommonFormat, Envelope, OverrideSet};
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Inheritance bookkeeping for one live object
#[derive(Debug)]
pub(crate) struct ChildRecord {
    pub(crate) handle: WeakAssetHandle,
    pub(crate) parent: Option<AssetPath>,
    pub(crate) overrides: Option<OverrideSet>,
}

#[derive(Debug, Default)]
pub(crate) struct CacheState {
    pub(crate) path_to_asset: HashMap<AssetPath, AssetHandle>,
    pub(crate) asset_to_path: HashMap<AssetId, AssetPath>,
    pub(crate) children: HashMap<AssetId, ChildRecord>,
}

impl CacheState {
    /// Record for `asset`, if it belongs to this very object
    pub(crate) fn record(&self, asset: &AssetHandle) -> Option<&ChildRecord> {
        self.children.get(&asset.id()).filter(|record| {
            record
                .handle
                .upgrade()
                .is_some_and(|live| live.ptr_eq(asset))
        })
    }

    /// Mutable record for `asset`, replacing a stale one left by a dead object
    pub(crate) fn record_mut(&mut self, asset: &AssetHandle) -> &mut ChildRecord {
        let stale = self.record(asset).is_none();
        let record = self.children.entry(asset.id()).or_insert_with(|| ChildRecord {
            handle: asset.downgrade(),
            parent: None,
            overrides: None,
        });
        if stale {
            *record = ChildRecord {
                handle: asset.downgrade(),
                parent: None,
                overrides: None,
            };
        }
        record
    }
}

/// Persistent object store with prototypal inheritance
pub struct Store {
    config: StoreConfig,
    registry: RwLock<TypeRegistry>,
    overlay: RwLock<FileSystemOverlay>,
    pub(crate) state: RwLock<CacheState>,
    loading: Mutex<Vec<AssetPath>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Store {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Store")
            .field("config", &self.config)
            .field("types", &self.registry.read().len())
            .field("overlay", &*self.overlay.read())
            .field("cached", &state.path_to_asset.len())
            .field("children", &state.children.len())
            .finish()
    }
}

/// Pops the loading stack when a load finishes, successfully or not
pub(crate) struct LoadingGuard<'a> {
    store: &'a Store,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store.loading.lock().pop();
    }
}

impl Store {
    /// Create a store with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create a store with explicit configuration
    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            registry: RwLock::new(TypeRegistry::new()),
            overlay: RwLock::new(FileSystemOverlay::new()),
            state: RwLock::new(CacheState::default()),
            loading: Mutex::new(Vec::new()),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register `T`, created with `T::default()`
    pub fn register_asset<T: Asset + Default>(&self) -> Arc<AssetDescriptor> {
        self.register_factory(T::default)
    }

    /// Register `T` with a custom factory
    ///
    /// Default initializers still run on every object the factory makes.
    pub fn register_factory<T: Asset>(&self, factory: fn() -> T) -> Arc<AssetDescriptor> {
        let descriptor = self.registry.write().register(factory);
        info!(name = descriptor.name(), short = descriptor.display_name(), "registered asset type");
        descriptor
    }

    /// Tag registered type `T` with capability `C` (usually `dyn Trait`)
    ///
    /// Returns false when `T` is not registered.
    pub fn register_capability<T: Asset, C: ?Sized + 'static>(&self) -> bool {
        self.registry.write().add_capability::<T, C>()
    }

    /// Add a read layer; lower priority values are consulted first
    pub fn register_file_system<F: ReadFileSystem + 'static>(&self, fs: F, priority: i32) {
        self.overlay.write().add_layer(Arc::new(fs), priority);
        debug!(priority, "registered read file system");
    }

    /// Set the single write sink
    pub fn register_writable_file_system<F: WritableFileSystem + 'static>(&self, fs: F) {
        self.overlay.write().set_sink(Arc::new(fs));
        debug!("registered writable file system");
    }

    // ------------------------------------------------------------------
    // Descriptors
    // ------------------------------------------------------------------

    /// Descriptor registered under `name`
    ///
    /// # Errors
    /// Returns [`AssetError::UnknownType`] if no such type is registered.
    pub fn descriptor(&self, name: &str) -> AssetResult<Arc<AssetDescriptor>> {
        self.registry
            .read()
            .get(name)
            .ok_or_else(|| AssetError::UnknownType(name.to_owned()))
    }

    /// Descriptor for a live object's type
    #[must_use]
    pub fn descriptor_for(&self, asset: &impl AsAssetHandle) -> Option<Arc<AssetDescriptor>> {
        self.registry.read().get(asset.as_asset_handle().type_name())
    }

    /// All registered descriptors, sorted by name
    #[must_use]
    pub fn descriptors(&self) -> Vec<Arc<AssetDescriptor>> {
        self.registry.read().descriptors().to_vec()
    }

    /// Descriptors whose type is `type_id` or carries it as a capability
    #[must_use]
    pub fn filter_descriptors_by_type(&self, type_id: TypeId) -> Vec<Arc<AssetDescriptor>> {
        self.registry.read().matching(type_id)
    }

    /// Typed form of [`Store::filter_descriptors_by_type`]
    #[must_use]
    pub fn filter_descriptors<C: ?Sized + 'static>(&self) -> Vec<Arc<AssetDescriptor>> {
        self.filter_descriptors_by_type(TypeId::of::<C>())
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    /// Raw bytes of `path` from the first layer holding it
    ///
    /// # Errors
    /// [`AssetError::NotFound`] when no layer holds the path.
    pub fn read_file(&self, path: &AssetPath) -> AssetResult<Vec<u8>> {
        let overlay = self.overlay.read().clone();
        overlay.read(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => AssetError::not_found(path),
            _ => AssetError::io_error(path, err),
        })
    }

    /// Walk every layer in priority order
    ///
    /// # Errors
    /// Propagates layer I/O errors.
    pub fn walk_files(
        &self,
        mut visit: impl FnMut(&AssetPath, EntryKind) -> WalkControl,
    ) -> AssetResult<()> {
        // clone the layer list so the visitor may call back into the store
        let overlay = self.overlay.read().clone();
        let visit: &mut WalkVisitor<'_> = &mut visit;
        overlay
            .walk(visit)
            .map_err(|err| AssetError::io_error(AssetPath::default(), err))
    }

    /// Asset files whose envelope type is `type_id` or carries it as a capability
    ///
    /// Files that do not decode are skipped with a warning.
    ///
    /// # Errors
    /// Propagates layer I/O errors from the walk.
    pub fn filter_files_by_type(&self, type_id: TypeId) -> AssetResult<Vec<AssetPath>> {
        let mut candidates = Vec::new();
        self.walk_files(|path, kind| {
            if kind == EntryKind::File && self.config.is_asset_file(path) {
                candidates.push(path.clone());
            }
            WalkControl::Continue
        })?;

        let mut seen = HashSet::new();
        let mut matches = Vec::new();
        for path in candidates {
            if !seen.insert(path.clone()) {
                continue;
            }
            let envelope = match self.read_file(&path).and_then(|bytes| Ok(Envelope::decode(&bytes)?)) {
                Ok(envelope) => envelope,
                Err(err) => {
                    warn!(%path, error = %err, "skipping file that is not an asset envelope");
                    continue;
                }
            };
            let matched = self
                .registry
                .read()
                .get(&envelope.type_name)
                .is_some_and(|d| d.matches(type_id));
            if matched {
                matches.push(path);
            }
        }
        Ok(matches)
    }

    /// Typed form of [`Store::filter_files_by_type`]
    ///
    /// # Errors
    /// Propagates layer I/O errors from the walk.
    pub fn filter_files<C: ?Sized + 'static>(&self) -> AssetResult<Vec<AssetPath>> {
        self.filter_files_by_type(TypeId::of::<C>())
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Path the object was loaded from or last saved to
    #[must_use]
    pub fn path_of(&self, asset: &impl AsAssetHandle) -> Option<AssetPath> {
        let asset = asset.as_asset_handle();
        let state = self.state.read();
        let path = state.asset_to_path.get(&asset.id())?;
        // the id only counts if the cached object at that path is this one
        state
            .path_to_asset
            .get(path)
            .filter(|cached| cached.ptr_eq(&asset))
            .map(|_| path.clone())
    }

    /// Recorded parent path
    #[must_use]
    pub fn parent_of(&self, asset: &impl AsAssetHandle) -> Option<AssetPath> {
        let asset = asset.as_asset_handle();
        self.state.read().record(&asset)?.parent.clone()
    }

    /// Copy of the override set, if one exists
    #[must_use]
    pub fn overrides_of(&self, asset: &impl AsAssetHandle) -> Option<OverrideSet> {
        let asset = asset.as_asset_handle();
        self.state.read().record(&asset)?.overrides.clone()
    }

    /// Whether `path` is in the path cache
    #[must_use]
    pub fn is_loaded(&self, path: impl Into<AssetPath>) -> bool {
        self.state.read().path_to_asset.contains_key(&path.into())
    }

    /// Cached object at `path`
    #[must_use]
    pub fn cached(&self, path: &AssetPath) -> Option<AssetHandle> {
        self.state.read().path_to_asset.get(path).cloned()
    }

    /// Full common-format tree of a live object
    ///
    /// # Errors
    /// [`AssetError::Reentrant`] if the object is write-locked further up the
    /// call chain; otherwise errors converting pointer fields.
    pub fn tree_of(&self, asset: &impl AsAssetHandle) -> AssetResult<CommonFormat> {
        self.tree_with(&asset.as_asset_handle(), ConvertContext::new(self))
    }

    pub(crate) fn tree_with(
        &self,
        asset: &AssetHandle,
        cx: ConvertContext<'_>,
    ) -> AssetResult<CommonFormat> {
        let guard = asset
            .try_read()
            .ok_or_else(|| AssetError::Reentrant(asset.type_name().to_owned()))?;
        guard.to_common(cx)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Forget cached objects, parent edges and override sets
    ///
    /// Registered types and filesystems are kept.
    pub fn reset(&self) {
        let mut state = self.state.write();
        let cached = state.path_to_asset.len();
        *state = CacheState::default();
        debug!(cached, "store caches cleared");
    }

    /// Forget everything, including registered types and filesystems
    pub fn reset_all(&self) {
        self.reset();
        *self.registry.write() = TypeRegistry::new();
        *self.overlay.write() = FileSystemOverlay::new();
    }

    // ------------------------------------------------------------------
    // Internal bookkeeping
    // ------------------------------------------------------------------

    /// Write lock on `asset`, failing instead of deadlocking on re-entry
    pub(crate) fn lock_for_write<'a>(
        &self,
        asset: &'a AssetHandle,
    ) -> AssetResult<RwLockWriteGuard<'a, dyn AnyAsset>> {
        asset
            .try_write()
            .ok_or_else(|| AssetError::Reentrant(asset.type_name().to_owned()))
    }

    /// Overlay `tree` onto a live object and run its post-load hook
    pub(crate) fn apply(&self, asset: &AssetHandle, tree: &CommonFormat) -> AssetResult<()> {
        let mut guard = self.lock_for_write(asset)?;
        guard.from_common(tree, ConvertContext::new(self))?;
        guard.run_post_load();
        Ok(())
    }

    pub(crate) fn enter_loading(&self, path: &AssetPath) -> AssetResult<LoadingGuard<'_>> {
        let mut stack = self.loading.lock();
        if stack.contains(path) {
            return Err(AssetError::Cycle { path: path.clone() });
        }
        if stack.len() >= self.config.max_depth {
            return Err(AssetError::DepthExceeded {
                path: path.clone(),
                limit: self.config.max_depth,
            });
        }
        stack.push(path.clone());
        Ok(LoadingGuard { store: self })
    }

    /// Put `asset` in both path caches under `path`
    pub(crate) fn remember(&self, path: AssetPath, asset: &AssetHandle) {
        let mut state = self.state.write();
        if let Some(previous) = state.path_to_asset.insert(path.clone(), asset.clone()) {
            if !previous.ptr_eq(asset)
                && state.asset_to_path.get(&previous.id()) == Some(&path)
            {
                state.asset_to_path.remove(&previous.id());
            }
        }
        state.asset_to_path.insert(asset.id(), path);
    }

    /// Record `parent` as the parent of `child`, optionally replacing its overrides
    pub(crate) fn record_parent(
        &self,
        child: &AssetHandle,
        parent: AssetPath,
        overrides: Option<Option<OverrideSet>>,
    ) {
        let mut state = self.state.write();
        let record = state.record_mut(child);
        record.parent = Some(parent);
        if let Some(overrides) = overrides {
            record.overrides = overrides.filter(|set| !set.is_empty());
        }
    }

    /// Live children whose recorded parent is `path`, with their overrides
    pub(crate) fn children_of(&self, path: &AssetPath) -> Vec<(AssetHandle, Option<OverrideSet>)> {
        let mut state = self.state.write();
        state.children.retain(|_, record| record.handle.upgrade().is_some());
        state
            .children
            .values()
            .filter(|record| record.parent.as_ref() == Some(path))
            .filter_map(|record| Some((record.handle.upgrade()?, record.overrides.clone())))
            .collect()
    }
}
