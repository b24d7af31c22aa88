//! Asset traits and shared handles
//!
//! Any type that implements [`Persist`] and [`Lifecycle`] is an [`Asset`].
//! Assets live behind [`Handle<T>`] (typed) or [`AssetHandle`] (erased);
//! both are reference-counted and compare by identity, which is what the
//! store's caches key on.

use crate::persist::Persist;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, Weak};

/// Optional hooks run by the store
///
/// Both hooks may run more than once on the same object (for example when
/// a handle is re-initialized after being copied) and must be idempotent.
pub trait Lifecycle {
    /// Fill in defaults on a freshly created object, after its fields
    fn default_initialize(&mut self) {}

    /// Rebuild derived state after the object's fields were loaded
    fn post_load(&mut self) {}
}

/// A persistable object
pub trait Asset: Persist + Lifecycle + Send + Sync + 'static {}

impl<T> Asset for T where T: Persist + Lifecycle + Send + Sync + 'static {}

/// Object-safe view of an [`Asset`]
pub trait AnyAsset: Persist + Send + Sync + 'static {
    /// Registered type name
    fn type_name(&self) -> &'static str;

    /// Run [`Lifecycle::post_load`]
    fn run_post_load(&mut self);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Asset> AnyAsset for T {
    fn type_name(&self) -> &'static str {
        type_name_of::<T>()
    }

    fn run_post_load(&mut self) {
        Lifecycle::post_load(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Registered name of a Rust type: its full module path
///
/// Two types with the same identifier in different modules get different
/// names, so envelopes written for one never load as the other.
#[must_use]
pub fn type_name_of<T: ?Sized>() -> &'static str {
    std::any::type_name::<T>()
}

/// Last path segment of a registered name, for listings
///
/// `game::units::Unit` becomes `Unit`; generic arguments are kept as written.
#[must_use]
pub fn short_type_name(full: &str) -> &str {
    let generic = full.find('<').unwrap_or(full.len());
    let start = full[..generic].rfind("::").map_or(0, |idx| idx + 2);
    &full[start..]
}

/// Identity of a live asset object
///
/// Two handles have the same id exactly when they point at the same object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(usize);

impl AssetId {
    fn of<T: ?Sized>(ptr: *const T) -> Self {
        Self(ptr.cast::<()>() as usize)
    }
}

/// Typed shared handle to an asset
pub struct Handle<T>(Arc<RwLock<T>>);

impl<T: Asset> Handle<T> {
    /// Wrap a new value
    #[must_use]
    pub fn new(value: T) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    /// Lock for reading
    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read()
    }

    /// Lock for writing
    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write()
    }

    /// Type-erased handle to the same object
    #[must_use]
    pub fn erase(&self) -> AssetHandle {
        AssetHandle::from_arc(Arc::clone(&self.0))
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> AssetId {
        AssetId::of(Arc::as_ptr(&self.0))
    }

    /// True if both handles point at the same object
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: Asset> Debug for Handle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle")
            .field(&type_name_of::<T>())
            .field(&self.id())
            .finish()
    }
}

impl<T: Asset> From<Handle<T>> for AssetHandle {
    fn from(handle: Handle<T>) -> Self {
        Self::from_arc(handle.0)
    }
}

/// Type-erased shared handle to an asset
#[derive(Clone)]
pub struct AssetHandle {
    shared: Arc<RwLock<dyn AnyAsset>>,
    any: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl AssetHandle {
    /// Wrap a new value
    #[must_use]
    pub fn new<T: Asset>(value: T) -> Self {
        Self::from_arc(Arc::new(RwLock::new(value)))
    }

    fn from_arc<T: Asset>(arc: Arc<RwLock<T>>) -> Self {
        Self {
            shared: arc.clone(),
            any: arc,
            type_name: type_name_of::<T>(),
        }
    }

    /// Registered type name of the object
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Lock for reading
    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, dyn AnyAsset> {
        self.shared.read()
    }

    /// Lock for writing
    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'_, dyn AnyAsset> {
        self.shared.write()
    }

    /// Lock for reading unless a writer holds the object
    #[inline]
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, dyn AnyAsset>> {
        self.shared.try_read()
    }

    /// Lock for writing unless the object is locked elsewhere
    #[inline]
    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, dyn AnyAsset>> {
        self.shared.try_write()
    }

    /// Typed handle, if the object is a `T`
    #[must_use]
    pub fn downcast<T: Asset>(&self) -> Option<Handle<T>> {
        Arc::clone(&self.any).downcast::<RwLock<T>>().ok().map(Handle)
    }

    /// True if the object is a `T`
    #[must_use]
    pub fn is<T: Asset>(&self) -> bool {
        self.any.is::<RwLock<T>>()
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> AssetId {
        AssetId::of(Arc::as_ptr(&self.any))
    }

    /// True if both handles point at the same object
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }

    /// Non-owning handle
    #[must_use]
    pub fn downgrade(&self) -> WeakAssetHandle {
        WeakAssetHandle {
            shared: Arc::downgrade(&self.shared),
            any: Arc::downgrade(&self.any),
            type_name: self.type_name,
        }
    }
}

impl Debug for AssetHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AssetHandle")
            .field(&self.type_name)
            .field(&self.id())
            .finish()
    }
}

/// Anything the store can treat as an asset handle
pub trait AsAssetHandle {
    fn as_asset_handle(&self) -> AssetHandle;
}

impl AsAssetHandle for AssetHandle {
    fn as_asset_handle(&self) -> AssetHandle {
        self.clone()
    }
}

impl<T: Asset> AsAssetHandle for Handle<T> {
    fn as_asset_handle(&self) -> AssetHandle {
        self.erase()
    }
}

/// Non-owning counterpart of [`AssetHandle`]
#[derive(Clone)]
pub struct WeakAssetHandle {
    shared: Weak<RwLock<dyn AnyAsset>>,
    any: Weak<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl WeakAssetHandle {
    /// Strong handle, if the object is still alive
    #[must_use]
    pub fn upgrade(&self) -> Option<AssetHandle> {
        Some(AssetHandle {
            shared: self.shared.upgrade()?,
            any: self.any.upgrade()?,
            type_name: self.type_name,
        })
    }
}

impl Debug for WeakAssetHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WeakAssetHandle").field(&self.type_name).finish()
    }
}
