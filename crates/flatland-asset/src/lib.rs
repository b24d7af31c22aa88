//! Flatland Asset - persistent objects with prototypal inheritance
//!
//! A [`Store`] loads and saves typed objects as small JSON envelopes. An
//! asset may name a parent asset; its file then holds only the fields that
//! differ from that parent, and saving the parent pushes the change into
//! every live child except for the fields the child has pinned.
//!
//! # Core Concepts
//!
//! - [`Persist`]: Conversion to and from the common format, usually via [`persistent!`]
//! - [`Store`]: Type registry, filesystem overlay, path caches and inheritance graph
//! - [`Handle`] / [`AssetHandle`]: Shared, identity-compared pointers to live assets
//! - [`OverrideSet`]: Fields a child keeps when its parent changes
//! - [`ReadFileSystem`] / [`WritableFileSystem`]: Where envelopes come from and go to
//!
//! # Example
//!
//! ```rust
//! use flatland_asset::{persistent, Handle, Lifecycle, MemoryFileSystem, Store};
//!
//! #[derive(Debug, Default)]
//! struct Unit {
//!     name: String,
//!     health: i64,
//! }
//!
//! persistent!(Unit { name as "Name", health as "Health" });
//!
//! impl Lifecycle for Unit {}
//!
//! let fs = MemoryFileSystem::new();
//! let store = Store::new();
//! store.register_asset::<Unit>();
//! store.register_file_system(fs.clone(), 0);
//! store.register_writable_file_system(fs);
//!
//! let orc = Handle::new(Unit { name: "orc".into(), health: 10 });
//! store.save("units/orc", &orc)?;
//!
//! let veteran = Handle::new(Unit { name: "orc".into(), health: 15 });
//! store.set_parent(&veteran, &orc)?;
//! store.save("units/veteran", &veteran)?;
//!
//! orc.write().name = "orc chief".into();
//! store.save("units/orc", &orc)?;
//!
//! assert_eq!(veteran.read().name, "orc chief");
//! assert_eq!(veteran.read().health, 15);
//! # Ok::<(), flatland_asset::AssetError>(())
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod macros;

pub mod asset;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod meta;
pub mod persist;
pub mod registry;
pub mod store;

pub use asset::{
    short_type_name, type_name_of, AnyAsset, AsAssetHandle, Asset, AssetHandle, AssetId, Handle,
    Lifecycle, WeakAssetHandle,
};
pub use config::StoreConfig;
pub use error::{AssetError, AssetResult};
pub use filesystem::{
    DirFileSystem, EntryKind, FileSystemOverlay, MemoryFileSystem, ReadFileSystem, WalkControl,
    WalkVisitor, WritableFileSystem,
};
pub use meta::{FieldInfo, FieldMeta};
pub use persist::{ConvertContext, Persist};
pub use registry::{AssetDescriptor, TypeRegistry};
pub use store::{LoadOptions, Store};

pub use flatland_format::{
    AssetPath, AssetReference, Bytes, CommonFormat, Envelope, FieldPath, FormatError, Mapping,
    OverrideSet,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for declaring and storing assets
    pub use crate::{
        persistent, AsAssetHandle, AssetError, AssetHandle, AssetPath, AssetResult, Bytes,
        Handle, Lifecycle, LoadOptions, Persist, Store, StoreConfig,
    };
}

#[doc(hidden)]
pub mod __private {
    pub use flatland_format::{CommonFormat, Mapping};
    pub use tracing;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
