//! Flatland Format
//!
//! The storage-independent half of the flatland asset system: the common
//! format every persistable value converts to, the envelope written to disk,
//! and the structural diff that makes inheritance cheap to store.
//!
//! # Core Concepts
//!
//! - [`CommonFormat`]: Type-erased tree (scalars, sequences, mappings, references, inline containers)
//! - [`Envelope`]: `{Type, Parent, Inner}` wrapper around a stored diff
//! - [`diff`] / [`merge`]: Minimal difference against a parent and its inverse
//! - [`FieldPath`]: Dotted address of a leaf inside a tree
//! - [`OverrideSet`]: Fields a child keeps when its parent changes
//!
//! # Example
//!
//! ```rust
//! use flatland_format::{diff, mapping, merge};
//!
//! let parent = mapping! { "Name" => "orc", "Health" => 10_i64 };
//! let child = mapping! { "Name" => "orc", "Health" => 12_i64 };
//!
//! let inner = diff(Some(&parent), &child).unwrap();
//! assert_eq!(inner, mapping! { "Health" => 12_i64 });
//! assert_eq!(merge(parent, &inner), child);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod bytes;
mod diff;
mod envelope;
mod error;
mod overrides;
mod path;
mod tree;

pub use bytes::Bytes;
pub use diff::{diff, extract, leaf_paths, merge};
pub use envelope::Envelope;
pub use error::{FormatError, FormatResult};
pub use overrides::OverrideSet;
pub use path::{AssetPath, FieldPath};
pub use tree::{
    AssetReference, CommonFormat, Mapping, Shape, INNER_KEY, PARENT_KEY, PATH_KEY, TYPE_KEY,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
