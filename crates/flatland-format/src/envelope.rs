//! Envelope: the on-disk wrapper around every stored asset
//!
//! ```json
//! {
//!   "Type": "game::units::Unit",
//!   "Parent": "units/base.json",
//!   "Inner": { "Name": "orc" }
//! }
//! ```
//!
//! `Parent` is written as `""` when absent and `Inner` as `null` when the
//! asset matches its parent (or the zero value) exactly.

use crate::error::{FormatError, FormatResult};
use crate::path::AssetPath;
use crate::tree::{CommonFormat, Mapping, INNER_KEY, PARENT_KEY, TYPE_KEY};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// Typed, optionally-parented wrapper around a diff tree
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Envelope {
    /// Registered type name
    pub type_name: String,
    /// Path of the asset this one inherits from
    pub parent: Option<AssetPath>,
    /// Diff against the parent, or against the zero value without one
    pub inner: Option<CommonFormat>,
}

impl Envelope {
    /// Create an envelope with no parent and no data
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            parent: None,
            inner: None,
        }
    }

    /// Set the parent path (builder pattern)
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<AssetPath>) -> Self {
        let parent = parent.into();
        self.parent = (!parent.is_empty()).then_some(parent);
        self
    }

    /// Set the diff tree (builder pattern)
    #[must_use]
    pub fn with_inner(mut self, inner: CommonFormat) -> Self {
        self.inner = Some(inner);
        self
    }

    /// Encode to JSON bytes
    ///
    /// # Errors
    /// Propagates serializer failures.
    pub fn encode(&self, pretty: bool) -> FormatResult<Vec<u8>> {
        let bytes = if pretty {
            serde_json::to_vec_pretty(self)?
        } else {
            serde_json::to_vec(self)?
        };
        Ok(bytes)
    }

    /// Decode from JSON bytes
    ///
    /// # Errors
    /// Returns [`FormatError::Json`] for invalid JSON and
    /// [`FormatError::MalformedWireData`] when the document is not an envelope.
    pub fn decode(bytes: &[u8]) -> FormatResult<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        match CommonFormat::from_json(value) {
            CommonFormat::Mapping(fields) => Self::from_fields(&fields),
            other => Err(FormatError::malformed(format!(
                "envelope must be a mapping, found {}",
                other.kind()
            ))),
        }
    }

    /// Build from the fields of a decoded mapping
    pub(crate) fn from_fields(fields: &Mapping) -> FormatResult<Self> {
        let type_name = fields
            .get(TYPE_KEY)
            .and_then(CommonFormat::as_str)
            .ok_or_else(|| FormatError::malformed("envelope is missing its Type"))?;

        let parent = match fields.get(PARENT_KEY) {
            None | Some(CommonFormat::Null) => None,
            Some(CommonFormat::String(path)) if path.is_empty() => None,
            Some(CommonFormat::String(path)) => Some(AssetPath::new(path.clone())),
            Some(other) => {
                return Err(FormatError::malformed(format!(
                    "envelope Parent must be a string, found {}",
                    other.kind()
                )))
            }
        };

        let inner = match fields.get(INNER_KEY) {
            None | Some(CommonFormat::Null) => None,
            Some(tree) => Some(tree.clone()),
        };

        Ok(Self {
            type_name: type_name.to_owned(),
            parent,
            inner,
        })
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry(TYPE_KEY, &self.type_name)?;
        map.serialize_entry(
            PARENT_KEY,
            self.parent.as_ref().map_or("", AssetPath::as_str),
        )?;
        map.serialize_entry(INNER_KEY, &self.inner)?;
        map.end()
    }
}
