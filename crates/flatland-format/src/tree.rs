//! The common format: a type-erased tree every persistable value converts to
//!
//! Trees are plain data. Asset references and inline containers have their
//! own variants when produced from live objects, but decode from JSON as
//! ordinary mappings; readers recognise them with [`CommonFormat::as_reference`]
//! and [`CommonFormat::as_envelope`] once they know what the destination
//! field expects.

use crate::envelope::Envelope;
use crate::error::{FormatError, FormatResult};
use crate::path::{AssetPath, FieldPath};
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Key-sorted mapping node
pub type Mapping = BTreeMap<String, CommonFormat>;

/// Wire key naming the asset type in references and envelopes
pub const TYPE_KEY: &str = "Type";
/// Wire key naming the referenced file
pub const PATH_KEY: &str = "Path";
/// Wire key naming an envelope's parent
pub const PARENT_KEY: &str = "Parent";
/// Wire key holding an envelope's diff
pub const INNER_KEY: &str = "Inner";

/// Type-erased value tree
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CommonFormat {
    /// Absent value (nil pointer, empty slot)
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Sequence(Vec<CommonFormat>),
    Mapping(Mapping),
    /// Pointer to a separately stored asset
    AssetReference(AssetReference),
    /// Pointer to a sub-asset embedded in the enclosing file
    InlineContainer(Box<Envelope>),
}

/// Coarse shape of a node, used to decide whether two nodes are comparable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Null,
    Bool,
    Number,
    String,
    Sequence,
    Mapping,
    Reference,
    Inline,
}

/// Pointer to an asset stored under its own path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetReference {
    /// Registered type name of the target
    pub type_name: String,
    /// Path the target was loaded from or saved to
    pub path: AssetPath,
}

impl AssetReference {
    /// Create a new reference
    #[must_use]
    pub fn new(type_name: impl Into<String>, path: impl Into<AssetPath>) -> Self {
        Self {
            type_name: type_name.into(),
            path: path.into(),
        }
    }
}

impl CommonFormat {
    /// Shape of this node
    #[must_use]
    pub fn shape(&self) -> Shape {
        match self {
            Self::Null => Shape::Null,
            Self::Bool(_) => Shape::Bool,
            Self::Int(_) | Self::UInt(_) | Self::Float(_) => Shape::Number,
            Self::String(_) => Shape::String,
            Self::Sequence(_) => Shape::Sequence,
            Self::Mapping(_) => Shape::Mapping,
            Self::AssetReference(_) => Shape::Reference,
            Self::InlineContainer(_) => Shape::Inline,
        }
    }

    /// Short human name for the node's shape, used in error messages
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self.shape() {
            Shape::Null => "null",
            Shape::Bool => "bool",
            Shape::Number => "number",
            Shape::String => "string",
            Shape::Sequence => "sequence",
            Shape::Mapping => "mapping",
            Shape::Reference => "asset reference",
            Shape::Inline => "inline container",
        }
    }

    /// True for the zero value of the node's kind
    ///
    /// References and inline containers are never zero; an absent pointer
    /// is [`CommonFormat::Null`].
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Null | Self::Bool(false) | Self::Int(0) | Self::UInt(0) => true,
            Self::Float(f) => *f == 0.0,
            Self::String(s) => s.is_empty(),
            Self::Sequence(items) => items.is_empty(),
            Self::Mapping(fields) => fields.is_empty(),
            _ => false,
        }
    }

    /// Value equality that treats numeric variants by value
    #[must_use]
    pub fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::UInt(b)) | (Self::UInt(b), Self::Int(a)) => {
                u64::try_from(*a).is_ok_and(|a| a == *b)
            }
            (Self::Float(a), b) | (b, Self::Float(a)) if b.shape() == Shape::Number => {
                b.as_f64().is_some_and(|b| b == *a)
            }
            _ => self == other,
        }
    }

    /// Borrow as a mapping
    #[inline]
    #[must_use]
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(fields) => Some(fields),
            _ => None,
        }
    }

    /// Borrow as a string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value as `i64`, converting between numeric variants
    ///
    /// `None` when the value does not fit exactly: out of range, or a float
    /// with a fractional part.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::float_cmp
    )]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            Self::Float(v) if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < -(i64::MIN as f64) => {
                Some(*v as i64)
            }
            _ => None,
        }
    }

    /// Numeric value as `u64`, converting between numeric variants
    ///
    /// `None` when the value does not fit exactly.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss,
        clippy::float_cmp
    )]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Int(v) => u64::try_from(*v).ok(),
            Self::UInt(v) => Some(*v),
            Self::Float(v) if v.fract() == 0.0 && *v >= 0.0 && *v < u64::MAX as f64 => Some(*v as u64),
            _ => None,
        }
    }

    /// Numeric value as `f64`, converting between numeric variants
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::UInt(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Interpret this node as an asset reference
    ///
    /// # Errors
    /// Returns [`FormatError::MalformedWireData`] if the node is neither a
    /// reference nor a mapping carrying a string `Path`.
    pub fn as_reference(&self) -> FormatResult<AssetReference> {
        match self {
            Self::AssetReference(reference) => Ok(reference.clone()),
            Self::Mapping(fields) => {
                let path = fields
                    .get(PATH_KEY)
                    .and_then(Self::as_str)
                    .ok_or_else(|| FormatError::malformed("asset reference is missing its Path"))?;
                let type_name = fields.get(TYPE_KEY).and_then(Self::as_str).unwrap_or_default();
                Ok(AssetReference::new(type_name, path))
            }
            other => Err(FormatError::malformed(format!(
                "expected an asset reference, found {}",
                other.kind()
            ))),
        }
    }

    /// Interpret this node as an inline envelope
    ///
    /// # Errors
    /// Returns [`FormatError::MalformedWireData`] if the node is neither an
    /// inline container nor a mapping with a string `Type`.
    pub fn as_envelope(&self) -> FormatResult<Envelope> {
        match self {
            Self::InlineContainer(envelope) => Ok((**envelope).clone()),
            Self::Mapping(fields) => Envelope::from_fields(fields),
            other => Err(FormatError::malformed(format!(
                "expected an inline container, found {}",
                other.kind()
            ))),
        }
    }

    /// Node at `path`, walking mappings from this node
    #[must_use]
    pub fn get_path(&self, path: &FieldPath) -> Option<&Self> {
        path.iter()
            .try_fold(self, |node, segment| node.as_mapping()?.get(segment))
    }

    /// Place `value` at `path`, creating intermediate mappings
    ///
    /// A non-mapping node on the way is replaced by a mapping.
    pub fn insert_path(&mut self, path: &FieldPath, value: Self) {
        insert_segments(self, path.segments(), value);
    }

    /// Take the node at `path` out of its mapping
    ///
    /// Returns `None` when nothing is there. The root itself cannot be removed.
    pub fn remove_path(&mut self, path: &FieldPath) -> Option<Self> {
        let (last, parents) = path.segments().split_last()?;
        let mut node = self;
        for segment in parents {
            node = match node {
                Self::Mapping(fields) => fields.get_mut(segment)?,
                _ => return None,
            };
        }
        match node {
            Self::Mapping(fields) => fields.remove(last),
            _ => None,
        }
    }

    /// Build a tree from decoded JSON
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => {
                if let Some(v) = n.as_u64() {
                    Self::UInt(v)
                } else if let Some(v) = n.as_i64() {
                    Self::Int(v)
                } else {
                    Self::Float(n.as_f64().unwrap_or_default())
                }
            }
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Sequence(items.into_iter().map(Self::from_json).collect()),
            Value::Object(fields) => Self::Mapping(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Encode as JSON value
    ///
    /// # Errors
    /// Propagates serializer failures.
    pub fn to_json(&self) -> FormatResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

fn insert_segments(node: &mut CommonFormat, segments: &[String], value: CommonFormat) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };
    if let CommonFormat::Mapping(fields) = node {
        insert_segments(fields.entry(head.clone()).or_default(), rest, value);
    } else {
        let mut child = CommonFormat::Null;
        insert_segments(&mut child, rest, value);
        *node = CommonFormat::Mapping(Mapping::from([(head.clone(), child)]));
    }
}

impl Serialize for CommonFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(v) => serializer.serialize_i64(*v),
            Self::UInt(v) => serializer.serialize_u64(*v),
            Self::Float(v) if v.is_finite() => serializer.serialize_f64(*v),
            Self::Float(_) => serializer.serialize_unit(),
            Self::String(s) => serializer.serialize_str(s),
            Self::Sequence(items) => items.serialize(serializer),
            Self::Mapping(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Self::AssetReference(reference) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry(TYPE_KEY, &reference.type_name)?;
                map.serialize_entry(PATH_KEY, &reference.path)?;
                map.end()
            }
            Self::InlineContainer(envelope) => envelope.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for CommonFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_json)
    }
}

impl From<bool> for CommonFormat {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for CommonFormat {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for CommonFormat {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<f64> for CommonFormat {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for CommonFormat {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for CommonFormat {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Mapping> for CommonFormat {
    fn from(value: Mapping) -> Self {
        Self::Mapping(value)
    }
}

impl<T: Into<CommonFormat>> From<Vec<T>> for CommonFormat {
    fn from(value: Vec<T>) -> Self {
        Self::Sequence(value.into_iter().map(Into::into).collect())
    }
}

/// Build a [`Mapping`] node from `key => value` pairs
///
/// ```
/// use flatland_format::{mapping, CommonFormat};
///
/// let tree = mapping! { "Name" => "orc", "Health" => 10_i64 };
/// assert_eq!(tree.as_mapping().map(|m| m.len()), Some(2));
/// ```
#[macro_export]
macro_rules! mapping {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut fields = $crate::Mapping::new();
        $(fields.insert(::std::string::String::from($key), $crate::CommonFormat::from($value));)*
        $crate::CommonFormat::Mapping(fields)
    }};
}
