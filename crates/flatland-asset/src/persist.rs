//! Conversion between live values and the common format
//!
//! [`Persist`] is implemented for scalars, strings, byte buffers, sequences,
//! string-keyed maps and asset pointers. Structs get an implementation from
//! [`crate::persistent!`], which lists the fields that are stored; anything
//! not listed is transient.

use crate::asset::{Asset, AssetHandle, Handle};
use crate::error::{AssetError, AssetResult};
use crate::meta::{FieldInfo, FieldMeta};
use crate::store::Store;
use flatland_format::{AssetPath, Bytes, CommonFormat, Mapping, OverrideSet};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

/// Two-way conversion to the common format
pub trait Persist {
    /// Full tree for this value
    ///
    /// # Errors
    /// Fails when a pointer target cannot be converted.
    fn to_common(&self, cx: ConvertContext<'_>) -> AssetResult<CommonFormat>;

    /// Apply a (possibly partial) tree onto this value
    ///
    /// Mapping keys missing from `tree` leave the matching fields untouched.
    ///
    /// # Errors
    /// Returns [`AssetError::MalformedWireData`] when the tree does not fit.
    fn from_common(&mut self, tree: &CommonFormat, cx: ConvertContext<'_>) -> AssetResult<()>;

    /// Run default initializers below this value, then on it
    fn walk_default_init(&mut self, _field: FieldMeta) {}

    /// Persisted fields, for editors
    fn field_info(&self) -> Vec<FieldInfo> {
        Vec::new()
    }
}

/// Parent edges and pins of every object written by one save
///
/// Filled while envelopes are built and recorded once the write succeeds.
pub(crate) type SavedPins = RefCell<Vec<(AssetHandle, AssetPath, Option<OverrideSet>)>>;

/// State threaded through a conversion
#[derive(Clone, Copy)]
pub struct ConvertContext<'a> {
    store: &'a Store,
    field: FieldMeta,
    saved_pins: Option<&'a SavedPins>,
}

impl<'a> ConvertContext<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self {
            store,
            field: FieldMeta::NONE,
            saved_pins: None,
        }
    }

    /// Context for a save, collecting the pins of every envelope it builds
    pub(crate) fn saving(store: &'a Store, pins: &'a SavedPins) -> Self {
        Self {
            saved_pins: Some(pins),
            ..Self::new(store)
        }
    }

    pub(crate) fn saved_pins(&self) -> Option<&'a SavedPins> {
        self.saved_pins
    }

    /// Context for converting the named field of the current value
    #[inline]
    #[must_use]
    pub fn for_field(self, field: FieldMeta) -> Self {
        Self { field, ..self }
    }

    /// Metadata of the field being converted
    #[inline]
    #[must_use]
    pub fn field(&self) -> FieldMeta {
        self.field
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &'a Store {
        self.store
    }

    /// Mapping fields of `tree`, `None` for null
    ///
    /// # Errors
    /// Returns [`AssetError::MalformedWireData`] for any other node.
    pub fn mapping_of<'t>(tree: &'t CommonFormat, what: &str) -> AssetResult<Option<&'t Mapping>> {
        match tree {
            CommonFormat::Mapping(fields) => Ok(Some(fields)),
            CommonFormat::Null => Ok(None),
            other => Err(mismatch(what, other)),
        }
    }

    fn pointer_to_common(&self, target: &AssetHandle) -> AssetResult<CommonFormat> {
        self.store.pointer_to_common(target, *self)
    }

    fn pointer_from_common(
        &self,
        tree: &CommonFormat,
        existing: Option<AssetHandle>,
    ) -> AssetResult<Option<AssetHandle>> {
        self.store.pointer_from_common(tree, existing, self.field)
    }
}

fn mismatch(expected: &str, found: &CommonFormat) -> AssetError {
    AssetError::malformed(format!("expected {expected}, found {}", found.kind()))
}

/// A number that does not fit `expected`, or a mismatch for non-numbers
fn out_of_range(expected: &str, found: &CommonFormat) -> AssetError {
    let value = match found {
        CommonFormat::Int(v) => v.to_string(),
        CommonFormat::UInt(v) => v.to_string(),
        CommonFormat::Float(v) => v.to_string(),
        other => return mismatch(expected, other),
    };
    AssetError::malformed(format!("{value} is out of range for {expected}"))
}

impl Persist for bool {
    fn to_common(&self, _cx: ConvertContext<'_>) -> AssetResult<CommonFormat> {
        Ok(CommonFormat::Bool(*self))
    }

    fn from_common(&mut self, tree: &CommonFormat, _cx: ConvertContext<'_>) -> AssetResult<()> {
        *self = match tree {
            CommonFormat::Bool(b) => *b,
            CommonFormat::Null => false,
            other => return Err(mismatch("bool", other)),
        };
        Ok(())
    }
}

macro_rules! persist_integer {
    ($variant:ident, $wide:ty, $read:ident; $($ty:ty),*) => {$(
        impl Persist for $ty {
            #[allow(clippy::unnecessary_fallible_conversions)]
            fn to_common(&self, _cx: ConvertContext<'_>) -> AssetResult<CommonFormat> {
                <$wide>::try_from(*self).map(CommonFormat::$variant).map_err(|_| {
                    AssetError::malformed(format!("{self} does not fit a stored {}", stringify!($wide)))
                })
            }

            #[allow(clippy::unnecessary_fallible_conversions)]
            fn from_common(&mut self, tree: &CommonFormat, _cx: ConvertContext<'_>) -> AssetResult<()> {
                *self = match tree {
                    CommonFormat::Null => 0,
                    other => other
                        .$read()
                        .and_then(|wide| <$ty>::try_from(wide).ok())
                        .ok_or_else(|| out_of_range(stringify!($ty), other))?,
                };
                Ok(())
            }
        }
    )*};
}

persist_integer!(Int, i64, as_i64; i8, i16, i32, i64, isize);
persist_integer!(UInt, u64, as_u64; u8, u16, u32, u64, usize);

impl Persist for f64 {
    fn to_common(&self, _cx: ConvertContext<'_>) -> AssetResult<CommonFormat> {
        Ok(CommonFormat::Float(*self))
    }

    fn from_common(&mut self, tree: &CommonFormat, _cx: ConvertContext<'_>) -> AssetResult<()> {
        *self = match tree {
            CommonFormat::Null => 0.0,
            other => other.as_f64().ok_or_else(|| mismatch("f64", other))?,
        };
        Ok(())
    }
}

impl Persist for f32 {
    fn to_common(&self, _cx: ConvertContext<'_>) -> AssetResult<CommonFormat> {
        Ok(CommonFormat::Float(f64::from(*self)))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_common(&mut self, tree: &CommonFormat, _cx: ConvertContext<'_>) -> AssetResult<()> {
        *self = match tree {
            CommonFormat::Null => 0.0,
            other => {
                let wide = other.as_f64().ok_or_else(|| mismatch("f32", other))?;
                if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
                    return Err(out_of_range("f32", other));
                }
                wide as f32
            }
        };
        Ok(())
    }
}

impl Persist for String {
    fn to_common(&self, _cx: ConvertContext<'_>) -> AssetResult<CommonFormat> {
        Ok(CommonFormat::String(self.clone()))
    }

    fn from_common(&mut self, tree: &CommonFormat, _cx: ConvertContext<'_>) -> AssetResult<()> {
        match tree {
            CommonFormat::String(s) => s.clone_into(self),
            CommonFormat::Null => self.clear(),
            other => return Err(mismatch("string", other)),
        }
        Ok(())
    }
}

impl Persist for AssetPath {
    fn to_common(&self, _cx: ConvertContext<'_>) -> AssetResult<CommonFormat> {
        Ok(CommonFormat::String(self.as_str().to_owned()))
    }

    fn from_common(&mut self, tree: &CommonFormat, _cx: ConvertContext<'_>) -> AssetResult<()> {
        *self = match tree {
            CommonFormat::String(s) => AssetPath::new(s.clone()),
            CommonFormat::Null => AssetPath::default(),
            other => return Err(mismatch("asset path", other)),
        };
        Ok(())
    }
}

impl Persist for Bytes {
    fn to_common(&self, _cx: ConvertContext<'_>) -> AssetResult<CommonFormat> {
        Ok(CommonFormat::String(self.encode()))
    }

    fn from_common(&mut self, tree: &CommonFormat, _cx: ConvertContext<'_>) -> AssetResult<()> {
        *self = match tree {
            CommonFormat::String(text) => Bytes::decode(text)?,
            CommonFormat::Null => Bytes::default(),
            other => return Err(mismatch("base64 string", other)),
        };
        Ok(())
    }
}

impl<T: Persist + Default> Persist for Vec<T> {
    fn to_common(&self, cx: ConvertContext<'_>) -> AssetResult<CommonFormat> {
        self.iter()
            .map(|item| item.to_common(cx))
            .collect::<AssetResult<Vec<_>>>()
            .map(CommonFormat::Sequence)
    }

    /// Resizes to the tree's length; surviving elements are updated in place
    /// so inline sub-assets keep their identity.
    fn from_common(&mut self, tree: &CommonFormat, cx: ConvertContext<'_>) -> AssetResult<()> {
        match tree {
            CommonFormat::Sequence(items) => {
                self.truncate(items.len());
                self.resize_with(items.len(), T::default);
                for (slot, item) in self.iter_mut().zip(items) {
                    slot.from_common(item, cx)?;
                }
            }
            CommonFormat::Null => self.clear(),
            other => return Err(mismatch("sequence", other)),
        }
        Ok(())
    }

    fn walk_default_init(&mut self, field: FieldMeta) {
        for item in self {
            item.walk_default_init(field);
        }
    }
}

impl<T: Persist + Default, const N: usize> Persist for [T; N] {
    fn to_common(&self, cx: ConvertContext<'_>) -> AssetResult<CommonFormat> {
        self.iter()
            .map(|item| item.to_common(cx))
            .collect::<AssetResult<Vec<_>>>()
            .map(CommonFormat::Sequence)
    }

    fn from_common(&mut self, tree: &CommonFormat, cx: ConvertContext<'_>) -> AssetResult<()> {
        match tree {
            CommonFormat::Sequence(items) if items.len() == N => {
                for (slot, item) in self.iter_mut().zip(items) {
                    slot.from_common(item, cx)?;
                }
            }
            CommonFormat::Sequence(items) => {
                return Err(AssetError::malformed(format!(
                    "expected {N} elements, found {}",
                    items.len()
                )))
            }
            CommonFormat::Null => self.iter_mut().for_each(|slot| *slot = T::default()),
            other => return Err(mismatch("sequence", other)),
        }
        Ok(())
    }

    fn walk_default_init(&mut self, field: FieldMeta) {
        for item in self {
            item.walk_default_init(field);
        }
    }
}

macro_rules! persist_string_map {
    ($map:ident) => {
        impl<T: Persist + Default> Persist for $map<String, T> {
            fn to_common(&self, cx: ConvertContext<'_>) -> AssetResult<CommonFormat> {
                self.iter()
                    .map(|(key, value)| Ok((key.clone(), value.to_common(cx)?)))
                    .collect::<AssetResult<Mapping>>()
                    .map(CommonFormat::Mapping)
            }

            /// The tree holds the whole map: keys it lacks are removed and
            /// values under kept keys are updated in place.
            fn from_common(&mut self, tree: &CommonFormat, cx: ConvertContext<'_>) -> AssetResult<()> {
                let Some(fields) = ConvertContext::mapping_of(tree, "mapping")? else {
                    self.clear();
                    return Ok(());
                };
                self.retain(|key, _| fields.contains_key(key));
                for (key, value) in fields {
                    self.entry(key.clone()).or_default().from_common(value, cx)?;
                }
                Ok(())
            }

            fn walk_default_init(&mut self, field: FieldMeta) {
                for value in self.values_mut() {
                    value.walk_default_init(field);
                }
            }
        }
    };
}

persist_string_map!(BTreeMap);
persist_string_map!(HashMap);

impl<T: Asset> Persist for Option<Handle<T>> {
    fn to_common(&self, cx: ConvertContext<'_>) -> AssetResult<CommonFormat> {
        match self {
            Some(handle) => cx.pointer_to_common(&handle.erase()),
            None => Ok(CommonFormat::Null),
        }
    }

    fn from_common(&mut self, tree: &CommonFormat, cx: ConvertContext<'_>) -> AssetResult<()> {
        let existing = self.as_ref().map(Handle::erase);
        *self = match cx.pointer_from_common(tree, existing)? {
            Some(handle) => Some(handle.downcast::<T>().ok_or_else(|| {
                AssetError::type_mismatch(crate::asset::type_name_of::<T>(), handle.type_name())
            })?),
            None => None,
        };
        Ok(())
    }

    fn walk_default_init(&mut self, field: FieldMeta) {
        match self {
            Some(handle) if field.is_inline() => handle.write().walk_default_init(FieldMeta::NONE),
            _ => {}
        }
    }
}

impl Persist for Option<AssetHandle> {
    fn to_common(&self, cx: ConvertContext<'_>) -> AssetResult<CommonFormat> {
        match self {
            Some(handle) => cx.pointer_to_common(handle),
            None => Ok(CommonFormat::Null),
        }
    }

    fn from_common(&mut self, tree: &CommonFormat, cx: ConvertContext<'_>) -> AssetResult<()> {
        *self = cx.pointer_from_common(tree, self.clone())?;
        Ok(())
    }

    fn walk_default_init(&mut self, field: FieldMeta) {
        match self {
            Some(handle) if field.is_inline() => handle.write().walk_default_init(FieldMeta::NONE),
            _ => {}
        }
    }
}
