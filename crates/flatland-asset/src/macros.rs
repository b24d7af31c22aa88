//! The `persistent!` declaration macro

/// Implement [`Persist`](crate::Persist) for a struct by listing its stored fields
///
/// Each entry is a field name, optionally renamed with `as "Key"` and tagged
/// with `: "tags"` (see [`FieldMeta`](crate::FieldMeta)). Fields left out of
/// the list are transient. The type must also implement
/// [`Lifecycle`](crate::Lifecycle), which runs after the fields on default
/// initialization.
///
/// ```rust
/// use flatland_asset::{persistent, Handle, Lifecycle};
///
/// #[derive(Default)]
/// struct Unit {
///     name: String,
///     health: i64,
///     escort: Option<Handle<Unit>>,
///     cached_label: String,
/// }
///
/// persistent!(Unit {
///     name as "Name",
///     health as "Health": "desc:Hit points",
///     escort as "Escort": "inline",
/// });
///
/// impl Lifecycle for Unit {}
/// ```
#[macro_export]
macro_rules! persistent {
    ($ty:ty { $($field:ident $(as $key:literal)? $(: $meta:literal)?),* $(,)? }) => {
        impl $crate::Persist for $ty {
            #[allow(unused_variables)]
            fn to_common(
                &self,
                cx: $crate::ConvertContext<'_>,
            ) -> $crate::AssetResult<$crate::__private::CommonFormat> {
                #[allow(unused_mut)]
                let mut fields = $crate::__private::Mapping::new();
                $(
                    fields.insert(
                        ::std::string::String::from($crate::__persistent_key!($field $(, $key)?)),
                        $crate::Persist::to_common(
                            &self.$field,
                            cx.for_field($crate::FieldMeta::new($crate::__persistent_meta!($($meta)?))),
                        )?,
                    );
                )*
                ::std::result::Result::Ok($crate::__private::CommonFormat::Mapping(fields))
            }

            #[allow(unused_variables)]
            fn from_common(
                &mut self,
                tree: &$crate::__private::CommonFormat,
                cx: $crate::ConvertContext<'_>,
            ) -> $crate::AssetResult<()> {
                let ::std::option::Option::Some(fields) =
                    $crate::ConvertContext::mapping_of(tree, ::std::stringify!($ty))?
                else {
                    return ::std::result::Result::Ok(());
                };
                $(
                    let key = $crate::__persistent_key!($field $(, $key)?);
                    match fields.get(key) {
                        ::std::option::Option::Some(value) => $crate::Persist::from_common(
                            &mut self.$field,
                            value,
                            cx.for_field($crate::FieldMeta::new($crate::__persistent_meta!($($meta)?))),
                        )?,
                        ::std::option::Option::None => $crate::__private::tracing::trace!(
                            field = key,
                            "field absent from tree, keeping current value"
                        ),
                    }
                )*
                ::std::result::Result::Ok(())
            }

            fn walk_default_init(&mut self, _field: $crate::FieldMeta) {
                $(
                    $crate::Persist::walk_default_init(
                        &mut self.$field,
                        $crate::FieldMeta::new($crate::__persistent_meta!($($meta)?)),
                    );
                )*
                $crate::Lifecycle::default_initialize(self);
            }

            fn field_info(&self) -> ::std::vec::Vec<$crate::FieldInfo> {
                ::std::vec![$(
                    $crate::FieldInfo {
                        name: $crate::__persistent_key!($field $(, $key)?),
                        meta: $crate::FieldMeta::new($crate::__persistent_meta!($($meta)?)),
                    }
                ),*]
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __persistent_key {
    ($field:ident) => {
        ::std::stringify!($field)
    };
    ($field:ident, $key:literal) => {
        $key
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __persistent_meta {
    () => {
        ""
    };
    ($meta:literal) => {
        $meta
    };
}
