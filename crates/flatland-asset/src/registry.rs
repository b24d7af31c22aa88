//! Type registry
//!
//! Maps the type names written in envelopes to factories for the matching
//! Rust types, and records which capability markers each type carries.

use crate::asset::{short_type_name, type_name_of, Asset, AssetHandle};
use crate::meta::FieldMeta;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

type Allocate = dyn Fn() -> AssetHandle + Send + Sync;

/// Everything the store needs to create and identify a registered type
#[derive(Clone)]
pub struct AssetDescriptor {
    name: &'static str,
    type_id: TypeId,
    capabilities: Vec<TypeId>,
    allocate: Arc<Allocate>,
}

impl AssetDescriptor {
    pub(crate) fn new<T: Asset>(factory: fn() -> T) -> Self {
        Self {
            name: type_name_of::<T>(),
            type_id: TypeId::of::<T>(),
            capabilities: Vec::new(),
            allocate: Arc::new(move || AssetHandle::new(factory())),
        }
    }

    /// Name written in envelopes: the fully qualified Rust type path
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path
    #[inline]
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        short_type_name(self.name)
    }

    #[inline]
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// True if the type is `type_id` or carries it as a capability
    #[must_use]
    pub fn matches(&self, type_id: TypeId) -> bool {
        self.type_id == type_id || self.capabilities.contains(&type_id)
    }

    /// Fresh, default-initialized instance
    #[must_use]
    pub fn create(&self) -> AssetHandle {
        let handle = (self.allocate)();
        handle.write().walk_default_init(FieldMeta::NONE);
        handle
    }

    /// Fresh instance straight from the factory, no initializers run
    #[must_use]
    pub fn allocate(&self) -> AssetHandle {
        (self.allocate)()
    }

    fn add_capability(&mut self, capability: TypeId) {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
    }
}

impl Debug for AssetDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetDescriptor")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities.len())
            .finish()
    }
}

/// Registered descriptors, indexed by name and kept sorted by display name
#[derive(Debug, Default)]
pub struct TypeRegistry {
    by_name: HashMap<&'static str, Arc<AssetDescriptor>>,
    sorted: Vec<Arc<AssetDescriptor>>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type with its factory, replacing any earlier registration
    pub fn register<T: Asset>(&mut self, factory: fn() -> T) -> Arc<AssetDescriptor> {
        let descriptor = AssetDescriptor::new(factory);
        if self.by_name.contains_key(descriptor.name) {
            tracing::debug!(name = descriptor.name, "asset type registered again");
        }
        self.insert(descriptor)
    }

    /// Tag a registered type with capability `C`
    ///
    /// Returns false when `T` is not registered.
    pub fn add_capability<T: Asset, C: ?Sized + 'static>(&mut self) -> bool {
        let Some(existing) = self.by_name.get(type_name_of::<T>()) else {
            return false;
        };
        let mut updated = AssetDescriptor::clone(existing);
        updated.add_capability(TypeId::of::<C>());
        self.insert(updated);
        true
    }

    fn insert(&mut self, descriptor: AssetDescriptor) -> Arc<AssetDescriptor> {
        let descriptor = Arc::new(descriptor);
        self.by_name.insert(descriptor.name, Arc::clone(&descriptor));
        self.sorted.retain(|d| d.name != descriptor.name);
        let key = (descriptor.display_name(), descriptor.name);
        let idx = self
            .sorted
            .partition_point(|d| (d.display_name(), d.name) < key);
        self.sorted.insert(idx, Arc::clone(&descriptor));
        descriptor
    }

    /// Descriptor registered under `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<AssetDescriptor>> {
        self.by_name.get(name).cloned()
    }

    /// All descriptors, sorted by display name then full name
    #[must_use]
    pub fn descriptors(&self) -> &[Arc<AssetDescriptor>] {
        &self.sorted
    }

    /// Descriptors whose type is `type_id` or carries it as a capability
    #[must_use]
    pub fn matching(&self, type_id: TypeId) -> Vec<Arc<AssetDescriptor>> {
        self.sorted
            .iter()
            .filter(|d| d.matches(type_id))
            .cloned()
            .collect()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Lifecycle;
    use crate::persistent;

    trait Drawable {}

    #[derive(Debug, Default)]
    struct Sprite {
        frames: u32,
        initialized: u32,
    }

    persistent!(Sprite { frames });

    impl Lifecycle for Sprite {
        fn default_initialize(&mut self) {
            self.initialized += 1;
        }
    }

    #[derive(Debug, Default)]
    struct Anim;

    persistent!(Anim {});

    impl Lifecycle for Anim {}

    #[test]
    fn descriptors_sorted_by_name() {
        let mut registry = TypeRegistry::new();
        registry.register(Sprite::default);
        registry.register(Anim::default);

        let names: Vec<_> = registry
            .descriptors()
            .iter()
            .map(|d| d.display_name())
            .collect();
        assert_eq!(names, vec!["Anim", "Sprite"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn reregistering_replaces() {
        let mut registry = TypeRegistry::new();
        registry.register(Sprite::default);
        registry.register(|| Sprite { frames: 4, initialized: 0 });
        assert_eq!(registry.len(), 1);

        let handle = registry.get(type_name_of::<Sprite>()).unwrap().allocate();
        assert_eq!(handle.downcast::<Sprite>().unwrap().read().frames, 4);
    }

    #[test]
    fn create_runs_initializers_allocate_does_not() {
        let mut registry = TypeRegistry::new();
        let descriptor = registry.register(Sprite::default);

        let created = descriptor.create().downcast::<Sprite>().unwrap();
        assert_eq!(created.read().initialized, 1);

        let raw = descriptor.allocate().downcast::<Sprite>().unwrap();
        assert_eq!(raw.read().initialized, 0);
    }

    #[test]
    fn capabilities_match() {
        let mut registry = TypeRegistry::new();
        registry.register(Sprite::default);
        registry.register(Anim::default);
        assert!(registry.add_capability::<Sprite, dyn Drawable>());

        let drawable: Vec<_> = registry
            .matching(TypeId::of::<dyn Drawable>())
            .iter()
            .map(|d| d.display_name())
            .collect();
        assert_eq!(drawable, vec!["Sprite"]);
        assert_eq!(registry.matching(TypeId::of::<Anim>()).len(), 1);
    }

    mod one {
        use crate::asset::Lifecycle;
        use crate::persistent;

        #[derive(Debug, Default)]
        pub(super) struct Item {
            pub(super) level: i64,
        }

        persistent!(Item { level });

        impl Lifecycle for Item {}
    }

    mod two {
        use crate::asset::Lifecycle;
        use crate::persistent;

        #[derive(Debug, Default)]
        pub(super) struct Item {
            pub(super) label: String,
        }

        persistent!(Item { label });

        impl Lifecycle for Item {}
    }

    #[test]
    fn same_identifier_in_two_modules_registers_twice() {
        let mut registry = TypeRegistry::new();
        let first = registry.register(one::Item::default);
        let second = registry.register(two::Item::default);
        assert_eq!(registry.len(), 2);
        assert_ne!(first.name(), second.name());
        assert_eq!(first.display_name(), second.display_name());

        let found = registry.get(type_name_of::<one::Item>()).unwrap();
        assert!(found.allocate().is::<one::Item>());
        let found = registry.get(type_name_of::<two::Item>()).unwrap();
        assert!(found.allocate().is::<two::Item>());
    }

    #[test]
    fn capability_for_unregistered_type() {
        let mut registry = TypeRegistry::new();
        assert!(!registry.add_capability::<Sprite, dyn Drawable>());
    }
}
