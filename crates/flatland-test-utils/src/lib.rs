//! Testing utilities for the flatland workspace
//!
//! Sample asset types and an in-memory store fixture.

#![allow(missing_docs)]

use flatland_asset::{
    persistent, AssetHandle, Bytes, Handle, Lifecycle, MemoryFileSystem, Store, StoreConfig,
};
use std::collections::BTreeMap;

/// Store backed by one shared in-memory filesystem, readable and writable
pub struct TestStore {
    pub store: Store,
    pub fs: MemoryFileSystem,
}

impl TestStore {
    /// Fresh store with every sample type registered
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        let fs = MemoryFileSystem::new();
        let store = Store::with_config(config);
        register_samples(&store);
        store.register_file_system(fs.clone(), 0);
        store.register_writable_file_system(fs.clone());
        Self { store, fs }
    }

    /// Put raw text in the filesystem
    pub fn write(&self, path: &str, contents: &str) {
        self.fs.insert(path, contents);
    }

    /// Raw text of a stored file
    ///
    /// # Panics
    /// When the file does not exist or is not UTF-8.
    #[must_use]
    pub fn read(&self, path: &str) -> String {
        let bytes = self
            .fs
            .get(path)
            .unwrap_or_else(|| panic!("no file at {path}"));
        String::from_utf8(bytes).expect("stored file is not UTF-8")
    }

    /// Stored file parsed as JSON
    ///
    /// # Panics
    /// When the file does not exist or is not JSON.
    #[must_use]
    pub fn read_json(&self, path: &str) -> serde_json::Value {
        serde_json::from_str(&self.read(path)).expect("stored file is not JSON")
    }

    /// Drop cached objects and edges, keeping types and files
    pub fn reset(&self) {
        self.store.reset();
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Register every sample type on `store`
pub fn register_samples(store: &Store) {
    store.register_asset::<Leaf>();
    store.register_asset::<Node>();
    store.register_asset::<TestParent>();
    store.register_asset::<ChildContainer>();
    store.register_asset::<Nested>();
    store.register_asset::<Sprite>();
    store.register_asset::<Squad>();
    store.register_asset::<Table>();
}

/// Downcast an erased handle in a test
///
/// # Panics
/// When the handle holds another type.
#[must_use]
pub fn typed<T: flatland_asset::Asset>(handle: &AssetHandle) -> Handle<T> {
    handle
        .downcast::<T>()
        .unwrap_or_else(|| panic!("expected {}, found {}", std::any::type_name::<T>(), handle.type_name()))
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Leaf {
    pub second_name: String,
}

persistent!(Leaf { second_name as "SecondName" });

impl Lifecycle for Leaf {}

/// Value, inline-by-value and by-reference members
#[derive(Debug, Default)]
pub struct Node {
    pub name: String,
    pub inline: Leaf,
    pub reference: Option<Handle<Leaf>>,
}

persistent!(Node {
    name as "Name",
    inline as "Inline",
    reference as "Reference",
});

impl Lifecycle for Node {}

/// Two-field asset used for parent/child tests
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TestParent {
    pub str_a: String,
    pub str_b: String,
    pub post_loads: u32,
}

persistent!(TestParent { str_a as "StrA", str_b as "StrB" });

impl Lifecycle for TestParent {
    fn post_load(&mut self) {
        self.post_loads += 1;
    }
}

impl TestParent {
    #[must_use]
    pub fn new(str_a: &str, str_b: &str) -> Self {
        Self {
            str_a: str_a.to_owned(),
            str_b: str_b.to_owned(),
            post_loads: 0,
        }
    }
}

/// Holds parented children inline, the way a level holds its placed objects
#[derive(Debug, Default)]
pub struct ChildContainer {
    pub children: Vec<Option<Handle<TestParent>>>,
}

persistent!(ChildContainer { children as "Children": "inline" });

impl Lifecycle for ChildContainer {}

impl ChildContainer {
    /// Handle of the child at `index`
    ///
    /// # Panics
    /// When there is no child at `index`.
    #[must_use]
    pub fn child(&self, index: usize) -> Handle<TestParent> {
        self.children[index].clone().expect("child slot is empty")
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct NestedInner {
    pub x: i64,
    pub y: i64,
}

persistent!(NestedInner { x as "X", y as "Y" });

impl Lifecycle for NestedInner {}

/// Nested mapping, sequence and numbers, for field-path overrides
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Nested {
    pub title: String,
    pub inner: NestedInner,
    pub values: Vec<i64>,
    pub scale: f64,
}

persistent!(Nested {
    title as "Title",
    inner as "Inner",
    values as "Values",
    scale as "Scale",
});

impl Lifecycle for Nested {}

/// Binary payload plus a designer default applied by the initializer
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Sprite {
    pub data: Bytes,
    pub frames: u32,
    pub did_init: bool,
}

persistent!(Sprite { data as "Data", frames as "Frames": "desc:Animation frame count" });

impl Lifecycle for Sprite {
    fn default_initialize(&mut self) {
        self.did_init = true;
    }
}

/// Polymorphic references and an inline leader
#[derive(Debug, Default)]
pub struct Squad {
    pub leader: Option<Handle<TestParent>>,
    pub banner: Option<AssetHandle>,
    pub members: Vec<Option<Handle<TestParent>>>,
}

persistent!(Squad {
    leader as "Leader": "inline",
    banner as "Banner",
    members as "Members",
});

impl Lifecycle for Squad {}

/// String-keyed map field, for key removal across inheritance
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Table {
    pub label: String,
    pub entries: BTreeMap<String, i64>,
}

impl Table {
    #[must_use]
    pub fn new(entries: &[(&str, i64)]) -> Self {
        Self {
            label: String::new(),
            entries: entries
                .iter()
                .map(|(key, value)| ((*key).to_owned(), *value))
                .collect(),
        }
    }
}

persistent!(Table { label as "Label", entries as "Entries" });

impl Lifecycle for Table {}
