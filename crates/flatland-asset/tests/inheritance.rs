//! Parent/child inheritance, propagation and override pins.
//!
//! The central guarantee: a child stores only what differs from its parent,
//! and saving the parent updates every live child in place except for the
//! fields the child has pinned.

use flatland_asset::{AssetError, FieldPath, Handle};
use flatland_test_utils::{ChildContainer, Nested, NestedInner, Table, TestParent, TestStore};
use pretty_assertions::assert_eq;
use serde_json::json;

fn field(path: &str) -> FieldPath {
    path.parse().unwrap()
}

/// An inline child with a parent is saved as its own diff, reloads with the
/// same pins, and follows later saves of the parent.
#[test]
fn inline_children_inherit_across_save_and_load() {
    let t = TestStore::new();

    {
        let parent = Handle::new(TestParent::new("ParentA", "ParentB"));
        t.store.save("parent.json", &parent).unwrap();

        let child = Handle::new(TestParent::new("ParentA", "ChildB"));
        let container = Handle::new(ChildContainer {
            children: vec![Some(child.clone())],
        });
        t.store.set_parent(&child, &parent).unwrap();

        let overrides = t.store.overrides_of(&child).unwrap();
        assert!(!overrides.contains(&field("StrA")), "matching values are inherited");
        assert!(overrides.contains(&field("StrB")), "differing values are pinned");

        t.store.save("child.json", &container).unwrap();
        assert_eq!(
            t.read_json("child.json"),
            json!({
                "Type": "flatland_test_utils::ChildContainer",
                "Parent": "",
                "Inner": {
                    "Children": [{
                        "Type": "flatland_test_utils::TestParent",
                        "Parent": "parent.json",
                        "Inner": { "StrB": "ChildB" }
                    }]
                }
            })
        );
    }

    t.reset();

    let container = t.store.load_as::<ChildContainer>("child.json").unwrap();
    let child = container.read().child(0);
    assert_eq!(t.store.path_of(&child), None);
    assert_eq!(t.store.parent_of(&child), Some("parent.json".into()));

    let overrides = t.store.overrides_of(&child).unwrap();
    assert!(!overrides.contains(&field("StrA")));
    assert!(overrides.contains(&field("StrB")));
    assert_eq!(child.read().str_a, "ParentA");
    assert_eq!(child.read().str_b, "ChildB");

    let parent = t.store.load_as::<TestParent>("parent.json").unwrap();
    parent.write().str_a = "ChangedParent".into();
    t.store.save("parent.json", &parent).unwrap();

    assert_eq!(child.read().str_a, "ChangedParent");
    assert_eq!(child.read().str_b, "ChildB");
}

#[test]
fn child_file_holds_only_the_diff() {
    let t = TestStore::new();
    let base = Handle::new(TestParent::new("a", "b"));
    t.store.save("base", &base).unwrap();

    let same = Handle::new(TestParent::new("a", "b"));
    t.store.set_parent(&same, &base).unwrap();
    t.store.save("same", &same).unwrap();
    assert_eq!(
        t.read_json("same.json"),
        json!({ "Type": "flatland_test_utils::TestParent", "Parent": "base.json", "Inner": null })
    );

    let derived = Handle::new(TestParent::new("a", "x"));
    t.store.set_parent(&derived, &base).unwrap();
    t.store.save("derived", &derived).unwrap();
    assert_eq!(
        t.read_json("derived.json"),
        json!({ "Type": "flatland_test_utils::TestParent", "Parent": "base.json", "Inner": { "StrB": "x" } })
    );
}

#[test]
fn saving_a_parent_updates_pathed_children() {
    let t = TestStore::new();
    let base = Handle::new(TestParent::new("a", "b"));
    t.store.save("base", &base).unwrap();

    let child = Handle::new(TestParent::new("a", "x"));
    t.store.set_parent(&child, &base).unwrap();
    t.store.save("child", &child).unwrap();

    base.write().str_a = "A2".into();
    base.write().str_b = "B2".into();
    t.store.save("base", &base).unwrap();

    assert_eq!(child.read().str_a, "A2");
    assert_eq!(child.read().str_b, "x");
}

/// Fields a child file stores stay the child's after the parent is saved,
/// even when they were edited after the parent was set.
#[test]
fn saved_child_fields_survive_parent_save() {
    let t = TestStore::new();
    let parent = Handle::new(TestParent::new("a", "b"));
    t.store.save("parent", &parent).unwrap();

    let child = Handle::new(TestParent::new("a", "b"));
    t.store.set_parent(&child, &parent).unwrap();
    assert_eq!(t.store.overrides_of(&child), None);

    child.write().str_b = "mine".into();
    t.store.save("child", &child).unwrap();
    assert_eq!(t.read_json("child.json")["Inner"], json!({ "StrB": "mine" }));
    assert!(t.store.overrides_of(&child).unwrap().contains(&field("StrB")));

    parent.write().str_a = "new".into();
    t.store.save("parent", &parent).unwrap();
    assert_eq!(child.read().str_a, "new");
    assert_eq!(child.read().str_b, "mine");

    t.reset();
    let reloaded = t.store.load_as::<TestParent>("child.json").unwrap();
    assert_eq!(reloaded.read().str_a, "new");
    assert_eq!(reloaded.read().str_b, "mine");
}

#[test]
fn saving_a_field_back_to_the_parent_value_unpins_it() {
    let t = TestStore::new();
    let parent = Handle::new(TestParent::new("a", "b"));
    t.store.save("parent", &parent).unwrap();

    let child = Handle::new(TestParent::new("a", "x"));
    t.store.set_parent(&child, &parent).unwrap();
    assert!(t.store.overrides_of(&child).unwrap().contains(&field("StrB")));

    child.write().str_b = "b".into();
    t.store.save("child", &child).unwrap();
    assert_eq!(t.store.overrides_of(&child), None);

    parent.write().str_b = "b2".into();
    t.store.save("parent", &parent).unwrap();
    assert_eq!(child.read().str_b, "b2");
}

#[test]
fn saving_a_container_pins_its_inline_children() {
    let t = TestStore::new();
    let parent = Handle::new(TestParent::new("a", "b"));
    t.store.save("parent", &parent).unwrap();

    let child = Handle::new(TestParent::new("a", "b"));
    t.store.set_parent(&child, &parent).unwrap();
    let container = Handle::new(ChildContainer {
        children: vec![Some(child.clone())],
    });
    child.write().str_a = "mine".into();
    t.store.save("container", &container).unwrap();
    assert!(t.store.overrides_of(&child).unwrap().contains(&field("StrA")));

    parent.write().str_a = "new".into();
    parent.write().str_b = "nb".into();
    t.store.save("parent", &parent).unwrap();
    assert_eq!(child.read().str_a, "mine");
    assert_eq!(child.read().str_b, "nb");
}

#[test]
fn removed_map_keys_propagate_to_children() {
    let t = TestStore::new();
    let parent = Handle::new(Table::new(&[("a", 1), ("b", 2)]));
    t.store.save("parent", &parent).unwrap();

    let child = Handle::new(Table::new(&[("a", 1), ("b", 2)]));
    t.store.set_parent(&child, &parent).unwrap();
    t.store.save("child", &child).unwrap();

    parent.write().entries.remove("b");
    t.store.save("parent", &parent).unwrap();
    assert_eq!(child.read().entries, Table::new(&[("a", 1)]).entries);

    t.reset();
    let fresh = t.store.load_as::<Table>("child.json").unwrap();
    assert_eq!(fresh.read().entries, Table::new(&[("a", 1)]).entries);
}

#[test]
fn pinned_map_key_survives_until_unpinned() {
    let t = TestStore::new();
    let parent = Handle::new(Table::new(&[("a", 1), ("b", 2)]));
    t.store.save("parent", &parent).unwrap();

    let child = Handle::new(Table::new(&[("a", 1), ("b", 2), ("c", 3)]));
    t.store.set_parent(&child, &parent).unwrap();
    assert!(t.store.overrides_of(&child).unwrap().contains(&field("Entries.c")));

    parent.write().entries.remove("b");
    parent.write().entries.insert("a".into(), 10);
    t.store.save("parent", &parent).unwrap();
    assert_eq!(child.read().entries, Table::new(&[("a", 10), ("c", 3)]).entries);

    child.write().label = "local".into();
    t.store.set_override(&child, "Entries.c", false).unwrap();
    assert_eq!(child.read().entries, Table::new(&[("a", 10)]).entries);
    assert_eq!(child.read().label, "local", "only the unpinned field is copied");
    assert_eq!(t.store.overrides_of(&child), None);
}

#[test]
fn unpinning_below_a_pinned_field_copies_nothing() {
    let t = TestStore::new();
    let base = Handle::new(Nested {
        inner: NestedInner { x: 1, y: 2 },
        ..Nested::default()
    });
    t.store.save("base", &base).unwrap();

    let child = Handle::new(Nested {
        inner: NestedInner { x: 1, y: 2 },
        ..Nested::default()
    });
    t.store.set_parent(&child, &base).unwrap();
    t.store.set_override(&child, "Inner", true).unwrap();
    t.store.set_override(&child, "Inner.X", true).unwrap();
    child.write().inner = NestedInner { x: 7, y: 8 };
    base.write().inner = NestedInner { x: 5, y: 6 };
    t.store.save("base", &base).unwrap();

    t.store.set_override(&child, "Inner.X", false).unwrap();
    assert_eq!(child.read().inner, NestedInner { x: 7, y: 8 });

    t.store.set_override(&child, "Inner", false).unwrap();
    assert_eq!(child.read().inner, NestedInner { x: 5, y: 6 });
}

#[test]
fn propagation_reaches_grandchildren() {
    let t = TestStore::new();
    let base = Handle::new(TestParent::new("a", "b"));
    t.store.save("base", &base).unwrap();

    let mid = Handle::new(TestParent::new("a", "m"));
    t.store.set_parent(&mid, &base).unwrap();
    t.store.save("mid", &mid).unwrap();

    let leaf = Handle::new(TestParent::new("a", "m"));
    t.store.set_parent(&leaf, &mid).unwrap();
    t.store.save("leaf", &leaf).unwrap();
    assert_eq!(t.store.overrides_of(&leaf), None);

    base.write().str_a = "z".into();
    t.store.save("base", &base).unwrap();

    assert_eq!(mid.read().str_a, "z");
    assert_eq!(leaf.read().str_a, "z");
    assert_eq!(leaf.read().str_b, "m");
}

#[test]
fn loaded_child_records_parent_and_stored_fields() {
    let t = TestStore::new();
    t.write("base.json", r#"{"Type":"flatland_test_utils::TestParent","Inner":{"StrA":"a","StrB":"b"}}"#);
    t.write(
        "child.json",
        r#"{"Type":"flatland_test_utils::TestParent","Parent":"base.json","Inner":{"StrB":"c"}}"#,
    );

    let child = t.store.load_as::<TestParent>("child.json").unwrap();
    assert_eq!(child.read().str_a, "a");
    assert_eq!(child.read().str_b, "c");
    assert_eq!(t.store.parent_of(&child), Some("base.json".into()));
    assert!(t.store.is_loaded("base.json"));

    let overrides = t.store.overrides_of(&child).unwrap();
    assert_eq!(overrides.iter().cloned().collect::<Vec<_>>(), vec![field("StrB")]);
}

#[test]
fn zero_value_can_clear_a_parent_value() {
    let t = TestStore::new();
    let base = Handle::new(TestParent::new("a", "b"));
    t.store.save("base", &base).unwrap();

    let child = Handle::new(TestParent::new("a", ""));
    t.store.set_parent(&child, &base).unwrap();
    t.store.save("child", &child).unwrap();
    assert_eq!(t.read_json("child.json")["Inner"], json!({ "StrB": "" }));

    t.reset();
    let child = t.store.load_as::<TestParent>("child.json").unwrap();
    assert_eq!(child.read().str_b, "");
}

#[test]
fn reparenting_keeps_existing_pins() {
    let t = TestStore::new();
    let first = Handle::new(TestParent::new("a1", "b1"));
    let second = Handle::new(TestParent::new("a2", "b2"));
    t.store.save("first", &first).unwrap();
    t.store.save("second", &second).unwrap();

    let child = Handle::new(TestParent::new("a1", "mine"));
    t.store.set_parent(&child, &first).unwrap();
    t.store.set_parent(&child, &second).unwrap();

    assert_eq!(t.store.parent_of(&child), Some("second.json".into()));
    assert_eq!(child.read().str_a, "a2");
    assert_eq!(child.read().str_b, "mine");
}

#[test]
fn parent_must_have_a_path() {
    let t = TestStore::new();
    let parent = Handle::new(TestParent::new("a", "b"));
    let child = Handle::new(TestParent::default());

    let err = t.store.set_parent(&child, &parent).unwrap_err();
    assert!(matches!(err, AssetError::NotLoaded(ref name) if name == "flatland_test_utils::TestParent"));
    assert!(err.is_recoverable());
}

#[test]
fn parent_cycles_are_rejected() {
    let t = TestStore::new();
    let base = Handle::new(TestParent::new("a", "b"));
    t.store.save("base", &base).unwrap();

    assert!(matches!(
        t.store.set_parent(&base, &base),
        Err(AssetError::Cycle { .. })
    ));

    let child = Handle::new(TestParent::new("a", "c"));
    t.store.set_parent(&child, &base).unwrap();
    t.store.save("child", &child).unwrap();
    assert!(matches!(
        t.store.set_parent(&base, &child),
        Err(AssetError::Cycle { .. })
    ));
    assert_eq!(t.store.parent_of(&base), None);
}

#[test]
fn pinned_field_survives_parent_update_until_unpinned() {
    let t = TestStore::new();
    let base = Handle::new(TestParent::new("a", "b"));
    t.store.save("base", &base).unwrap();

    let child = Handle::new(TestParent::new("a", "b"));
    t.store.set_parent(&child, &base).unwrap();
    assert_eq!(t.store.overrides_of(&child), None);

    t.store.set_override(&child, "StrA", true).unwrap();
    child.write().str_a = "mine".into();

    base.write().str_a = "new".into();
    base.write().str_b = "nb".into();
    t.store.save("base", &base).unwrap();
    assert_eq!(child.read().str_a, "mine");
    assert_eq!(child.read().str_b, "nb");

    t.store.set_override(&child, "StrA", false).unwrap();
    assert_eq!(child.read().str_a, "new", "unpinning copies the parent value");
    assert_eq!(t.store.overrides_of(&child), None, "empty set is dropped");
}

#[test]
fn nested_field_paths_pin_single_leaves() {
    let t = TestStore::new();
    let inner = NestedInner { x: 1, y: 2 };
    let base = Handle::new(Nested {
        inner: inner.clone(),
        ..Nested::default()
    });
    t.store.save("base", &base).unwrap();

    let child = Handle::new(Nested {
        inner,
        ..Nested::default()
    });
    t.store.set_parent(&child, &base).unwrap();
    t.store.set_override(&child, "Inner.X", true).unwrap();
    child.write().inner.x = 9;

    base.write().inner = NestedInner { x: 5, y: 6 };
    t.store.save("base", &base).unwrap();
    assert_eq!(child.read().inner, NestedInner { x: 9, y: 6 });
}

#[test]
fn sequences_are_pinned_whole() {
    let t = TestStore::new();
    let base = Handle::new(Nested {
        values: vec![1, 2, 3],
        ..Nested::default()
    });
    t.store.save("base", &base).unwrap();

    let child = Handle::new(Nested {
        values: vec![1, 2, 4],
        ..Nested::default()
    });
    t.store.set_parent(&child, &base).unwrap();
    assert!(t.store.overrides_of(&child).unwrap().contains(&field("Values")));

    base.write().values = vec![7];
    t.store.save("base", &base).unwrap();
    assert_eq!(child.read().values, vec![1, 2, 4]);
}

#[test]
fn invalid_override_path_is_rejected() {
    let t = TestStore::new();
    let child = Handle::new(TestParent::default());
    assert!(matches!(
        t.store.set_override(&child, "A..B", true),
        Err(AssetError::Format(_))
    ));
}
