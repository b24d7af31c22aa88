//! Pointer fields: references to pathed assets, inline sub-assets, and the
//! guards against loops through either.

use flatland_asset::{AssetError, Handle, LoadOptions, StoreConfig};
use flatland_test_utils::{Leaf, Node, Sprite, Squad, TestParent, TestStore};
use pretty_assertions::assert_eq;
use serde_json::json;

fn leaf(name: &str) -> Handle<Leaf> {
    Handle::new(Leaf {
        second_name: name.to_owned(),
    })
}

#[test]
fn reference_is_saved_as_type_and_path() {
    let t = TestStore::new();
    let target = leaf("target");
    t.store.save("leaf", &target).unwrap();

    let node = Handle::new(Node {
        name: "node".into(),
        inline: Leaf {
            second_name: "inline".into(),
        },
        reference: Some(target),
    });
    t.store.save("node", &node).unwrap();

    assert_eq!(
        t.read_json("node.json")["Inner"],
        json!({
            "Inline": { "SecondName": "inline" },
            "Name": "node",
            "Reference": { "Type": "flatland_test_utils::Leaf", "Path": "leaf.json" }
        })
    );
}

#[test]
fn loaded_reference_is_the_cached_target() {
    let t = TestStore::new();
    t.write("leaf.json", r#"{"Type":"flatland_test_utils::Leaf","Inner":{"SecondName":"target"}}"#);
    t.write(
        "node.json",
        r#"{"Type":"flatland_test_utils::Node","Inner":{"Name":"n","Reference":{"Type":"flatland_test_utils::Leaf","Path":"leaf.json"}}}"#,
    );

    let node = t.store.load_as::<Node>("node.json").unwrap();
    let reference = node.read().reference.clone().unwrap();
    assert_eq!(reference.read().second_name, "target");

    let direct = t.store.load_as::<Leaf>("leaf.json").unwrap();
    assert!(direct.ptr_eq(&reference));
}

#[test]
fn reference_to_unsaved_asset_is_dropped() {
    let t = TestStore::new();
    let node = Handle::new(Node {
        name: "n".into(),
        inline: Leaf::default(),
        reference: Some(leaf("floating")),
    });
    t.store.save("node", &node).unwrap();
    assert_eq!(t.read_json("node.json")["Inner"], json!({ "Name": "n" }));
}

#[test]
fn inline_sub_asset_round_trips_as_embedded_envelope() {
    let t = TestStore::new();
    let squad = Handle::new(Squad {
        leader: Some(Handle::new(TestParent::new("boss", "loud"))),
        ..Squad::default()
    });
    t.store.save("squad", &squad).unwrap();
    assert_eq!(
        t.read_json("squad.json")["Inner"],
        json!({
            "Leader": {
                "Type": "flatland_test_utils::TestParent",
                "Parent": "",
                "Inner": { "StrA": "boss", "StrB": "loud" }
            }
        })
    );

    t.reset();
    let loaded = t.store.load_as::<Squad>("squad.json").unwrap();
    let leader = loaded.read().leader.clone().unwrap();
    assert_eq!(leader.read().str_a, "boss");
    assert_eq!(leader.read().post_loads, 1);
    assert_eq!(t.store.path_of(&leader), None);
}

#[test]
fn untyped_reference_keeps_the_concrete_type() {
    let t = TestStore::new();
    let flag = leaf("flag");
    t.store.save("flag", &flag).unwrap();
    let member = Handle::new(TestParent::new("m", ""));
    t.store.save("member", &member).unwrap();

    let squad = Handle::new(Squad {
        banner: Some(flag.erase()),
        members: vec![Some(member), None],
        ..Squad::default()
    });
    t.store.save("squad", &squad).unwrap();
    assert_eq!(
        t.read_json("squad.json")["Inner"],
        json!({
            "Banner": { "Type": "flatland_test_utils::Leaf", "Path": "flag.json" },
            "Members": [{ "Type": "flatland_test_utils::TestParent", "Path": "member.json" }, null]
        })
    );

    t.reset();
    let loaded = t.store.load_as::<Squad>("squad.json").unwrap();
    let loaded = loaded.read();
    let banner = loaded.banner.clone().unwrap();
    assert!(banner.is::<Leaf>());
    assert_eq!(banner.type_name(), "flatland_test_utils::Leaf");
    assert_eq!(loaded.members.len(), 2);
    assert!(loaded.members[1].is_none());
    assert_eq!(loaded.members[0].as_ref().unwrap().read().str_a, "m");
}

#[test]
fn reference_type_must_match_the_target_file() {
    let t = TestStore::new();
    t.write("leaf.json", r#"{"Type":"flatland_test_utils::Leaf","Inner":{"SecondName":"x"}}"#);
    t.write(
        "node.json",
        r#"{"Type":"flatland_test_utils::Node","Inner":{"Reference":{"Type":"flatland_test_utils::TestParent","Path":"leaf.json"}}}"#,
    );

    let err = t.store.load("node.json").unwrap_err();
    assert!(matches!(
        err,
        AssetError::TypeMismatch { ref expected, ref found } if expected == "flatland_test_utils::TestParent"
            && found == "flatland_test_utils::Leaf"
    ));
    assert!(!t.store.is_loaded("node.json"));
}

#[test]
fn forced_reload_updates_inline_sub_assets_in_place() {
    let t = TestStore::new();
    t.write(
        "squad.json",
        r#"{"Type":"flatland_test_utils::Squad","Inner":{"Leader":{"Type":"flatland_test_utils::TestParent","Inner":{"StrA":"old"}}}}"#,
    );
    let squad = t.store.load_as::<Squad>("squad.json").unwrap();
    let leader = squad.read().leader.clone().unwrap();

    t.write(
        "squad.json",
        r#"{"Type":"flatland_test_utils::Squad","Inner":{"Leader":{"Type":"flatland_test_utils::TestParent","Inner":{"StrA":"new"}}}}"#,
    );
    t.store
        .load_with_options("squad.json", LoadOptions::new().with_force_reload(true))
        .unwrap();

    let reloaded = squad.read().leader.clone().unwrap();
    assert!(reloaded.ptr_eq(&leader));
    assert_eq!(leader.read().str_a, "new");
}

#[test]
fn parent_cycle_in_files_is_reported() {
    let t = TestStore::new();
    t.write("a.json", r#"{"Type":"flatland_test_utils::TestParent","Parent":"b.json"}"#);
    t.write("b.json", r#"{"Type":"flatland_test_utils::TestParent","Parent":"a.json"}"#);

    assert!(matches!(t.store.load("a.json"), Err(AssetError::Cycle { .. })));
    assert!(!t.store.is_loaded("a.json"));

    t.write("ok.json", r#"{"Type":"flatland_test_utils::TestParent","Inner":{"StrA":"fine"}}"#);
    let ok = t.store.load_as::<TestParent>("ok.json").unwrap();
    assert_eq!(ok.read().str_a, "fine");
}

#[test]
fn self_reference_is_reported_as_a_cycle() {
    let t = TestStore::new();
    t.write(
        "squad.json",
        r#"{"Type":"flatland_test_utils::Squad","Inner":{"Banner":{"Type":"flatland_test_utils::Squad","Path":"squad.json"}}}"#,
    );
    assert!(matches!(t.store.load("squad.json"), Err(AssetError::Cycle { .. })));
}

#[test]
fn deep_parent_chains_hit_the_depth_limit() {
    let t = TestStore::with_config(StoreConfig::default().with_max_depth(2));
    t.write("a.json", r#"{"Type":"flatland_test_utils::TestParent","Inner":{"StrA":"root"}}"#);
    t.write("b.json", r#"{"Type":"flatland_test_utils::TestParent","Parent":"a.json"}"#);
    t.write("c.json", r#"{"Type":"flatland_test_utils::TestParent","Parent":"b.json"}"#);

    let b = t.store.load_as::<TestParent>("b.json").unwrap();
    assert_eq!(b.read().str_a, "root");

    t.reset();
    assert!(matches!(
        t.store.load("c.json"),
        Err(AssetError::DepthExceeded { limit: 2, .. })
    ));
}

#[test]
fn new_instance_copies_inline_and_shares_references() {
    let t = TestStore::new();
    let flag = leaf("flag");
    t.store.save("flag", &flag).unwrap();
    let template = Handle::new(Squad {
        leader: Some(Handle::new(TestParent::new("boss", ""))),
        banner: Some(flag.erase()),
        members: Vec::new(),
    });
    t.store.save("template", &template).unwrap();

    let instance = t.store.new_instance_of(&template).unwrap();
    assert!(!instance.ptr_eq(&template));
    assert_eq!(t.store.path_of(&instance), None);

    let instance = instance.read();
    let leader = instance.leader.clone().unwrap();
    assert!(!leader.ptr_eq(template.read().leader.as_ref().unwrap()));
    assert_eq!(leader.read().str_a, "boss");
    assert!(instance.banner.as_ref().unwrap().ptr_eq(&flag.erase()));
}

#[test]
fn new_instance_runs_default_initializers() {
    let t = TestStore::new();
    let template = Handle::new(Sprite {
        frames: 8,
        ..Sprite::default()
    });
    assert!(!template.read().did_init);

    let instance = t.store.new_instance_of(&template).unwrap();
    let instance = instance.read();
    assert_eq!(instance.frames, 8);
    assert!(instance.did_init);
}
