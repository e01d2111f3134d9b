use serde::Serialize;
use serde_json::{json, Value};
use softhaus::prelude::*;

#[test]
fn orphans_are_dropped() {
    let flat = json!([
        {"id": 1, "parent_id": 0},
        {"id": 2, "parent_id": 1},
        {"id": 3, "parent_id": 99},
    ]);

    let tree = list_to_tree_value(flat, &TreeOptions::default()).expect("list input");
    assert_eq!(
        tree,
        json!([{"id": 1, "parent_id": 0, "children": [{"id": 2, "parent_id": 1}]}])
    );
}

#[test]
fn empty_input_gives_empty_forest() {
    let tree = list_to_tree_value(json!([]), &TreeOptions::default()).expect("list input");
    assert_eq!(tree, json!([]));
}

#[test]
fn custom_keys_and_root() {
    let flat = json!([
        {"key": "10", "up": null, "label": "top"},
        {"key": 11, "up": "10", "label": "a"},
        {"key": 12, "up": 10, "label": "b"},
        {"key": 13, "up": 11, "label": "a.1"},
    ]);
    let options = TreeOptions::default()
        .root_id(Value::Null)
        .id_key("key")
        .parent_key("up")
        .children_key("nodes");

    let tree = list_to_tree_value(flat, &options).expect("list input");
    assert_eq!(tree[0]["label"], json!("top"));
    assert_eq!(tree[0]["nodes"][0]["label"], json!("a"));
    assert_eq!(tree[0]["nodes"][1]["label"], json!("b"));
    assert_eq!(tree[0]["nodes"][0]["nodes"][0]["label"], json!("a.1"));
    assert!(tree[0]["nodes"][1].get("nodes").is_none());
}

#[test]
fn non_list_input_is_rejected() {
    assert!(matches!(
        list_to_tree_value(json!({"id": 1}), &TreeOptions::default()),
        Err(ConvertError::NotAList(_))
    ));
}

#[derive(Serialize)]
struct Menu {
    title: &'static str,
    entries: Vec<MenuEntry>,
}

#[derive(Serialize)]
struct MenuEntry {
    id: u32,
    parent_id: u32,
    label: &'static str,
}

#[test]
fn object_to_array_feeds_list_to_tree() {
    let menu = Menu {
        title: "main",
        entries: vec![
            MenuEntry { id: 1, parent_id: 0, label: "file" },
            MenuEntry { id: 2, parent_id: 1, label: "open" },
            MenuEntry { id: 3, parent_id: 0, label: "edit" },
        ],
    };

    let plain = object_to_array(&menu).expect("serializable");
    assert_eq!(object_to_array(&plain).expect("serializable"), plain);

    let tree = list_to_tree_value(plain["entries"].clone(), &TreeOptions::default())
        .expect("list input");
    let labels: Vec<&Value> = tree
        .as_array()
        .expect("array")
        .iter()
        .map(|node| &node["label"])
        .collect();
    assert_eq!(labels, [&json!("file"), &json!("edit")]);
    assert_eq!(tree[0]["children"][0]["label"], json!("open"));
}
