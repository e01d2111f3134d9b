//! Flat list to tree conversion over JSON records

use crate::errors::ConvertError;
use crate::Row;
use serde_json::Value;
use std::collections::HashMap;

/// Key names and root sentinel for [`list_to_tree`]
#[derive(Debug, Clone, PartialEq)]
pub struct TreeOptions {
    /// Parent value marking a top-level record
    pub root_id: Value,
    pub id_key: String,
    pub parent_key: String,
    pub children_key: String,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            root_id: Value::from(0),
            id_key: "id".to_string(),
            parent_key: "parent_id".to_string(),
            children_key: "children".to_string(),
        }
    }
}

impl TreeOptions {
    pub fn root_id(mut self, root_id: impl Into<Value>) -> Self {
        self.root_id = root_id.into();
        self
    }

    pub fn id_key(mut self, key: impl Into<String>) -> Self {
        self.id_key = key.into();
        self
    }

    pub fn parent_key(mut self, key: impl Into<String>) -> Self {
        self.parent_key = key.into();
        self
    }

    pub fn children_key(mut self, key: impl Into<String>) -> Self {
        self.children_key = key.into();
        self
    }
}

/// Normalized id used for matching parents to records
///
/// Integers, integral floats, booleans and numeric strings compare as
/// integers; a missing or null value equals `0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum NodeKey {
    Int(i64),
    Text(String),
}

impl NodeKey {
    fn of(value: Option<&Value>) -> Option<Self> {
        match value {
            None | Some(Value::Null) => Some(NodeKey::Int(0)),
            Some(Value::Bool(b)) => Some(NodeKey::Int(i64::from(*b))),
            Some(Value::Number(n)) => match n.as_i64() {
                Some(i) => Some(NodeKey::Int(i)),
                None => n
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| NodeKey::Int(f as i64))
                    .or_else(|| Some(NodeKey::Text(n.to_string()))),
            },
            Some(Value::String(s)) => Some(
                s.trim()
                    .parse::<i64>()
                    .map(NodeKey::Int)
                    .unwrap_or_else(|_| NodeKey::Text(s.clone())),
            ),
            Some(Value::Array(_) | Value::Object(_)) => None,
        }
    }
}

/// Convert a flat list of records into a forest
///
/// Records whose parent equals `options.root_id` become roots, records
/// whose parent is present become children of it, in input order. Records
/// unreachable from a root (missing parents, cycles) are dropped. When ids
/// repeat, children attach to the last record carrying that id.
///
/// Only records that have children gain the children field. Runs in linear
/// time without recursion, so depth is bounded by memory only.
pub fn list_to_tree(items: Vec<Row>, options: &TreeOptions) -> Vec<Row> {
    let root = NodeKey::of(Some(&options.root_id));

    let mut lookup: HashMap<NodeKey, usize> = HashMap::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if let Some(key) = NodeKey::of(item.get(&options.id_key)) {
            lookup.insert(key, index);
        }
    }

    let mut roots = Vec::new();
    let mut children = vec![Vec::new(); items.len()];
    for (index, item) in items.iter().enumerate() {
        let parent = NodeKey::of(item.get(&options.parent_key));
        if parent.is_some() && parent == root {
            roots.push(index);
        } else if let Some(&parent_index) = parent.as_ref().and_then(|key| lookup.get(key)) {
            children[parent_index].push(index);
        }
    }

    let (tree, dropped) = assemble(items, &roots, &children, |mut row, nested: Vec<Row>| {
        if !nested.is_empty() {
            let nested = nested.into_iter().map(Value::Object).collect();
            row.insert(options.children_key.clone(), Value::Array(nested));
        }
        row
    });

    if dropped > 0 {
        debug_log!(dropped, "records without a reachable parent dropped");
    }
    tree
}

/// [`list_to_tree`] over a JSON array of objects
pub fn list_to_tree_value(items: Value, options: &TreeOptions) -> Result<Value, ConvertError> {
    let items = match items {
        Value::Array(items) => items,
        other => return Err(ConvertError::NotAList(json_kind(&other))),
    };

    let rows = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(row) => Ok(row),
            _ => Err(ConvertError::NotARecord { index }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let tree = list_to_tree(rows, options);
    Ok(Value::Array(tree.into_iter().map(Value::Object).collect()))
}

/// Build nested nodes from parent links, children before their parents
///
/// Returns the root nodes and the number of items that were unreachable.
pub(crate) fn assemble<I, N>(
    items: Vec<I>,
    roots: &[usize],
    children: &[Vec<usize>],
    mut build: impl FnMut(I, Vec<N>) -> N,
) -> (Vec<N>, usize) {
    // Preorder from the roots; cycles are never reached since each item has one parent
    let mut order = Vec::with_capacity(items.len());
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(index) = stack.pop() {
        order.push(index);
        stack.extend(children[index].iter().rev().copied());
    }

    let mut slots: Vec<Option<I>> = items.into_iter().map(Some).collect();
    let mut built: Vec<Option<N>> = std::iter::repeat_with(|| None).take(slots.len()).collect();

    for &index in order.iter().rev() {
        let nested = children[index]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        if let Some(item) = slots[index].take() {
            built[index] = Some(build(item, nested));
        }
    }

    let dropped = slots.len() - order.len();
    let nodes = roots.iter().filter_map(|&root| built[root].take()).collect();
    (nodes, dropped)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: Value) -> Vec<Row> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(row) => row,
                    _ => panic!("expected object"),
                })
                .collect(),
            _ => panic!("expected array"),
        }
    }

    fn convert(value: Value, options: &TreeOptions) -> Value {
        let tree = list_to_tree(rows(value), options);
        Value::Array(tree.into_iter().map(Value::Object).collect())
    }

    #[test]
    fn test_orphan_is_dropped() {
        let tree = convert(
            json!([
                {"id": 1, "parent_id": 0},
                {"id": 2, "parent_id": 1},
                {"id": 3, "parent_id": 99},
            ]),
            &TreeOptions::default(),
        );
        assert_eq!(
            tree,
            json!([{"id": 1, "parent_id": 0, "children": [{"id": 2, "parent_id": 1}]}])
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(list_to_tree(Vec::new(), &TreeOptions::default()).is_empty());
    }

    #[test]
    fn test_children_keep_input_order_when_parent_comes_later() {
        let tree = convert(
            json!([
                {"id": 3, "parent_id": 1, "name": "c"},
                {"id": 2, "parent_id": 1, "name": "b"},
                {"id": 1, "parent_id": 0, "name": "a"},
                {"id": 4, "parent_id": 0, "name": "d"},
            ]),
            &TreeOptions::default(),
        );
        assert_eq!(
            tree,
            json!([
                {"id": 1, "parent_id": 0, "name": "a", "children": [
                    {"id": 3, "parent_id": 1, "name": "c"},
                    {"id": 2, "parent_id": 1, "name": "b"},
                ]},
                {"id": 4, "parent_id": 0, "name": "d"},
            ])
        );
    }

    #[test]
    fn test_custom_keys_and_root() {
        let options = TreeOptions::default()
            .root_id("root")
            .id_key("code")
            .parent_key("up")
            .children_key("items");
        let tree = convert(
            json!([
                {"code": "a", "up": "root"},
                {"code": "b", "up": "a"},
                {"code": "c", "up": "b"},
            ]),
            &options,
        );
        assert_eq!(
            tree,
            json!([{"code": "a", "up": "root", "items": [
                {"code": "b", "up": "a", "items": [{"code": "c", "up": "b"}]}
            ]}])
        );
    }

    #[test]
    fn test_loose_key_matching() {
        let tree = convert(
            json!([
                {"id": "1", "parent_id": null},
                {"id": 2, "parent_id": "1"},
                {"id": 3.0, "parent_id": 1},
                {"id": 4, "parent_id": 3},
            ]),
            &TreeOptions::default(),
        );
        let root = &tree[0];
        assert_eq!(tree.as_array().map(Vec::len), Some(1));
        assert_eq!(root["children"].as_array().map(Vec::len), Some(2));
        assert_eq!(root["children"][1]["children"][0]["id"], json!(4));
    }

    #[test]
    fn test_cycles_and_self_parents_are_dropped() {
        let tree = convert(
            json!([
                {"id": 1, "parent_id": 0},
                {"id": 2, "parent_id": 3},
                {"id": 3, "parent_id": 2},
                {"id": 4, "parent_id": 4},
            ]),
            &TreeOptions::default(),
        );
        assert_eq!(tree, json!([{"id": 1, "parent_id": 0}]));
    }

    #[test]
    fn test_duplicate_ids_attach_to_last() {
        let tree = convert(
            json!([
                {"id": 1, "parent_id": 0, "v": "first"},
                {"id": 1, "parent_id": 0, "v": "second"},
                {"id": 2, "parent_id": 1},
            ]),
            &TreeOptions::default(),
        );
        assert_eq!(
            tree,
            json!([
                {"id": 1, "parent_id": 0, "v": "first"},
                {"id": 1, "parent_id": 0, "v": "second", "children": [{"id": 2, "parent_id": 1}]},
            ])
        );
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let depth = 100_000;
        let items: Vec<Row> = (1..=depth)
            .map(|id| rows(json!([{"id": id, "parent_id": id - 1}])).remove(0))
            .collect();

        let tree = list_to_tree(items, &TreeOptions::default());
        assert_eq!(tree.len(), 1);

        // Unwind iteratively so dropping the result does not recurse either
        let mut levels = 1;
        let mut current = tree.into_iter().next().map(Value::Object);
        while let Some(Value::Object(mut node)) = current {
            current = match node.remove("children") {
                Some(Value::Array(mut children)) => {
                    levels += 1;
                    children.pop()
                }
                _ => None,
            };
        }
        assert_eq!(levels, depth);
    }

    #[test]
    fn test_value_entry_point_rejects_bad_input() {
        let options = TreeOptions::default();
        assert!(matches!(
            list_to_tree_value(json!({"id": 1}), &options),
            Err(ConvertError::NotAList("an object"))
        ));
        assert!(matches!(
            list_to_tree_value(json!([{"id": 1}, 5]), &options),
            Err(ConvertError::NotARecord { index: 1 })
        ));
        assert_eq!(
            list_to_tree_value(json!([]), &options).expect("empty list"),
            json!([])
        );
    }
}
