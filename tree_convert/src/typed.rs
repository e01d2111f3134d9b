//! Tree building over typed items

use crate::list::assemble;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;

/// Item carrying its own id and an optional parent id
pub trait TreeItem {
    type Id: Eq + Hash + Clone;

    fn id(&self) -> Self::Id;

    fn parent_id(&self) -> Option<Self::Id>;
}

/// An item and its direct children
///
/// Serializes as the item's fields plus `children` when there are any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode<T> {
    #[serde(flatten)]
    pub item: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode<T>>,
}

impl<T> TreeNode<T> {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes in this subtree, counted without recursion
    pub fn subtree_size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

/// Typed counterpart of [`list_to_tree`](crate::list_to_tree)
///
/// Items whose parent equals `root` are roots; `None` selects items without
/// a parent.
pub fn build_tree<T: TreeItem>(items: Vec<T>, root: Option<T::Id>) -> Vec<TreeNode<T>> {
    let lookup: HashMap<T::Id, usize> = items
        .iter()
        .enumerate()
        .map(|(index, item)| (item.id(), index))
        .collect();

    let mut roots = Vec::new();
    let mut children = vec![Vec::new(); items.len()];
    for (index, item) in items.iter().enumerate() {
        let parent = item.parent_id();
        if parent == root {
            roots.push(index);
        } else if let Some(&parent_index) = parent.as_ref().and_then(|id| lookup.get(id)) {
            children[parent_index].push(index);
        }
    }

    let (nodes, dropped) = assemble(items, &roots, &children, |item, children| TreeNode {
        item,
        children,
    });
    if dropped > 0 {
        debug_log!(dropped, "items without a reachable parent dropped");
    }
    nodes
}
