//! UI state of one rendered tree item.

use olli_core::{ElaboratedTree, NodeIndex};

/// Binds one elaborated node to one rendered item.
///
/// Items are rebuilt from scratch whenever the tree is. Only the node id
/// survives a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeTreeItem {
    pub node: NodeIndex,
    pub id: String,
    /// The node has children.
    pub expandable: bool,
    pub expanded: bool,
    /// Child focus returns to when descending again.
    pub last_visited_child: Option<NodeIndex>,
    /// `0` for the one keyboard-reachable item, `-1` for all others.
    pub tab_index: i32,
}

impl RuntimeTreeItem {
    fn new(tree: &ElaboratedTree, node: NodeIndex) -> Self {
        let elaborated = tree.get(node);
        Self {
            node,
            id: elaborated.map(|n| n.id.clone()).unwrap_or_default(),
            expandable: elaborated.is_some_and(|n| !n.is_leaf()),
            expanded: false,
            last_visited_child: None,
            tab_index: -1,
        }
    }
}

/// Items for every node of `tree`, indexed like the tree's arena.
pub(crate) fn build_items(tree: &ElaboratedTree) -> Vec<RuntimeTreeItem> {
    tree.iter()
        .map(|(index, _)| RuntimeTreeItem::new(tree, index))
        .collect()
}
