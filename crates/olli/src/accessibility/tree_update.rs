//! AccessKit tree updates built from the runtime state.

use accesskit::{Action, Node, NodeId, Tree, TreeUpdate};
use olli_core::NodeIndex;

use super::role::AccessibleRole;
use crate::runtime::Navigator;

/// Id of the tree container node.
pub const CONTAINER_ID: NodeId = NodeId(0);

/// AccessKit id of a tree item.
pub fn node_id(index: NodeIndex) -> NodeId {
    NodeId(index.get() as u64 + 1)
}

/// Build a complete tree update for the visible items of `navigator`.
///
/// The container is a `Tree` node; expanded items list their children
/// directly. Focus is on the focused item.
pub fn build_tree_update(navigator: &Navigator) -> TreeUpdate {
    let tree = navigator.tree();
    let mut container = Node::new(AccessibleRole::Tree.to_accesskit_role());
    if let Some(title) = tree.spec().title() {
        container.set_label(title);
    }
    container.set_children(vec![node_id(tree.root())]);

    let mut nodes = vec![(CONTAINER_ID, container)];
    let mut stack = vec![tree.root()];
    while let Some(index) = stack.pop() {
        let Some(item) = navigator.item(index) else {
            continue;
        };
        let mut node = Node::new(AccessibleRole::TreeItem.to_accesskit_role());
        node.set_label(tree.description_text(index));
        if let Some(elaborated) = tree.get(index) {
            node.set_level(elaborated.depth + 1);
        }
        node.set_position_in_set(tree.position_in_parent(index) + 1);
        node.set_size_of_set(tree.siblings(index).len().max(1));
        node.set_selected(index == navigator.focused());
        node.add_action(Action::Focus);

        if item.expandable {
            node.set_expanded(item.expanded);
        }
        if item.expandable && item.expanded {
            let children = tree.children(index);
            node.set_children(children.iter().map(|&c| node_id(c)).collect::<Vec<_>>());
            // Reverse so pre-order is preserved.
            stack.extend(children.iter().rev());
        }
        nodes.push((node_id(index), node));
    }

    TreeUpdate {
        nodes,
        tree: Some(Tree::new(CONTAINER_ID)),
        focus: node_id(navigator.focused()),
    }
}

/// An update that only moves focus.
pub fn build_focus_update(navigator: &Navigator) -> TreeUpdate {
    TreeUpdate {
        nodes: vec![],
        tree: None,
        focus: node_id(navigator.focused()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use olli_core::value::Datum;
    use olli_core::{ElaborateOptions, OlliNode, OlliSpec, UnitSpec, Value, elaborate_tree};

    fn navigator() -> Navigator {
        let data: Vec<Datum> = ["a", "b", "a"]
            .into_iter()
            .map(|x| Datum::from([("x".to_string(), Value::from(x))]))
            .collect();
        let mut unit = UnitSpec::new(data);
        unit.structure = Some(vec![OlliNode::group("x")]);
        let tree = elaborate_tree(&OlliSpec::Unit(unit), &ElaborateOptions::default()).unwrap();
        Navigator::new(tree)
    }

    #[test]
    fn test_collapsed_update() {
        let nav = navigator();
        let update = build_tree_update(&nav);
        assert_eq!(update.nodes.len(), 2);
        assert_eq!(update.tree.as_ref().map(|t| t.root), Some(CONTAINER_ID));
        assert_eq!(update.focus, NodeId(1));
    }

    #[test]
    fn test_expanded_update_focuses_child() {
        let mut nav = navigator();
        nav.set_focus_to_next_layer();
        let update = build_tree_update(&nav);
        assert_eq!(update.nodes.len(), 4);
        let ids: Vec<NodeId> = update.nodes.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![NodeId(0), NodeId(1), NodeId(2), NodeId(3)]);
        assert_eq!(update.focus, NodeId(2));
        assert_eq!(build_focus_update(&nav).focus, NodeId(2));
    }
}
