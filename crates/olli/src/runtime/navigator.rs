//! Focus and expansion state machine over an elaborated tree.
//!
//! The [`Navigator`] keeps exactly one item keyboard-reachable (roving
//! tabindex) and a single open branch: focusing an item expands all of its
//! ancestors and collapses everything else. Requests without a valid target
//! (ArrowUp at the root, a lateral move past the last view) do nothing and
//! return `false`.

use olli_core::logging::targets;
use olli_core::{ElaboratedTree, NodeIndex, NodeType, Signal};

use super::coordinator::{InstanceId, NavigationCoordinator};
use super::item::{RuntimeTreeItem, build_items};

/// Direction of a move between sibling views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LateralDirection {
    Previous,
    Next,
}

/// Payload of [`Navigator::focus_changed`].
#[derive(Debug, Clone, PartialEq)]
pub struct FocusChange {
    pub id: String,
    pub node_type: NodeType,
    /// Composed description of the newly focused node.
    pub description: String,
}

/// Navigation runtime for one rendered tree.
pub struct Navigator {
    tree: ElaboratedTree,
    items: Vec<RuntimeTreeItem>,
    focused: NodeIndex,
    coordinator: Option<(NavigationCoordinator, InstanceId)>,
    focus_changed: Signal<FocusChange>,
}

impl std::fmt::Debug for Navigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigator")
            .field("nodes", &self.tree.len())
            .field("focused", &self.focused_id())
            .finish()
    }
}

impl Navigator {
    /// Start with the root focused and everything collapsed.
    pub fn new(tree: ElaboratedTree) -> Self {
        let mut items = build_items(&tree);
        let focused = tree.root();
        if let Some(root) = items.get_mut(focused.get()) {
            root.tab_index = 0;
        }
        Self {
            tree,
            items,
            focused,
            coordinator: None,
            focus_changed: Signal::new(),
        }
    }

    /// Report focus changes of this navigator to `coordinator` as `instance`.
    pub fn attach_coordinator(&mut self, coordinator: NavigationCoordinator, instance: InstanceId) {
        self.coordinator = Some((coordinator, instance));
    }

    /// Swap in a rebuilt tree, discarding all item state, and restore focus
    /// to the previously focused id (or its nearest surviving ancestor).
    pub fn replace_tree(&mut self, tree: ElaboratedTree) {
        let id = self.focused_id().to_string();
        self.items = build_items(&tree);
        self.tree = tree;
        self.focused = self.tree.root();
        self.focus_by_id(&id);
    }

    pub fn tree(&self) -> &ElaboratedTree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut ElaboratedTree {
        &mut self.tree
    }

    pub fn items(&self) -> &[RuntimeTreeItem] {
        &self.items
    }

    pub fn item(&self, index: NodeIndex) -> Option<&RuntimeTreeItem> {
        self.items.get(index.get())
    }

    fn item_mut(&mut self, index: NodeIndex) -> Option<&mut RuntimeTreeItem> {
        self.items.get_mut(index.get())
    }

    /// The keyboard-reachable item.
    pub fn focused(&self) -> NodeIndex {
        self.focused
    }

    pub fn focused_id(&self) -> &str {
        self.item(self.focused).map(|i| i.id.as_str()).unwrap_or("")
    }

    /// Description of the focused node.
    pub fn focused_description(&self) -> String {
        self.tree.description_text(self.focused)
    }

    pub fn is_expanded(&self, index: NodeIndex) -> bool {
        self.item(index).is_some_and(|i| i.expanded)
    }

    /// An item is visible when every ancestor is expanded.
    pub fn is_visible(&self, index: NodeIndex) -> bool {
        self.tree.get(index).is_some() && self.tree.ancestors(index).all(|a| self.is_expanded(a))
    }

    /// Emitted after every focus move.
    pub fn focus_changed(&self) -> &Signal<FocusChange> {
        &self.focus_changed
    }

    /// Focus `index`, expanding its ancestors and collapsing every other
    /// branch.
    pub fn set_focus_to_item(&mut self, index: NodeIndex) -> bool {
        let Some(node) = self.tree.get(index) else {
            tracing::trace!(target: targets::NAVIGATE, index = index.get(), "no such item");
            return false;
        };
        let change = FocusChange {
            id: node.id.clone(),
            node_type: node.node_type,
            description: self.tree.description_text(index),
        };

        let path: Vec<NodeIndex> = self.tree.ancestors(index).collect();
        for item in &mut self.items {
            if path.contains(&item.node) {
                item.expanded = true;
            } else if item.node != index {
                item.expanded = false;
            }
            item.tab_index = if item.node == index { 0 } else { -1 };
        }
        if let Some(parent) = self.tree.parent(index)
            && let Some(item) = self.item_mut(parent)
        {
            item.last_visited_child = Some(index);
        }
        self.focused = index;

        tracing::debug!(target: targets::NAVIGATE, id = %change.id, "focus moved");
        if let Some((coordinator, instance)) = &self.coordinator {
            coordinator.set_last_focused(*instance);
        }
        self.focus_changed.emit(change);
        true
    }

    /// Focus a node by id after a rebuild.
    ///
    /// Falls back to the nearest ancestor id that still exists (ids are
    /// path-derived, so `olli-2-1` falls back to `olli-2`), then to the root.
    pub fn focus_by_id(&mut self, id: &str) -> bool {
        let mut candidate = id;
        loop {
            if let Some(index) = self.tree.find_by_id(candidate) {
                return self.set_focus_to_item(index);
            }
            match candidate.rfind('-') {
                Some(cut) => candidate = &candidate[..cut],
                None => break,
            }
        }
        let root = self.tree.root();
        self.set_focus_to_item(root)
    }

    /// Expand `index`, collapsing its expanded siblings.
    pub fn expand_tree_item(&mut self, index: NodeIndex) -> bool {
        if !self.item(index).is_some_and(|i| i.expandable) {
            return false;
        }
        let siblings: Vec<NodeIndex> = self.tree.siblings(index).to_vec();
        for sibling in siblings.into_iter().filter(|&s| s != index) {
            self.collapse_subtree(sibling);
        }
        if let Some(item) = self.item_mut(index) {
            item.expanded = true;
        }
        tracing::debug!(target: targets::NAVIGATE, id = %self.items[index.get()].id, "expanded");
        true
    }

    /// Collapse `index` and everything below it.
    ///
    /// If focus was inside the collapsed branch it moves to `index`.
    pub fn collapse_tree_item(&mut self, index: NodeIndex) -> bool {
        if !self.is_expanded(index) {
            return false;
        }
        self.collapse_subtree(index);
        if self.tree.ancestors(self.focused).any(|a| a == index) {
            self.set_focus_to_item(index);
        }
        true
    }

    fn collapse_subtree(&mut self, index: NodeIndex) {
        let mut stack = vec![index];
        while let Some(current) = stack.pop() {
            if let Some(item) = self.item_mut(current) {
                item.expanded = false;
            }
            stack.extend_from_slice(self.tree.children(current));
        }
    }

    /// Toggle expansion of the focused item.
    pub fn activate(&mut self) -> bool {
        let focused = self.focused;
        if self.is_expanded(focused) {
            self.collapse_tree_item(focused)
        } else {
            self.expand_tree_item(focused)
        }
    }

    fn sibling_at(&self, offset: isize) -> Option<NodeIndex> {
        let siblings = self.tree.siblings(self.focused);
        let position = self.tree.position_in_parent(self.focused).checked_add_signed(offset)?;
        siblings.get(position).copied()
    }

    fn move_to(&mut self, target: Option<NodeIndex>, request: &'static str) -> bool {
        match target {
            Some(index) if index != self.focused => self.set_focus_to_item(index),
            _ => {
                tracing::trace!(target: targets::NAVIGATE, request, id = %self.focused_id(), "no target");
                false
            }
        }
    }

    pub fn set_focus_to_next_item(&mut self) -> bool {
        let target = self.sibling_at(1);
        self.move_to(target, "next item")
    }

    pub fn set_focus_to_previous_item(&mut self) -> bool {
        let target = self.sibling_at(-1);
        self.move_to(target, "previous item")
    }

    pub fn set_focus_to_first_in_level(&mut self) -> bool {
        let target = self.tree.siblings(self.focused).first().copied();
        self.move_to(target, "first in level")
    }

    pub fn set_focus_to_last_in_level(&mut self) -> bool {
        let target = self.tree.siblings(self.focused).last().copied();
        self.move_to(target, "last in level")
    }

    /// Descend to the child visited last, or the first child.
    pub fn set_focus_to_next_layer(&mut self) -> bool {
        let children = self.tree.children(self.focused);
        let remembered = self
            .item(self.focused)
            .and_then(|i| i.last_visited_child)
            .filter(|c| children.contains(c));
        let target = remembered.or_else(|| children.first().copied());
        self.move_to(target, "next layer")
    }

    /// Ascend to the parent, remembering the departure child, and close the
    /// branch that was left.
    pub fn set_focus_to_parent_item(&mut self) -> bool {
        let departure = self.focused;
        let Some(parent) = self.tree.parent(departure) else {
            return self.move_to(None, "parent");
        };
        let moved = self.set_focus_to_item(parent);
        if let Some(item) = self.item_mut(parent) {
            item.last_visited_child = Some(departure);
        }
        self.collapse_subtree(parent);
        moved
    }

    /// Focus the node at the same structural position in the adjacent view.
    ///
    /// Only applies when every child of the root is a view.
    pub fn set_focus_to_lateral_item(&mut self, direction: LateralDirection) -> bool {
        let target = self.lateral_target(direction);
        self.move_to(target, "lateral")
    }

    fn lateral_target(&self, direction: LateralDirection) -> Option<NodeIndex> {
        let root = self.tree.root();
        let views = self.tree.children(root);
        let all_views = !views.is_empty()
            && views
                .iter()
                .all(|&v| self.tree.get(v).is_some_and(|n| n.node_type == NodeType::View));
        if !all_views {
            return None;
        }

        let mut path = Vec::new();
        let mut current = self.focused;
        loop {
            let parent = self.tree.parent(current)?;
            if parent == root {
                break;
            }
            path.push(self.tree.position_in_parent(current));
            current = parent;
        }

        let view_position = self.tree.position_in_parent(current);
        let target_position = match direction {
            LateralDirection::Previous => view_position.checked_sub(1)?,
            LateralDirection::Next => view_position + 1,
        };
        let mut target = *views.get(target_position)?;
        for &position in path.iter().rev() {
            target = *self.tree.children(target).get(position)?;
        }
        Some(target)
    }

    /// Jump to the child of the enclosing view (or root) with `node_type`.
    pub fn focus_on_node_type(&mut self, node_type: NodeType) -> bool {
        let view = self.tree.enclosing_view(self.focused);
        let target = self
            .tree
            .children(view)
            .iter()
            .copied()
            .find(|&c| self.tree.get(c).is_some_and(|n| n.node_type == node_type));
        self.move_to(target, "node type")
    }

    /// Visible items in pre-order.
    pub fn visible_items(&self) -> impl Iterator<Item = &RuntimeTreeItem> + '_ {
        self.items.iter().filter(|i| self.is_visible(i.node))
    }
}
