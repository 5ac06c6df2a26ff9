//! Render-free ARIA projection of the runtime state.
//!
//! The projection is a nested [`AriaElement`] tree that an embedder turns
//! into markup or platform nodes. Only visible items are projected: an
//! expanded item carries a `group` with its children, a collapsed one none.
//!
//! ```text
//! tree
//! └── treeitem  (level 1, expanded)
//!     └── group
//!         ├── treeitem  (level 2, posinset 1)
//!         └── treeitem  (level 2, posinset 2)
//! ```

use olli_core::NodeIndex;

use super::role::AccessibleRole;
use crate::runtime::{DataTable, Navigator};

/// One projected element with its ARIA state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AriaElement {
    pub role: AccessibleRole,
    /// Node id, for tree items.
    pub id: Option<String>,
    pub label: Option<String>,
    /// 1-based depth.
    pub level: Option<usize>,
    /// 1-based position among siblings.
    pub pos_in_set: Option<usize>,
    pub set_size: Option<usize>,
    /// Present only on items that have children.
    pub expanded: Option<bool>,
    pub selected: Option<bool>,
    pub tab_index: Option<i32>,
    pub children: Vec<AriaElement>,
}

impl AriaElement {
    pub fn new(role: AccessibleRole) -> Self {
        Self {
            role,
            id: None,
            label: None,
            level: None,
            pos_in_set: None,
            set_size: None,
            expanded: None,
            selected: None,
            tab_index: None,
            children: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_children(mut self, children: Vec<AriaElement>) -> Self {
        self.children = children;
        self
    }

    /// Attribute name/value pairs in markup order.
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        let mut attrs = vec![("role", self.role.as_aria_role().to_string())];
        if let Some(id) = &self.id {
            attrs.push(("id", id.clone()));
        }
        if let Some(label) = &self.label {
            attrs.push(("aria-label", label.clone()));
        }
        if let Some(level) = self.level {
            attrs.push(("aria-level", level.to_string()));
        }
        if let Some(pos) = self.pos_in_set {
            attrs.push(("aria-posinset", pos.to_string()));
        }
        if let Some(size) = self.set_size {
            attrs.push(("aria-setsize", size.to_string()));
        }
        if let Some(expanded) = self.expanded {
            attrs.push(("aria-expanded", expanded.to_string()));
        }
        if let Some(selected) = self.selected {
            attrs.push(("aria-selected", selected.to_string()));
        }
        if let Some(tab_index) = self.tab_index {
            attrs.push(("tabindex", tab_index.to_string()));
        }
        attrs
    }

    /// Depth-first search by node id.
    pub fn find(&self, id: &str) -> Option<&AriaElement> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Number of elements with `role` in this subtree, including `self`.
    pub fn count(&self, role: AccessibleRole) -> usize {
        usize::from(self.role == role) + self.children.iter().map(|c| c.count(role)).sum::<usize>()
    }
}

/// Project the visible items of `navigator` as an ARIA tree.
pub fn project_tree(navigator: &Navigator) -> AriaElement {
    let tree = navigator.tree();
    let label = tree.spec().title().unwrap_or("Chart").to_string();
    AriaElement::new(AccessibleRole::Tree)
        .with_label(label)
        .with_children(vec![project_item(navigator, tree.root())])
}

fn project_item(navigator: &Navigator, index: NodeIndex) -> AriaElement {
    let tree = navigator.tree();
    let mut element = AriaElement::new(AccessibleRole::TreeItem).with_label(tree.description_text(index));
    element.pos_in_set = Some(tree.position_in_parent(index) + 1);
    element.set_size = Some(tree.siblings(index).len().max(1));
    element.level = tree.get(index).map(|n| n.depth + 1);
    element.selected = Some(index == navigator.focused());

    if let Some(item) = navigator.item(index) {
        element.id = Some(item.id.clone());
        element.tab_index = Some(item.tab_index);
        if item.expandable {
            element.expanded = Some(item.expanded);
        }
        if item.expandable && item.expanded {
            let children = tree
                .children(index)
                .iter()
                .map(|&child| project_item(navigator, child))
                .collect();
            element.children = vec![AriaElement::new(AccessibleRole::Group).with_children(children)];
        }
    }
    element
}

/// Project a data table: a header row followed by one row per record.
pub fn project_table(table: &DataTable) -> AriaElement {
    let header = AriaElement::new(AccessibleRole::Row).with_children(
        table
            .header
            .iter()
            .map(|h| AriaElement::new(AccessibleRole::ColumnHeader).with_label(h.clone()))
            .collect(),
    );
    let rows = table.rows.iter().map(|row| {
        AriaElement::new(AccessibleRole::Row).with_children(
            row.iter()
                .map(|cell| AriaElement::new(AccessibleRole::Cell).with_label(cell.clone()))
                .collect(),
        )
    });
    AriaElement::new(AccessibleRole::Table)
        .with_label(table.caption.clone())
        .with_children(std::iter::once(header).chain(rows).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use olli_core::value::Datum;
    use olli_core::{Axis, AxisType, ElaborateOptions, OlliSpec, UnitSpec, Value, elaborate_tree};

    fn navigator() -> Navigator {
        let data: Vec<Datum> = [("a", 1.0), ("b", 2.0), ("a", 3.0)]
            .into_iter()
            .map(|(x, y)| Datum::from([("x".to_string(), Value::from(x)), ("y".to_string(), Value::from(y))]))
            .collect();
        let mut unit = UnitSpec::new(data);
        unit.title = Some("Sales".into());
        unit.axes = vec![Axis::new("x", AxisType::X), Axis::new("y", AxisType::Y)];
        let tree = elaborate_tree(&OlliSpec::Unit(unit), &ElaborateOptions::default()).unwrap();
        Navigator::new(tree)
    }

    #[test]
    fn test_collapsed_root_projection() {
        let nav = navigator();
        let tree = project_tree(&nav);
        assert_eq!(tree.role, AccessibleRole::Tree);
        assert_eq!(tree.label.as_deref(), Some("Sales"));

        let root = &tree.children[0];
        assert_eq!(root.expanded, Some(false));
        assert_eq!(root.selected, Some(true));
        assert_eq!(root.tab_index, Some(0));
        assert_eq!(root.level, Some(1));
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_expanded_branch_projection() {
        let mut nav = navigator();
        nav.set_focus_to_next_layer();
        nav.set_focus_to_next_item();
        let tree = project_tree(&nav);

        assert_eq!(tree.count(AccessibleRole::TreeItem), 3);
        assert_eq!(tree.count(AccessibleRole::Group), 1);
        let y_axis = tree.find("olli-1").unwrap();
        assert_eq!(y_axis.level, Some(2));
        assert_eq!(y_axis.pos_in_set, Some(2));
        assert_eq!(y_axis.set_size, Some(2));
        assert_eq!(y_axis.selected, Some(true));
        assert_eq!(y_axis.expanded, Some(false));

        let attrs = y_axis.attributes();
        assert!(attrs.contains(&("aria-expanded", "false".to_string())));
        assert!(attrs.contains(&("tabindex", "0".to_string())));
        assert_eq!(tree.find("olli-0").unwrap().tab_index, Some(-1));
    }

    #[test]
    fn test_leaf_has_no_expanded_attribute() {
        let mut nav = navigator();
        let leaf = nav.tree().find_by_id("olli-0-1").unwrap();
        nav.set_focus_to_item(leaf);
        let tree = project_tree(&nav);
        let element = tree.find("olli-0-1").unwrap();
        assert_eq!(element.expanded, None);
        assert!(!element.attributes().iter().any(|(name, _)| *name == "aria-expanded"));
    }

    #[test]
    fn test_table_projection() {
        let table = DataTable {
            caption: "Two rows".into(),
            header: vec!["x".into(), "y".into()],
            rows: vec![vec!["a".into(), "1".into()], vec!["b".into(), "2".into()]],
        };
        let element = project_table(&table);
        assert_eq!(element.role, AccessibleRole::Table);
        assert_eq!(element.count(AccessibleRole::Row), 3);
        assert_eq!(element.count(AccessibleRole::ColumnHeader), 2);
        assert_eq!(element.count(AccessibleRole::Cell), 4);
    }
}
