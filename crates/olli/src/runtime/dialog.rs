//! Dialogs opened over the tree: data table, filter and help.

use olli_core::{ElaboratedTree, NodeIndex, Predicate, PredicateError, Value, get_domain, simplify_predicate};

use crate::keyboard::HelpEntry;

/// How a dialog was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogResult {
    /// Closed without applying anything (Escape).
    #[default]
    Rejected,
    /// Confirmed (Enter).
    Accepted,
}

impl DialogResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, DialogResult::Accepted)
    }
}

/// An open dialog.
#[derive(Debug, Clone, PartialEq)]
pub enum Dialog {
    Table(DataTable),
    Filter(FilterDialog),
    Help(Vec<HelpEntry>),
}

impl Dialog {
    /// Title announced when the dialog opens.
    pub fn title(&self) -> &str {
        match self {
            Dialog::Table(table) => &table.caption,
            Dialog::Filter(_) => "Filter the chart",
            Dialog::Help(_) => "Keyboard shortcuts",
        }
    }
}

/// The records of one node as a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    /// Description of the node the rows come from.
    pub caption: String,
    /// Column labels, one per field of the node's unit.
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DataTable {
    /// Tabulate the live selection of `index`.
    pub fn for_node(tree: &ElaboratedTree, index: NodeIndex) -> Self {
        let Some(unit) = tree.unit_for(index) else {
            return Self::default();
        };
        let header = unit
            .fields
            .iter()
            .map(|def| unit.label_for(&def.field).to_string())
            .collect();
        let rows = tree
            .selection(index)
            .into_iter()
            .map(|datum| {
                unit.fields
                    .iter()
                    .map(|def| match datum.get(&def.field) {
                        Some(value) if !value.is_null() => value.format_with(def.time_unit),
                        _ => String::new(),
                    })
                    .collect()
            })
            .collect();
        Self {
            caption: tree.description_text(index),
            header,
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// A field the filter dialog offers, with the values it can be set to.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOption {
    pub field: String,
    pub label: String,
    pub domain: Vec<Value>,
}

/// Editor for the chart's selection predicate.
///
/// The draft starts as the current selection. Accepting the dialog hands
/// the simplified draft to the instance, which rebuilds the tree with it.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterDialog {
    options: Vec<FilterOption>,
    draft: Option<Predicate>,
}

impl FilterDialog {
    /// Offer every field of the unit `index` belongs to. Domains are taken
    /// from the unfiltered data so any value can be selected again.
    pub fn for_node(tree: &ElaboratedTree, index: NodeIndex) -> Self {
        let Some(unit) = tree.unit_for(index) else {
            return Self {
                options: Vec::new(),
                draft: None,
            };
        };
        let options = unit
            .fields
            .iter()
            .map(|def| FilterOption {
                field: def.field.clone(),
                label: unit.label_for(&def.field).to_string(),
                domain: get_domain(def, &unit.data, None),
            })
            .collect();
        Self {
            options,
            draft: unit.selection.clone(),
        }
    }

    pub fn options(&self) -> &[FilterOption] {
        &self.options
    }

    pub fn option(&self, field: &str) -> Option<&FilterOption> {
        self.options.iter().find(|o| o.field == field)
    }

    pub fn draft(&self) -> Option<&Predicate> {
        self.draft.as_ref()
    }

    /// Replace the draft. Malformed predicates are rejected and the previous
    /// draft is kept.
    pub fn set_draft(&mut self, predicate: Predicate) -> Result<(), PredicateError> {
        predicate.validate()?;
        self.draft = Some(predicate);
        Ok(())
    }

    /// Spoken form of the draft.
    pub fn draft_text(&self) -> String {
        match &self.draft {
            Some(predicate) => simplify_predicate(predicate).to_string(),
            None => Predicate::always().to_string(),
        }
    }

    /// Drop the draft so accepting removes the selection.
    pub fn clear(&mut self) {
        self.draft = None;
    }

    /// The selection to rebuild with. An always-true draft clears it.
    pub fn take(self) -> Option<Predicate> {
        self.draft
            .map(|p| simplify_predicate(&p))
            .filter(|p| !p.is_always())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use olli_core::value::Datum;
    use olli_core::{ElaborateOptions, FieldPredicate, OlliNode, OlliSpec, UnitSpec, elaborate_tree};

    fn tree(selection: Option<Predicate>) -> ElaboratedTree {
        let data: Vec<Datum> = [("a", 1.0), ("b", 2.0), ("a", 3.0)]
            .into_iter()
            .map(|(x, y)| Datum::from([("x".to_string(), Value::from(x)), ("y".to_string(), Value::from(y))]))
            .collect();
        let mut unit = UnitSpec::new(data);
        unit.structure = Some(vec![OlliNode::group("x")]);
        unit.selection = selection;
        elaborate_tree(&OlliSpec::Unit(unit), &ElaborateOptions::default()).unwrap()
    }

    #[test]
    fn test_table_for_node() {
        let tree = tree(None);
        let a = tree.children(tree.root())[0];
        let table = DataTable::for_node(&tree, a);
        assert_eq!(table.header, vec!["x", "y"]);
        assert_eq!(table.rows, vec![vec!["a", "1"], vec!["a", "3"]]);
        assert_eq!(table.caption, tree.description_text(a));
        assert_eq!(Dialog::Table(table).title(), tree.description_text(a));
    }

    #[test]
    fn test_filter_domains_ignore_selection() {
        let selection = Predicate::from(FieldPredicate::equal("x", "a"));
        let tree = tree(Some(selection.clone()));
        let dialog = FilterDialog::for_node(&tree, tree.root());
        assert_eq!(dialog.draft(), Some(&selection));
        let x = dialog.option("x").unwrap();
        assert_eq!(x.domain, vec![Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn test_filter_draft_is_simplified() {
        let tree = tree(None);
        let mut dialog = FilterDialog::for_node(&tree, tree.root());
        assert_eq!(dialog.draft_text(), "all values");

        dialog
            .set_draft(Predicate::and(vec![
                FieldPredicate::gte("y", 0).into(),
                FieldPredicate::lte("y", 10).into(),
            ]))
            .unwrap();
        let taken = dialog.take().unwrap();
        assert!(matches!(taken, Predicate::Field(_)));
    }

    #[test]
    fn test_filter_rejects_inverted_range() {
        let tree = tree(None);
        let mut dialog = FilterDialog::for_node(&tree, tree.root());
        let inverted = FieldPredicate::range("y", 10, 0, true);
        assert!(dialog.set_draft(inverted.into()).is_err());
        assert_eq!(dialog.draft(), None);
    }

    #[test]
    fn test_cleared_filter_takes_none() {
        let tree = tree(Some(FieldPredicate::equal("x", "b").into()));
        let mut dialog = FilterDialog::for_node(&tree, tree.root());
        dialog.clear();
        assert_eq!(dialog.take(), None);
    }
}
