//! Text of individual description tokens.

use super::Token;
use super::aggregate::{quartile, summarize};
use crate::domain::domain_of;
use crate::predicate::Predicate;
use crate::spec::{CompositionOperator, MeasureType, OlliSpec, UnitSpec};
use crate::tree::{ElaboratedTree, NodeIndex, NodeType};
use crate::value::{Value, format_number};

const QUARTILE_NAMES: [&str; 4] = ["top", "second", "third", "bottom"];

/// Text for one token of one node. Empty when there is nothing to say.
pub(super) fn token_text(tree: &ElaboratedTree, index: NodeIndex, token: Token) -> String {
    match token {
        Token::Index => index_text(tree, index),
        Token::Type => type_text(tree, index),
        Token::Name => node_name(tree, index),
        Token::Children => children_text(tree, index),
        Token::Data => data_text(tree, index),
        Token::Size => count_text(tree.selection(index).len(), "value"),
        Token::Depth => tree
            .get(index)
            .map(|n| format!("level {}", n.depth))
            .unwrap_or_default(),
        Token::Parent => tree
            .parent(index)
            .map(|p| format!("in {}", short_label(tree, p)))
            .unwrap_or_default(),
        Token::Aggregate => aggregate_text(tree, index),
        Token::Quartile => quartile_text(tree, index),
    }
}

fn count_text(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {}", plural(noun))
    }
}

fn plural(noun: &str) -> String {
    match noun {
        "category" => "categories".to_string(),
        n if n.ends_with('s') => format!("{n}es"),
        n => format!("{n}s"),
    }
}

fn index_text(tree: &ElaboratedTree, index: NodeIndex) -> String {
    let siblings = tree.siblings(index).len();
    format!("{} of {}", tree.position_in_parent(index) + 1, siblings)
}

fn type_text(tree: &ElaboratedTree, index: NodeIndex) -> String {
    let Some(node) = tree.get(index) else {
        return String::new();
    };
    let unit = tree.unit_for(index);
    let noun = unit
        .and_then(|u| u.mark)
        .map(|m| m.chart_noun())
        .unwrap_or("chart");

    match node.node_type {
        NodeType::Root => match tree.spec() {
            OlliSpec::Multi(multi) if tree.children(index).len() > 1 => match multi.operator {
                CompositionOperator::Layer => "a layered chart".to_string(),
                CompositionOperator::Concat => "a multi-view chart".to_string(),
            },
            _ if has_view_children(tree, index) => format!("a faceted {noun}"),
            _ => format!("a {noun}"),
        },
        NodeType::View => match tree.parent(index).and_then(|p| tree.get(p)?.groupby.clone()) {
            Some(_) => "a facet".to_string(),
            None => format!("a {noun}"),
        },
        NodeType::Legend => {
            let channel = node
                .groupby
                .as_deref()
                .and_then(|f| unit?.legend_for(f))
                .map(|l| l.channel.as_str());
            match channel {
                Some(channel) => format!("{channel} legend"),
                None => "legend".to_string(),
            }
        }
        other => other.spoken().to_string(),
    }
}

fn has_view_children(tree: &ElaboratedTree, index: NodeIndex) -> bool {
    let children = tree.children(index);
    !children.is_empty()
        && children
            .iter()
            .all(|&c| tree.get(c).is_some_and(|n| n.node_type == NodeType::View))
}

/// Name of a node as spoken on its own.
pub(crate) fn node_name(tree: &ElaboratedTree, index: NodeIndex) -> String {
    let Some(node) = tree.get(index) else {
        return String::new();
    };
    if let Some(name) = &node.name {
        return name.clone();
    }
    let unit = tree.unit_for(index);

    match node.node_type {
        NodeType::Root => tree.spec().title().unwrap_or_default().to_string(),
        NodeType::XAxis | NodeType::YAxis | NodeType::Legend | NodeType::Other => {
            match (unit, node.groupby.as_deref()) {
                (Some(unit), Some(field)) => unit.label_for(field).to_string(),
                _ => String::new(),
            }
        }
        NodeType::View | NodeType::FilteredData => match &node.predicate {
            Some(Predicate::Field(fp)) => {
                let parent_groups = tree
                    .parent(index)
                    .and_then(|p| tree.get(p)?.groupby.as_deref())
                    == Some(fp.field.as_str());
                if parent_groups {
                    fp.value_label()
                } else {
                    fp.to_string()
                }
            }
            Some(p) => p.to_string(),
            None => String::new(),
        },
        NodeType::Annotations => String::new(),
    }
}

/// Short reference to a node, as used by its children.
pub(crate) fn short_label(tree: &ElaboratedTree, index: NodeIndex) -> String {
    let Some(node) = tree.get(index) else {
        return String::new();
    };
    let name = node_name(tree, index);
    match node.node_type {
        NodeType::Root => "the chart".to_string(),
        NodeType::FilteredData if !name.is_empty() => name,
        NodeType::Annotations => "annotations".to_string(),
        kind if name.is_empty() => kind.spoken().to_string(),
        kind => format!("{} {name}", kind.spoken()),
    }
}

fn children_text(tree: &ElaboratedTree, index: NodeIndex) -> String {
    let children = tree.children(index);
    let Some(node) = tree.get(index) else {
        return String::new();
    };
    if children.is_empty() {
        return String::new();
    }
    let all_of = |t: NodeType| {
        children
            .iter()
            .all(|&c| tree.get(c).is_some_and(|n| n.node_type == t))
    };

    if all_of(NodeType::View) {
        return format!("with {}", count_text(children.len(), "view"));
    }
    if all_of(NodeType::FilteredData) {
        let noun = match (&node.groupby, tree.unit_for(index)) {
            (Some(field), Some(unit)) if partitions_by_value(unit, field) => "category",
            (Some(_), _) => "range",
            _ => "group",
        };
        return format!("with {}", count_text(children.len(), noun));
    }
    if children.len() <= 4 {
        let labels: Vec<String> = children.iter().map(|&c| short_label(tree, c)).collect();
        return format!("with {}", join_list(&labels));
    }
    format!("with {}", count_text(children.len(), "group"))
}

fn partitions_by_value(unit: &UnitSpec, field: &str) -> bool {
    unit.field_def(field)
        .is_some_and(|f| f.measure_type().is_categorical() || f.time_unit.is_some())
}

fn join_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

fn data_text(tree: &ElaboratedTree, index: NodeIndex) -> String {
    let (Some(node), Some(unit)) = (tree.get(index), tree.unit_for(index)) else {
        return String::new();
    };
    let Some(field) = node.groupby.as_deref() else {
        return String::new();
    };
    let Some(def) = unit.field_def(field) else {
        return String::new();
    };
    let rows = tree.selection(index);
    let domain = domain_of(field, def.time_unit, &rows);
    let fmt = |v: &Value| v.format_with(def.time_unit);

    let (Some(first), Some(last)) = (domain.first(), domain.last()) else {
        return String::new();
    };
    if partitions_by_value(unit, field) {
        if domain.len() <= 5 {
            let labels: Vec<String> = domain.iter().map(fmt).collect();
            return format!("{}: {}", count_text(domain.len(), "category"), join_list(&labels));
        }
        return format!(
            "{} from {} to {}",
            count_text(domain.len(), "category"),
            fmt(first),
            fmt(last)
        );
    }
    let kind = match def.measure_type() {
        MeasureType::Temporal => "dates",
        _ => "values",
    };
    format!("{kind} from {} to {}", fmt(first), fmt(last))
}

fn aggregate_text(tree: &ElaboratedTree, index: NodeIndex) -> String {
    let Some(unit) = tree.unit_for(index) else {
        return String::new();
    };
    let grouped = tree.path_groupbys(index);
    let rows = tree.selection(index);

    let parts: Vec<String> = unit
        .fields
        .iter()
        .filter(|f| f.measure_type() == MeasureType::Quantitative)
        .filter(|f| !grouped.contains(&f.field.as_str()))
        .filter_map(|f| {
            let s = summarize(&f.field, &rows)?;
            Some(format!(
                "average {} {}, minimum {}, maximum {}",
                unit.label_for(&f.field),
                format_number(s.mean),
                format_number(s.min),
                format_number(s.max)
            ))
        })
        .collect();
    parts.join("; ")
}

fn quartile_text(tree: &ElaboratedTree, index: NodeIndex) -> String {
    let siblings = tree.siblings(index);
    let sizes: Vec<usize> = siblings
        .iter()
        .map(|&s| tree.selection(s).len())
        .collect();
    let own = sizes[tree.position_in_parent(index).min(sizes.len().saturating_sub(1))];
    match quartile(own, &sizes) {
        Some(q) => format!("in the {} quartile by count", QUARTILE_NAMES[q]),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use crate::description::compose;
    use crate::predicate::{FieldPredicate, Predicate};
    use crate::spec::{Axis, AxisType, FieldDef, Mark, MeasureType, OlliNode, OlliSpec, UnitSpec};
    use crate::tree::{ElaborateOptions, elaborate_tree};
    use crate::value::{Datum, Value};

    fn datum(x: &str, y: f64) -> Datum {
        Datum::from([
            ("x".to_string(), Value::from(x)),
            ("y".to_string(), Value::from(y)),
        ])
    }

    fn bar_chart() -> UnitSpec {
        let mut unit = UnitSpec::new(vec![datum("a", 1.0), datum("b", 2.0), datum("a", 3.0)]);
        unit.fields = vec![
            FieldDef::new("x", MeasureType::Nominal),
            FieldDef::new("y", MeasureType::Quantitative).with_label("score"),
        ];
        unit.mark = Some(Mark::Bar);
        unit.title = Some("Scores".into());
        unit
    }

    #[test]
    fn test_hoisted_groupby_descriptions() {
        let mut unit = bar_chart();
        unit.structure = Some(vec![OlliNode::group("x")]);
        let tree = elaborate_tree(&OlliSpec::Unit(unit), &ElaborateOptions::default()).unwrap();

        let root = tree.root();
        assert_eq!(
            tree.description_text(root),
            "A bar chart. Scores. With 2 categories. 3 values."
        );
        let a = tree.children(root)[0];
        assert_eq!(
            tree.description_text(a),
            "1 of 2. A. 2 values. Level 1. In the chart. \
             Average score 2, minimum 1, maximum 3. In the top quartile by count."
        );
        let b = tree.children(root)[1];
        assert!(tree.description_text(b).starts_with("2 of 2. B. 1 value."));
        assert!(tree.description_text(b).ends_with("In the bottom quartile by count."));
    }

    #[test]
    fn test_axis_descriptions() {
        let mut unit = bar_chart();
        unit.axes = vec![
            Axis::new("x", AxisType::X),
            Axis::new("y", AxisType::Y).with_ticks(vec![0.into(), 2.into(), 4.into()]),
        ];
        let tree = elaborate_tree(&OlliSpec::Unit(unit), &ElaborateOptions::default()).unwrap();

        let root = tree.root();
        assert_eq!(
            tree.description_text(root),
            "A bar chart. Scores. With x-axis x and y-axis score. 3 values."
        );
        let x_axis = tree.children(root)[0];
        assert_eq!(
            tree.description_text(x_axis),
            "X-axis. X. With 2 categories. 2 categories: a and b. 3 values. Level 1. In the chart."
        );
        let y_axis = tree.children(root)[1];
        assert!(
            tree.description_text(y_axis)
                .contains("With 2 ranges. Values from 1 to 3.")
        );
        let first_range = tree.children(y_axis)[0];
        assert!(
            tree.description_text(first_range)
                .starts_with("1 of 2. Range from 0 to 2. 1 value.")
        );
    }

    #[test]
    fn test_named_partition_uses_its_name() {
        let mut unit = bar_chart();
        unit.structure = Some(vec![OlliNode::partition(
            "high scores",
            Predicate::from(FieldPredicate::gte("y", 2)),
        )]);
        let tree = elaborate_tree(&OlliSpec::Unit(unit), &ElaborateOptions::default()).unwrap();
        let partition = tree.children(tree.root())[0];
        assert!(
            tree.description_text(partition)
                .starts_with("1 of 1. High scores. 2 values.")
        );
        assert_eq!(
            compose(&tree.get(partition).unwrap().description, None),
            tree.description_text(partition)
        );
    }
}
