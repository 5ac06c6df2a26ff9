//! Expansion of declared structure into a realized tree.

use super::{ElaboratedNode, ElaboratedTree, NodeIndex, NodeType, next_generation};
use crate::description::{DescriptionSettings, describe_tree};
use crate::error::Result;
use crate::infer::elaborate_spec;
use crate::logging::targets;
use crate::predicate::{Predicate, field_to_predicates, selection_test};
use crate::spec::{AxisType, FieldRole, OlliNode, OlliSpec, PredicateScope, UnitSpec};
use crate::value::Datum;

/// Options for [`elaborate_tree`].
#[derive(Debug, Clone)]
pub struct ElaborateOptions {
    /// Id of the root node and prefix of every other id.
    pub namespace: String,
    pub descriptions: DescriptionSettings,
}

impl Default for ElaborateOptions {
    fn default() -> Self {
        Self {
            namespace: "olli".to_string(),
            descriptions: DescriptionSettings::default(),
        }
    }
}

impl ElaborateOptions {
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}

/// Elaborate a spec into a described tree.
///
/// The spec is completed first (field types, temporal values, default
/// structure). Each unit's domains and bins are computed over its data as
/// filtered by its selection. Bins matching no records become leaves.
pub fn elaborate_tree(spec: &OlliSpec, options: &ElaborateOptions) -> Result<ElaboratedTree> {
    let _span = tracing::info_span!(target: targets::ELABORATE, "elaborate_tree").entered();

    let spec = elaborate_spec(spec.clone())?;
    let mut builder = Builder { nodes: Vec::new() };
    let namespace = options.namespace.as_str();

    match spec.units() {
        [unit] => {
            let ctx = UnitContext::new(unit, 0);
            let mut root = ElaboratedNode::new(namespace.to_string(), NodeType::Root, None, 0);
            root.full_predicate = ctx.base.clone();
            root.spec_index = Some(0);
            let root = builder.push(root);
            builder.build_unit(&ctx, root)?;
        }
        units => {
            let root = builder.push(ElaboratedNode::new(
                namespace.to_string(),
                NodeType::Root,
                None,
                0,
            ));
            for (i, unit) in units.iter().enumerate() {
                let ctx = UnitContext::new(unit, i);
                let mut view =
                    ElaboratedNode::new(format!("{namespace}-{i}"), NodeType::View, Some(root), 1);
                view.full_predicate = ctx.base.clone();
                view.spec_index = Some(i);
                view.name = unit.title.clone();
                let view = builder.push(view);
                builder.build_unit(&ctx, view)?;
            }
        }
    }

    let mut tree = ElaboratedTree {
        nodes: builder.nodes,
        spec,
        generation: next_generation(),
    };
    describe_tree(&mut tree, &options.descriptions)?;

    tracing::info!(
        target: targets::ELABORATE,
        nodes = tree.len(),
        generation = tree.generation(),
        "elaborated tree"
    );
    Ok(tree)
}

struct UnitContext<'a> {
    unit: &'a UnitSpec,
    spec_index: usize,
    /// The unit's selection, or the always-true predicate.
    base: Predicate,
    /// Records domains and bins are computed over.
    domain_data: Vec<Datum>,
}

impl<'a> UnitContext<'a> {
    fn new(unit: &'a UnitSpec, spec_index: usize) -> Self {
        let base = unit.selection.clone().unwrap_or_else(Predicate::always);
        let domain_data = selection_test(&unit.data, &base)
            .into_iter()
            .cloned()
            .collect();
        Self {
            unit,
            spec_index,
            base,
            domain_data,
        }
    }

    fn count(&self, predicate: &Predicate) -> usize {
        selection_test(&self.unit.data, predicate).len()
    }
}

struct Builder {
    nodes: Vec<ElaboratedNode>,
}

impl Builder {
    fn push(&mut self, node: ElaboratedNode) -> NodeIndex {
        let index = NodeIndex(self.nodes.len());
        if let Some(parent) = node.parent {
            self.nodes[parent.0].children.push(index);
        }
        self.nodes.push(node);
        index
    }

    fn child(&self, parent: NodeIndex, position: usize, node_type: NodeType) -> ElaboratedNode {
        let p = &self.nodes[parent.0];
        let mut node = ElaboratedNode::new(
            format!("{}-{}", p.id, position),
            node_type,
            Some(parent),
            p.depth + 1,
        );
        node.full_predicate = p.full_predicate.clone();
        node.spec_index = p.spec_index;
        node
    }

    /// Expand a unit's structure beneath its top node.
    ///
    /// A sole top-level group on a facet or role-less field is hoisted into
    /// the top node itself.
    fn build_unit(&mut self, ctx: &UnitContext<'_>, top: NodeIndex) -> Result<()> {
        let structure = ctx.unit.structure.as_deref().unwrap_or(&[]);
        match structure {
            [OlliNode::Group { groupby, children }]
                if matches!(ctx.unit.role_of(groupby), FieldRole::Facet | FieldRole::None) =>
            {
                self.nodes[top.0].groupby = Some(groupby.clone());
                self.expand_group(ctx, top, groupby, children)
            }
            nodes => {
                for (i, node) in nodes.iter().enumerate() {
                    self.elaborate_node(ctx, node, top, i)?;
                }
                Ok(())
            }
        }
    }

    fn elaborate_node(
        &mut self,
        ctx: &UnitContext<'_>,
        node: &OlliNode,
        parent: NodeIndex,
        position: usize,
    ) -> Result<()> {
        match node {
            OlliNode::Group { groupby, children } => {
                let node_type = match ctx.unit.role_of(groupby) {
                    FieldRole::Axis(AxisType::X) => NodeType::XAxis,
                    FieldRole::Axis(AxisType::Y) => NodeType::YAxis,
                    FieldRole::Legend(_) => NodeType::Legend,
                    FieldRole::Facet | FieldRole::None => NodeType::Other,
                };
                let mut group = self.child(parent, position, node_type);
                group.groupby = Some(groupby.clone());
                let group = self.push(group);
                self.expand_group(ctx, group, groupby, children)
            }
            OlliNode::Predicate {
                predicate,
                scope,
                name,
                explanation,
                children,
            } => {
                let mut filtered = self.child(parent, position, NodeType::FilteredData);
                filtered.full_predicate = match scope {
                    PredicateScope::Narrowing => filtered.full_predicate.conjoin(predicate.clone()),
                    PredicateScope::Independent => ctx.base.conjoin(predicate.clone()),
                };
                filtered.predicate = Some(predicate.clone());
                filtered.name = name.clone();
                filtered.explanation = explanation.clone();
                let has_rows = ctx.count(&filtered.full_predicate) > 0;
                let filtered = self.push(filtered);
                if has_rows {
                    for (i, child) in children.iter().enumerate() {
                        self.elaborate_node(ctx, child, filtered, i)?;
                    }
                }
                Ok(())
            }
            OlliNode::Annotation { annotations } => {
                let wrapper = self.child(parent, position, NodeType::Annotations);
                let wrapper = self.push(wrapper);
                for (i, child) in annotations.iter().enumerate() {
                    self.elaborate_node(ctx, child, wrapper, i)?;
                }
                Ok(())
            }
        }
    }

    /// Add one child per value or bin of `field` under `group`, then the
    /// declared `children` under each non-empty one.
    fn expand_group(
        &mut self,
        ctx: &UnitContext<'_>,
        group: NodeIndex,
        field: &str,
        children: &[OlliNode],
    ) -> Result<()> {
        let child_type = match ctx.unit.role_of(field) {
            FieldRole::Facet => NodeType::View,
            _ => NodeType::FilteredData,
        };
        let ticks = ctx.unit.axis_for(field).and_then(|a| a.ticks.as_deref());
        let predicates = field_to_predicates(field, &ctx.domain_data, &ctx.unit.fields, ticks)?;

        for (i, fp) in predicates.into_iter().enumerate() {
            let own = Predicate::Field(fp);
            let mut bin = self.child(group, i, child_type);
            bin.full_predicate = bin.full_predicate.conjoin(own.clone());
            bin.predicate = Some(own);
            let has_rows = ctx.count(&bin.full_predicate) > 0;
            let bin = self.push(bin);
            if has_rows {
                for (j, child) in children.iter().enumerate() {
                    self.elaborate_node(ctx, child, bin, j)?;
                }
            }
        }

        tracing::trace!(
            target: targets::ELABORATE,
            field,
            spec_index = ctx.spec_index,
            children = self.nodes[group.0].children.len(),
            "expanded group"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::FieldPredicate;
    use crate::spec::{Axis, FieldDef, MeasureType, MultiSpec, CompositionOperator};
    use crate::value::Value;

    fn datum(x: &str, y: f64) -> Datum {
        Datum::from([
            ("x".to_string(), Value::from(x)),
            ("y".to_string(), Value::from(y)),
        ])
    }

    fn xy_unit() -> UnitSpec {
        let mut unit = UnitSpec::new(vec![datum("a", 1.0), datum("b", 2.0), datum("a", 3.0)]);
        unit.fields = vec![
            FieldDef::new("x", MeasureType::Nominal),
            FieldDef::new("y", MeasureType::Quantitative),
        ];
        unit
    }

    fn build(unit: UnitSpec) -> ElaboratedTree {
        elaborate_tree(&OlliSpec::Unit(unit), &ElaborateOptions::default()).unwrap()
    }

    #[test]
    fn test_groupby_hoisted_into_root() {
        let mut unit = xy_unit();
        unit.structure = Some(vec![OlliNode::group("x")]);
        let tree = build(unit);

        let root = tree.get(tree.root()).unwrap();
        assert_eq!(root.id, "olli");
        assert_eq!(root.node_type, NodeType::Root);
        assert_eq!(root.groupby.as_deref(), Some("x"));
        assert_eq!(root.children.len(), 2);

        let sizes: Vec<usize> = root.children.iter().map(|&c| tree.selection(c).len()).collect();
        assert_eq!(sizes, vec![2, 1]);
        let a = tree.get(root.children[0]).unwrap();
        assert_eq!(a.id, "olli-0");
        assert_eq!(a.node_type, NodeType::FilteredData);
        assert_eq!(
            a.predicate,
            Some(Predicate::Field(FieldPredicate::equal("x", "a")))
        );
    }

    #[test]
    fn test_axis_group_types_and_nesting() {
        let mut unit = xy_unit();
        unit.axes = vec![
            Axis::new("x", AxisType::X),
            Axis::new("y", AxisType::Y).with_ticks(vec![0.into(), 2.into(), 4.into()]),
        ];
        unit.structure = Some(vec![
            OlliNode::group_with("x", vec![OlliNode::group("y")]),
            OlliNode::group("y"),
        ]);
        let tree = build(unit);

        let root = tree.get(tree.root()).unwrap();
        let x_axis = tree.get(root.children[0]).unwrap();
        let y_axis = tree.get(root.children[1]).unwrap();
        assert_eq!(x_axis.node_type, NodeType::XAxis);
        assert_eq!(y_axis.node_type, NodeType::YAxis);
        assert_eq!(y_axis.children.len(), 2);

        let a = x_axis.children[0];
        let nested_y = tree.children(a)[0];
        assert_eq!(tree.get(nested_y).unwrap().id, "olli-0-0-0");
        assert_eq!(tree.get(nested_y).unwrap().depth, 3);
        assert_eq!(tree.children(nested_y).len(), 2);
    }

    #[test]
    fn test_selection_is_subset_of_parent() {
        let mut unit = xy_unit();
        unit.axes = vec![Axis::new("y", AxisType::Y)];
        unit.structure = Some(vec![OlliNode::group_with("x", vec![OlliNode::group("y")])]);
        let tree = build(unit);

        for (index, node) in tree.iter() {
            let Some(parent) = node.parent else { continue };
            let parent_rows = tree.selection(parent);
            for row in tree.selection(index) {
                assert!(parent_rows.contains(&row), "{} escapes its parent", node.id);
            }
        }
    }

    /// Every grouped node's children together hold exactly its rows.
    fn assert_partitioned(tree: &ElaboratedTree) -> usize {
        let mut checked = 0;
        for (index, node) in tree.iter() {
            if node.groupby.is_none() || node.children.is_empty() {
                continue;
            }
            let own = tree.selection(index).len();
            let sum: usize = node.children.iter().map(|&c| tree.selection(c).len()).sum();
            assert_eq!(sum, own, "children of {} do not partition it", node.id);
            checked += 1;
        }
        checked
    }

    #[test]
    fn test_grouped_children_partition_parent() {
        let values = [-3.5, -0.25, 0.0, 1.75, 2.5, 9.9];
        let rows: Vec<Datum> = values
            .iter()
            .zip(["a", "b", "a", "c", "b", "a"])
            .map(|(&y, x)| datum(x, y))
            .collect();

        // Negative and fractional values, nice-step bins.
        let mut unit = xy_unit();
        unit.data = rows.clone();
        unit.axes = vec![Axis::new("y", AxisType::Y)];
        unit.structure = Some(vec![
            OlliNode::group_with("x", vec![OlliNode::group("y")]),
            OlliNode::group("y"),
        ]);
        assert!(assert_partitioned(&build(unit)) > 0);

        // Data beyond both ends of the ticks.
        let mut unit = xy_unit();
        unit.data = rows;
        unit.axes = vec![Axis::new("y", AxisType::Y).with_ticks(vec![0.into(), 1.into()])];
        assert!(assert_partitioned(&build(unit)) > 0);

        // Calendar-aligned temporal bins.
        let dates = ["2020-01-15", "2020-03-02", "2021-07-30", "2022-12-31"];
        let mut unit = UnitSpec::new(
            dates
                .iter()
                .map(|d| Datum::from([("t".to_string(), Value::from(*d))]))
                .collect(),
        );
        unit.fields = vec![FieldDef::new("t", MeasureType::Temporal)];
        unit.axes = vec![Axis::new("t", AxisType::X)];
        let tree = build(unit);
        assert_eq!(tree.selection(tree.root()).len(), dates.len());
        assert!(assert_partitioned(&tree) > 0);
    }

    #[test]
    fn test_empty_bins_are_leaves() {
        let mut unit = xy_unit();
        unit.axes = vec![Axis::new("y", AxisType::Y).with_ticks(vec![
            0.into(),
            1.5.into(),
            1.8.into(),
            4.into(),
        ])];
        unit.structure = Some(vec![OlliNode::group_with("y", vec![OlliNode::group("x")])]);
        let tree = build(unit);

        let axis = tree.children(tree.root())[0];
        let empty = tree.children(axis)[1];
        assert!(tree.selection(empty).is_empty());
        assert!(tree.get(empty).unwrap().is_leaf());
        assert!(!tree.children(tree.children(axis)[0]).is_empty());
    }

    #[test]
    fn test_ids_are_deterministic() {
        let mut unit = xy_unit();
        unit.axes = vec![Axis::new("x", AxisType::X), Axis::new("y", AxisType::Y)];
        let a = build(unit.clone());
        let b = build(unit);
        let ids_a: Vec<&str> = a.iter().map(|(_, n)| n.id.as_str()).collect();
        let ids_b: Vec<&str> = b.iter().map(|(_, n)| n.id.as_str()).collect();
        assert_eq!(ids_a, ids_b);
        assert!(b.generation() > a.generation());

        let mut unique = ids_a.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids_a.len());
    }

    #[test]
    fn test_independent_predicate_ignores_parent() {
        let mut unit = xy_unit();
        let high = Predicate::from(FieldPredicate::gte("y", 2));
        unit.structure = Some(vec![OlliNode::group_with(
            "x",
            vec![OlliNode::partition("high values", high.clone())],
        )]);
        let tree = build(unit);

        let a = tree.children(tree.root())[0];
        let partition = tree.children(a)[0];
        let node = tree.get(partition).unwrap();
        assert_eq!(node.full_predicate, high);
        assert_eq!(tree.selection(partition).len(), 2);
    }

    #[test]
    fn test_facet_children_are_views() {
        let mut unit = xy_unit();
        unit.facet = Some("x".into());
        unit.axes = vec![Axis::new("y", AxisType::Y)];
        let tree = build(unit);

        let root = tree.get(tree.root()).unwrap();
        assert_eq!(root.groupby.as_deref(), Some("x"));
        for &view in &root.children {
            let view_node = tree.get(view).unwrap();
            assert_eq!(view_node.node_type, NodeType::View);
            assert_eq!(tree.get(view_node.children[0]).unwrap().node_type, NodeType::YAxis);
        }
        // Sibling views share the same bins.
        let first = tree.children(root.children[0])[0];
        let second = tree.children(root.children[1])[0];
        assert_eq!(tree.children(first).len(), tree.children(second).len());
    }

    #[test]
    fn test_multi_unit_views() {
        let spec = OlliSpec::Multi(MultiSpec {
            operator: CompositionOperator::Concat,
            units: vec![xy_unit(), xy_unit()],
            title: None,
        });
        let tree = elaborate_tree(&spec, &ElaborateOptions::default()).unwrap();
        let root = tree.get(tree.root()).unwrap();
        assert_eq!(root.children.len(), 2);
        for (i, &view) in root.children.iter().enumerate() {
            let node = tree.get(view).unwrap();
            assert_eq!(node.node_type, NodeType::View);
            assert_eq!(node.spec_index, Some(i));
        }
        assert_eq!(tree.selection(tree.root()).len(), 6);
    }

    #[test]
    fn test_selection_scopes_domains() {
        let mut unit = xy_unit();
        unit.structure = Some(vec![OlliNode::group("x")]);
        unit.selection = Some(FieldPredicate::lt("y", 3).into());
        let tree = build(unit);
        let root = tree.root();
        assert_eq!(tree.selection(root).len(), 2);
        assert_eq!(tree.children(root).len(), 2);
        assert_eq!(tree.selection(tree.children(root)[0]).len(), 1);
    }
}
