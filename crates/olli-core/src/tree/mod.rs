//! The elaborated accessibility tree.
//!
//! [`ElaboratedTree`] owns every node in an arena; parent and child links are
//! [`NodeIndex`] values into it. Node ids are strings derived from the
//! structural path (`olli`, `olli-0`, `olli-0-2`, ...), so the same spec always
//! produces the same ids and focus can be restored across rebuilds.

mod elaborate;

pub use elaborate::{ElaborateOptions, elaborate_tree};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::description::Description;
use crate::predicate::{Predicate, selection_test};
use crate::spec::{OlliSpec, UnitSpec};
use crate::value::Datum;

/// Counter stamping each elaboration with a fresh generation.
static GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    GENERATION.fetch_add(1, Ordering::Relaxed)
}

const ROOT_SLOT: [NodeIndex; 1] = [NodeIndex(0)];

/// Kind of an elaborated node, decided by the role of the field it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Root,
    View,
    XAxis,
    YAxis,
    Legend,
    FilteredData,
    Annotations,
    Other,
}

impl NodeType {
    /// All node types, in declaration order.
    pub const ALL: [NodeType; 8] = [
        NodeType::Root,
        NodeType::View,
        NodeType::XAxis,
        NodeType::YAxis,
        NodeType::Legend,
        NodeType::FilteredData,
        NodeType::Annotations,
        NodeType::Other,
    ];

    /// Spoken name of the node kind.
    pub fn spoken(self) -> &'static str {
        match self {
            NodeType::Root => "chart",
            NodeType::View => "view",
            NodeType::XAxis => "x-axis",
            NodeType::YAxis => "y-axis",
            NodeType::Legend => "legend",
            NodeType::FilteredData => "data",
            NodeType::Annotations => "annotations",
            NodeType::Other => "group",
        }
    }

    /// The wire name, as used in configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Root => "root",
            NodeType::View => "view",
            NodeType::XAxis => "xAxis",
            NodeType::YAxis => "yAxis",
            NodeType::Legend => "legend",
            NodeType::FilteredData => "filteredData",
            NodeType::Annotations => "annotations",
            NodeType::Other => "other",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index of a node inside its [`ElaboratedTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub(crate) usize);

impl NodeIndex {
    /// The raw arena slot.
    pub fn get(self) -> usize {
        self.0
    }
}

/// A realized node of the accessibility tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ElaboratedNode {
    /// Stable id derived from the structural path.
    pub id: String,
    pub node_type: NodeType,
    pub parent: Option<NodeIndex>,
    pub children: Vec<NodeIndex>,
    /// Conjunction of every predicate from the root to this node.
    pub full_predicate: Predicate,
    /// Field this node branches on, for group nodes.
    pub groupby: Option<String>,
    /// This node's own predicate, for bin and filter nodes.
    pub predicate: Option<Predicate>,
    /// Name given by the structure, for named partitions.
    pub name: Option<String>,
    pub explanation: Option<String>,
    pub description: Description,
    /// Extra text appended by the enrichment pass.
    pub enrichment: Option<String>,
    pub depth: usize,
    /// Unit of a multi-unit spec this node belongs to.
    pub spec_index: Option<usize>,
}

impl ElaboratedNode {
    fn new(id: String, node_type: NodeType, parent: Option<NodeIndex>, depth: usize) -> Self {
        Self {
            id,
            node_type,
            parent,
            children: Vec::new(),
            full_predicate: Predicate::always(),
            groupby: None,
            predicate: None,
            name: None,
            explanation: None,
            description: Description::new(),
            enrichment: None,
            depth,
            spec_index: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// An elaborated tree together with the elaborated spec it was built from.
#[derive(Debug, Clone)]
pub struct ElaboratedTree {
    nodes: Vec<ElaboratedNode>,
    spec: OlliSpec,
    generation: u64,
}

impl ElaboratedTree {
    /// The root node index.
    pub fn root(&self) -> NodeIndex {
        NodeIndex(0)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Generation stamp of this elaboration. Later builds have larger stamps.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The elaborated spec the tree was built from.
    pub fn spec(&self) -> &OlliSpec {
        &self.spec
    }

    pub fn get(&self, index: NodeIndex) -> Option<&ElaboratedNode> {
        self.nodes.get(index.0)
    }

    pub fn get_mut(&mut self, index: NodeIndex) -> Option<&mut ElaboratedNode> {
        self.nodes.get_mut(index.0)
    }

    /// Iterate over nodes in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, &ElaboratedNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeIndex(i), n))
    }

    /// Find a node by its id.
    pub fn find_by_id(&self, id: &str) -> Option<NodeIndex> {
        self.nodes.iter().position(|n| n.id == id).map(NodeIndex)
    }

    pub fn parent(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.get(index).and_then(|n| n.parent)
    }

    pub fn children(&self, index: NodeIndex) -> &[NodeIndex] {
        self.get(index).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Siblings including `index`, in order. The root is its own only sibling.
    pub fn siblings(&self, index: NodeIndex) -> &[NodeIndex] {
        match self.parent(index) {
            Some(parent) => self.children(parent),
            None => &ROOT_SLOT,
        }
    }

    /// Position of `index` among its siblings.
    pub fn position_in_parent(&self, index: NodeIndex) -> usize {
        self.siblings(index)
            .iter()
            .position(|&i| i == index)
            .unwrap_or(0)
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        std::iter::successors(self.parent(index), move |&i| self.parent(i))
    }

    /// The unit spec a node's data comes from.
    pub fn unit_for(&self, index: NodeIndex) -> Option<&UnitSpec> {
        let spec_index = self.get(index)?.spec_index.unwrap_or(0);
        self.spec.unit(spec_index)
    }

    /// Records selected by a node, computed fresh from its full predicate.
    ///
    /// The synthetic root of a multi-unit tree selects the records of every
    /// unit.
    pub fn selection(&self, index: NodeIndex) -> Vec<&Datum> {
        let Some(node) = self.get(index) else {
            return Vec::new();
        };
        match node.spec_index {
            Some(i) => self
                .spec
                .unit(i)
                .map(|unit| selection_test(&unit.data, &node.full_predicate))
                .unwrap_or_default(),
            None => self
                .spec
                .units()
                .iter()
                .flat_map(|unit| {
                    let predicate = unit.selection.clone().unwrap_or_else(Predicate::always);
                    selection_test(&unit.data, &node.full_predicate.conjoin(predicate))
                })
                .collect(),
        }
    }

    /// Fields grouped on the path from the root to `index`, inclusive.
    pub fn path_groupbys(&self, index: NodeIndex) -> Vec<&str> {
        std::iter::once(index)
            .chain(self.ancestors(index))
            .filter_map(|i| self.get(i)?.groupby.as_deref())
            .collect()
    }

    /// Nearest ancestor-or-self that is a view or the root.
    pub fn enclosing_view(&self, index: NodeIndex) -> NodeIndex {
        std::iter::once(index)
            .chain(self.ancestors(index))
            .find(|&i| {
                self.get(i)
                    .is_some_and(|n| matches!(n.node_type, NodeType::View | NodeType::Root))
            })
            .unwrap_or_else(|| self.root())
    }

    /// Full description text of a node, with any enrichment appended.
    pub fn description_text(&self, index: NodeIndex) -> String {
        match self.get(index) {
            Some(node) => crate::description::compose(&node.description, node.enrichment.as_deref()),
            None => String::new(),
        }
    }
}
