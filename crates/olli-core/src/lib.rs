//! Core model for Olli, an accessible tree view of charts.
//!
//! This crate turns a declarative chart spec into an [`ElaboratedTree`]: a
//! hierarchy of progressively filtered views of the chart's data that a
//! screen-reader user can explore. It is render-free; the `olli` crate adds
//! keyboard navigation and accessibility output on top.
//!
//! - **Values**: records of nulls, booleans, numbers, strings and dates
//! - **Specs**: fields, axes, legends, facets and a declared structure
//! - **Domains and bins**: sorted unique values and nice histogram ranges
//! - **Predicates**: field tests, composition, simplification, evaluation
//! - **Elaboration**: spec completion and realized tree construction
//! - **Descriptions**: token-based spoken text per node
//! - **Enrichment**: an async seam for extra description text; stale results
//!   are dropped by generation
//!
//! # Example
//!
//! ```
//! use olli_core::{ElaborateOptions, OlliSpec, elaborate_tree};
//!
//! let spec = OlliSpec::from_json(r#"{
//!     "data": [{"x": "a", "y": 1}, {"x": "b", "y": 2}, {"x": "a", "y": 3}],
//!     "structure": [{"groupby": "x"}]
//! }"#)?;
//! let tree = elaborate_tree(&spec, &ElaborateOptions::default())?;
//!
//! let root = tree.root();
//! assert_eq!(tree.children(root).len(), 2);
//! assert_eq!(tree.selection(tree.children(root)[0]).len(), 2);
//! # Ok::<(), olli_core::Error>(())
//! ```

pub mod bins;
pub mod description;
pub mod domain;
pub mod enrich;
mod error;
pub mod infer;
pub mod logging;
pub mod predicate;
pub mod signal;
pub mod spec;
pub mod tree;
pub mod value;

pub use bins::{Bin, get_bins};
pub use description::{
    Description, DescriptionSettings, Token, Verbosity, compose, describe_node, describe_tree,
};
pub use domain::get_domain;
pub use enrich::{
    CancellationToken, EnrichError, Enricher, EnrichmentCache, EnrichmentPatch, EnrichmentRequest,
    apply_patch, apply_patches, enrich_tree,
};
pub use error::{Error, Result};
pub use infer::{elaborate_spec, infer_structure, infer_type};
pub use logging::{PerfSpan, TreeDebug, TreeFormatOptions, TreeStyle};
pub use predicate::{
    FieldPredicate, FieldTest, Predicate, PredicateError, field_to_predicates, selection_test,
    simplify_predicate,
};
pub use signal::{ConnectionId, Signal};
pub use spec::{
    Axis, AxisType, CompositionOperator, FieldDef, Legend, LegendChannel, Mark, MeasureType,
    MultiSpec, OlliNode, OlliSpec, PredicateScope, UnitSpec,
};
pub use tree::{ElaborateOptions, ElaboratedNode, ElaboratedTree, NodeIndex, NodeType, elaborate_tree};
pub use value::{Dataset, Datum, TimeUnit, Value};
