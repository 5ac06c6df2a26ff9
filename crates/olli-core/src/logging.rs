//! Logging and debugging facilities for Olli.
//!
//! Olli uses the `tracing` crate for instrumentation. Install a subscriber in
//! the embedding application to see logs:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("olli_core::elaborate=debug")
//!     .init();
//! ```
//!
//! Use [`TreeDebug`] to print an elaborated tree as an outline:
//!
//! ```ignore
//! use olli_core::logging::TreeDebug;
//!
//! println!("{}", TreeDebug::new(&tree));
//! ```

use std::fmt::{self, Write as FmtWrite};

use crate::tree::{ElaboratedTree, NodeIndex};

/// Span names used throughout Olli for tracing.
pub mod span_names {
    /// Enrichment pass span.
    pub const ENRICH: &str = "olli::enrich";
    /// Wholesale rebuild after a selection change.
    pub const REBUILD: &str = "olli::rebuild";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core model target.
    pub const CORE: &str = "olli_core";
    /// Spec completion and tree elaboration.
    pub const ELABORATE: &str = "olli_core::elaborate";
    /// Predicate evaluation.
    pub const PREDICATE: &str = "olli_core::predicate";
    /// Description generation.
    pub const DESCRIBE: &str = "olli_core::describe";
    /// Enrichment pass.
    pub const ENRICH: &str = "olli_core::enrich";
    /// Signal emission.
    pub const SIGNAL: &str = "olli_core::signal";
    /// Focus and expansion changes in the runtime.
    pub const NAVIGATE: &str = "olli::navigate";
    /// Key binding and dispatch.
    pub const KEYBOARD: &str = "olli::keyboard";
    /// Configuration loading.
    pub const CONFIG: &str = "olli::config";
    /// Instance lifecycle: builds, rebuilds and dialogs.
    pub const INSTANCE: &str = "olli::instance";
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact single-line representation.
    Compact,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    pub style: TreeStyle,
    /// Whether to show node ids.
    pub show_ids: bool,
    /// Whether to show node types.
    pub show_types: bool,
    /// Whether to show the composed description under each node.
    pub show_descriptions: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_types: true,
            show_descriptions: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Options for detailed debugging output.
    pub fn detailed() -> Self {
        Self {
            show_descriptions: true,
            ..Default::default()
        }
    }

    /// Options for minimal output.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_types: false,
            show_descriptions: false,
            ..Default::default()
        }
    }
}

/// Outline formatter for an [`ElaboratedTree`].
///
/// Each line shows a node's short name, followed by its id and type when
/// enabled:
///
/// ```text
/// the chart [olli] (root)
/// ├── a [olli-0] (filteredData)
/// └── b [olli-1] (filteredData)
/// ```
#[derive(Debug, Clone)]
pub struct TreeDebug<'a> {
    tree: &'a ElaboratedTree,
    options: TreeFormatOptions,
}

impl<'a> TreeDebug<'a> {
    pub fn new(tree: &'a ElaboratedTree) -> Self {
        Self {
            tree,
            options: TreeFormatOptions::default(),
        }
    }

    pub fn with_options(tree: &'a ElaboratedTree, options: TreeFormatOptions) -> Self {
        Self { tree, options }
    }

    /// Format the whole tree.
    pub fn format_tree(&self) -> String {
        if self.tree.is_empty() {
            return "(empty)\n".to_string();
        }
        self.format_subtree(self.tree.root())
    }

    /// Format the subtree rooted at `index`.
    pub fn format_subtree(&self, index: NodeIndex) -> String {
        let mut output = String::new();
        self.format_subtree_into(index, 0, true, &mut output);
        output
    }

    fn format_subtree_into(&self, index: NodeIndex, depth: usize, is_last: bool, output: &mut String) {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return;
        }
        let Some(node) = self.tree.get(index) else {
            return;
        };

        output.push_str(&self.build_prefix(depth, is_last));
        output.push_str(&crate::description::short_label(self.tree, index));
        if self.options.show_ids {
            write!(output, " [{}]", node.id).expect("write to String");
        }
        if self.options.show_types {
            write!(output, " ({})", node.node_type).expect("write to String");
        }
        output.push('\n');

        if self.options.show_descriptions {
            let text = self.tree.description_text(index);
            if !text.is_empty() {
                writeln!(output, "{}  {}", self.build_text_prefix(depth + 1), text)
                    .expect("write to String");
            }
        }

        let child_count = node.children.len();
        for (i, &child) in node.children.iter().enumerate() {
            self.format_subtree_into(child, depth + 1, i + 1 == child_count, output);
        }
    }

    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (corner, last) = match self.options.style {
            TreeStyle::Ascii => ("+-- ", "`-- "),
            TreeStyle::Unicode => ("\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} "),
            TreeStyle::Compact => ("- ", "- "),
        };

        let mut prefix = self.build_text_prefix(depth - 1);
        prefix.push_str(if is_last { last } else { corner });
        prefix
    }

    fn build_text_prefix(&self, depth: usize) -> String {
        let branch = match self.options.style {
            TreeStyle::Ascii => "|",
            TreeStyle::Unicode => "\u{2502}",
            TreeStyle::Compact => " ",
        };
        let mut prefix = String::new();
        for _ in 0..depth {
            prefix.push_str(branch);
            for _ in 0..self.options.indent_size {
                prefix.push(' ');
            }
        }
        prefix
    }
}

impl fmt::Display for TreeDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_tree())
    }
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Useful for timing an operation with a subscriber that records span
/// durations.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "olli::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}
