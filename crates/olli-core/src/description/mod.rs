//! Spoken descriptions of tree nodes.
//!
//! A description is built from [`Token`]s. Each node type supports a fixed
//! set of tokens; the [`Verbosity`] or per-type overrides in
//! [`DescriptionSettings`] pick which of them are spoken. Token text is
//! computed from the node's live selection, so descriptions can be
//! recomputed after the data changes without rebuilding the tree.
//!
//! The final text joins the non-empty tokens in canonical order:
//!
//! ```text
//! 2 of 3. Japan. 79 values. Level 2. In x-axis origin.
//! ```

mod aggregate;
mod tokens;

pub use aggregate::{Summary, quartile, summarize};
pub(crate) use tokens::short_label;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::logging::targets;
use crate::tree::{ElaboratedTree, NodeIndex, NodeType};

/// A unit of description text. Declaration order is the spoken order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Token {
    /// Position among siblings.
    Index,
    /// Kind of node.
    Type,
    Name,
    /// What the node contains.
    Children,
    /// Range or categories of the grouped field.
    Data,
    /// Number of selected records.
    Size,
    Depth,
    Parent,
    /// Min, max and average of ungrouped quantitative fields.
    Aggregate,
    /// Size rank among siblings.
    Quartile,
}

impl Token {
    pub fn as_str(self) -> &'static str {
        match self {
            Token::Index => "index",
            Token::Type => "type",
            Token::Name => "name",
            Token::Children => "children",
            Token::Data => "data",
            Token::Size => "size",
            Token::Depth => "depth",
            Token::Parent => "parent",
            Token::Aggregate => "aggregate",
            Token::Quartile => "quartile",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token text of one node, in canonical order.
pub type Description = BTreeMap<Token, String>;

/// How much is spoken for each node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Every supported token.
    #[default]
    High,
    /// A terse subset.
    Low,
}

/// Tokens a node type can render.
pub fn supported_tokens(node_type: NodeType) -> &'static [Token] {
    use Token::*;
    match node_type {
        NodeType::Root => &[Type, Name, Children, Size],
        NodeType::View => &[Index, Type, Name, Children, Size, Depth, Parent],
        NodeType::XAxis | NodeType::YAxis | NodeType::Legend | NodeType::Other => {
            &[Type, Name, Children, Data, Size, Depth, Parent]
        }
        NodeType::FilteredData => &[
            Index, Name, Children, Size, Depth, Parent, Aggregate, Quartile,
        ],
        NodeType::Annotations => &[Name, Children, Depth, Parent],
    }
}

/// Tokens spoken at low verbosity.
pub fn low_verbosity_tokens(node_type: NodeType) -> &'static [Token] {
    use Token::*;
    match node_type {
        NodeType::Root => &[Type, Name, Children],
        NodeType::View => &[Index, Name, Children],
        NodeType::XAxis | NodeType::YAxis | NodeType::Legend | NodeType::Other => {
            &[Type, Name, Data]
        }
        NodeType::FilteredData => &[Index, Name, Size],
        NodeType::Annotations => &[Name, Children],
    }
}

/// Which tokens to render per node type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptionSettings {
    #[serde(default)]
    pub verbosity: Verbosity,
    /// Explicit token lists that replace the verbosity default.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<NodeType, Vec<Token>>,
}

impl DescriptionSettings {
    pub fn with_verbosity(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            overrides: BTreeMap::new(),
        }
    }

    /// Tokens to render for `node_type`, in canonical order.
    ///
    /// Fails if an override names a token the type does not support.
    pub fn tokens_for(&self, node_type: NodeType) -> Result<Vec<Token>> {
        let mut tokens = match self.overrides.get(&node_type) {
            Some(tokens) => {
                check_supported(node_type, tokens)?;
                tokens.clone()
            }
            None => match self.verbosity {
                Verbosity::High => supported_tokens(node_type).to_vec(),
                Verbosity::Low => low_verbosity_tokens(node_type).to_vec(),
            },
        };
        tokens.sort();
        tokens.dedup();
        Ok(tokens)
    }

    /// Check every override against the supported token sets.
    pub fn validate(&self) -> Result<()> {
        self.overrides
            .iter()
            .try_for_each(|(&node_type, tokens)| check_supported(node_type, tokens))
    }
}

fn check_supported(node_type: NodeType, tokens: &[Token]) -> Result<()> {
    let supported = supported_tokens(node_type);
    match tokens.iter().find(|t| !supported.contains(t)) {
        Some(&token) => Err(Error::UnsupportedToken { token, node_type }),
        None => Ok(()),
    }
}

/// Compute the description of one node from its live selection.
///
/// Every token must be supported by the node's type.
pub fn describe_node(
    tree: &ElaboratedTree,
    index: NodeIndex,
    selected: &[Token],
) -> Result<Description> {
    let node = tree.get(index).ok_or(Error::InvalidNode(index.get()))?;
    check_supported(node.node_type, selected)?;

    Ok(selected
        .iter()
        .map(|&token| (token, tokens::token_text(tree, index, token)))
        .collect())
}

/// Describe every node of `tree` according to `settings`.
pub fn describe_tree(tree: &mut ElaboratedTree, settings: &DescriptionSettings) -> Result<()> {
    let mut descriptions = Vec::with_capacity(tree.len());
    for (index, node) in tree.iter() {
        let tokens = settings.tokens_for(node.node_type)?;
        descriptions.push((index, describe_node(tree, index, &tokens)?));
    }
    for (index, description) in descriptions {
        if let Some(node) = tree.get_mut(index) {
            node.description = description;
        }
    }
    tracing::debug!(target: targets::DESCRIBE, nodes = tree.len(), "described tree");
    Ok(())
}

fn trailing_punctuation() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\s.,;:]+$").expect("valid pattern"))
}

/// Join token text into a sentence sequence.
///
/// Each part is trimmed, stripped of trailing punctuation and capitalized;
/// parts are joined with ". " and the whole ends with a period. Empty parts
/// are skipped. `enrichment`, when present, is appended as a final part.
pub fn compose(description: &Description, enrichment: Option<&str>) -> String {
    let parts: Vec<String> = description
        .values()
        .map(String::as_str)
        .chain(enrichment)
        .map(|text| trailing_punctuation().replace(text.trim(), "").into_owned())
        .filter(|text| !text.is_empty())
        .map(|text| capitalize(&text))
        .collect();

    if parts.is_empty() {
        return String::new();
    }
    format!("{}.", parts.join(". "))
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
