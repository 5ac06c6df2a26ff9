//! Error types for the Olli core model.

use crate::description::Token;
use crate::tree::NodeType;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while elaborating or describing a chart spec.
///
/// These signal a defect in the spec or in the calling code and are surfaced
/// to the embedder. Evaluation problems inside predicates are not reported
/// here; they fail open (see [`crate::predicate::selection_test`]).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A field is referenced but neither declared nor present in the data.
    #[error("Unknown field '{field}' referenced by {context}")]
    UnknownField { field: String, context: String },

    /// A value could not be interpreted for the field's type.
    #[error("Invalid value for field '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// The spec is structurally unusable.
    #[error("Malformed spec: {0}")]
    MalformedSpec(String),

    /// A description token was requested for a node type that never renders it.
    #[error("Token '{token}' is not supported for {node_type} nodes")]
    UnsupportedToken { token: Token, node_type: NodeType },

    /// A node index does not belong to the tree it was used with.
    #[error("Node index {0} is out of range")]
    InvalidNode(usize),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an unknown-field error.
    pub fn unknown_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
            context: context.into(),
        }
    }

    /// Create an invalid-value error.
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}
