//! Error types for the Olli runtime.

use std::path::PathBuf;

use crate::keyboard::{Action, KeyParseError};

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring or building an Olli instance.
///
/// Navigation itself never fails; a key with no valid target does nothing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Elaboration or description of the chart failed.
    #[error(transparent)]
    Core(#[from] olli_core::Error),

    /// The configuration is not valid TOML or has the wrong shape.
    #[error("Invalid configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Cannot serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// A configuration value is well formed but unusable.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidConfig { key: String, message: String },

    /// The configuration file could not be read.
    #[error("Cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A key binding override names no known action.
    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    #[error("Invalid key combination: {0}")]
    KeyParse(#[from] KeyParseError),

    /// A key combination is already bound to another action.
    #[error("'{keys}' is already bound to {existing}, cannot bind it to {requested}")]
    BindingConflict {
        keys: String,
        existing: Action,
        requested: Action,
    },
}
