//! Instance configuration, loadable from TOML.
//!
//! ```toml
//! namespace = "sales-chart"
//! render = "tree"
//! verbosity = "low"
//!
//! [tokens]
//! xAxis = ["name", "data"]
//!
//! [keys]
//! open_help = "Shift+Slash"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use olli_core::logging::targets;
use olli_core::{DescriptionSettings, ElaborateOptions, NodeType, Token, Verbosity};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::keyboard::KeyBindings;

/// How an instance presents its chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// A navigable tree.
    #[default]
    Tree,
    /// A flat table of every record.
    Table,
}

/// Settings of one Olli instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OlliConfig {
    /// Id of the root node and prefix of every other id.
    pub namespace: String,
    pub render: RenderMode,
    pub verbosity: Verbosity,
    /// Token lists replacing the verbosity default per node type.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tokens: BTreeMap<NodeType, Vec<Token>>,
    /// Key binding overrides, action name to key combination.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub keys: BTreeMap<String, String>,
}

impl Default for OlliConfig {
    fn default() -> Self {
        Self {
            namespace: "olli".to_string(),
            render: RenderMode::default(),
            verbosity: Verbosity::default(),
            tokens: BTreeMap::new(),
            keys: BTreeMap::new(),
        }
    }
}

impl OlliConfig {
    /// Parse and validate a configuration.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(target: targets::CONFIG, path = %path.display(), "loading configuration");
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Check everything that parsing alone cannot.
    ///
    /// The namespace must be a non-empty id without whitespace, token lists
    /// must be supported by their node type and key overrides must parse
    /// without conflicts.
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() || self.namespace.chars().any(char::is_whitespace) {
            return Err(Error::InvalidConfig {
                key: "namespace".to_string(),
                message: format!("'{}' is not a valid id", self.namespace),
            });
        }
        self.description_settings().validate()?;
        self.key_bindings()?;
        Ok(())
    }

    pub fn description_settings(&self) -> DescriptionSettings {
        DescriptionSettings {
            verbosity: self.verbosity,
            overrides: self.tokens.clone(),
        }
    }

    pub fn elaborate_options(&self) -> ElaborateOptions {
        ElaborateOptions {
            namespace: self.namespace.clone(),
            descriptions: self.description_settings(),
        }
    }

    /// Default bindings with the configured overrides applied.
    pub fn key_bindings(&self) -> Result<KeyBindings> {
        let mut bindings = KeyBindings::defaults();
        bindings.apply_overrides(&self.keys)?;
        Ok(bindings)
    }
}
