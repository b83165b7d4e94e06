//! TOML configuration for the engine and the override providers
//!
//! ```toml
//! [engine]
//! strict_variables = true
//!
//! [[providers]]
//! type = "table"
//! templates = { "static1" = "static2" }
//!
//! [[providers]]
//! type = "arguments"
//! arguments = { arg2 = "value3" }
//! ```
//!
//! Providers join the chain in the order they are listed.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::engine::{Context, EngineConfig};
use crate::overrides::{
    ArgumentTableProvider, OverrideError, OverrideProvider, ProviderChain, TableProvider,
};

/// Errors that can occur when loading a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse configuration TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error(transparent)]
    Override(#[from] OverrideError),
}

/// Engine options plus the ordered provider list
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OverrideConfig {
    pub engine: EngineConfig,
    pub providers: Vec<ProviderConfig>,
}

/// One `[[providers]]` entry, selected by its `type` key
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Table(TableConfig),
    Arguments(ArgumentsConfig),
}

/// `type = "table"`: template renames
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableConfig {
    pub templates: HashMap<String, String>,
}

/// `type = "arguments"`: with-argument replacements
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArgumentsConfig {
    pub arguments: Context,
}

impl ProviderConfig {
    fn build(&self) -> Box<dyn OverrideProvider> {
        match self {
            Self::Table(table) => Box::new(TableProvider::new(table.templates.clone())),
            Self::Arguments(args) => Box::new(ArgumentTableProvider::new(args.arguments.clone())),
        }
    }
}

impl OverrideConfig {
    /// Load a configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Build the provider chain in listed order
    pub fn build_chain(&self) -> Result<ProviderChain, ConfigError> {
        let providers = self.providers.iter().map(ProviderConfig::build).collect();
        Ok(ProviderChain::new(providers)?)
    }
}
