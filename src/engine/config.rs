//! Configuration for the template environment

use serde::Deserialize;

/// Options controlling how templates are rendered
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fail on undefined variables instead of rendering them as empty
    pub strict_variables: bool,

    /// Maximum nesting of includes, embeds and parents
    pub max_include_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict_variables: false,
            max_include_depth: 64,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether undefined variables are an error
    pub fn with_strict_variables(mut self, strict: bool) -> Self {
        self.strict_variables = strict;
        self
    }

    /// Set the maximum template nesting depth
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }
}
