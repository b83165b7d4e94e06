//! The provider contract and the built-in table providers

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use crate::engine::Context;

/// Error reported by a provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A participant in the override chain
///
/// Both hooks receive the template name, the with-arguments of the include,
/// the enclosing render context and the `only` flag. Implementations must not
/// depend on anything but their own state and these inputs; the defaults leave
/// everything unchanged.
pub trait OverrideProvider: Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Checked once when the provider joins a chain
    fn validate(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Return the template name to render instead of `name`
    fn rewrite_template_name(
        &self,
        name: &str,
        _with: &Context,
        _context: &Context,
        _only: bool,
    ) -> Result<String, ProviderError> {
        Ok(name.to_string())
    }

    /// Return the full replacement for the with-arguments of an include
    fn preprocess_template_args(
        &self,
        _name: &str,
        with: &Context,
        _context: &Context,
        _only: bool,
    ) -> Result<Context, ProviderError> {
        Ok(with.clone())
    }
}

/// Renames templates through a fixed lookup table
///
/// Names absent from the table pass through unchanged. An entry with an empty
/// source or target name is not read as "no mapping": `validate` rejects it, so
/// the chain holding the table fails to build.
#[derive(Debug, Clone, Default)]
pub struct TableProvider {
    templates: HashMap<String, String>,
}

impl TableProvider {
    pub fn new(templates: HashMap<String, String>) -> Self {
        Self { templates }
    }

    /// Builder form adding one `from -> to` entry
    pub fn with_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.templates.insert(from.into(), to.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TableProvider {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(from, to)| (from.into(), to.into()))
                .collect(),
        )
    }
}

impl OverrideProvider for TableProvider {
    fn name(&self) -> &str {
        "table"
    }

    fn validate(&self) -> Result<(), ProviderError> {
        match self
            .templates
            .iter()
            .find(|(from, to)| from.is_empty() || to.is_empty())
        {
            Some((from, to)) => Err(ProviderError::new(format!(
                "empty template name in rename '{}' -> '{}'",
                from, to
            ))),
            None => Ok(()),
        }
    }

    fn rewrite_template_name(
        &self,
        name: &str,
        _with: &Context,
        _context: &Context,
        _only: bool,
    ) -> Result<String, ProviderError> {
        Ok(self
            .templates
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string()))
    }
}

/// Replaces the value of with-arguments whose key is in its table
///
/// Keys missing from the with-arguments are not added.
#[derive(Debug, Clone, Default)]
pub struct ArgumentTableProvider {
    arguments: Context,
}

impl ArgumentTableProvider {
    pub fn new(arguments: Context) -> Self {
        Self { arguments }
    }

    /// Builder form adding one replacement
    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }
}

impl OverrideProvider for ArgumentTableProvider {
    fn name(&self) -> &str {
        "arguments"
    }

    fn preprocess_template_args(
        &self,
        _name: &str,
        with: &Context,
        _context: &Context,
        _only: bool,
    ) -> Result<Context, ProviderError> {
        Ok(with
            .iter()
            .map(|(key, value)| {
                let value = self.arguments.get(key).unwrap_or(value);
                (key.clone(), value.clone())
            })
            .collect())
    }
}
