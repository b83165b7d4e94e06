//! Template overrides: rename included templates and rewrite their arguments
//!
//! [`TemplateOverride`] publishes two functions and one node visitor to an
//! [`Environment`](crate::engine::Environment). At compile time the visitor
//! routes every parent, include and embed through the functions; at render
//! time the functions fold the [`ProviderChain`] over the template name and
//! the with-arguments.

mod chain;
mod error;
mod provider;
mod visitor;

use std::sync::Arc;

use serde_json::Value;

use crate::engine::{
    Context, Function, FunctionError, FunctionExtension, NodeVisitor, VisitorExtension,
};

pub use chain::ProviderChain;
pub use error::{OverrideError, Stage};
pub use provider::{ArgumentTableProvider, OverrideProvider, ProviderError, TableProvider};
pub use visitor::OverrideNodeVisitor;

/// Function returning the template name to render
pub const RENAME_FUNCTION: &str = "_override_template";

/// Function returning the variables to pass to the rendered template
pub const PARAMETERS_FUNCTION: &str = "_override_parameters";

/// Runs right after the built-in optimizer
pub const VISITOR_PRIORITY: i32 = crate::engine::OPTIMIZER_PRIORITY + 1;

/// Dispatcher holding the provider chain shared by both hook functions
#[derive(Debug, Clone, Default)]
pub struct TemplateOverride {
    chain: Arc<ProviderChain>,
}

impl TemplateOverride {
    pub fn new(chain: ProviderChain) -> Self {
        Self {
            chain: Arc::new(chain),
        }
    }

    /// Build the chain from `providers`, validating each one
    pub fn from_providers(
        providers: Vec<Box<dyn OverrideProvider>>,
    ) -> Result<Self, OverrideError> {
        Ok(Self::new(ProviderChain::new(providers)?))
    }

    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    /// Rename pipeline; a missing `with` or `context` counts as empty
    pub fn rename(
        &self,
        name: &str,
        only: bool,
        with: Option<&Context>,
        context: Option<&Context>,
    ) -> Result<String, OverrideError> {
        let empty = Context::new();
        self.chain.rewrite_template_name(
            name,
            with.unwrap_or(&empty),
            context.unwrap_or(&empty),
            only,
        )
    }

    /// Argument pipeline; a missing `with` or `context` counts as empty
    pub fn rewrite_args(
        &self,
        name: &str,
        only: bool,
        with: Option<&Context>,
        context: Option<&Context>,
    ) -> Result<Context, OverrideError> {
        let empty = Context::new();
        self.chain.preprocess_template_args(
            name,
            with.unwrap_or(&empty),
            context.unwrap_or(&empty),
            only,
        )
    }

    /// Entry point of [`RENAME_FUNCTION`]; an array of names is renamed element-wise
    pub fn call_rename(&self, args: &[Value]) -> Result<Value, OverrideError> {
        let hook = HookArguments::parse(RENAME_FUNCTION, args)?;
        let rename = |name: &str| self.rename(name, hook.only, hook.with, hook.context);
        match hook.name {
            Value::String(name) => rename(name.as_str()).map(Value::String),
            Value::Array(names) => names
                .iter()
                .map(|name| match name {
                    Value::String(name) => rename(name.as_str()).map(Value::String),
                    other => Err(invalid(
                        RENAME_FUNCTION,
                        format!("template names must be strings, got {}", other),
                    )),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Err(invalid(
                RENAME_FUNCTION,
                format!("template name must be a string or an array, got {}", other),
            )),
        }
    }

    /// Entry point of [`PARAMETERS_FUNCTION`]; for an array of names the first one is passed on
    pub fn call_rewrite_args(&self, args: &[Value]) -> Result<Value, OverrideError> {
        let hook = HookArguments::parse(PARAMETERS_FUNCTION, args)?;
        let name = match hook.name {
            Value::String(name) => name.as_str(),
            Value::Array(names) => names.first().and_then(Value::as_str).ok_or_else(|| {
                invalid(
                    PARAMETERS_FUNCTION,
                    "template name array must start with a string",
                )
            })?,
            other => {
                return Err(invalid(
                    PARAMETERS_FUNCTION,
                    format!("template name must be a string or an array, got {}", other),
                ))
            }
        };
        self.rewrite_args(name, hook.only, hook.with, hook.context)
            .map(Value::Object)
    }
}

impl FunctionExtension for TemplateOverride {
    fn functions(&self) -> Vec<(String, Function)> {
        let rename = self.clone();
        let parameters = self.clone();
        vec![
            (
                RENAME_FUNCTION.to_string(),
                function(move |args| Ok(rename.call_rename(args)?)),
            ),
            (
                PARAMETERS_FUNCTION.to_string(),
                function(move |args| Ok(parameters.call_rewrite_args(args)?)),
            ),
        ]
    }
}

impl VisitorExtension for TemplateOverride {
    fn node_visitors(&self) -> Vec<Box<dyn NodeVisitor>> {
        vec![Box::new(OverrideNodeVisitor)]
    }
}

fn function<F>(f: F) -> Function
where
    F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn invalid(function: &'static str, reason: impl Into<String>) -> OverrideError {
    OverrideError::InvalidArgument {
        function,
        reason: reason.into(),
    }
}

/// Positional arguments of a hook call: `(name, only, with, context)`
struct HookArguments<'a> {
    name: &'a Value,
    only: bool,
    with: Option<&'a Context>,
    context: Option<&'a Context>,
}

impl<'a> HookArguments<'a> {
    fn parse(function: &'static str, args: &'a [Value]) -> Result<Self, OverrideError> {
        let (name, rest) = args
            .split_first()
            .ok_or_else(|| invalid(function, "missing template name"))?;
        if rest.len() > 3 {
            return Err(invalid(
                function,
                format!("expected at most 4 arguments, got {}", args.len()),
            ));
        }

        let only = match rest.first() {
            None | Some(Value::Null) => false,
            Some(Value::Bool(only)) => *only,
            Some(other) => {
                return Err(invalid(
                    function,
                    format!("only flag must be a boolean, got {}", other),
                ))
            }
        };

        Ok(Self {
            name,
            only,
            with: mapping(function, "with", rest.get(1))?,
            context: mapping(function, "context", rest.get(2))?,
        })
    }
}

fn mapping<'a>(
    function: &'static str,
    what: &str,
    value: Option<&'a Value>,
) -> Result<Option<&'a Context>, OverrideError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(invalid(
            function,
            format!("{} must be a mapping, got {}", what, other),
        )),
    }
}
