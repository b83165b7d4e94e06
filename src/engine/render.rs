//! Evaluation of compiled templates against a context

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::{Context, Environment, RenderError, Template};
use crate::parser::ast::*;

/// Block bodies in effect, keyed by block name; the most-derived definition wins.
/// Each body is paired with the root module its embeds index into.
type Blocks<'a> = HashMap<&'a str, (&'a [Spanned<Node>], &'a Module)>;

pub(crate) struct Renderer<'e> {
    env: &'e Environment,
}

impl<'e> Renderer<'e> {
    pub(crate) fn new(env: &'e Environment) -> Self {
        Self { env }
    }

    /// Render a template root; its embeds resolve against its own `embedded` list
    pub(crate) fn render_module(
        &self,
        module: &Module,
        context: &Context,
        depth: usize,
    ) -> Result<String, RenderError> {
        self.render_with_blocks(module, module, Blocks::new(), context, depth)
    }

    /// Render `module`, which is `root` itself or one of its embedded modules
    fn render_with_blocks<'a>(
        &self,
        module: &'a Module,
        root: &'a Module,
        mut blocks: Blocks<'a>,
        context: &Context,
        depth: usize,
    ) -> Result<String, RenderError> {
        let limit = self.env.config().max_include_depth;
        if depth > limit {
            return Err(RenderError::RecursionLimit {
                limit,
                template: module.name.clone(),
            });
        }

        let Some(parent) = &module.parent else {
            let mut out = String::new();
            self.render_nodes(&module.body, root, &blocks, context, depth, &mut out)?;
            return Ok(out);
        };

        for block in module.blocks() {
            blocks
                .entry(block.name.as_str())
                .or_insert((block.body.as_slice(), root));
        }

        let value = self.evaluate(parent, context)?;
        let template = self.resolve(&value, &parent.span)?;
        tracing::trace!(
            template = %module.name,
            parent = %template.name(),
            "rendering parent template"
        );
        self.render_with_blocks(
            template.module(),
            template.module(),
            blocks,
            context,
            depth + 1,
        )
    }

    fn render_nodes<'a>(
        &self,
        nodes: &'a [Spanned<Node>],
        root: &'a Module,
        blocks: &Blocks<'a>,
        context: &Context,
        depth: usize,
        out: &mut String,
    ) -> Result<(), RenderError> {
        for node in nodes {
            match &node.node {
                Node::Text(text) => out.push_str(text),
                Node::Print(expr) => {
                    let value = self.evaluate(expr, context)?;
                    out.push_str(&to_output(&value, &expr.span)?);
                }
                Node::Block(block) => {
                    let (body, owner) = blocks
                        .get(block.name.as_str())
                        .copied()
                        .unwrap_or((block.body.as_slice(), root));
                    self.render_nodes(body, owner, blocks, context, depth, out)?;
                }
                Node::Include(include) => {
                    out.push_str(&self.render_include(include, root, context, depth)?);
                }
            }
        }
        Ok(())
    }

    fn render_include(
        &self,
        include: &IncludeNode,
        root: &Module,
        context: &Context,
        depth: usize,
    ) -> Result<String, RenderError> {
        let template: Arc<Template>;
        let (module, owner) = match &include.target {
            IncludeTarget::Expression(expr) => {
                let value = self.evaluate(expr, context)?;
                match self.resolve(&value, &expr.span) {
                    Ok(resolved) => {
                        template = resolved;
                        (template.module(), template.module())
                    }
                    Err(RenderError::TemplateNotFound { name }) if include.ignore_missing => {
                        tracing::debug!(template = %name, "skipping missing include");
                        return Ok(String::new());
                    }
                    Err(e) => return Err(e),
                }
            }
            IncludeTarget::Embedded { filename, index } => {
                let embedded =
                    root.embedded
                        .get(*index)
                        .ok_or_else(|| RenderError::MissingEmbedded {
                            template: filename.clone(),
                            index: *index,
                        })?;
                (embedded, root)
            }
        };

        let variables = match &include.variables {
            None => Context::new(),
            Some(expr) => match self.evaluate(expr, context)? {
                Value::Object(map) => map,
                Value::Null => Context::new(),
                other => {
                    return Err(RenderError::Evaluation {
                        message: format!(
                            "Variables passed to an include must be a mapping, got {}",
                            type_name(&other)
                        ),
                        span: expr.span.clone(),
                    })
                }
            },
        };

        let scope = if include.only {
            variables
        } else {
            let mut merged = context.clone();
            merged.extend(variables);
            merged
        };

        self.render_with_blocks(module, owner, Blocks::new(), &scope, depth + 1)
    }

    /// Load the first existing template named by `value`, a name or an array of names
    fn resolve(&self, value: &Value, span: &Span) -> Result<Arc<Template>, RenderError> {
        let candidates: Vec<&str> = match value {
            Value::String(name) => vec![name.as_str()],
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().ok_or_else(|| RenderError::Evaluation {
                        message: format!("Template names must be strings, got {}", type_name(item)),
                        span: span.clone(),
                    })
                })
                .collect::<Result<_, _>>()?,
            other => {
                return Err(RenderError::Evaluation {
                    message: format!(
                        "Template name must be a string or an array of strings, got {}",
                        type_name(other)
                    ),
                    span: span.clone(),
                })
            }
        };

        match candidates.iter().find(|name| self.env.exists(name)) {
            Some(name) => self.env.load_template(name),
            None => Err(RenderError::TemplateNotFound {
                name: candidates.join(", "),
            }),
        }
    }

    pub(crate) fn evaluate(&self, expr: &Expr, context: &Context) -> Result<Value, RenderError> {
        let strict = self.env.config().strict_variables;
        match &expr.node {
            Expression::Constant(value) => Ok(value.clone()),
            Expression::Name(name) if name == CONTEXT_VARIABLE => {
                Ok(Value::Object(context.clone()))
            }
            Expression::Name(name) => match context.get(name) {
                Some(value) => Ok(value.clone()),
                None if strict => Err(RenderError::UndefinedVariable {
                    name: name.clone(),
                    span: expr.span.clone(),
                }),
                None => Ok(Value::Null),
            },
            Expression::Map(entries) => entries
                .iter()
                .map(|(key, value)| Ok((key.clone(), self.evaluate(value, context)?)))
                .collect::<Result<Context, RenderError>>()
                .map(Value::Object),
            Expression::Array(items) => items
                .iter()
                .map(|item| self.evaluate(item, context))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Expression::Attribute { object, name } => {
                let value = self.evaluate(object, context)?;
                match value.as_object().and_then(|map| map.get(name)) {
                    Some(attribute) => Ok(attribute.clone()),
                    None if strict => Err(RenderError::Evaluation {
                        message: format!(
                            "Key '{}' does not exist on {}",
                            name,
                            type_name(&value)
                        ),
                        span: expr.span.clone(),
                    }),
                    None => Ok(Value::Null),
                }
            }
            Expression::Concat { left, right } => {
                let mut joined = to_output(&self.evaluate(left, context)?, &left.span)?;
                joined.push_str(&to_output(&self.evaluate(right, context)?, &right.span)?);
                Ok(Value::String(joined))
            }
            Expression::Call { name, arguments } => {
                let function =
                    self.env
                        .function(name)
                        .ok_or_else(|| RenderError::UnknownFunction {
                            name: name.clone(),
                            span: expr.span.clone(),
                        })?;
                let arguments = arguments
                    .iter()
                    .map(|argument| self.evaluate(argument, context))
                    .collect::<Result<Vec<_>, _>>()?;
                function(&arguments).map_err(|source| RenderError::Function {
                    name: name.clone(),
                    source,
                })
            }
        }
    }
}

/// Convert a value to the text printed for it
fn to_output(value: &Value, span: &Span) -> Result<String, RenderError> {
    match value {
        Value::Null | Value::Bool(false) => Ok(String::new()),
        Value::Bool(true) => Ok("1".to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        Value::Array(_) | Value::Object(_) => Err(RenderError::Evaluation {
            message: format!("Cannot print {}", type_name(value)),
            span: span.clone(),
        }),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "mapping",
    }
}
