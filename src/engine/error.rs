//! Error types for compiling and rendering templates

use thiserror::Error;

use crate::parser::ast::Span;
use crate::ParseError;

/// Error returned by a host function
pub type FunctionError = Box<dyn std::error::Error + Send + Sync>;

/// A parse node is missing a part its kind requires
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StructuralError {
    #[error("{kind} node at {span:?} is missing its {part}")]
    MissingPart {
        kind: &'static str,
        part: &'static str,
        span: Span,
    },
}

/// Errors that can occur while loading, compiling or rendering a template
#[derive(Debug, Error)]
pub enum RenderError {
    /// No loader entry for the requested name
    #[error("template not found: {name}")]
    TemplateNotFound { name: String },

    /// The loader found the template but could not read it
    #[error("error reading template {name}: {message}")]
    Load { name: String, message: String },

    /// The template source does not parse
    #[error("parse errors in {template}: {}", format_parse_errors(.errors))]
    Parse {
        template: String,
        source_text: String,
        errors: Vec<ParseError>,
    },

    /// A node visitor rejected the parse tree
    #[error("compile error in {template}: {source}")]
    Compile {
        template: String,
        #[source]
        source: StructuralError,
    },

    /// Call to a function nobody registered
    #[error("unknown function '{name}'")]
    UnknownFunction { name: String, span: Span },

    /// A registered function returned an error
    #[error("function '{name}' failed: {source}")]
    Function {
        name: String,
        #[source]
        source: FunctionError,
    },

    /// Variable lookup failed with strict variables enabled
    #[error("variable '{name}' does not exist")]
    UndefinedVariable { name: String, span: Span },

    /// An expression produced a value of the wrong kind
    #[error("{message}")]
    Evaluation { message: String, span: Span },

    /// An embed refers to an embedded module its template does not have
    #[error("embedded template {index} not found in {template}")]
    MissingEmbedded { template: String, index: usize },

    /// Includes and parents nested deeper than the configured limit
    #[error("maximum template depth of {limit} exceeded while rendering {template}")]
    RecursionLimit { limit: usize, template: String },
}

impl RenderError {
    /// Format the error for a terminal, using ariadne reports for parse errors
    pub fn report(&self) -> String {
        match self {
            RenderError::Parse {
                template,
                source_text,
                errors,
            } => errors
                .iter()
                .map(|e| e.format(source_text, template))
                .collect::<Vec<_>>()
                .join("\n"),
            other => other.to_string(),
        }
    }
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
