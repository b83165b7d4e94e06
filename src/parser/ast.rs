//! Abstract Syntax Tree types for templates

use serde_json::Value;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Name under which expressions can reach the whole render context
pub const CONTEXT_VARIABLE: &str = "_context";

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// A spanned expression
pub type Expr = Spanned<Expression>;

/// Expressions usable in print tags and tag arguments
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value: string, number, boolean or null
    Constant(Value),
    /// Variable lookup; `_context` resolves to the whole context
    Name(String),
    /// Map literal: `{ key: expr, ... }`
    Map(Vec<(String, Expr)>),
    /// Array literal: `[a, b]`
    Array(Vec<Expr>),
    /// Attribute access: `object.name`
    Attribute { object: Box<Expr>, name: String },
    /// String concatenation: `left ~ right`
    Concat { left: Box<Expr>, right: Box<Expr> },
    /// Function call: `name(arguments)`
    Call { name: String, arguments: Vec<Expr> },
}

impl Expression {
    /// Constant expression helper
    pub fn constant(value: impl Into<Value>) -> Self {
        Expression::Constant(value.into())
    }

    /// Reference to the render-time context mapping
    pub fn context() -> Self {
        Expression::Name(CONTEXT_VARIABLE.to_string())
    }

    /// Returns the function name if this is a call expression
    pub fn call_name(&self) -> Option<&str> {
        match self {
            Expression::Call { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Body node of a template
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Raw template text
    Text(String),
    /// Output of an expression: `{{ expr }}`
    Print(Expr),
    /// Named, overridable block: `{% block name %}...{% endblock %}`
    Block(BlockNode),
    /// `{% include %}`, or the include half of a lowered `{% embed %}`
    Include(IncludeNode),
}

/// Block definition with its default body
#[derive(Debug, Clone, PartialEq)]
pub struct BlockNode {
    pub name: String,
    pub body: Vec<Spanned<Node>>,
}

/// Include of another template
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeNode {
    pub target: IncludeTarget,
    /// Expression from the `with` clause
    pub variables: Option<Expr>,
    /// Whether the included template sees only `variables`
    pub only: bool,
    /// Whether a missing template renders nothing instead of failing
    pub ignore_missing: bool,
}

/// What an include node renders
#[derive(Debug, Clone, PartialEq)]
pub enum IncludeTarget {
    /// Template name computed at render time
    Expression(Expr),
    /// Embedded module fixed at parse time: module `index` of template `filename`
    Embedded { filename: String, index: usize },
}

/// Root of a compiled template, also used for embedded templates
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Name of the template this module was compiled from
    pub name: String,
    /// Parent template expression from `{% extends %}` (or the embed target)
    pub parent: Option<Expr>,
    pub body: Vec<Spanned<Node>>,
    /// Modules lowered from `{% embed %}` tags, addressed by index
    pub embedded: Vec<Module>,
    /// Position in the owning template's `embedded` list, for embedded modules
    pub index: Option<usize>,
}

impl Module {
    /// Create an empty top-level module
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            body: Vec::new(),
            embedded: Vec::new(),
            index: None,
        }
    }

    /// Collect every block defined in this module's body, outermost first
    pub fn blocks(&self) -> Vec<&BlockNode> {
        fn collect<'a>(nodes: &'a [Spanned<Node>], out: &mut Vec<&'a BlockNode>) {
            for node in nodes {
                if let Node::Block(block) = &node.node {
                    out.push(block);
                    collect(&block.body, out);
                }
            }
        }

        let mut out = Vec::new();
        collect(&self.body, &mut out);
        out
    }
}
