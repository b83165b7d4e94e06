//! Minimal Twig-style host engine
//!
//! The [`Environment`] loads template sources through a [`Loader`], parses
//! them, runs every registered [`NodeVisitor`] over the tree and caches the
//! result. Rendering evaluates the cached tree against a JSON context; calls
//! inside expressions dispatch to functions registered with
//! [`Environment::add_function`].
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use template_override::engine::{ArrayLoader, Context, Environment};
//!
//! let loader = ArrayLoader::new()
//!     .with_template("page", "Hello {% include \"name\" %}!")
//!     .with_template("name", "{{ who }}");
//! let env = Environment::new(loader);
//!
//! let mut context = Context::new();
//! context.insert("who".to_string(), json!("world"));
//! assert_eq!(env.render("page", &context).unwrap(), "Hello world!");
//! ```

mod config;
mod error;
mod loader;
mod render;
mod visitor;

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use crate::parser::{self, ast::Module};

pub use config::EngineConfig;
pub use error::{FunctionError, RenderError, StructuralError};
pub use loader::{ArrayLoader, FilesystemLoader, Loader, LoaderError};
pub use visitor::{traverse, NodeMut, NodeVisitor, OptimizerVisitor, OPTIMIZER_PRIORITY};

use render::Renderer;

/// Variables visible to a template while rendering
pub type Context = serde_json::Map<String, Value>;

/// A function callable from template expressions
pub type Function = Arc<dyn Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync>;

/// Something that publishes functions to an environment
pub trait FunctionExtension {
    fn functions(&self) -> Vec<(String, Function)>;
}

/// Something that publishes node visitors to an environment
pub trait VisitorExtension {
    fn node_visitors(&self) -> Vec<Box<dyn NodeVisitor>>;
}

/// A parsed template after every visitor has run
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: String,
    module: Module,
}

impl Template {
    /// Name the template was loaded under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The compiled tree
    pub fn module(&self) -> &Module {
        &self.module
    }
}

/// Template environment: loader, functions, visitors and the compiled-template cache
pub struct Environment {
    loader: Box<dyn Loader>,
    config: EngineConfig,
    functions: HashMap<String, Function>,
    visitors: Vec<Box<dyn NodeVisitor>>,
    cache: DashMap<String, Arc<Template>>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut functions: Vec<_> = self.functions.keys().collect();
        functions.sort();
        f.debug_struct("Environment")
            .field("config", &self.config)
            .field("functions", &functions)
            .field(
                "visitor_priorities",
                &self.visitors.iter().map(|v| v.priority()).collect::<Vec<_>>(),
            )
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl Environment {
    /// Create an environment with the default configuration and the built-in optimizer
    pub fn new(loader: impl Loader + 'static) -> Self {
        let mut env = Self {
            loader: Box::new(loader),
            config: EngineConfig::default(),
            functions: HashMap::new(),
            visitors: Vec::new(),
            cache: DashMap::new(),
        };
        env.add_node_visitor(Box::new(OptimizerVisitor));
        env
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self.cache.clear();
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a function under `name`, replacing any previous one
    pub fn add_function<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    /// Register a visitor; visitors with equal priority keep registration order
    pub fn add_node_visitor(&mut self, visitor: Box<dyn NodeVisitor>) {
        self.visitors.push(visitor);
        self.visitors.sort_by_key(|v| v.priority());
        self.cache.clear();
    }

    pub fn register_functions(&mut self, extension: &dyn FunctionExtension) {
        for (name, function) in extension.functions() {
            self.functions.insert(name, function);
        }
    }

    pub fn register_visitors(&mut self, extension: &dyn VisitorExtension) {
        for visitor in extension.node_visitors() {
            self.add_node_visitor(visitor);
        }
    }

    /// Register both the functions and the visitors of an extension
    pub fn add_extension<E>(&mut self, extension: &E)
    where
        E: FunctionExtension + VisitorExtension,
    {
        self.register_functions(extension);
        self.register_visitors(extension);
    }

    pub(crate) fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    /// Parse `source` as template `name` and run every visitor over it
    pub fn compile(&self, name: &str, source: &str) -> Result<Template, RenderError> {
        let mut module = parser::parse(source, name).map_err(|errors| RenderError::Parse {
            template: name.to_string(),
            source_text: source.to_string(),
            errors,
        })?;

        for visitor in &self.visitors {
            visitor::traverse(&mut module, visitor.as_ref()).map_err(|source| {
                RenderError::Compile {
                    template: name.to_string(),
                    source,
                }
            })?;
        }

        tracing::debug!(
            template = name,
            visitors = self.visitors.len(),
            embedded = module.embedded.len(),
            "compiled template"
        );

        Ok(Template {
            name: name.to_string(),
            module,
        })
    }

    /// Load a compiled template, compiling and caching it on first use
    pub fn load_template(&self, name: &str) -> Result<Arc<Template>, RenderError> {
        if let Some(template) = self.cache.get(name) {
            return Ok(Arc::clone(template.value()));
        }

        let source = self.loader.source(name).map_err(|e| match e {
            LoaderError::NotFound { name } => RenderError::TemplateNotFound { name },
            other => RenderError::Load {
                name: name.to_string(),
                message: other.to_string(),
            },
        })?;
        let template = Arc::new(self.compile(name, &source)?);

        Ok(Arc::clone(
            self.cache
                .entry(name.to_string())
                .or_insert(template)
                .value(),
        ))
    }

    /// Whether a template can be loaded under `name`
    pub fn exists(&self, name: &str) -> bool {
        self.cache.contains_key(name) || self.loader.exists(name)
    }

    /// Render template `name` with `context`
    pub fn render(&self, name: &str, context: &Context) -> Result<String, RenderError> {
        let template = self.load_template(name)?;
        self.render_template(&template, context)
    }

    /// Render an already compiled template
    pub fn render_template(
        &self,
        template: &Template,
        context: &Context,
    ) -> Result<String, RenderError> {
        Renderer::new(self).render_module(template.module(), context, 0)
    }
}
