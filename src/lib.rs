//! Template Override - rename included templates and rewrite their arguments at render time
//!
//! This library provides a small Twig-style template engine and an extension for it
//! that routes every `include`, `embed` and `extends` through an ordered chain of
//! override providers.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use template_override::engine::{ArrayLoader, Context, Environment};
//! use template_override::overrides::{TableProvider, TemplateOverride};
//!
//! let loader = ArrayLoader::new()
//!     .with_template("page", "{% include \"static1\" with {b: \"v2\"} only %}")
//!     .with_template("static1", "test1 {{ a }} {{ b }}")
//!     .with_template("static2", "test2 {{ a }} {{ b }}");
//!
//! let overrides = TemplateOverride::from_providers(vec![Box::new(
//!     TableProvider::default().with_rename("static1", "static2"),
//! )])
//! .unwrap();
//!
//! let mut env = Environment::new(loader);
//! env.add_extension(&overrides);
//!
//! let mut context = Context::new();
//! context.insert("a".to_string(), json!("v1"));
//! assert_eq!(env.render("page", &context).unwrap(), "test2  v2");
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod overrides;
pub mod parser;

pub use config::{ConfigError, OverrideConfig};
pub use engine::{Context, EngineConfig, Environment, RenderError};
pub use error::ParseError;
pub use overrides::{OverrideError, OverrideProvider, ProviderChain, TemplateOverride};
pub use parser::parse;

/// Build an environment over `loader` with the override extension for `chain` installed
///
/// # Example
///
/// ```rust
/// use template_override::engine::{ArrayLoader, Context};
/// use template_override::{environment_with_overrides, ProviderChain};
///
/// let loader = ArrayLoader::new()
///     .with_template("base", "[{% block body %}{% endblock %}]")
///     .with_template("page", "{% extends \"base\" %}{% block body %}hi{% endblock %}");
///
/// let env = environment_with_overrides(loader, ProviderChain::empty());
/// assert_eq!(env.render("page", &Context::new()).unwrap(), "[hi]");
/// ```
pub fn environment_with_overrides(
    loader: impl engine::Loader + 'static,
    chain: ProviderChain,
) -> Environment {
    let mut env = Environment::new(loader);
    env.add_extension(&TemplateOverride::new(chain));
    env
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::engine::ArrayLoader;
    use crate::overrides::TableProvider;

    fn loader() -> ArrayLoader {
        ArrayLoader::new()
            .with_template("static1", "test1 {{ a }} {{ b }}")
            .with_template("static2", "test2 {{ a }} {{ b }}")
            .with_template("page", "{% include \"static1\" with {b: \"v2\"} only %}")
    }

    fn context() -> Context {
        let mut context = Context::new();
        context.insert("a".to_string(), json!("v1"));
        context
    }

    #[test]
    fn test_empty_chain_renders_original() {
        let env = environment_with_overrides(loader(), ProviderChain::empty());
        assert_eq!(env.render("page", &context()).unwrap(), "test1  v2");
    }

    #[test]
    fn test_table_chain_renders_replacement() {
        let chain = ProviderChain::new(vec![Box::new(
            TableProvider::default().with_rename("static1", "static2"),
        )])
        .unwrap();
        let env = environment_with_overrides(loader(), chain);
        assert_eq!(env.render("page", &context()).unwrap(), "test2  v2");
    }

    #[test]
    fn test_config_driven_environment() {
        let config = OverrideConfig::from_str(
            "[engine]\nstrict_variables = false\n\n[[providers]]\ntype = \"table\"\ntemplates = { static1 = \"static2\" }\n",
        )
        .unwrap();
        let env = environment_with_overrides(loader(), config.build_chain().unwrap())
            .with_config(config.engine.clone());
        assert_eq!(env.render("page", &context()).unwrap(), "test2  v2");
    }
}
