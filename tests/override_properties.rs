//! Behavioral properties of the override hooks on a live environment

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use template_override::engine::{ArrayLoader, Context, Environment, RenderError};
use template_override::overrides::{
    OverrideError, OverrideProvider, ProviderChain, ProviderError, TableProvider,
    TemplateOverride,
};

/// One recorded provider call
#[derive(Debug, Clone, PartialEq)]
enum Call {
    Rename { name: String, only: bool, with: Context },
    Args { name: String, only: bool, with: Context },
}

/// Identity provider logging every call it receives
#[derive(Default, Clone)]
struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Recorder {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl OverrideProvider for Recorder {
    fn rewrite_template_name(
        &self,
        name: &str,
        with: &Context,
        _context: &Context,
        only: bool,
    ) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(Call::Rename {
            name: name.to_string(),
            only,
            with: with.clone(),
        });
        Ok(name.to_string())
    }

    fn preprocess_template_args(
        &self,
        name: &str,
        with: &Context,
        _context: &Context,
        only: bool,
    ) -> Result<Context, ProviderError> {
        self.calls.lock().unwrap().push(Call::Args {
            name: name.to_string(),
            only,
            with: with.clone(),
        });
        Ok(with.clone())
    }
}

fn env_with(templates: &[(&str, &str)], providers: Vec<Box<dyn OverrideProvider>>) -> Environment {
    let mut env = Environment::new(templates.iter().copied().collect::<ArrayLoader>());
    env.add_extension(&TemplateOverride::from_providers(providers).unwrap());
    env
}

fn object(value: Value) -> Context {
    value.as_object().cloned().unwrap_or_default()
}

#[test]
fn test_extends_makes_one_rename_call_and_no_args_call() {
    let recorder = Recorder::default();
    let env = env_with(
        &[("base", "base"), ("child", "{% extends \"base\" %}")],
        vec![Box::new(recorder.clone())],
    );

    assert_eq!(env.render("child", &object(json!({"x": 1}))).unwrap(), "base");
    assert_eq!(
        recorder.calls(),
        vec![Call::Rename {
            name: "base".to_string(),
            only: false,
            with: Context::new(),
        }]
    );
}

#[test]
fn test_embed_never_renames_the_embedding_include() {
    let recorder = Recorder::default();
    let env = env_with(
        &[
            ("box", "[{% block content %}{% endblock %}]"),
            (
                "page",
                "{% embed \"box\" with {k: 1} only %}{% block content %}{{ k }}{% endblock %}{% endembed %}",
            ),
        ],
        vec![Box::new(recorder.clone())],
    );

    assert_eq!(env.render("page", &Context::new()).unwrap(), "[1]");
    assert_eq!(
        recorder.calls(),
        vec![
            // Arguments of the embed, keyed by the embedding template
            Call::Args {
                name: "page".to_string(),
                only: true,
                with: object(json!({"k": 1})),
            },
            // Parent of the embedded module
            Call::Rename {
                name: "box".to_string(),
                only: false,
                with: Context::new(),
            },
        ]
    );
}

#[test]
fn test_include_passes_original_name_to_both_pipelines() {
    let recorder = Recorder::default();
    let env = env_with(
        &[
            ("a", "A"),
            ("b", "B{{ x }}"),
            ("page", "{% include \"a\" with {x: 1} %}"),
        ],
        vec![
            Box::new(TableProvider::default().with_rename("a", "b")),
            Box::new(recorder.clone()),
        ],
    );

    assert_eq!(env.render("page", &Context::new()).unwrap(), "B1");
    assert_eq!(
        recorder.calls(),
        vec![
            // The recorder runs after the table, so it sees the renamed name here...
            Call::Rename {
                name: "b".to_string(),
                only: false,
                with: object(json!({"x": 1})),
            },
            // ...but the argument pipeline always gets the original one
            Call::Args {
                name: "a".to_string(),
                only: false,
                with: object(json!({"x": 1})),
            },
        ]
    );
}

#[test]
fn test_include_expression_is_evaluated_twice() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut env = env_with(
        &[("a", "A"), ("page", "{% include pick() %}")],
        Vec::new(),
    );
    let calls = Arc::clone(&counter);
    env.add_function("pick", move |_: &[Value]| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!("a"))
    });

    assert_eq!(env.render("page", &Context::new()).unwrap(), "A");
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_array_targets_are_renamed_element_wise() {
    let env = env_with(
        &[
            ("missing_v2", "found v2"),
            ("page", "{% include [\"missing\", \"fallback\"] %}"),
            ("fallback", "fallback"),
        ],
        vec![Box::new(
            TableProvider::default().with_rename("missing", "missing_v2"),
        )],
    );
    assert_eq!(env.render("page", &Context::new()).unwrap(), "found v2");
}

#[test]
fn test_ignore_missing_applies_to_renamed_target() {
    let env = env_with(
        &[("a", "A"), ("page", "x{% include \"a\" ignore missing %}y")],
        vec![Box::new(TableProvider::default().with_rename("a", "gone"))],
    );
    assert_eq!(env.render("page", &Context::new()).unwrap(), "xy");
}

#[test]
fn test_provider_failure_aborts_render() {
    struct Refusing;
    impl OverrideProvider for Refusing {
        fn preprocess_template_args(
            &self,
            name: &str,
            _with: &Context,
            _context: &Context,
            _only: bool,
        ) -> Result<Context, ProviderError> {
            Err(ProviderError::new(format!("no arguments for {}", name)))
        }
    }

    let env = env_with(
        &[("a", "A"), ("page", "{% include \"a\" %}")],
        vec![Box::new(Refusing)],
    );
    let err = env.render("page", &Context::new()).unwrap_err();

    let (name, source) = match err {
        RenderError::Function { name, source } => (name, source),
        other => panic!("expected a function error, got {:?}", other),
    };
    assert_eq!(name, "_override_parameters");
    let source = source
        .downcast_ref::<OverrideError>()
        .expect("override error source");
    assert!(source.to_string().contains("no arguments for a"));
}

#[test]
fn test_context_reaches_providers() {
    struct ByLocale;
    impl OverrideProvider for ByLocale {
        fn rewrite_template_name(
            &self,
            name: &str,
            _with: &Context,
            context: &Context,
            _only: bool,
        ) -> Result<String, ProviderError> {
            Ok(match context.get("locale").and_then(Value::as_str) {
                Some(locale) => format!("{}.{}", name, locale),
                None => name.to_string(),
            })
        }
    }

    let env = env_with(
        &[
            ("greeting", "hello"),
            ("greeting.fr", "bonjour"),
            ("page", "{% include \"greeting\" %}"),
        ],
        vec![Box::new(ByLocale)],
    );
    assert_eq!(
        env.render("page", &object(json!({"locale": "fr"}))).unwrap(),
        "bonjour"
    );
    assert_eq!(env.render("page", &Context::new()).unwrap(), "hello");
}

#[test]
fn test_invalid_chain_fails_before_rendering() {
    let err = ProviderChain::new(vec![Box::new(
        TableProvider::default().with_rename("", "x"),
    )])
    .unwrap_err();
    assert!(matches!(err, OverrideError::Configuration { .. }));
}
