//! End-to-end rendering through the override extension

use serde_json::json;

use template_override::engine::{ArrayLoader, Context, Environment};
use template_override::overrides::{
    ArgumentTableProvider, OverrideProvider, TableProvider, TemplateOverride,
};

const TEMPLATES: &[(&str, &str)] = &[
    ("static1", "test1 {{arg1}} {{arg2}}"),
    ("static2", "test2 {{arg1}} {{arg2}}"),
    ("include", "{% include \"static1\" %}"),
    ("include_with", "{% include \"static1\" with { arg2: \"value2\" } %}"),
    (
        "include_with_only",
        "{% include \"static1\" with { arg2: \"value2\" } only %}",
    ),
    ("embed", "{% embed \"static1\" %}{% endembed %}"),
    (
        "embed_with",
        "{% embed \"static1\" with { arg2: \"value2\" } %}{% endembed %}",
    ),
    (
        "embed_with_only",
        "{% embed \"static1\" with { arg2: \"value2\" } only %}{% endembed %}",
    ),
    ("extends", "{% extends \"static1\" %}"),
];

fn environment(rewrite: bool) -> Environment {
    let mut providers: Vec<Box<dyn OverrideProvider>> = Vec::new();
    if rewrite {
        providers.push(Box::new(
            TableProvider::default().with_rename("static1", "static2"),
        ));
        providers.push(Box::new(
            ArgumentTableProvider::default().with_argument("arg2", "value3"),
        ));
    }

    let mut env = Environment::new(TEMPLATES.iter().copied().collect::<ArrayLoader>());
    env.add_extension(&TemplateOverride::from_providers(providers).expect("valid providers"));
    env
}

fn render(name: &str, rewrite: bool) -> String {
    let mut context = Context::new();
    context.insert("arg1".to_string(), json!("value1"));
    environment(rewrite)
        .render(name, &context)
        .unwrap_or_else(|e| panic!("rendering {} failed: {}", name, e))
}

#[test]
fn test_include() {
    assert_eq!(render("include", false), "test1 value1 ");
    assert_eq!(render("include", true), "test2 value1 ");
}

#[test]
fn test_include_with() {
    assert_eq!(render("include_with", false), "test1 value1 value2");
    assert_eq!(render("include_with", true), "test2 value1 value3");
}

#[test]
fn test_include_with_only() {
    assert_eq!(render("include_with_only", false), "test1  value2");
    assert_eq!(render("include_with_only", true), "test2  value3");
}

#[test]
fn test_embed() {
    assert_eq!(render("embed", false), "test1 value1 ");
    assert_eq!(render("embed", true), "test2 value1 ");
}

#[test]
fn test_embed_with() {
    assert_eq!(render("embed_with", false), "test1 value1 value2");
    assert_eq!(render("embed_with", true), "test2 value1 value3");
}

#[test]
fn test_embed_with_only() {
    assert_eq!(render("embed_with_only", false), "test1  value2");
    assert_eq!(render("embed_with_only", true), "test2  value3");
}

#[test]
fn test_extends() {
    assert_eq!(render("extends", false), "test1 value1 ");
    assert_eq!(render("extends", true), "test2 value1 ");
}

#[test]
fn test_include_with_only_end_to_end() {
    let loader = ArrayLoader::new()
        .with_template("static1", "test1 {{a}} {{b}}")
        .with_template("static2", "test2 {{a}} {{b}}")
        .with_template("page", "{% include \"static1\" with {b: \"v2\"} only %}");
    let mut context = Context::new();
    context.insert("a".to_string(), json!("v1"));

    let mut plain = Environment::new(loader.clone());
    plain.add_extension(&TemplateOverride::default());
    insta::assert_snapshot!(plain.render("page", &context).unwrap(), @"test1  v2");

    let mut renamed = Environment::new(loader);
    renamed.add_extension(
        &TemplateOverride::from_providers(vec![Box::new(
            TableProvider::default().with_rename("static1", "static2"),
        )])
        .unwrap(),
    );
    insta::assert_snapshot!(renamed.render("page", &context).unwrap(), @"test2  v2");
}

#[test]
fn test_embedded_blocks_render_into_renamed_parent() {
    let loader = ArrayLoader::new()
        .with_template("card", "<old>{% block body %}default{% endblock %}</old>")
        .with_template("card_v2", "<new>{% block body %}default{% endblock %}</new>")
        .with_template(
            "page",
            "{% embed \"card\" %}{% block body %}{{ title }}{% endblock %}{% endembed %}",
        );
    let mut env = Environment::new(loader);
    env.add_extension(
        &TemplateOverride::from_providers(vec![Box::new(
            TableProvider::default().with_rename("card", "card_v2"),
        )])
        .unwrap(),
    );

    let mut context = Context::new();
    context.insert("title".to_string(), json!("Hello"));
    insta::assert_snapshot!(env.render("page", &context).unwrap(), @"<new>Hello</new>");
}
