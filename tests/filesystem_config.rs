//! Rendering from a template directory with a TOML override configuration

use std::fs;

use serde_json::json;
use tempfile::{tempdir, TempDir};

use template_override::engine::{Context, FilesystemLoader};
use template_override::{environment_with_overrides, OverrideConfig, RenderError};

/// Write `files` into a fresh temporary directory
fn template_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempdir().unwrap();
    for (file, content) in files {
        let target = dir.path().join(file);
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(target, content).unwrap();
    }
    dir
}

const CONFIG: &str = r#"
[engine]
strict_variables = true

[[providers]]
type = "table"
templates = { "partials/card.twig" = "themes/dark/card.twig" }

[[providers]]
type = "arguments"
arguments = { title = "Overridden" }
"#;

#[test]
fn test_render_directory_with_config() {
    let dir = template_dir(&[
        (
            "page.twig",
            "{% include \"partials/card.twig\" with {title: \"Original\"} %}",
        ),
        ("partials/card.twig", "light {{ title }}"),
        ("themes/dark/card.twig", "dark {{ title }} {{ user }}"),
    ]);

    let config = OverrideConfig::from_str(CONFIG).unwrap();
    let env = environment_with_overrides(
        FilesystemLoader::new(dir.path()),
        config.build_chain().unwrap(),
    )
    .with_config(config.engine.clone());

    let mut context = Context::new();
    context.insert("user".to_string(), json!("ada"));
    assert_eq!(
        env.render("page.twig", &context).unwrap(),
        "dark Overridden ada"
    );
}

#[test]
fn test_strict_variables_from_config() {
    let dir = template_dir(&[("page.twig", "{{ nobody }}")]);

    let config = OverrideConfig::from_str(CONFIG).unwrap();
    let env = environment_with_overrides(
        FilesystemLoader::new(dir.path()),
        config.build_chain().unwrap(),
    )
    .with_config(config.engine);

    let err = env.render("page.twig", &Context::new()).unwrap_err();
    assert!(matches!(err, RenderError::UndefinedVariable { name, .. } if name == "nobody"));
}

#[test]
fn test_templates_cannot_escape_directory() {
    let dir = template_dir(&[("page.twig", "{% include \"../secret\" %}")]);
    let env = environment_with_overrides(
        FilesystemLoader::new(dir.path()),
        Default::default(),
    );
    let err = env.render("page.twig", &Context::new()).unwrap_err();
    assert!(matches!(err, RenderError::TemplateNotFound { .. }));
}
