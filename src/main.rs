//! Template Override CLI
//!
//! Usage:
//!   template-override [OPTIONS] <TEMPLATE>
//!
//! Options:
//!   -t, --templates <DIR>    Directory templates are loaded from [default: .]
//!   -c, --config <FILE>      Override configuration (TOML format)
//!   -x, --context <FILE>     Render context (JSON object)
//!   --var <KEY=VALUE>        Set a context variable, may be repeated
//!   --dump-ast               Print the compiled tree instead of rendering
//!   -h, --help               Print help

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use template_override::engine::{Context, FilesystemLoader};
use template_override::{environment_with_overrides, OverrideConfig, ProviderChain};

#[derive(Parser)]
#[command(name = "template-override")]
#[command(about = "Render templates through a chain of override providers")]
struct Cli {
    /// Name of the template to render, relative to the templates directory
    template: String,

    /// Directory templates are loaded from
    #[arg(short, long, default_value = ".")]
    templates: PathBuf,

    /// Override configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON file holding the render context
    #[arg(short = 'x', long)]
    context: Option<PathBuf>,

    /// Context variable as KEY=VALUE; VALUE is parsed as JSON, or taken as a string
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    vars: Vec<(String, Value)>,

    /// Print the compiled tree instead of rendering
    #[arg(long)]
    dump_ast: bool,
}

fn parse_var(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    if key.is_empty() {
        return Err(format!("empty variable name in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => match OverrideConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading configuration '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => OverrideConfig::default(),
    };

    let chain = match config.build_chain() {
        Ok(chain) => chain,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let context = match load_context(cli.context.as_deref(), cli.vars) {
        Ok(context) => context,
        Err(message) => {
            eprintln!("Error: {}", message);
            std::process::exit(1);
        }
    };

    let env = build_env(&cli.templates, chain).with_config(config.engine);

    if cli.dump_ast {
        match env.load_template(&cli.template) {
            Ok(template) => println!("{:#?}", template.module()),
            Err(e) => {
                eprintln!("{}", e.report());
                std::process::exit(1);
            }
        }
        return;
    }

    match env.render(&cli.template, &context) {
        Ok(output) => print!("{}", output),
        Err(e) => {
            eprintln!("{}", e.report());
            std::process::exit(1);
        }
    }
}

fn build_env(templates: &Path, chain: ProviderChain) -> template_override::Environment {
    environment_with_overrides(FilesystemLoader::new(templates), chain)
}

/// Read the JSON context file, then apply `--var` assignments on top
fn load_context(path: Option<&Path>, vars: Vec<(String, Value)>) -> Result<Context, String> {
    let mut context = match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .map_err(|e| format!("reading context file '{}': {}", path.display(), e))?;
            match serde_json::from_str(&content) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    return Err(format!(
                        "context file '{}' must hold a JSON object",
                        path.display()
                    ))
                }
                Err(e) => {
                    return Err(format!(
                        "parsing context file '{}': {}",
                        path.display(),
                        e
                    ))
                }
            }
        }
        None => Context::new(),
    };
    context.extend(vars);
    Ok(context)
}
