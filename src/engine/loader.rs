//! Template loaders: where template sources come from

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while loading a template source
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Template not known to the loader
    #[error("template not found: {name}")]
    NotFound { name: String },

    /// Template name escapes the loader's root
    #[error("invalid template name: {name}")]
    InvalidName { name: String },

    /// Error reading a template file
    #[error("error reading template file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Source of template text, looked up by name
pub trait Loader: Send + Sync {
    /// Return the source text for `name`
    fn source(&self, name: &str) -> Result<String, LoaderError>;

    /// Check whether `name` can be loaded
    fn exists(&self, name: &str) -> bool {
        self.source(name).is_ok()
    }
}

/// Loader backed by an in-memory map of name to source
#[derive(Debug, Default, Clone)]
pub struct ArrayLoader {
    templates: HashMap<String, String>,
}

impl ArrayLoader {
    /// Create a new empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template, replacing any previous source with the same name
    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(name.into(), source.into());
    }

    /// Builder form of [`ArrayLoader::insert`]
    pub fn with_template(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(name, source);
        self
    }

    /// Get all template names
    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(|s| s.as_str()).collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ArrayLoader {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut loader = ArrayLoader::new();
        for (name, source) in iter {
            loader.insert(name, source);
        }
        loader
    }
}

impl Loader for ArrayLoader {
    fn source(&self, name: &str) -> Result<String, LoaderError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| LoaderError::NotFound {
                name: name.to_string(),
            })
    }

    fn exists(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }
}

/// Loader reading templates from files below a base directory
#[derive(Debug, Clone)]
pub struct FilesystemLoader {
    base_path: PathBuf,
}

impl FilesystemLoader {
    /// Create a loader rooted at `base_path`
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Get the base path
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a template name to a path, rejecting names that leave the base directory
    fn resolve(&self, name: &str) -> Result<PathBuf, LoaderError> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || escapes {
            return Err(LoaderError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(self.base_path.join(relative))
    }
}

impl Loader for FilesystemLoader {
    fn source(&self, name: &str) -> Result<String, LoaderError> {
        let path = self.resolve(name)?;
        if !path.is_file() {
            return Err(LoaderError::NotFound {
                name: name.to_string(),
            });
        }
        std::fs::read_to_string(&path).map_err(|source| LoaderError::Io { path, source })
    }

    fn exists(&self, name: &str) -> bool {
        self.resolve(name).map(|p| p.is_file()).unwrap_or(false)
    }
}
