//! The ordered provider chain and its two pipelines

use super::error::{OverrideError, Stage};
use super::provider::OverrideProvider;
use crate::engine::Context;

/// Ordered, immutable list of providers
///
/// Order is fixed at construction. Both pipelines consult the providers
/// in that order and share nothing but their original inputs.
pub struct ProviderChain {
    providers: Vec<Box<dyn OverrideProvider>>,
}

impl std::fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.name()))
            .finish()
    }
}

impl Default for ProviderChain {
    fn default() -> Self {
        Self::empty()
    }
}

impl ProviderChain {
    /// Build a chain, validating every provider up front
    pub fn new(providers: Vec<Box<dyn OverrideProvider>>) -> Result<Self, OverrideError> {
        for provider in &providers {
            provider
                .validate()
                .map_err(|e| OverrideError::Configuration {
                    provider: provider.name().to_string(),
                    reason: e.to_string(),
                })?;
        }
        tracing::debug!(providers = providers.len(), "built override provider chain");
        Ok(Self { providers })
    }

    /// A chain with no providers; both pipelines return their input
    pub fn empty() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Fold the template name through every provider; `with` stays the original
    pub fn rewrite_template_name(
        &self,
        name: &str,
        with: &Context,
        context: &Context,
        only: bool,
    ) -> Result<String, OverrideError> {
        let mut current = name.to_string();
        for provider in &self.providers {
            let next = provider
                .rewrite_template_name(&current, with, context, only)
                .map_err(|source| OverrideError::Provider {
                    provider: provider.name().to_string(),
                    stage: Stage::RenameTemplate,
                    source,
                })?;
            tracing::trace!(provider = provider.name(), from = %current, to = %next, "rename step");
            current = next;
        }
        if current != name {
            tracing::debug!(from = name, to = %current, "template renamed");
        }
        Ok(current)
    }

    /// Fold the with-arguments through every provider; `name` stays the original
    pub fn preprocess_template_args(
        &self,
        name: &str,
        with: &Context,
        context: &Context,
        only: bool,
    ) -> Result<Context, OverrideError> {
        let mut current = with.clone();
        for provider in &self.providers {
            current = provider
                .preprocess_template_args(name, &current, context, only)
                .map_err(|source| OverrideError::Provider {
                    provider: provider.name().to_string(),
                    stage: Stage::RewriteArguments,
                    source,
                })?;
            tracing::trace!(provider = provider.name(), template = name, "argument step");
        }
        if &current != with {
            tracing::debug!(template = name, "template arguments rewritten");
        }
        Ok(current)
    }
}
