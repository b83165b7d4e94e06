use thiserror::Error;

use super::provider::ProviderError;

/// Pipeline a provider was running in when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    RenameTemplate,
    RewriteArguments,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::RenameTemplate => write!(f, "template rename"),
            Stage::RewriteArguments => write!(f, "argument rewrite"),
        }
    }
}

/// Errors raised while building or running the override chain
#[derive(Debug, Error)]
pub enum OverrideError {
    /// A provider failed validation when the chain was built
    #[error("invalid override provider {provider}: {reason}")]
    Configuration { provider: String, reason: String },

    /// A provider returned an error while rendering
    #[error("override provider {provider} failed during {stage}: {source}")]
    Provider {
        provider: String,
        stage: Stage,
        #[source]
        source: ProviderError,
    },

    /// A hook function received an argument of the wrong shape
    #[error("invalid argument to {function}: {reason}")]
    InvalidArgument {
        function: &'static str,
        reason: String,
    },
}
