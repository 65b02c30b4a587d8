//! Runner error types.

use crate::provider::ProviderKind;

/// Errors that can occur while setting up a run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Configuration loading errors.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// Provider client initialization errors.
    #[error(transparent)]
    Provider(#[from] crate::provider::ProviderError),

    /// No token in the config file, on the command line or in the environment.
    #[error("No access token configured (set repo.token or {})", crate::config::TOKEN_ENV)]
    MissingToken,

    /// The provider is missing a setting it needs.
    #[error("{provider} needs repo.{field}")]
    MissingSetting {
        provider: ProviderKind,
        field: &'static str,
    },

    /// Fork was requested from a listing-only provider.
    #[error("{provider} does not support fork")]
    ForkUnsupported { provider: ProviderKind },
}
