//! Catalog lookup error types.

use crate::provider::ProviderError;
use thiserror::Error;

/// Errors that can occur while resolving groups or repositories.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No repository lives under the requested group or subgroup.
    #[error("No projects found in group '{group}'")]
    GroupNotFound { group: String },

    /// The group exists but holds no repository with the requested name.
    #[error("Project '{name}' not found in group '{group}'")]
    ProjectNotFound { group: String, name: String },

    /// The provider listing itself failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
