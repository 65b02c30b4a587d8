//! Provider error types.

use thiserror::Error;

/// Errors returned by a remote hosting provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GitHub API error.
    #[error("GitHub API error: {0}")]
    GitHub(#[from] octocrab::Error),

    /// The provider answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A provider URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The provider returned a project the catalog cannot represent.
    #[error("Invalid project '{path}' returned by provider")]
    InvalidProject { path: String },

    /// The operation requires a provider-assigned project ID.
    #[error("Project '{path}' has no provider ID")]
    MissingId { path: String },

    /// The listing needs a page number the provider API cannot address.
    #[error("Page {page} is out of range for the provider API")]
    PageOutOfRange { page: u32 },

    /// The listing did not answer within the fetch budget.
    #[error("Timed out after {secs} seconds")]
    Timeout { secs: u64 },
}
