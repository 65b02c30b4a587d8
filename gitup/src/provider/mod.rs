//! Remote hosting providers.
//!
//! Providers come with two capabilities. [`RepoList`] is read-only and is all
//! the sync flow needs. [`RepoFork`] extends it with the write operations used
//! by the fork flow, so a provider that can only list never has to stub them.

mod error;
pub mod github;
pub mod gitlab;

pub use error::ProviderError;
pub use github::GitHub;
pub use gitlab::GitLab;

use crate::catalog::{CatalogError, CatalogFetcher, PageSource};
use crate::repo::Repo;
use async_trait::async_trait;
use serde::Deserialize;

/// Read-only catalog capability.
#[async_trait]
pub trait RepoList: Send + Sync {
    /// Lists every repository visible to the caller.
    async fn projects(&self) -> Vec<Repo>;

    /// Lists the repositories of a group, or of a subgroup given as `"a/b"`.
    async fn projects_by_group(&self, group: &str) -> Result<Vec<Repo>, CatalogError>;

    /// Resolves the repository `name` living directly in `group`.
    async fn project(&self, group: &str, name: &str) -> Result<Repo, CatalogError>;
}

/// Fork capability: write operations keyed by the provider-assigned ID.
#[async_trait]
pub trait RepoFork: RepoList {
    /// Forks `repo` into `namespace`, or into the caller's own namespace when `None`.
    async fn fork(&self, repo: &Repo, namespace: Option<&str>) -> Result<Repo, ProviderError>;

    /// Renames `repo` (both display name and path).
    async fn rename(&self, repo: &Repo, name: &str) -> Result<Repo, ProviderError>;

    /// Moves `repo` into `namespace`.
    async fn transfer(&self, repo: &Repo, namespace: &str) -> Result<Repo, ProviderError>;

    /// Removes the fork relationship between `repo` and its upstream.
    async fn delete_fork_relation(&self, repo: &Repo) -> Result<(), ProviderError>;
}

/// Raw write operations a provider implements to gain [`RepoFork`].
#[async_trait]
pub trait ForkApi: Send + Sync + 'static {
    /// See [`RepoFork::fork`].
    async fn fork(&self, repo: &Repo, namespace: Option<&str>) -> Result<Repo, ProviderError>;

    /// See [`RepoFork::rename`].
    async fn rename(&self, repo: &Repo, name: &str) -> Result<Repo, ProviderError>;

    /// See [`RepoFork::transfer`].
    async fn transfer(&self, repo: &Repo, namespace: &str) -> Result<Repo, ProviderError>;

    /// See [`RepoFork::delete_fork_relation`].
    async fn delete_fork_relation(&self, repo: &Repo) -> Result<(), ProviderError>;
}

#[async_trait]
impl<S: PageSource + ForkApi> RepoFork for CatalogFetcher<S> {
    async fn fork(&self, repo: &Repo, namespace: Option<&str>) -> Result<Repo, ProviderError> {
        ForkApi::fork(self.source(), repo, namespace).await
    }

    async fn rename(&self, repo: &Repo, name: &str) -> Result<Repo, ProviderError> {
        ForkApi::rename(self.source(), repo, name).await
    }

    async fn transfer(&self, repo: &Repo, namespace: &str) -> Result<Repo, ProviderError> {
        ForkApi::transfer(self.source(), repo, namespace).await
    }

    async fn delete_fork_relation(&self, repo: &Repo) -> Result<(), ProviderError> {
        ForkApi::delete_fork_relation(self.source(), repo).await
    }
}

/// Supported hosting providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// GitLab REST v4 (listing and fork).
    Gitlab,
    /// GitHub REST (listing only).
    Github,
}

impl ProviderKind {
    /// Returns the provider name as used in configuration files.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gitlab => "gitlab",
            Self::Github => "github",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
