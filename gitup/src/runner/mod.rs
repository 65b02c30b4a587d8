//! Application context for sync and fork runs.
//!
//! A [`Runner`] is built once from a [`RunnerConfig`]. It owns the provider
//! client, the worker pool and the git collaborator, and lends them to the
//! orchestrators for each run.

mod config;
mod error;

pub use config::RunnerConfig;
pub use error::RunnerError;

use crate::catalog::{CatalogFetcher, PageSource};
use crate::fork::{ForkConfig, Forker};
use crate::git::{CliGit, GitSync};
use crate::pool::WorkerPool;
use crate::provider::{GitHub, GitLab, ProviderKind, RepoFork, RepoList};
use crate::summary::RunSummary;
use crate::sync::{SyncConfig, Syncer};
use std::sync::Arc;
use tracing::info;

/// Owns the shared resources of a run.
pub struct Runner {
    config: RunnerConfig,
    catalog: Arc<dyn RepoList>,
    forker: Option<Arc<dyn RepoFork>>,
    pool: WorkerPool,
    git: Arc<dyn GitSync>,
}

impl Runner {
    /// Builds a runner from the provided configuration.
    ///
    /// Must be called inside a tokio runtime, since the worker pool starts
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] if the provider client cannot be built.
    pub fn new(config: RunnerConfig) -> Result<Self, RunnerError> {
        let (catalog, forker): (Arc<dyn RepoList>, Option<Arc<dyn RepoFork>>) = match config
            .provider()
        {
            ProviderKind::Gitlab => {
                let host = config.host().ok_or(RunnerError::MissingSetting {
                    provider: ProviderKind::Gitlab,
                    field: "host",
                })?;
                let gitlab = GitLab::new(host, config.token())?;
                let shared = Arc::new(fetcher(gitlab, &config));
                let catalog: Arc<dyn RepoList> = shared.clone();
                let forker: Arc<dyn RepoFork> = shared;
                (catalog, Some(forker))
            }
            ProviderKind::Github => {
                let github = GitHub::new(config.token())?;
                let catalog: Arc<dyn RepoList> = Arc::new(fetcher(github, &config));
                (catalog, None)
            }
        };

        info!(
            provider = %config.provider(),
            concurrency = config.concurrency(),
            "Runner ready"
        );
        Ok(Self {
            pool: WorkerPool::new(config.concurrency()),
            config,
            catalog,
            forker,
            git: Arc::new(CliGit::new()),
        })
    }

    /// Replaces the git collaborator.
    pub fn with_git(mut self, git: Arc<dyn GitSync>) -> Self {
        self.git = git;
        self
    }

    /// Returns the run configuration.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Read-only catalog of the configured provider.
    pub fn catalog(&self) -> &dyn RepoList {
        self.catalog.as_ref()
    }

    /// Syncs the repositories selected by `sync` under the configured root.
    pub async fn run_sync(&self, sync: &SyncConfig) -> RunSummary {
        Syncer::new(
            self.catalog(),
            Arc::clone(&self.git),
            &self.pool,
            self.config.cwd(),
            sync,
        )
        .with_token(self.config.token())
        .go()
        .await
    }

    /// Executes the fork requests in `configs`.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::ForkUnsupported`] if the provider can only list.
    pub async fn run_fork(&self, configs: &[ForkConfig]) -> Result<RunSummary, RunnerError> {
        let Some(api) = &self.forker else {
            return Err(RunnerError::ForkUnsupported {
                provider: self.config.provider(),
            });
        };
        Ok(Forker::new(Arc::clone(api), &self.pool, configs).go().await)
    }

    /// Stops the worker pool once queued work is done.
    pub async fn shutdown(self) {
        self.pool.shutdown().await;
    }
}

fn fetcher<S: PageSource>(source: S, config: &RunnerConfig) -> CatalogFetcher<S> {
    let fetcher = CatalogFetcher::new(source, config.filter_archived());
    match config.fetch_timeout() {
        Some(timeout) => fetcher.with_timeout(timeout),
        None => fetcher,
    }
}
