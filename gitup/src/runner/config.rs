//! Runner configuration.

use crate::config::Config;
use crate::provider::ProviderKind;
use crate::runner::RunnerError;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything a [`Runner`](crate::Runner) needs, resolved from the config
/// file and command line.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Provider to talk to.
    provider: ProviderKind,
    /// Provider host, if the provider needs one.
    host: Option<String>,
    /// Token used for API calls and clone URLs.
    token: String,
    /// Root directory repositories are synced into.
    cwd: PathBuf,
    /// Number of workers.
    concurrency: usize,
    /// Whether archived projects are left out.
    filter_archived: bool,
    /// Catalog fetch budget override.
    fetch_timeout: Option<Duration>,
}

impl RunnerConfig {
    /// Creates a new configuration for a run.
    pub fn new(provider: ProviderKind, token: String, cwd: PathBuf, concurrency: usize) -> Self {
        Self {
            provider,
            host: None,
            token,
            cwd,
            concurrency,
            filter_archived: false,
            fetch_timeout: None,
        }
    }

    /// Resolves a run configuration from a loaded config file.
    ///
    /// `token` and `concurrency` come from the command line and win over the
    /// file when set.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::MissingToken`] if no token is available anywhere.
    pub fn from_config(
        config: &Config,
        token: Option<String>,
        concurrency: Option<usize>,
        default_concurrency: usize,
    ) -> Result<Self, RunnerError> {
        let token = token
            .filter(|t| !t.is_empty())
            .or_else(|| config.repo.token())
            .ok_or(RunnerError::MissingToken)?;
        let concurrency = concurrency
            .or(config.concurrency)
            .unwrap_or(default_concurrency);

        let mut runner = Self::new(config.repo.kind, token, config.cwd.clone(), concurrency)
            .with_filter_archived(config.repo.filter_archived);
        if let Some(host) = &config.repo.host {
            runner = runner.with_host(host.as_str());
        }
        if let Some(timeout) = config.repo.fetch_timeout() {
            runner = runner.with_fetch_timeout(timeout);
        }
        Ok(runner)
    }

    /// Sets the provider host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets whether archived projects are left out.
    pub fn with_filter_archived(mut self, filter_archived: bool) -> Self {
        self.filter_archived = filter_archived;
        self
    }

    /// Sets the catalog fetch budget.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Returns the provider kind.
    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// Returns the provider host.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Returns the configured token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the sync root.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Returns the worker count.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns whether archived projects are left out.
    pub fn filter_archived(&self) -> bool {
        self.filter_archived
    }

    /// Returns the catalog fetch budget override.
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout
    }
}
