//! Configuration loading.
//!
//! A config file names the provider and credentials, the local root for
//! synced repositories and, optionally, sync filters and fork requests:
//!
//! ```toml
//! cwd = "/srv/mirror"
//! concurrency = 10
//!
//! [repo]
//! type = "gitlab"
//! host = "gitlab.example.com"
//! filter-archived = true
//!
//! [sync]
//! bare = true
//! groups = ["teamA", "teamB/backend"]
//!
//! [[fork]]
//! from-group = "teamA"
//! from-repos = ["svc"]
//! to-group = "teamB"
//! ```

mod error;

pub use error::ConfigError;

use crate::fork::{ForkConfig, ForkFile};
use crate::provider::ProviderKind;
use crate::sync::SyncConfig;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable consulted when no token is configured.
pub const TOKEN_ENV: &str = "GITUP_TOKEN";

/// Parsed configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Root directory repositories are synced into.
    #[serde(default = "default_cwd")]
    pub cwd: PathBuf,

    /// Worker count. The command line chooses when unset.
    #[serde(default)]
    pub concurrency: Option<usize>,

    /// Provider connection.
    pub repo: RepoConfig,

    /// Sync options.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Fork requests listed inline.
    #[serde(default)]
    pub fork: Vec<ForkConfig>,
}

/// The `[repo]` section: which provider to talk to and how.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RepoConfig {
    /// Provider type.
    #[serde(rename = "type")]
    pub kind: ProviderKind,

    /// Provider host (required for GitLab).
    #[serde(default)]
    pub host: Option<String>,

    /// Access token. Falls back to [`TOKEN_ENV`].
    #[serde(default)]
    pub token: Option<String>,

    /// Leave archived projects out of the catalog.
    #[serde(default)]
    pub filter_archived: bool,

    /// Wall-clock budget for one catalog fetch.
    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,
}

impl RepoConfig {
    /// Configured token, or the value of [`TOKEN_ENV`].
    pub fn token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty()))
    }

    /// Catalog fetch budget, if overridden.
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }
}

fn default_cwd() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is missing, unreadable, not valid
    /// TOML, or names GitLab without a host.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!(path = %path.display(), "Loading configuration");
        let config: Self = read_toml(path)?;
        config.validate(path)?;
        debug!(
            provider = %config.repo.kind,
            cwd = %config.cwd.display(),
            forks = config.fork.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let host_missing = self.repo.host.as_deref().map_or(true, |h| h.trim().is_empty());
        if self.repo.kind == ProviderKind::Gitlab && host_missing {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                message: "repo.host is required for gitlab".to_string(),
            });
        }
        if self.concurrency == Some(0) {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                message: "concurrency must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Loads fork requests from a file of `[[fork]]` tables.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file is missing, unreadable or invalid.
pub fn load_forks(path: &Path) -> Result<Vec<ForkConfig>, ConfigError> {
    let file: ForkFile = read_toml(path)?;
    info!(path = %path.display(), count = file.fork.len(), "Loaded fork requests");
    Ok(file.fork)
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::MissingFile {
            path: path.display().to_string(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.display().to_string(),
        source: e,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::TomlError {
        path: path.display().to_string(),
        source: e,
    })
}
