#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

pub mod catalog;
pub mod config;
pub mod fork;
pub mod git;
pub mod pool;
pub mod provider;
pub mod repo;
pub mod runner;
pub mod summary;
pub mod sync;

pub use catalog::{Catalog, CatalogError, CatalogFetcher, PageQuery, PageSource, ProjectPage};
pub use config::{load_forks, Config, ConfigError, RepoConfig};
pub use fork::{ForkConfig, ForkPlan, ForkState, ForkStep, Forker, PlanError};
pub use git::{CliGit, GitError, GitSync, SyncRequest};
pub use pool::{Reporter, TaskRunner, WorkerPool};
pub use provider::{GitHub, GitLab, ProviderError, ProviderKind, RepoFork, RepoList};
pub use repo::Repo;
pub use runner::{Runner, RunnerConfig, RunnerError};
pub use summary::{RunSummary, TaskOutcome};
pub use sync::{SyncConfig, Syncer};
