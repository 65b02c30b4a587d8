//! Git error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while syncing a local repository.
#[derive(Debug, Error)]
pub enum GitError {
    /// The work directory could not be created.
    #[error("Failed to create work directory {path}: {source}")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The git executable could not be started.
    #[error("Failed to execute git {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Git ran but exited unsuccessfully.
    #[error("git {command} failed: {stderr}")]
    Command { command: String, stderr: String },
}
