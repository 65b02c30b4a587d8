//! Local repository sync through the `git` command line.

mod error;

pub use error::GitError;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;
use url::Url;

/// Refspecs mirrored into a bare clone on update.
const BARE_REFSPECS: [&str; 2] = ["+refs/heads/*:refs/heads/*", "+refs/tags/*:refs/tags/*"];

/// What to sync and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    /// Remote clone URL.
    pub url: String,
    /// Local directory holding the clone.
    pub work_dir: PathBuf,
    /// Keep a bare mirror instead of a working tree.
    pub bare: bool,
    /// Access token injected into http(s) URLs.
    pub token: Option<String>,
}

impl SyncRequest {
    /// File whose presence means the clone already exists.
    pub fn marker(&self) -> PathBuf {
        if self.bare {
            self.work_dir.join("HEAD")
        } else {
            self.work_dir.join(".git").join("HEAD")
        }
    }
}

/// Brings one local repository up to date with its remote.
#[async_trait]
pub trait GitSync: Send + Sync {
    /// Clones or updates the repository described by `request`.
    ///
    /// Returns `true` if anything changed locally and `false` if the clone was
    /// already up to date.
    async fn sync(&self, request: &SyncRequest) -> Result<bool, GitError>;
}

/// [`GitSync`] backed by the system `git` executable.
#[derive(Debug, Clone, Default)]
pub struct CliGit;

impl CliGit {
    /// Creates a new instance.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GitSync for CliGit {
    async fn sync(&self, request: &SyncRequest) -> Result<bool, GitError> {
        let dir = request.work_dir.as_path();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| GitError::WorkDir {
                path: dir.to_path_buf(),
                source,
            })?;

        let url = authenticated_url(&request.url, request.token.as_deref());

        if !request.marker().exists() {
            debug!(path = %dir.display(), bare = request.bare, "Cloning repository");
            let mut args = vec!["clone"];
            if request.bare {
                args.push("--bare");
            }
            args.extend([url.as_str(), "."]);
            run_git(dir, &args).await?;
            return Ok(true);
        }

        if request.bare {
            debug!(path = %dir.display(), "Fetching repository");
            let before = run_git(dir, &["for-each-ref", "--format=%(objectname) %(refname)"]).await?;
            let mut args = vec!["fetch", "--prune", "--quiet", url.as_str()];
            args.extend(BARE_REFSPECS);
            run_git(dir, &args).await?;
            let after = run_git(dir, &["for-each-ref", "--format=%(objectname) %(refname)"]).await?;
            Ok(before != after)
        } else {
            debug!(path = %dir.display(), "Pulling repository");
            let before = head(dir).await;
            run_git(dir, &["remote", "set-url", "origin", url.as_str()]).await?;
            run_git(dir, &["pull", "--ff-only", "--quiet"]).await?;
            let after = head(dir).await;
            Ok(before != after)
        }
    }
}

/// Injects `oauth2:<token>` credentials into an http(s) URL.
///
/// Other schemes (ssh, local paths) are returned unchanged.
pub fn authenticated_url(url: &str, token: Option<&str>) -> String {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return url.to_string();
    };
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return url.to_string();
    }
    if parsed.set_username("oauth2").is_err() || parsed.set_password(Some(token)).is_err() {
        return url.to_string();
    }
    parsed.into()
}

/// Current `HEAD` commit, or `None` for an unborn branch.
async fn head(path: &Path) -> Option<String> {
    run_git(path, &["rev-parse", "HEAD"]).await.ok()
}

/// Runs a git command and returns its stdout.
///
/// Errors name only the subcommand, so credentials in URLs never reach logs.
async fn run_git(path: &Path, args: &[&str]) -> Result<String, GitError> {
    let command = args.first().copied().unwrap_or_default().to_string();
    let output = Command::new("git")
        .args(args)
        .current_dir(path)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|source| GitError::Spawn {
            command: command.clone(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(GitError::Command { command, stderr });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
