//! Bulk clone/update of remote repositories into a local tree.
//!
//! Every repository lands at `<cwd>/<full_path>`, so the local layout mirrors
//! the provider's namespaces.

use crate::git::{GitError, GitSync, SyncRequest};
use crate::pool::{task, Reporter, TaskRunner};
use crate::provider::RepoList;
use crate::repo::Repo;
use crate::summary::{RunSummary, TaskOutcome};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

/// The `[sync]` section of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SyncConfig {
    /// Keep bare mirrors instead of working trees.
    pub bare: bool,

    /// Groups (or `"group/subgroup"` paths) to sync. Empty means everything.
    pub groups: Vec<String>,
}

/// Runs one sync pass over the configured repositories.
pub struct Syncer<'a> {
    catalog: &'a dyn RepoList,
    git: Arc<dyn GitSync>,
    runner: &'a dyn TaskRunner,
    cwd: &'a Path,
    token: Option<&'a str>,
    config: &'a SyncConfig,
}

impl<'a> Syncer<'a> {
    /// Creates a syncer writing under `cwd`.
    pub fn new(
        catalog: &'a dyn RepoList,
        git: Arc<dyn GitSync>,
        runner: &'a dyn TaskRunner,
        cwd: &'a Path,
        config: &'a SyncConfig,
    ) -> Self {
        Self {
            catalog,
            git,
            runner,
            cwd,
            token: None,
            config,
        }
    }

    /// Sets the credential injected into http(s) clone URLs.
    pub fn with_token(mut self, token: &'a str) -> Self {
        self.token = Some(token);
        self
    }

    /// Syncs every selected repository and waits for all of them to finish.
    ///
    /// Individual failures are reported in the summary and never stop the
    /// rest of the batch.
    pub async fn go(&self) -> RunSummary {
        let span = info_span!(
            "sync",
            cwd = %self.cwd.display(),
            bare = self.config.bare,
            groups = self.config.groups.len()
        );

        async {
            let mut summary = RunSummary::new();
            let repos = self.resolve(&mut summary).await;
            info!(count = repos.len(), "Syncing repositories");

            let mut reporter = Reporter::new();
            for repo in repos {
                let request = self.request_for(repo);
                let sink = reporter.sink();
                let git = Arc::clone(&self.git);

                self.runner.post(task(async move {
                    let dir = request.work_dir.display().to_string();
                    let result = git.sync(&request).await;
                    sink.report(sync_outcome(&dir, &result));
                    result.map(|_| ())
                }));
            }

            reporter.drain(summary).await
        }
        .instrument(span)
        .await
    }

    /// Builds the sync request for one repository.
    pub fn request_for(&self, repo: Repo) -> SyncRequest {
        SyncRequest {
            work_dir: self.cwd.join(&repo.full_path),
            url: repo.url,
            bare: self.config.bare,
            token: self.token.map(str::to_string),
        }
    }

    /// Selects the repositories to sync, skipping groups that fail to resolve.
    async fn resolve(&self, summary: &mut RunSummary) -> Vec<Repo> {
        if self.config.groups.is_empty() {
            return self.catalog.projects().await;
        }

        let mut seen = HashSet::new();
        let mut repos = Vec::new();
        for group in &self.config.groups {
            match self.catalog.projects_by_group(group).await {
                Ok(found) => repos.extend(
                    found
                        .into_iter()
                        .filter(|repo| seen.insert(repo.full_path.clone())),
                ),
                Err(e) => {
                    warn!(group = %group, error = %e, "Skipping group");
                    summary.skipped += 1;
                }
            }
        }
        repos
    }
}

/// Describes the result of syncing the clone at `dir`.
fn sync_outcome(dir: &str, result: &Result<bool, GitError>) -> TaskOutcome {
    match result {
        Ok(true) => TaskOutcome::success(format!("{dir} sync-to-latest")),
        Ok(false) => TaskOutcome::success(format!("{dir} already-up-to-date")),
        Err(e) => TaskOutcome::failure(format!("Error sync[{dir}]"), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_clone_is_synced_to_latest() {
        let outcome = sync_outcome("/work/teamA/svc", &Ok(true));
        assert!(outcome.is_success());
        assert_eq!(outcome.description, "/work/teamA/svc sync-to-latest");
    }

    #[test]
    fn unchanged_clone_is_already_up_to_date() {
        let outcome = sync_outcome("/work/teamA/svc", &Ok(false));
        assert!(outcome.is_success());
        assert_eq!(outcome.description, "/work/teamA/svc already-up-to-date");
    }

    #[test]
    fn failed_sync_names_dir_and_cause() {
        let result = Err(GitError::Command {
            command: "pull".into(),
            stderr: "fatal: Not possible to fast-forward".into(),
        });

        let outcome = sync_outcome("/work/teamA/svc", &result);

        assert!(!outcome.is_success());
        assert_eq!(outcome.description, "Error sync[/work/teamA/svc]");
        assert!(outcome
            .error
            .as_deref()
            .is_some_and(|e| e.contains("Not possible to fast-forward")));
        assert_eq!(
            outcome.to_string(),
            "Error sync[/work/teamA/svc] err[git pull failed: fatal: Not possible to fast-forward]"
        );
    }
}
