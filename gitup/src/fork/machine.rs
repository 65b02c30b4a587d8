//! Fork execution as a sequential state machine.
//!
//! A plan runs the steps `Fork -> Rename -> Transfer -> Unlink`, skipping the
//! ones it does not need. The first failing step stops the chain.

use super::plan::ForkPlan;
use crate::provider::{ProviderError, RepoFork};
use crate::repo::Repo;
use std::fmt;
use tracing::debug;

/// One remote operation in a fork chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkStep {
    Fork,
    Rename,
    Transfer,
    Unlink,
}

impl ForkStep {
    /// State reached once this step succeeds.
    pub fn completes(self) -> ForkState {
        match self {
            Self::Fork => ForkState::Forked,
            Self::Rename => ForkState::Renamed,
            Self::Transfer => ForkState::Transferred,
            Self::Unlink => ForkState::Unlinked,
        }
    }
}

impl fmt::Display for ForkStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fork => "fork",
            Self::Rename => "rename",
            Self::Transfer => "transfer",
            Self::Unlink => "unlink",
        })
    }
}

/// Progress of one fork plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForkState {
    Pending,
    Forked,
    Renamed,
    Transferred,
    Unlinked,
    Failed { step: ForkStep, error: String },
}

impl ForkState {
    /// Returns true once a step has failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl ForkPlan {
    /// Steps this plan runs, in order. Needs no network access.
    pub fn steps(&self) -> Vec<ForkStep> {
        let mut steps = vec![ForkStep::Fork];
        if self.change_name_fork() {
            steps.push(ForkStep::Rename);
        }
        if self.same_group_fork() {
            steps.push(ForkStep::Transfer);
        }
        if self.remove_fork_relation() {
            steps.push(ForkStep::Unlink);
        }
        steps
    }
}

/// Where a plan ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Last state reached.
    pub state: ForkState,
    /// Latest record of the fork, once it exists.
    pub repo: Option<Repo>,
}

impl Execution {
    /// Outcome line for the reporter.
    pub fn describe(&self, plan: &ForkPlan) -> String {
        let target = format!(
            "[{}]->[{}][{}]",
            plan.source().full_path,
            plan.target_group(),
            plan.final_name()
        );
        match &self.state {
            ForkState::Failed { step, error } => format!("Fork error {target} at {step}: {error}"),
            _ => format!("Fork success {target}"),
        }
    }
}

/// Runs every step of `plan` against `api`, stopping at the first failure.
pub async fn execute(api: &dyn RepoFork, plan: &ForkPlan) -> Execution {
    let mut state = ForkState::Pending;
    let mut repo: Option<Repo> = None;

    for step in plan.steps() {
        debug!(source = %plan.source().full_path, %step, "Running fork step");
        let result = run_step(api, plan, step, repo.as_ref()).await;

        match result {
            Ok(updated) => {
                if let Some(updated) = updated {
                    repo = Some(updated);
                }
                state = step.completes();
            }
            Err(e) => {
                state = ForkState::Failed {
                    step,
                    error: e.to_string(),
                };
                break;
            }
        }
    }

    Execution { state, repo }
}

/// Runs one step. Steps after the fork act on the latest fork record.
async fn run_step(
    api: &dyn RepoFork,
    plan: &ForkPlan,
    step: ForkStep,
    current: Option<&Repo>,
) -> Result<Option<Repo>, ProviderError> {
    let fork = current.unwrap_or(plan.source());
    match step {
        ForkStep::Fork => {
            let namespace = (!plan.same_group_fork()).then(|| plan.target_group());
            api.fork(plan.source(), namespace).await.map(Some)
        }
        ForkStep::Rename => api.rename(fork, plan.final_name()).await.map(Some),
        ForkStep::Transfer => api.transfer(fork, plan.target_group()).await.map(Some),
        ForkStep::Unlink => api.delete_fork_relation(fork).await.map(|()| None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fork::ForkConfig;

    fn plan(to_group: &str, to_repo: Option<&str>, unlink: bool) -> ForkPlan {
        let source = Repo::new(Some(1), "https://x/teamA/svc.git", "svc", "teamA/svc").unwrap();
        let config = ForkConfig {
            from_group: "teamA".into(),
            from_repos: vec!["svc".into()],
            to_group: Some(to_group.into()),
            to_repos: to_repo.into_iter().map(str::to_string).collect(),
            rm_fork_relation: unlink,
        };
        ForkPlan::new(source, &config, 0).unwrap()
    }

    #[test]
    fn cross_group_fork_is_a_single_step() {
        assert_eq!(plan("teamB", None, false).steps(), vec![ForkStep::Fork]);
    }

    #[test]
    fn same_group_rename_transfers_back() {
        assert_eq!(
            plan("teamA", Some("svc2"), true).steps(),
            vec![
                ForkStep::Fork,
                ForkStep::Rename,
                ForkStep::Transfer,
                ForkStep::Unlink
            ]
        );
    }

    #[test]
    fn describes_success_and_failure() {
        let plan = plan("teamB", Some("svc2"), false);
        let done = Execution {
            state: ForkState::Renamed,
            repo: None,
        };
        assert_eq!(done.describe(&plan), "Fork success [teamA/svc]->[teamB][svc2]");

        let failed = Execution {
            state: ForkState::Failed {
                step: ForkStep::Rename,
                error: "409 conflict".into(),
            },
            repo: None,
        };
        assert!(failed.state.is_failed());
        assert_eq!(
            failed.describe(&plan),
            "Fork error [teamA/svc]->[teamB][svc2] at rename: 409 conflict"
        );
    }
}
