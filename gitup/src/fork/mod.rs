//! Bulk fork of repositories between groups.
//!
//! Each request in a [`ForkConfig`] is checked, turned into one [`ForkPlan`]
//! per source repository, and each plan runs as one task on the worker pool.
//! A bad request or entry is logged and skipped without touching the others.

mod config;
mod machine;
mod plan;

pub use config::{ForkConfig, ForkFile};
pub use machine::{execute, Execution, ForkState, ForkStep};
pub use plan::{validate, ForkPlan, PlanError};

use crate::pool::{task, Reporter, TaskRunner};
use crate::provider::RepoFork;
use crate::summary::{RunSummary, TaskOutcome};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

/// Runs one fork pass over a list of requests.
pub struct Forker<'a> {
    api: Arc<dyn RepoFork>,
    runner: &'a dyn TaskRunner,
    configs: &'a [ForkConfig],
}

impl<'a> Forker<'a> {
    /// Creates a forker for `configs`.
    pub fn new(
        api: Arc<dyn RepoFork>,
        runner: &'a dyn TaskRunner,
        configs: &'a [ForkConfig],
    ) -> Self {
        Self {
            api,
            runner,
            configs,
        }
    }

    /// Builds the plans of every valid request.
    ///
    /// Rejected requests and entries are logged and counted as skipped.
    pub async fn plan(&self, summary: &mut RunSummary) -> Vec<ForkPlan> {
        let mut plans = Vec::new();
        for config in self.configs {
            if let Err(e) = validate(config) {
                warn!(from_group = %config.from_group, error = %e, "Skipping fork request");
                summary.skipped += 1;
                continue;
            }

            for (index, name) in config.from_repos.iter().enumerate() {
                let planned = match self.api.project(&config.from_group, name).await {
                    Ok(source) => ForkPlan::new(source, config, index),
                    Err(e) => Err(PlanError::from(e)),
                };
                match planned {
                    Ok(plan) => plans.push(plan),
                    Err(e) => {
                        warn!(
                            from_group = %config.from_group,
                            repo = %name,
                            error = %e,
                            "Skipping fork"
                        );
                        summary.skipped += 1;
                    }
                }
            }
        }
        plans
    }

    /// Executes every plan and waits for all of them to finish.
    pub async fn go(&self) -> RunSummary {
        let span = info_span!("fork", requests = self.configs.len());

        async {
            let mut summary = RunSummary::new();
            let plans = self.plan(&mut summary).await;
            info!(count = plans.len(), "Forking repositories");

            let mut reporter = Reporter::new();
            for plan in plans {
                let sink = reporter.sink();
                let api = Arc::clone(&self.api);

                self.runner.post(task(async move {
                    let execution = execute(api.as_ref(), &plan).await;
                    let description = execution.describe(&plan);
                    match execution.state {
                        ForkState::Failed { error, .. } => {
                            sink.report(TaskOutcome::failure(description, &error));
                            Err(error)
                        }
                        _ => {
                            sink.report(TaskOutcome::success(description));
                            Ok(())
                        }
                    }
                }));
            }

            reporter.drain(summary).await
        }
        .instrument(span)
        .await
    }
}
