//! Result channel and drain loop shared by the orchestrators.

use super::barrier::{CompletionBarrier, Ticket};
use crate::summary::{RunSummary, TaskOutcome};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Collects the outcomes of one orchestration run.
///
/// Every call to [`Reporter::sink`] registers one task with the completion
/// barrier. [`Reporter::drain`] then consumes outcomes until the barrier
/// reaches zero and returns the tallied [`RunSummary`].
pub struct Reporter {
    tx: mpsc::UnboundedSender<TaskOutcome>,
    rx: mpsc::UnboundedReceiver<TaskOutcome>,
    barrier: Arc<CompletionBarrier>,
    submitted: usize,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter {
    /// Creates a reporter with nothing submitted.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            barrier: CompletionBarrier::new(),
            submitted: 0,
        }
    }

    /// Registers one task and returns the handle it reports through.
    ///
    /// Must be called before the task is posted, so the barrier can never
    /// reach zero while work is still queued.
    pub fn sink(&mut self) -> OutcomeSink {
        self.submitted += 1;
        OutcomeSink {
            tx: self.tx.clone(),
            _ticket: self.barrier.register(),
        }
    }

    /// Number of sinks handed out so far.
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Drains outcomes until every registered task has finished.
    ///
    /// `summary` carries counts gathered before submission (skipped items).
    /// Tasks that finished without reporting (for example after a panic) are
    /// counted as failed.
    pub async fn drain(self, mut summary: RunSummary) -> RunSummary {
        let Self {
            tx,
            mut rx,
            barrier,
            submitted,
        } = self;
        drop(tx);
        summary.submitted += submitted;

        let done = CancellationToken::new();
        let supervisor = {
            let done = done.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                done.cancel();
            })
        };

        let mut observed = 0;
        loop {
            tokio::select! {
                biased;
                received = rx.recv() => match received {
                    Some(outcome) => {
                        observed += 1;
                        log_outcome(&outcome);
                        summary.record_outcome(&outcome);
                    }
                    None => break,
                },
                _ = done.cancelled() => break,
            }
        }

        // Sends happen before tickets drop, so anything left is already queued.
        while let Ok(outcome) = rx.try_recv() {
            observed += 1;
            log_outcome(&outcome);
            summary.record_outcome(&outcome);
        }
        supervisor.abort();

        let lost = submitted.saturating_sub(observed);
        if lost > 0 {
            warn!(lost, "Tasks finished without reporting an outcome");
            summary.failed += lost;
        }
        debug!(submitted, observed, "Result drain finished");
        summary
    }
}

fn log_outcome(outcome: &TaskOutcome) {
    match &outcome.error {
        None => info!(outcome = %outcome.description, "Task finished"),
        Some(error) => warn!(outcome = %outcome.description, %error, "Task failed"),
    }
}

/// A task's handle for publishing its single outcome.
///
/// Dropping the sink, with or without reporting, marks the task finished.
pub struct OutcomeSink {
    tx: mpsc::UnboundedSender<TaskOutcome>,
    _ticket: Ticket,
}

impl OutcomeSink {
    /// Publishes `outcome`, then releases the task's barrier ticket.
    pub fn report(self, outcome: TaskOutcome) {
        if self.tx.send(outcome).is_err() {
            debug!("Outcome published after the reporter stopped");
        }
    }
}
