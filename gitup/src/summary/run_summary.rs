//! Run summary types.

use super::result::TaskOutcome;

/// Summary of one sync or fork run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of tasks posted to the worker pool.
    pub submitted: usize,

    /// Number of tasks that reported success.
    pub succeeded: usize,

    /// Number of tasks that failed, or finished without reporting.
    pub failed: usize,

    /// Number of groups, requests or plans skipped before submission.
    pub skipped: usize,
}

impl RunSummary {
    /// Creates a new empty summary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the summary with a task outcome.
    pub fn record_outcome(&mut self, outcome: &TaskOutcome) {
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Number of outcomes recorded so far.
    #[must_use]
    pub fn observed(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Returns true if any failures occurred.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Returns true if all operations were successful.
    #[must_use]
    pub fn all_success(&self) -> bool {
        self.failed == 0
    }
}
