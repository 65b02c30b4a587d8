//! Per-task outcome types.

use std::fmt;

/// Result of one posted task, as published to the reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    /// Human-readable summary, naming the repository it concerns.
    pub description: String,

    /// Error message, if the task failed.
    pub error: Option<String>,
}

impl TaskOutcome {
    /// A successful outcome.
    pub fn success(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            error: None,
        }
    }

    /// A failed outcome.
    pub fn failure(description: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            description: description.into(),
            error: Some(error.to_string()),
        }
    }

    /// Returns true if the task succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            None => f.write_str(&self.description),
            Some(error) => write!(f, "{} err[{}]", self.description, error),
        }
    }
}
