//! Error types for job runs.

use thiserror::Error;

/// Result type for job runs.
pub type TaskResult<T = ()> = Result<T, TaskError>;

/// Why a job run did not complete normally.
///
/// None of these propagate as panics; [`Job::run`](crate::Job::run) logs
/// them and hands them back for callers that care.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// An exclusive job was still running, so this run was skipped.
    #[error("job {0} is already running")]
    AlreadyRunning(String),

    /// The job body panicked.
    #[error("job {job} panicked: {message}")]
    Panicked {
        /// Job name.
        job: String,
        /// Panic payload, if it was a string.
        message: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TaskError {
    /// Create a panicked error.
    pub fn panicked(job: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Panicked {
            job: job.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Returns true if the run was skipped rather than attempted.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::AlreadyRunning(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TaskError::panicked("Reindex", "index locked");
        assert_eq!(err.to_string(), "job Reindex panicked: index locked");
        assert!(!err.is_skipped());
        assert!(TaskError::AlreadyRunning("Reindex".into()).is_skipped());
    }
}
