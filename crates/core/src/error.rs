// Central Error Type for the Application

use crate::domain::TaskId;
use thiserror::Error;

/// Failure taxonomy returned by the task service and stores
///
/// Every variant carries owned strings so errors can be cloned into
/// presentation state and one-shot notifications.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Transient failure of a (simulated) remote call. Safe to retry.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Task not found: {0}")]
    NotFound(TaskId),

    /// Opaque failure from the persistence layer
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TaskError {
    /// Whether retrying the same operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, TaskError::Network(_))
    }
}

/// Result type alias using TaskError
pub type Result<T> = std::result::Result<T, TaskError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by converting to TaskError::Storage(String)

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_network_errors_are_transient() {
        assert!(TaskError::Network("timeout".into()).is_transient());
        assert!(!TaskError::NotFound("task-1".into()).is_transient());
        assert!(!TaskError::Storage("disk full".into()).is_transient());
        assert!(!TaskError::Config("bad value".into()).is_transient());
    }

    #[test]
    fn test_display_includes_cause() {
        let err = TaskError::NotFound("task-42".into());
        assert_eq!(err.to_string(), "Task not found: task-42");
    }
}
