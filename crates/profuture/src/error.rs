//! Error types for the profuture combinators

use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinError;

/// Failures produced by the combinators themselves.
///
/// Task errors are never wrapped in this type; they reach the caller
/// unchanged. An [`ExecutionError`] only shows up in a caller's error type
/// through its `From<ExecutionError>` conversion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Promise timed out")]
    Timeout { duration: Duration },

    #[error("Callback was dropped without being invoked")]
    CallbackDropped,

    #[error("Callback was invoked without an error or a value")]
    MissingValue,

    #[error("Task {index} was aborted before it settled")]
    Aborted { index: usize },
}

/// Errors raised while validating configuration, before any task runs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid concurrency limit: {value} (must be > 0)")]
    InvalidConcurrencyLimit { value: usize },
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ExecutionError {
    /// Create a timeout error
    pub fn timeout(duration: Duration) -> Self {
        ExecutionError::Timeout { duration }
    }

    /// Create an aborted error for the task at `index`
    pub fn aborted(index: usize) -> Self {
        ExecutionError::Aborted { index }
    }

    /// Turn the failed join of task `index` into an error, resuming the task's panic if it panicked
    pub(crate) fn from_join_error(err: JoinError, index: usize) -> Self {
        match err.try_into_panic() {
            Ok(payload) => std::panic::resume_unwind(payload),
            Err(_) => ExecutionError::aborted(index),
        }
    }

    /// Check if this error indicates a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutionError::Timeout { .. })
    }

    /// Check if this error was caused by a callback that never produced a settlement
    pub fn is_callback_failure(&self) -> bool {
        matches!(
            self,
            ExecutionError::CallbackDropped | ExecutionError::MissingValue
        )
    }
}

impl ConfigError {
    /// Create an invalid concurrency limit error
    pub fn invalid_concurrency_limit(value: usize) -> Self {
        ConfigError::InvalidConcurrencyLimit { value }
    }
}

impl From<ExecutionError> for String {
    fn from(err: ExecutionError) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_is_fixed() {
        let err = ExecutionError::timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Promise timed out");
        assert!(err.is_timeout());
        assert!(!err.is_callback_failure());
    }

    #[test]
    fn test_error_helpers() {
        assert!(ExecutionError::CallbackDropped.is_callback_failure());
        assert!(ExecutionError::MissingValue.is_callback_failure());

        let aborted = ExecutionError::aborted(3);
        assert!(!aborted.is_timeout());
        if let ExecutionError::Aborted { index } = aborted {
            assert_eq!(index, 3);
        } else {
            panic!("Expected aborted error");
        }
    }

    #[tokio::test]
    async fn test_aborted_join_maps_to_error() {
        let handle = tokio::spawn(std::future::pending::<()>());
        handle.abort();
        let err = handle.await.unwrap_err();

        let mapped = ExecutionError::from_join_error(err, 1);
        assert_eq!(mapped, ExecutionError::Aborted { index: 1 });
    }

    #[test]
    fn test_config_error_helpers() {
        let invalid = ConfigError::invalid_concurrency_limit(0);
        assert_eq!(invalid, ConfigError::InvalidConcurrencyLimit { value: 0 });
        assert_eq!(
            invalid.to_string(),
            "Invalid concurrency limit: 0 (must be > 0)"
        );
    }

    #[test]
    fn test_string_conversion() {
        let message: String = ExecutionError::timeout(Duration::from_secs(1)).into();
        assert_eq!(message, "Promise timed out");
    }
}
