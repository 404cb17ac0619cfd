//! Save error types.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single save handler. Never escapes a flush.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    /// Handler reported failure
    #[error("Save failed: {0}")]
    Handler(String),

    /// Handler exceeded its time budget
    #[error("Save handler timed out after {0:?}")]
    Timeout(Duration),

    /// Handler panicked
    #[error("Save handler panicked")]
    Panicked,
}

impl SaveError {
    pub fn handler(message: impl Into<String>) -> Self {
        SaveError::Handler(message.into())
    }
}

/// Result type alias using SaveError.
pub type SaveResult<T> = Result<T, SaveError>;
