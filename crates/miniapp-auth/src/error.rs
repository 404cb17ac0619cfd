//! Auth error types.

use thiserror::Error;

/// Auth error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Manual login input rejected before any I/O
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No usable identity could be derived
    #[error("Missing identity: {0}")]
    MissingIdentity(String),

    /// Remote API error
    #[error("API error: {0}")]
    Api(#[from] miniapp_api::ApiError),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] credential_store::StorageError),

    /// Invalid state transition in the guard FSM
    #[error("Invalid guard state transition: {0}")]
    InvalidStateTransition(String),
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
