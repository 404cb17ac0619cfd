//! Client-side key-value storage for the notes mini-app.
//!
//! This crate provides:
//! - The [`CredentialStore`] trait, an opaque persistent key-value seam
//! - An in-memory backend and a JSON-file backend
//! - [`CredentialManager`], typed access to the session token, theme
//!   preference and the cached cross-origin identity payload

mod file;
mod keys;
mod manager;
mod memory;
mod traits;

pub use file::FileCredentialStore;
pub use keys::StorageKeys;
pub use manager::{CredentialManager, SessionCredential, Theme};
pub use memory::MemoryCredentialStore;
pub use traits::CredentialStore;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific failure
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Stored value could not be decoded
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
