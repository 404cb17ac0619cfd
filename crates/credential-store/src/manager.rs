//! Typed access to the credential store slots.

use crate::{CredentialStore, StorageError, StorageKeys, StorageResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Opaque bearer token authorizing API calls.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredential {
    pub token: String,
}

impl SessionCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

// Tokens never end up in logs through Debug.
impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("token", &format_args!("<{} bytes>", self.token.len()))
            .finish()
    }
}

/// UI theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(StorageError::Encoding(format!("unknown theme: {}", other))),
        }
    }
}

/// High-level API over a [`CredentialStore`].
///
/// Cheap to clone; all clones share the same backend.
#[derive(Clone)]
pub struct CredentialManager {
    storage: Arc<dyn CredentialStore>,
}

impl CredentialManager {
    pub fn new(storage: Arc<dyn CredentialStore>) -> Self {
        Self { storage }
    }

    // ==========================================
    // Session credential
    // ==========================================

    pub fn credential(&self) -> StorageResult<Option<SessionCredential>> {
        Ok(self
            .storage
            .get(StorageKeys::TOKEN)?
            .filter(|t| !t.is_empty())
            .map(SessionCredential::new))
    }

    pub fn set_credential(&self, credential: &SessionCredential) -> StorageResult<()> {
        tracing::debug!("Storing session credential");
        self.storage.set(StorageKeys::TOKEN, &credential.token)
    }

    /// Remove the session credential. Returns whether one existed.
    pub fn clear_credential(&self) -> StorageResult<bool> {
        tracing::debug!("Clearing session credential");
        self.storage.delete(StorageKeys::TOKEN)
    }

    /// Whether a credential exists. Read failures count as "no credential".
    pub fn has_credential(&self) -> bool {
        match self.credential() {
            Ok(credential) => credential.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read session credential");
                false
            }
        }
    }

    // ==========================================
    // Theme
    // ==========================================

    /// Stored theme, falling back to dark for missing or unknown values.
    pub fn theme(&self) -> StorageResult<Theme> {
        Ok(self
            .storage
            .get(StorageKeys::THEME)?
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default())
    }

    pub fn set_theme(&self, theme: Theme) -> StorageResult<()> {
        self.storage.set(StorageKeys::THEME, theme.as_str())
    }

    // ==========================================
    // Cross-origin identity payload
    // ==========================================

    pub fn cross_message_payload(&self) -> StorageResult<Option<String>> {
        Ok(self
            .storage
            .get(StorageKeys::CROSS_MESSAGE_INIT_DATA)?
            .filter(|p| !p.trim().is_empty()))
    }

    pub fn set_cross_message_payload(&self, payload: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::CROSS_MESSAGE_INIT_DATA, payload)
    }

    pub fn clear_cross_message_payload(&self) -> StorageResult<bool> {
        self.storage.delete(StorageKeys::CROSS_MESSAGE_INIT_DATA)
    }
}
