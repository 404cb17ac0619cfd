//! Identity-to-session exchange.

use crate::identity::derive_identity;
use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use credential_store::{CredentialManager, SessionCredential};
use identity_resolver::IdentitySourceResolver;
use miniapp_api::{AuthApi, IdentityExchange};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default prefix for synthesized usernames.
pub const DEFAULT_USERNAME_PREFIX: &str = "max";

/// Anything able to establish a session. The seam [`crate::SessionGuard`] drives.
#[async_trait]
pub trait Bootstrap: Send + Sync {
    /// True once a session credential exists.
    async fn bootstrap(&self, wait_for_data: bool) -> bool;
}

/// Exchanges a resolved host identity for a session credential.
pub struct AuthBootstrapper {
    resolver: IdentitySourceResolver,
    api: Arc<dyn AuthApi>,
    credentials: CredentialManager,
    username_prefix: String,
}

impl AuthBootstrapper {
    pub fn new(
        resolver: IdentitySourceResolver,
        api: Arc<dyn AuthApi>,
        credentials: CredentialManager,
    ) -> Self {
        Self {
            resolver,
            api,
            credentials,
            username_prefix: DEFAULT_USERNAME_PREFIX.to_string(),
        }
    }

    pub fn with_username_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.username_prefix = prefix.into();
        self
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    /// Establish a session from ambient host identity.
    ///
    /// Idempotent: returns true without I/O when a credential exists. Every
    /// failure (no identity, incomplete identity, rejected or unreachable
    /// login, storage error) yields false.
    pub async fn bootstrap(&self, wait_for_data: bool) -> bool {
        if self.credentials.has_credential() {
            debug!("Credential present, skipping bootstrap");
            return true;
        }

        let Some(envelope) = self.resolver.resolve(wait_for_data).await else {
            info!(wait_for_data, "Bootstrap incomplete: no identity source");
            return false;
        };

        let Some(identity) = derive_identity(&envelope, &self.username_prefix) else {
            warn!(
                source = %envelope.source(),
                "Bootstrap incomplete: identity lacks username or identifier"
            );
            return false;
        };

        match self.exchange(&identity).await {
            Ok(()) => {
                info!(source = %envelope.source(), "Session established from host identity");
                true
            }
            Err(e) => {
                warn!(error = %e, "Bootstrap exchange failed");
                false
            }
        }
    }

    /// Manual login from the login surface.
    pub async fn login_manually(&self, username: &str, uuid: &str, register: bool) -> AuthResult<()> {
        let username = username.trim();
        let uuid = uuid.trim();
        if username.is_empty() || uuid.is_empty() {
            return Err(AuthError::InvalidInput(
                "username and uuid are required".to_string(),
            ));
        }

        let identity = IdentityExchange::new(username, uuid);
        if register {
            // The register form reports its own failure and skips login.
            self.api.register(&identity).await?;
        }
        self.login_and_store(&identity).await?;
        info!(username = %username, "Session established manually");
        Ok(())
    }

    /// Drop the session credential. Returns whether one existed.
    pub fn logout(&self) -> AuthResult<bool> {
        let existed = self.credentials.clear_credential()?;
        info!(existed, "Logged out");
        Ok(existed)
    }

    /// Ask the host to reload the mini-app. False when the host cannot.
    pub fn request_host_reload(&self) -> bool {
        match self.resolver.host() {
            Some(host) => host.request_reload(),
            None => false,
        }
    }

    /// Register (best effort), then login and persist the credential.
    async fn exchange(&self, identity: &IdentityExchange) -> AuthResult<()> {
        // Any register failure is ignored; login decides.
        if let Err(e) = self.api.register(identity).await {
            warn!(error = %e, kind = ?e.kind(), "Register failed, continuing to login");
        }
        self.login_and_store(identity).await
    }

    async fn login_and_store(&self, identity: &IdentityExchange) -> AuthResult<()> {
        let token = self.api.login(identity).await?;
        self.credentials
            .set_credential(&SessionCredential::new(token))?;
        Ok(())
    }
}

#[async_trait]
impl Bootstrap for AuthBootstrapper {
    async fn bootstrap(&self, wait_for_data: bool) -> bool {
        AuthBootstrapper::bootstrap(self, wait_for_data).await
    }
}
