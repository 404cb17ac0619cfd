//! App-lifetime listener that keeps the cross-message cache slot current.
//!
//! The resolver only sees messages while a `resolve(true)` is subscribed.
//! This listener is attached for the whole session, so a message posted
//! before (or between) resolutions still lands in the cache slot and is
//! picked up by the next resolve.

use crate::envelope::{IdentityEnvelope, IdentitySource};
use crate::message::{identity_payload_from_message, MessageBus};
use credential_store::CredentialManager;
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Parse an identity-bearing message and store its payload in the cache
/// slot. Returns the envelope when the message was usable.
pub(crate) fn cache_identity_message(
    credentials: &CredentialManager,
    message: &Value,
) -> Option<IdentityEnvelope> {
    let raw = identity_payload_from_message(message)?;
    let envelope = IdentityEnvelope::parse(IdentitySource::CrossMessage, &raw)?;

    if let Err(e) = credentials.set_cross_message_payload(&raw) {
        warn!(error = %e, "Could not cache cross-message identity payload");
    }
    Some(envelope)
}

/// Background listener writing every usable message to the cache slot.
/// Detaches when dropped.
pub struct IdentityMessageCache {
    task: JoinHandle<()>,
}

impl IdentityMessageCache {
    /// Attach to `bus`. The subscription exists before this returns, so
    /// anything posted afterwards is captured.
    pub fn spawn(bus: &MessageBus, credentials: CredentialManager) -> Self {
        let mut subscription = bus.subscribe();

        let task = tokio::spawn(async move {
            loop {
                match subscription.recv().await {
                    Ok(message) => {
                        if let Some(envelope) = cache_identity_message(&credentials, &message) {
                            debug!(
                                fields = envelope.fields().len(),
                                "Cached cross-message identity payload"
                            );
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Identity cache lagged, messages dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self { task }
    }
}

impl Drop for IdentityMessageCache {
    fn drop(&mut self) {
        self.task.abort();
    }
}
