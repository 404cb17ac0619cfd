//! Multi-source identity resolution.

use crate::envelope::{IdentityEnvelope, IdentitySource};
use crate::host::HostSdk;
use crate::launch::LaunchParams;
use crate::cache::cache_identity_message;
use crate::message::MessageBus;
use credential_store::CredentialManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Timing knobs for [`IdentitySourceResolver::resolve`] in wait mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Overall bound on the race.
    pub wait_timeout: Duration,
    /// How often the host SDK and the cached slot are re-checked.
    pub poll_interval: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_millis(5000),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Picks the first usable identity envelope among the host SDK, the
/// cross-origin message channel and the launch URL.
///
/// Priority without waiting: host SDK, cached cross-message payload, URL.
/// With waiting, a live message or a late SDK injection can still win
/// before the timeout.
pub struct IdentitySourceResolver {
    host: Option<Arc<dyn HostSdk>>,
    credentials: CredentialManager,
    bus: MessageBus,
    launch: LaunchParams,
    config: ResolverConfig,
}

impl IdentitySourceResolver {
    pub fn new(
        host: Option<Arc<dyn HostSdk>>,
        credentials: CredentialManager,
        bus: MessageBus,
        launch: LaunchParams,
    ) -> Self {
        Self {
            host,
            credentials,
            bus,
            launch,
            config: ResolverConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn host(&self) -> Option<&Arc<dyn HostSdk>> {
        self.host.as_ref()
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    /// Resolve an identity envelope.
    ///
    /// Never fails; `None` means no source produced usable data (in wait
    /// mode: within the configured timeout). All timers and the message
    /// listener are torn down before this returns.
    pub async fn resolve(&self, wait: bool) -> Option<IdentityEnvelope> {
        if let Some(envelope) = self.check_present_sources() {
            return Some(envelope);
        }
        if !wait {
            debug!("No identity source available");
            return None;
        }

        debug!(
            timeout_ms = self.config.wait_timeout.as_millis() as u64,
            "Waiting for identity source"
        );

        let mut subscription = self.bus.subscribe();
        let deadline = tokio::time::sleep(self.config.wait_timeout);
        tokio::pin!(deadline);

        let mut poll = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.poll_interval,
            self.config.poll_interval,
        );
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                message = subscription.recv() => match message {
                    Ok(message) => {
                        if let Some(envelope) = self.accept_message(&message) {
                            return Some(envelope);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Identity listener lagged, messages dropped");
                    }
                    Err(RecvError::Closed) => {
                        warn!("Message bus closed while waiting for identity");
                        return None;
                    }
                },
                _ = poll.tick() => {
                    if let Some(envelope) = self.check_polled_sources() {
                        return Some(envelope);
                    }
                }
                _ = &mut deadline => {
                    info!("Identity wait timed out");
                    return None;
                }
            }
        }
    }

    fn check_present_sources(&self) -> Option<IdentityEnvelope> {
        self.check_polled_sources().or_else(|| self.check_launch_params())
    }

    /// Sources that may appear while waiting: SDK injection and the cache slot.
    fn check_polled_sources(&self) -> Option<IdentityEnvelope> {
        self.check_host_sdk().or_else(|| self.check_cached_message())
    }

    fn check_host_sdk(&self) -> Option<IdentityEnvelope> {
        let raw = self.host.as_ref()?.init_data()?;
        found(IdentityEnvelope::parse(IdentitySource::HostSdk, &raw))
    }

    fn check_cached_message(&self) -> Option<IdentityEnvelope> {
        let raw = match self.credentials.cross_message_payload() {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Could not read cached identity payload");
                return None;
            }
        };
        found(IdentityEnvelope::parse(IdentitySource::CrossMessage, &raw))
    }

    fn check_launch_params(&self) -> Option<IdentityEnvelope> {
        let raw = self.launch.identity_payload()?;
        found(IdentityEnvelope::parse(IdentitySource::UrlParams, &raw))
    }

    fn accept_message(&self, message: &serde_json::Value) -> Option<IdentityEnvelope> {
        found(cache_identity_message(&self.credentials, message))
    }
}

fn found(envelope: Option<IdentityEnvelope>) -> Option<IdentityEnvelope> {
    if let Some(envelope) = &envelope {
        info!(
            source = %envelope.source(),
            fields = envelope.fields().len(),
            "Identity source resolved"
        );
    }
    envelope
}
