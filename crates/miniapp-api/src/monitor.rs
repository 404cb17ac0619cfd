//! Backend connectivity monitor.

use crate::HealthProbe;
use credential_store::CredentialManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Periodically probes the backend while a credential exists.
///
/// Publishes `Some(true)` / `Some(false)` after each probe and `None` while
/// signed out. Probes never overlap. The loop stops when the monitor drops.
pub struct ConnectivityMonitor {
    availability: watch::Receiver<Option<bool>>,
    task: JoinHandle<()>,
}

impl ConnectivityMonitor {
    pub fn spawn(
        probe: Arc<dyn HealthProbe>,
        credentials: CredentialManager,
        interval: Duration,
    ) -> Self {
        let (tx, rx) = watch::channel(None);
        let task = tokio::spawn(run(probe, credentials, interval, tx));
        Self {
            availability: rx,
            task,
        }
    }

    /// Last known availability; `None` when unknown or not monitored.
    pub fn availability(&self) -> Option<bool> {
        *self.availability.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<bool>> {
        self.availability.clone()
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    probe: Arc<dyn HealthProbe>,
    credentials: CredentialManager,
    interval: Duration,
    tx: watch::Sender<Option<bool>>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if !credentials.has_credential() {
            tx.send_if_modified(|current| current.take().is_some());
            continue;
        }

        let available = match probe.check_health().await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Health probe failed");
                false
            }
        };

        let previous = *tx.borrow();
        if previous != Some(available) {
            if available {
                info!("Backend reachable");
            } else {
                warn!("Backend unreachable");
            }
        }
        tx.send_replace(Some(available));
    }
}
