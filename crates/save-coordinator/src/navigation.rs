//! Navigation gate: flush before leaving, never block the route change.

use crate::coordinator::{invoke, FlushOutcome, SaveCoordinator};
use crate::registry::{CloseReason, SaveFn, SaveHandlerRegistry};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default route of the edit surface.
pub const DEFAULT_EDIT_SURFACE_ROUTE: &str = "/notes";

/// Host router seam.
pub trait Router: Send + Sync {
    fn current_route(&self) -> String;
    fn navigate(&self, route: &str);
}

/// What a navigation intent ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum NavigationOutcome {
    /// Same-route tap on the open edit surface. `closed` is false when the
    /// close handler was absent or failed.
    ClosedInPlace { closed: bool },
    /// Already on the target route.
    AlreadyThere,
    /// A navigation to the same target is still pending.
    Suppressed,
    /// Route changed after the flush settled.
    Navigated { save: FlushOutcome },
}

/// Intercepts in-app navigation and flushes pending edits first.
pub struct NavigationGate {
    router: Arc<dyn Router>,
    registry: SaveHandlerRegistry,
    coordinator: SaveCoordinator,
    edit_surface_route: String,
    pending_target: Arc<Mutex<Option<String>>>,
}

impl NavigationGate {
    pub fn new(
        router: Arc<dyn Router>,
        registry: SaveHandlerRegistry,
        coordinator: SaveCoordinator,
    ) -> Self {
        Self {
            router,
            registry,
            coordinator,
            edit_surface_route: DEFAULT_EDIT_SURFACE_ROUTE.to_string(),
            pending_target: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_edit_surface_route(mut self, route: impl Into<String>) -> Self {
        self.edit_surface_route = route.into();
        self
    }

    pub fn registry(&self) -> &SaveHandlerRegistry {
        &self.registry
    }

    pub fn coordinator(&self) -> &SaveCoordinator {
        &self.coordinator
    }

    /// Handle a user navigation intent. Never fails.
    pub async fn on_navigate_intent(&self, target: &str) -> NavigationOutcome {
        let current = self.router.current_route();

        if target == current {
            if self.registry.surface_open() && target == self.edit_surface_route {
                return self.close_in_place().await;
            }
            debug!(route = %target, "Already on route");
            return NavigationOutcome::AlreadyThere;
        }

        let Some(_pending) = PendingTarget::claim(&self.pending_target, target) else {
            debug!(route = %target, "Navigation already pending, suppressed");
            return NavigationOutcome::Suppressed;
        };

        let save = self.coordinator.flush(self.registry.snapshot()).await;
        if !save.is_saved() {
            debug!(outcome = ?save, "Navigating without a confirmed save");
        }

        self.router.navigate(target);
        info!(from = %current, to = %target, "Navigated");
        NavigationOutcome::Navigated { save }
    }

    async fn close_in_place(&self) -> NavigationOutcome {
        let Some(close) = self.registry.snapshot().close else {
            debug!("Edit surface open without a close handler");
            return NavigationOutcome::ClosedInPlace { closed: false };
        };

        let bound: SaveFn = Arc::new(move || close(CloseReason::SameRouteTap));
        let closed = match invoke(&bound, self.coordinator.config().handler_timeout).await {
            Ok(()) => {
                debug!("Edit surface closed in place");
                true
            }
            Err(e) => {
                warn!(error = %e, "Closing edit surface failed");
                false
            }
        };
        NavigationOutcome::ClosedInPlace { closed }
    }
}

/// Marks a target as pending until dropped.
struct PendingTarget {
    slot: Arc<Mutex<Option<String>>>,
    target: String,
}

impl PendingTarget {
    fn claim(slot: &Arc<Mutex<Option<String>>>, target: &str) -> Option<Self> {
        let mut pending = slot.lock();
        if pending.as_deref() == Some(target) {
            return None;
        }
        *pending = Some(target.to_string());
        Some(Self {
            slot: slot.clone(),
            target: target.to_string(),
        })
    }
}

impl Drop for PendingTarget {
    fn drop(&mut self) {
        let mut pending = self.slot.lock();
        if pending.as_deref() == Some(self.target.as_str()) {
            *pending = None;
        }
    }
}
