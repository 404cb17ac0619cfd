//! Protected-view gating.
//!
//! ```text
//!              BootstrapSucceeded
//!   Checking ─────────────────────► Admitted
//!     │  ▲                             │
//!     │  └──────── CredentialLost ─────┘
//!     │  ▲
//!     │  └──────── Retry ──────┐
//!     │ BootstrapFailed        │
//!     └──────────────────► Failed
//! ```
//!
//! The initial state is `Admitted` when a credential already exists,
//! otherwise `Checking` with a bootstrap spawned immediately.

use crate::Bootstrap;
use credential_store::CredentialManager;
use parking_lot::Mutex;
use rust_fsm::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub guard_machine(Checking)

    Checking => {
        BootstrapSucceeded => Admitted,
        BootstrapFailed => Failed
    },
    Admitted => {
        CredentialLost => Checking
    },
    Failed => {
        Retry => Checking
    }
}

pub use guard_machine::Input as GuardMachineInput;
pub use guard_machine::State as GuardMachineState;
pub use guard_machine::StateMachine as GuardMachine;

/// Public view of the guard FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    Checking,
    Admitted,
    Failed,
}

impl From<&GuardMachineState> for GuardState {
    fn from(state: &GuardMachineState) -> Self {
        match state {
            GuardMachineState::Checking => GuardState::Checking,
            GuardMachineState::Admitted => GuardState::Admitted,
            GuardMachineState::Failed => GuardState::Failed,
        }
    }
}

/// What the guarded slot renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum GuardView {
    Loading,
    Protected,
    /// Manual-entry login surface. `reload_prompt` is set after a failed
    /// bootstrap so the user is offered a host reload.
    RedirectToLogin { reload_prompt: bool },
}

impl From<GuardState> for GuardView {
    fn from(state: GuardState) -> Self {
        match state {
            GuardState::Checking => GuardView::Loading,
            GuardState::Admitted => GuardView::Protected,
            GuardState::Failed => GuardView::RedirectToLogin {
                reload_prompt: true,
            },
        }
    }
}

struct Shared {
    machine: Mutex<GuardMachine>,
    state_tx: watch::Sender<GuardState>,
    canceled: AtomicBool,
}

impl Shared {
    /// Apply `input` under the machine lock. Returns whether it was accepted.
    fn transition(&self, input: GuardMachineInput) -> bool {
        if self.canceled.load(Ordering::SeqCst) {
            debug!(input = ?input, "Guard torn down, dropping transition");
            return false;
        }

        let mut machine = self.machine.lock();
        let from = GuardState::from(machine.state());
        if machine.consume(&input).is_err() {
            debug!(from = ?from, input = ?input, "Guard input rejected in current state");
            return false;
        }
        let to = GuardState::from(machine.state());
        debug!(from = ?from, to = ?to, "Guard state changed");
        self.state_tx.send_replace(to);
        true
    }
}

/// Gates protected content on a session credential.
///
/// Dropping the guard (or calling [`SessionGuard::unmount`]) cancels state
/// updates; an in-flight bootstrap is left to finish and its result ignored.
pub struct SessionGuard {
    shared: Arc<Shared>,
    bootstrapper: Arc<dyn Bootstrap>,
    state_rx: watch::Receiver<GuardState>,
}

impl SessionGuard {
    /// Mount the guard. Spawns a bootstrap when no credential exists.
    pub fn mount(bootstrapper: Arc<dyn Bootstrap>, credentials: &CredentialManager) -> Self {
        let initial = if credentials.has_credential() {
            GuardMachineState::Admitted
        } else {
            GuardMachineState::Checking
        };
        let (state_tx, state_rx) = watch::channel(GuardState::from(&initial));

        let guard = Self {
            shared: Arc::new(Shared {
                machine: Mutex::new(GuardMachine::from_state(initial)),
                state_tx,
                canceled: AtomicBool::new(false),
            }),
            bootstrapper,
            state_rx,
        };

        if guard.state() == GuardState::Checking {
            guard.spawn_check();
        } else {
            debug!("Credential present, guard admitted on mount");
        }
        guard
    }

    pub fn state(&self) -> GuardState {
        *self.state_rx.borrow()
    }

    pub fn view(&self) -> GuardView {
        self.state().into()
    }

    pub fn subscribe(&self) -> watch::Receiver<GuardState> {
        self.state_rx.clone()
    }

    /// Wait until the guard leaves `Checking`.
    pub async fn settled(&self) -> GuardState {
        let mut rx = self.state_rx.clone();
        let settled = match rx.wait_for(|state| *state != GuardState::Checking).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        settled
    }

    /// Re-run the bootstrap after a failure (e.g. from the reload prompt).
    /// Ignored unless the guard is `Failed`.
    pub fn retry(&self) {
        if self.shared.transition(GuardMachineInput::Retry) {
            self.spawn_check();
        }
    }

    /// The credential was invalidated while admitted; check again.
    pub fn credential_lost(&self) {
        if self.shared.transition(GuardMachineInput::CredentialLost) {
            warn!("Credential lost while admitted, re-checking session");
            self.spawn_check();
        }
    }

    /// Tear down the guard.
    pub fn unmount(self) {}

    fn spawn_check(&self) {
        let shared = self.shared.clone();
        let bootstrapper = self.bootstrapper.clone();

        tokio::spawn(async move {
            // Run in a nested task so a panicking bootstrap maps to Failed.
            let outcome = tokio::spawn(async move { bootstrapper.bootstrap(true).await }).await;

            let input = match outcome {
                Ok(true) => {
                    info!("Session guard admitted");
                    GuardMachineInput::BootstrapSucceeded
                }
                Ok(false) => {
                    info!("Session guard failed: bootstrap incomplete");
                    GuardMachineInput::BootstrapFailed
                }
                Err(e) => {
                    error!(error = %e, "Bootstrap task aborted");
                    GuardMachineInput::BootstrapFailed
                }
            };
            if !shared.transition(input) {
                debug!("Bootstrap result not applied");
            }
        });
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.shared.canceled.store(true, Ordering::SeqCst);
    }
}
