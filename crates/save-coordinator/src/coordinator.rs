//! Deduplicated, best-effort flush of pending edits.
//!
//! ```text
//!   Idle ──Begin──► InFlight ──Settle──► CoolingDown ──Expire──► Idle
//! ```
//!
//! Callers arriving while `InFlight` join the running attempt. Callers
//! arriving while `CoolingDown` get the settled outcome without a new
//! attempt. The cooldown expires lazily on the next observation.

use crate::registry::{CloseReason, SaveFn, SaveHandlers, SaveStrategy};
use crate::SaveError;
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use parking_lot::Mutex;
use rust_fsm::*;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Default debounce after an attempt settles.
pub const DEFAULT_SAVE_COOLDOWN: Duration = Duration::from_millis(200);

/// Default per-handler time budget.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_millis(5000);

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub attempt_machine(Idle)

    Idle => {
        Begin => InFlight
    },
    InFlight => {
        Settle => CoolingDown
    },
    CoolingDown => {
        Expire => Idle
    }
}

pub use attempt_machine::Input as AttemptMachineInput;
pub use attempt_machine::State as AttemptMachineState;
pub use attempt_machine::StateMachine as AttemptMachine;

/// Public view of the attempt FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    Idle,
    InFlight,
    CoolingDown,
}

impl From<&AttemptMachineState> for AttemptState {
    fn from(state: &AttemptMachineState) -> Self {
        match state {
            AttemptMachineState::Idle => AttemptState::Idle,
            AttemptMachineState::InFlight => AttemptState::InFlight,
            AttemptMachineState::CoolingDown => AttemptState::CoolingDown,
        }
    }
}

/// Result of a flush. Informational only; a flush never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "strategy")]
pub enum FlushOutcome {
    /// A handler succeeded; later handlers were skipped.
    Saved(SaveStrategy),
    /// Every present handler failed.
    Failed,
    /// Nothing was registered.
    NoHandlers,
}

impl FlushOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, FlushOutcome::Saved(_))
    }
}

/// Timing for [`SaveCoordinator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub cooldown: Duration,
    pub handler_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_SAVE_COOLDOWN,
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }
}

type PendingFlush = Shared<BoxFuture<'static, FlushOutcome>>;

struct AttemptSlot {
    machine: AttemptMachine,
    pending: Option<PendingFlush>,
    last_outcome: Option<FlushOutcome>,
    cooldown_until: Option<Instant>,
    attempts: u64,
}

impl AttemptSlot {
    fn transition(&mut self, input: AttemptMachineInput) {
        let from = AttemptState::from(self.machine.state());
        match self.machine.consume(&input) {
            Ok(_) => {
                debug!(from = ?from, to = ?AttemptState::from(self.machine.state()), "Save attempt state changed");
            }
            Err(_) => {
                error!(from = ?from, input = ?input, "Invalid save attempt transition");
            }
        }
    }

    fn expire_cooldown(&mut self, now: Instant) {
        if *self.machine.state() != AttemptMachineState::CoolingDown {
            return;
        }
        if self.cooldown_until.map(|until| now >= until).unwrap_or(true) {
            self.cooldown_until = None;
            self.transition(AttemptMachineInput::Expire);
        }
    }
}

/// Process-wide save coordinator. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SaveCoordinator {
    slot: Arc<Mutex<AttemptSlot>>,
    config: CoordinatorConfig,
}

impl Default for SaveCoordinator {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}

impl SaveCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            slot: Arc::new(Mutex::new(AttemptSlot {
                machine: AttemptMachine::new(),
                pending: None,
                last_outcome: None,
                cooldown_until: None,
                attempts: 0,
            })),
            config,
        }
    }

    pub fn config(&self) -> CoordinatorConfig {
        self.config
    }

    pub fn state(&self) -> AttemptState {
        let mut slot = self.slot.lock();
        slot.expire_cooldown(Instant::now());
        AttemptState::from(slot.machine.state())
    }

    /// Number of handler-chain executions started so far.
    pub fn attempts(&self) -> u64 {
        self.slot.lock().attempts
    }

    /// Flush pending edits through `handlers`.
    ///
    /// Never fails and never blocks past the per-handler budgets. The
    /// handler chain runs on its own task, so a caller giving up early does
    /// not stall the attempt for the callers that joined it.
    pub async fn flush(&self, handlers: SaveHandlers) -> FlushOutcome {
        let pending = {
            let mut slot = self.slot.lock();
            slot.expire_cooldown(Instant::now());

            match slot.machine.state() {
                AttemptMachineState::InFlight => match &slot.pending {
                    Some(pending) => {
                        debug!("Save already in flight, joining it");
                        pending.clone()
                    }
                    None => {
                        error!("In-flight save attempt has no pending future");
                        return FlushOutcome::Failed;
                    }
                },
                AttemptMachineState::CoolingDown => {
                    let outcome = slot.last_outcome.unwrap_or(FlushOutcome::NoHandlers);
                    debug!(outcome = ?outcome, "Save cooling down, reusing settled outcome");
                    return outcome;
                }
                AttemptMachineState::Idle => {
                    slot.transition(AttemptMachineInput::Begin);
                    slot.attempts += 1;
                    let pending = self.start_attempt(handlers);
                    slot.pending = Some(pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    fn start_attempt(&self, handlers: SaveHandlers) -> PendingFlush {
        let slot = self.slot.clone();
        let config = self.config;

        let task = tokio::spawn(async move {
            let outcome = run_chain(&handlers, config.handler_timeout).await;

            let mut slot = slot.lock();
            slot.transition(AttemptMachineInput::Settle);
            slot.pending = None;
            slot.last_outcome = Some(outcome);
            slot.cooldown_until = Some(Instant::now() + config.cooldown);
            outcome
        });

        async move {
            task.await.unwrap_or_else(|e| {
                error!(error = %e, "Save attempt task aborted");
                FlushOutcome::Failed
            })
        }
        .boxed()
        .shared()
    }
}

/// Walk the chain until a handler succeeds.
async fn run_chain(handlers: &SaveHandlers, handler_timeout: Duration) -> FlushOutcome {
    let chain = handlers.chain(CloseReason::Navigation);
    if chain.is_empty() {
        debug!("No save handlers registered");
        return FlushOutcome::NoHandlers;
    }

    for (strategy, handler) in chain {
        match invoke(&handler, handler_timeout).await {
            Ok(()) => {
                info!(strategy = %strategy, "Pending edits saved");
                return FlushOutcome::Saved(strategy);
            }
            Err(e) => {
                warn!(strategy = %strategy, error = %e, "Save handler failed, trying next");
            }
        }
    }

    warn!("Every save handler failed");
    FlushOutcome::Failed
}

/// Run one handler under its time budget, mapping panics to failures.
pub(crate) async fn invoke(handler: &SaveFn, handler_timeout: Duration) -> Result<(), SaveError> {
    let handler = handler.clone();
    let guarded = AssertUnwindSafe(async move { handler().await }).catch_unwind();

    match tokio::time::timeout(handler_timeout, guarded).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(SaveError::Panicked),
        Err(_) => Err(SaveError::Timeout(handler_timeout)),
    }
}
