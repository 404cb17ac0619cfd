//! Navigation-guarded save coordination for the notes mini-app.
//!
//! This crate provides:
//! - [`SaveHandlerRegistry`]: the edit surface's typed save capabilities
//! - [`SaveCoordinator`]: deduplicated best-effort flush with an explicit
//!   attempt FSM (`Idle -> InFlight -> CoolingDown -> Idle`)
//! - [`NavigationGate`]: flush before route changes, never block them

mod coordinator;
mod error;
mod navigation;
mod registry;

pub use coordinator::attempt_machine;
pub use coordinator::{
    AttemptMachine, AttemptMachineInput, AttemptMachineState, AttemptState, CoordinatorConfig,
    FlushOutcome, SaveCoordinator, DEFAULT_HANDLER_TIMEOUT, DEFAULT_SAVE_COOLDOWN,
};
pub use error::{SaveError, SaveResult};
pub use navigation::{NavigationGate, NavigationOutcome, Router, DEFAULT_EDIT_SURFACE_ROUTE};
pub use registry::{
    CloseFn, CloseReason, Registration, SaveFn, SaveFuture, SaveHandlerRegistry, SaveHandlers,
    SaveStrategy,
};

#[cfg(test)]
mod tests;
