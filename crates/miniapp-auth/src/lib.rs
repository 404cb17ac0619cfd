//! Session bootstrap for the notes mini-app.
//!
//! This crate provides:
//! - [`AuthBootstrapper`]: resolve host identity, register + login, persist
//!   the credential; plus manual login and logout
//! - [`SessionGuard`]: FSM-based gating of protected views
//! - [`resolve_view`]: app-shell choice between login, connection error and
//!   the guarded routes

mod bootstrapper;
mod error;
mod guard;
mod identity;
mod shell;

pub use bootstrapper::{AuthBootstrapper, Bootstrap, DEFAULT_USERNAME_PREFIX};
pub use error::{AuthError, AuthResult};
pub use guard::guard_machine;
pub use guard::{
    GuardMachine, GuardMachineInput, GuardMachineState, GuardState, GuardView, SessionGuard,
};
pub use identity::derive_identity;
pub use shell::{resolve_view, ShellView, LOGIN_ROUTE};

#[cfg(test)]
mod tests;
