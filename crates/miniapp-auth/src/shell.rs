//! Top-level view selection for the app shell.

use crate::GuardView;
use serde::{Deserialize, Serialize};

/// Route of the manual-entry login surface.
pub const LOGIN_ROUTE: &str = "/login";

/// What the shell renders for the current route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellView {
    /// The login surface, reached directly.
    Login,
    /// Signed in locally but the backend is unreachable. Never a logout.
    ConnectionError,
    /// Protected routes, gated by the session guard.
    Guarded(GuardView),
}

/// Pick the shell view.
///
/// `backend_available` is the connectivity monitor's last reading; `None`
/// (unknown) never produces the connection-error view.
pub fn resolve_view(
    route: &str,
    has_credential: bool,
    backend_available: Option<bool>,
    guard: GuardView,
) -> ShellView {
    if route == LOGIN_ROUTE {
        return ShellView::Login;
    }
    if has_credential && backend_available == Some(false) {
        return ShellView::ConnectionError;
    }
    ShellView::Guarded(guard)
}
