//! Backend access for the notes mini-app.
//!
//! This crate provides:
//! - [`ApiClient`], the single-attempt JSON wrapper with bearer transport
//!   and 401 / 502 / 503 / network classification
//! - Auth endpoints behind the [`AuthApi`] seam
//! - [`ConnectivityMonitor`], a periodic `/health` probe

mod auth;
mod client;
mod error;
mod monitor;
mod traits;

pub use auth::{CurrentUser, IdentityExchange};
pub use client::{error_detail, ApiClient};
pub use error::{ApiError, ApiResult, FailureKind};
pub use monitor::ConnectivityMonitor;
pub use traits::{AuthApi, HealthProbe};

#[cfg(test)]
mod tests;
