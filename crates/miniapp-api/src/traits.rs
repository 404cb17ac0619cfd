//! Seams consumed by the auth and shell layers.

use crate::{ApiResult, IdentityExchange};
use async_trait::async_trait;

/// Remote auth endpoints.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /auth/register`. Idempotent on the server side.
    async fn register(&self, identity: &IdentityExchange) -> ApiResult<()>;

    /// `POST /auth/login`, returning the access token.
    async fn login(&self, identity: &IdentityExchange) -> ApiResult<String>;
}

/// `GET /health`.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check_health(&self) -> ApiResult<()>;
}
