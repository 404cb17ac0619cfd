//! Auth and health endpoints.

use crate::{ApiClient, ApiError, ApiResult, AuthApi, HealthProbe};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

/// Body of `POST /auth/register` and `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityExchange {
    pub username: String,
    pub uuid: String,
}

impl IdentityExchange {
    pub fn new(username: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            uuid: uuid.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
}

/// `GET /auth/me` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub uuid: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl ApiClient {
    pub async fn me(&self) -> ApiResult<CurrentUser> {
        self.get("/auth/me").await
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn register(&self, identity: &IdentityExchange) -> ApiResult<()> {
        debug!(username = %identity.username, "Registering identity");
        let _: Value = self.post("/auth/register", identity).await?;
        Ok(())
    }

    async fn login(&self, identity: &IdentityExchange) -> ApiResult<String> {
        let response: Option<LoginResponse> = self.post("/auth/login", identity).await?;
        match response {
            Some(response) if !response.access_token.is_empty() => {
                info!(username = %identity.username, "Login accepted");
                Ok(response.access_token)
            }
            _ => Err(ApiError::Decode("login response has no access_token".to_string())),
        }
    }
}

#[async_trait]
impl HealthProbe for ApiClient {
    async fn check_health(&self) -> ApiResult<()> {
        let _: Value = self.get("/health").await?;
        Ok(())
    }
}
