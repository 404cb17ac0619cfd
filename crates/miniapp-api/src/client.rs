//! Outbound API call wrapper.
//!
//! Every call carries the stored bearer credential when one exists. Failure
//! handling is uniform:
//! - 401 deletes the credential and yields [`ApiError::Unauthorized`]
//! - 502 / 503 and transport errors keep the credential
//! - other non-success answers carry the server's `detail` / `message` text

use crate::{ApiError, ApiResult};
use credential_store::CredentialManager;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Single-attempt JSON client for the mini-app backend.
#[derive(Clone)]
pub struct ApiClient {
    http_client: Client,
    base_url: Url,
    credentials: CredentialManager,
}

impl ApiClient {
    pub fn new(base_url: Url, credentials: CredentialManager) -> Self {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                Client::new()
            });
        Self::with_http_client(http_client, base_url, credentials)
    }

    pub fn with_http_client(
        http_client: Client,
        base_url: Url,
        credentials: CredentialManager,
    ) -> Self {
        Self {
            http_client,
            base_url,
            credentials,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    /// Absolute URL for `path`, keeping any path prefix on the base URL.
    pub fn endpoint(&self, path: &str) -> ApiResult<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&joined)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let value = self.request(Method::GET, path, None).await?;
        decode(path, value)
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        let value = self.request(Method::POST, path, Some(&body)).await?;
        decode(path, value)
    }

    /// Perform one call and return the decoded JSON body.
    ///
    /// Empty or non-JSON success bodies decode to [`Value::Null`].
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> ApiResult<Value> {
        let url = self.endpoint(path)?;
        debug!(method = %method, url = %url, "API request");

        let mut request = self.http_client.request(method.clone(), url.clone());
        if let Some(credential) = self.credentials.credential().ok().flatten() {
            request = request.header(AUTHORIZATION, credential.bearer());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(method = %method, url = %url, error = %e, "API unreachable");
                return Err(ApiError::Network(e));
            }
        };

        let status = response.status();
        debug!(method = %method, url = %url, status = %status, "API response");

        if status == StatusCode::UNAUTHORIZED {
            warn!(url = %url, "API rejected credential, clearing session");
            if let Err(e) = self.credentials.clear_credential() {
                warn!(error = %e, "Could not clear rejected credential");
            }
            return Err(ApiError::Unauthorized);
        }

        if status == StatusCode::BAD_GATEWAY || status == StatusCode::SERVICE_UNAVAILABLE {
            warn!(url = %url, status = %status, "API host unavailable");
            return Err(ApiError::HostUnavailable {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = error_detail(&body);
            warn!(url = %url, status = %status, detail = %detail, "API request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);
        let text = response.text().await?;

        if !is_json || text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!(url = %url, error = %e, "Success body is not valid JSON");
            Value::Null
        }))
    }
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> ApiResult<T> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(format!("{}: {}", path, e)))
}

/// Human-readable detail from an error body.
///
/// Prefers the JSON `detail` or `message` field, then the raw text. Empty,
/// null and `false` fields count as absent.
pub fn error_detail(body: &str) -> String {
    const FALLBACK: &str = "Request failed";

    if body.trim().is_empty() {
        return FALLBACK.to_string();
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => ["detail", "message"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(|value| match value {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::String(_) | Value::Null | Value::Bool(false) => None,
                other => Some(other.to_string()),
            })
            .unwrap_or_else(|| FALLBACK.to_string()),
        _ => body.to_string(),
    }
}
