//! API error types.

use thiserror::Error;

/// The only distinction that reaches user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 401: the credential was rejected and has been cleared.
    Unauthorized,
    /// Backend unreachable or answering 502/503. The credential is kept.
    Connectivity,
    /// Any other non-success answer.
    Rejected,
}

/// API error type.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Server answered 401
    #[error("Unauthorized")]
    Unauthorized,

    /// Gateway or service unavailable (502 / 503)
    #[error("Host unavailable: HTTP {status}")]
    HostUnavailable { status: u16 },

    /// Transport failure: connection refused, DNS, timeout
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Other non-success status with the server's detail text
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    /// Success body did not match the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ApiError::Unauthorized => FailureKind::Unauthorized,
            ApiError::HostUnavailable { .. } | ApiError::Network(_) => FailureKind::Connectivity,
            ApiError::Status { .. } | ApiError::Decode(_) | ApiError::InvalidUrl(_) => {
                FailureKind::Rejected
            }
        }
    }

    /// Fixed user-facing text for the failure kind. Causes are logged, not shown.
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            FailureKind::Unauthorized => "Your session has ended. Please sign in again.",
            FailureKind::Connectivity => {
                "The server is temporarily unavailable. Please try again later."
            }
            FailureKind::Rejected => "The request could not be completed.",
        }
    }

    /// Returns true if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::HostUnavailable { .. } => true,
            ApiError::Network(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            ApiError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::HostUnavailable { status } | ApiError::Status { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;
