use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error as ThisError;

use super::IsRetryable;

/// PostgREST code for "`.single()` matched zero (or several) rows".
pub const NO_ROWS_CODE: &str = "PGRST116";

/// Failures while talking to the hosted backend.
#[derive(Debug, ThisError)]
pub enum ProviderError {
    /// Transport-level failure (DNS, connect, timeouts, etc).
    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Structured PostgREST error; the message is what clients get to see.
    #[error("{}", .body.message)]
    Rest { status: StatusCode, body: RestErrorBody },

    /// Structured auth-server error.
    #[error("{message}")]
    Auth { status: StatusCode, message: String },

    /// Non-JSON error body.
    #[error("Upstream error with status: {status}")]
    UpstreamStatus { status: StatusCode, body: String },

    #[error("Invalid Content-Range header: {0}")]
    ContentRange(String),

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("Realtime error: {0}")]
    Realtime(String),

    #[error("Missing configuration: {0}")]
    Config(&'static str),
}

impl ProviderError {
    /// True when a single-row read found nothing.
    pub fn is_no_rows(&self) -> bool {
        matches!(
            self,
            ProviderError::Rest { body, .. } if body.code.as_deref() == Some(NO_ROWS_CODE)
        )
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ProviderError::Rest { status, .. }
            | ProviderError::Auth { status, .. }
            | ProviderError::UpstreamStatus { status, .. } => Some(*status),
            ProviderError::Reqwest(e) => e.status(),
            _ => None,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ProviderError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ProviderError::WebSocket(Box::new(err))
    }
}

impl IsRetryable for ProviderError {
    fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Reqwest(e) => e.is_connect() || e.is_timeout(),
            ProviderError::Rest { status, .. } | ProviderError::UpstreamStatus { status, .. } => {
                status.is_server_error()
            }
            _ => false,
        }
    }
}

/// PostgREST error payload: `{code, message, details, hint}`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RestErrorBody {
    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub details: Option<Value>,

    #[serde(default)]
    pub hint: Option<Value>,
}

/// Auth-server error payload. Older deployments answer `{error, error_description}`,
/// newer ones `{code, error_code, msg}`; some endpoints use `message`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthErrorBody {
    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub error_description: Option<String>,

    #[serde(default)]
    pub error_code: Option<String>,

    #[serde(default)]
    pub msg: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

impl AuthErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.msg
            .or(self.error_description)
            .or(self.message)
            .or(self.error)
            .or(self.error_code)
    }
}
