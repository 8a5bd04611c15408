use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;
use vectorshop_schema::Envelope;

use super::{ProviderError, RelayError};

/// Errors surfaced to HTTP clients as `{"success": false, "message": ...}`.
#[derive(Debug, ThisError)]
pub enum ApiError {
    #[error("No authorization header")]
    MissingAuthorization,

    #[error("{0}")]
    Unauthorized(String),

    /// Login failures never reveal which half of the credentials was wrong.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingAuthorization
            | ApiError::Unauthorized(_)
            | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Provider(_) | ApiError::Relay(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Re-labels any failure as 401, keeping its message. Used where the caller's own
    /// identity is being resolved.
    #[must_use]
    pub fn into_unauthorized(self) -> Self {
        match self {
            ApiError::MissingAuthorization | ApiError::Unauthorized(_) => self,
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::BytesRejection(e) => {
                ApiError::Internal(format!("Failed to read request body: {e}"))
            }
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        match &self {
            ApiError::Provider(err) => {
                tracing::error!(
                    status = ?err.status(),
                    error = %err,
                    "Backend call failed"
                );
            }
            ApiError::Relay(_) | ApiError::Internal(_) => {
                tracing::error!(message = %message, "Internal error");
            }
            _ => {
                tracing::warn!(status = %status, message = %message, "Request rejected");
            }
        }

        (status, Json(Envelope::failure(message))).into_response()
    }
}
