//! Error types for tts-ui HTTP handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::session::IdentityError;

/// HTTP-facing error type
#[derive(Debug, Error)]
pub enum UiError {
    /// Identity provider could not produce a redirect (502/503)
    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),
}

impl IntoResponse for UiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            UiError::Identity(IdentityError::NotDiscovered) => {
                (StatusCode::SERVICE_UNAVAILABLE, "IDENTITY_NOT_READY")
            }
            UiError::Identity(_) => (StatusCode::BAD_GATEWAY, "IDENTITY_ERROR"),
        };

        error!(code = error_code, "{}", self);

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for handlers
pub type UiResult<T> = Result<T, UiError>;
