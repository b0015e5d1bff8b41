//! API error handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use peup_core::error::PeupError;

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    code: String,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(status: StatusCode, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: code.into(),
        }
    }

    /// Bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
    }

    /// Not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, "NOT_FOUND")
    }

    /// Upstream failure.
    pub fn bad_gateway(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message, code)
    }

    /// Internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, "INTERNAL_ERROR")
    }

    /// Returns the HTTP status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the machine-readable code.
    pub fn code(&self) -> &str {
        &self.code
    }
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<PeupError> for ApiError {
    fn from(err: PeupError) -> Self {
        match &err {
            PeupError::NotFound(_) => ApiError::not_found(err.to_string()),
            PeupError::InvalidInput(_) => ApiError::bad_request(err.to_string()),
            PeupError::UpstreamTimeout { .. } => {
                tracing::warn!(error = %err, "Upstream timed out");
                ApiError::bad_gateway(err.to_string(), "UPSTREAM_TIMEOUT")
            }
            _ if err.is_upstream() => {
                tracing::warn!(error = %err, "Upstream failure");
                ApiError::bad_gateway(err.to_string(), "UPSTREAM_ERROR")
            }
            PeupError::HttpError(_) => {
                tracing::warn!(error = %err, "Registry unreachable");
                ApiError::bad_gateway(err.to_string(), "UPSTREAM_ERROR")
            }
            _ => {
                tracing::error!(error = %err, "Internal error");
                ApiError::internal("An internal error occurred")
            }
        }
    }
}
