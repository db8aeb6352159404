//! API error types and HTTP status mapping.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::engine::EngineError;
use crate::scripts::ScriptError;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

/// API error type that can be converted to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or incomplete request.
    BadRequest(String),
    /// Resource not found.
    NotFound(String),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Internal(msg) => {
                tracing::error!("Internal API error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound(msg) => ApiError::NotFound(format!("task not found: {}", msg)),
            EngineError::AlreadyStarted(msg) => {
                ApiError::BadRequest(format!("task already started: {}", msg))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ScriptError> for ApiError {
    fn from(err: ScriptError) -> Self {
        match err {
            ScriptError::UnknownScript(_) => ApiError::BadRequest(err.to_string()),
            ScriptError::ScriptMissing(_) => ApiError::NotFound(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("invalid request body: {}", rejection.body_text()))
    }
}
