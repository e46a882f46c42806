//! API error type and helpers.
//!
//! Every failure leaves the API in the same shape as the middleware's
//! canned responses:
//!
//! ```json
//! {"error": {"code": "validation_error", "message": "...", "field": "email"}}
//! ```
//!
//! Core errors map by category: validation failures are 400, missing
//! records are 404, and everything else is a 500 whose details stay in the
//! server log.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;
use warden_core::Error;

/// Body of an error response, nested under `"error"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Offending input field, for field-level validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Serialize)]
struct Envelope<'a> {
    error: &'a ErrorBody,
}

/// Structured error returned by handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Response status.
    pub status: StatusCode,
    /// Response body.
    pub body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code: code.to_string(),
                message: message.into(),
                field: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(Envelope { error: &self.body })).into_response()
    }
}

/// 400 with code `validation_error`.
pub fn api_validation_error(field: Option<&str>, message: &str) -> ApiError {
    let mut err = ApiError::new(StatusCode::BAD_REQUEST, "validation_error", message);
    err.body.field = field.map(str::to_string);
    err
}

/// 401 with code `unauthenticated`.
pub fn api_unauthenticated(message: &str) -> ApiError {
    ApiError::new(StatusCode::UNAUTHORIZED, "unauthenticated", message)
}

/// 403 with code `forbidden`.
pub fn api_forbidden() -> ApiError {
    ApiError::new(StatusCode::FORBIDDEN, "forbidden", "forbidden")
}

/// 404 with code `not_found`.
pub fn api_not_found(message: &str) -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "not_found", message)
}

/// 500 with code `internal`. The message is generic; log details first.
pub fn api_internal() -> ApiError {
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation { field, message } => {
                api_validation_error(field.as_deref(), &message)
            }
            Error::NotFound { kind, .. } => api_not_found(&format!("{kind} not found")),
            other => {
                tracing::error!(error = %other, "request failed");
                api_internal()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        api_validation_error(None, &rejection.body_text())
    }
}

/// Unwraps a JSON body, turning extractor rejections into `ApiError`.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(ApiError::from)
}
