//! Canned responses shared by the middleware layers.

use axum::response::{IntoResponse, Response};
use http::StatusCode;

/// Builds `{"error": {"code": .., "message": ..}}` with the given status.
pub fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let body = serde_json::json!({
        "error": {
            "code": code,
            "message": message,
        }
    });
    (
        status,
        [(http::header::CONTENT_TYPE, "application/json")],
        serde_json::to_string(&body).unwrap_or_default(),
    )
        .into_response()
}

/// The fixed denial. It never says which role or permission was missing.
pub fn forbidden_response() -> Response {
    error_response(StatusCode::FORBIDDEN, "forbidden", "forbidden")
}

/// `303 See Other` to the login page.
pub fn redirect_to_login(login_path: &str) -> Response {
    let mut response = StatusCode::SEE_OTHER.into_response();
    if let Ok(location) = http::HeaderValue::from_str(login_path) {
        response
            .headers_mut()
            .insert(http::header::LOCATION, location);
    }
    response
}
