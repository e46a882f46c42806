//! Authenticated user identity and extraction helpers.

use axum::extract::FromRequestParts;
use axum::response::Response;
use http::StatusCode;
use http::request::Parts;
use serde::Serialize;
use warden_core::PrincipalId;

use crate::response::error_response;

/// The principal behind a validated session token.
///
/// Stored in request extensions by [`AuthLayer`](crate::AuthLayer). Handlers
/// can take it as an extractor; extraction fails with 401 when the request
/// is unauthenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    /// Principal id.
    pub principal_id: PrincipalId,
    /// Login email at the time the session was issued.
    pub email: String,
}

/// Extract the `AuthenticatedUser` from HTTP request `Parts`, if present.
pub fn user_from_parts(parts: &Parts) -> Option<&AuthenticatedUser> {
    parts.extensions.get::<AuthenticatedUser>()
}

/// Extract the user's email from HTTP request `Parts`.
///
/// Returns `"anonymous"` if no authenticated user is present.
pub fn email_from_parts(parts: &Parts) -> &str {
    user_from_parts(parts)
        .map(|u| u.email.as_str())
        .unwrap_or("anonymous")
}

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        user_from_parts(parts).cloned().ok_or_else(|| {
            error_response(
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "authentication required",
            )
        })
    }
}
