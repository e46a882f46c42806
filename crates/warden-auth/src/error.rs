//! Auth-specific error types.

/// Errors that can occur during authentication.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AuthError {
    /// No Authorization header or bearer token present.
    #[error("missing authentication token")]
    MissingToken,

    /// Token is not a known session.
    #[error("invalid session token")]
    InvalidToken,

    /// Session has expired.
    #[error("session has expired")]
    Expired,

    /// Email/password pair did not match.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Session backend failed.
    #[error("session backend error: {0}")]
    Backend(String),
}

impl AuthError {
    /// Whether this error should result in a 401 (vs. a 500).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AuthError::MissingToken
                | AuthError::InvalidToken
                | AuthError::Expired
                | AuthError::InvalidCredentials
        )
    }
}
