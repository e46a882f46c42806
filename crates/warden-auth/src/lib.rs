//! Authentication and request-time authorization for Warden.
//!
//! Provides:
//! - [`AuthenticatedUser`]: identity behind a validated session token
//! - [`Authenticator`]: trait for async token validation
//! - [`SessionStore`]: opaque in-memory session tokens with a TTL
//! - [`AuthLayer`] / [`AuthService`]: Tower middleware that resolves tokens
//! - [`Requirement`]: what a route needs, parseable from route metadata
//! - [`RequireLayer`] / [`RequireService`]: Tower middleware enforcing a
//!   requirement through the [`Gate`](warden_acl::Gate)
//! - [`AuthConfig`] and [`AuthError`]

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

mod error;
mod guard;
mod middleware;
mod requirement;
mod response;
mod session;
mod user;

use serde::{Deserialize, Serialize};

pub use error::AuthError;
pub use guard::{RequireLayer, RequireService};
pub use middleware::{AuthLayer, AuthService, extract_bearer_token};
pub use requirement::{ParseRequirementError, Requirement};
pub use response::{error_response, forbidden_response, redirect_to_login};
pub use session::{Session, SessionStore};
pub use user::{AuthenticatedUser, email_from_parts, user_from_parts};

/// Settings for authentication, the `[auth]` config section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Where anonymous requests to protected routes are redirected.
    pub login_path: String,
    /// Session lifetime in seconds.
    pub session_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            session_ttl_secs: 7200,
        }
    }
}

impl AuthConfig {
    /// Session lifetime.
    pub fn session_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.session_ttl_secs)
    }
}

/// Trait for validating tokens and extracting user identity.
///
/// The middleware calls `authenticate()` with the bearer token and stores
/// the returned user in the request extensions.
pub trait Authenticator: Send + Sync + 'static {
    /// Validate a token and return the authenticated user.
    fn authenticate(
        &self,
        token: &str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<AuthenticatedUser, AuthError>> + Send + '_>,
    >;
}
