//! Per-route authorization middleware.
//!
//! Outcomes:
//!
//! - no authenticated user: `303 See Other` to the login path
//! - requirement not met: `403` with the fixed `forbidden` body
//! - principal deleted since the session was issued: treated as no user
//! - any other gate failure: `500`

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::IntoResponse;
use http::{Request, StatusCode};
use tower::{Layer, Service};
use warden_acl::Gate;
use warden_core::EntityKind;

use crate::response::{error_response, forbidden_response, redirect_to_login};
use crate::{AuthenticatedUser, Requirement};

/// Tower `Layer` enforcing one [`Requirement`].
#[derive(Clone)]
pub struct RequireLayer {
    gate: Arc<Gate>,
    requirement: Arc<Requirement>,
    login_path: Arc<str>,
}

impl RequireLayer {
    /// Enforces `requirement`, redirecting anonymous requests to
    /// `login_path`.
    pub fn new(gate: Arc<Gate>, requirement: Requirement, login_path: impl Into<Arc<str>>) -> Self {
        Self {
            gate,
            requirement: Arc::new(requirement),
            login_path: login_path.into(),
        }
    }

    /// The enforced requirement.
    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }
}

impl<S> Layer<S> for RequireLayer {
    type Service = RequireService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireService {
            inner,
            gate: Arc::clone(&self.gate),
            requirement: Arc::clone(&self.requirement),
            login_path: Arc::clone(&self.login_path),
        }
    }
}

/// Tower `Service` produced by [`RequireLayer`].
#[derive(Clone)]
pub struct RequireService<S> {
    inner: S,
    gate: Arc<Gate>,
    requirement: Arc<Requirement>,
    login_path: Arc<str>,
}

impl<S> Service<Request<Body>> for RequireService<S>
where
    S: Service<Request<Body>, Error = Infallible> + Clone + Send + 'static,
    S::Response: IntoResponse,
    S::Future: Send,
{
    type Response = axum::response::Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let gate = Arc::clone(&self.gate);
        let requirement = Arc::clone(&self.requirement);
        let login_path = Arc::clone(&self.login_path);

        Box::pin(async move {
            let Some(user) = req.extensions().get::<AuthenticatedUser>().cloned() else {
                return Ok(redirect_to_login(&login_path));
            };

            match requirement.is_met(&gate, user.principal_id).await {
                Ok(true) => {
                    let resp = inner
                        .call(req)
                        .await
                        .unwrap_or_else(|infallible| match infallible {});
                    Ok(resp.into_response())
                }
                Ok(false) => {
                    log::debug!(
                        "Denied principal {} on {} (requires {requirement})",
                        user.principal_id,
                        req.uri().path()
                    );
                    Ok(forbidden_response())
                }
                Err(e) if e.is_not_found(EntityKind::Principal) => {
                    log::warn!("Session for deleted principal {}", user.principal_id);
                    Ok(redirect_to_login(&login_path))
                }
                Err(e) => {
                    log::error!("Authorization check failed: {e}");
                    Ok(error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal",
                        "internal error",
                    ))
                }
            }
        })
    }
}
