//! Tower authentication middleware.
//!
//! `AuthLayer` resolves a bearer token to an [`AuthenticatedUser`] and puts
//! it in the request extensions. It does not decide access: a request with
//! no token passes through anonymous, and [`RequireLayer`](crate::RequireLayer)
//! on the route decides what to do with it. A token that is present but
//! invalid or expired is answered with 401 straight away.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::IntoResponse;
use http::{Request, StatusCode};
use tower::{Layer, Service};

use crate::Authenticator;
use crate::response::error_response;

/// Tower `Layer` that wraps services with token authentication.
pub struct AuthLayer<A: Authenticator> {
    authenticator: Arc<A>,
}

impl<A: Authenticator> Clone for AuthLayer<A> {
    fn clone(&self) -> Self {
        Self {
            authenticator: Arc::clone(&self.authenticator),
        }
    }
}

impl<A: Authenticator> AuthLayer<A> {
    /// Create a new auth layer with the given authenticator.
    pub fn new(authenticator: Arc<A>) -> Self {
        Self { authenticator }
    }
}

impl<A: Authenticator, S> Layer<S> for AuthLayer<A> {
    type Service = AuthService<A, S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            authenticator: Arc::clone(&self.authenticator),
        }
    }
}

/// Tower `Service` that authenticates tokens before forwarding requests.
pub struct AuthService<A: Authenticator, S> {
    inner: S,
    authenticator: Arc<A>,
}

impl<A: Authenticator, S: Clone> Clone for AuthService<A, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            authenticator: Arc::clone(&self.authenticator),
        }
    }
}

impl<A, S> Service<Request<Body>> for AuthService<A, S>
where
    A: Authenticator,
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

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let authenticator = Arc::clone(&self.authenticator);

        Box::pin(async move {
            if let Some(token) = extract_bearer_token(&req).map(str::to_string) {
                match authenticator.authenticate(&token).await {
                    Ok(user) => {
                        req.extensions_mut().insert(user);
                    }
                    Err(auth_err) if auth_err.is_client_error() => {
                        log::warn!("Authentication failed: {auth_err}");
                        return Ok(error_response(
                            StatusCode::UNAUTHORIZED,
                            "unauthenticated",
                            &auth_err.to_string(),
                        ));
                    }
                    Err(auth_err) => {
                        log::error!("Authentication backend failure: {auth_err}");
                        return Ok(error_response(
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "internal",
                            "internal error",
                        ));
                    }
                }
            }

            let resp = inner
                .call(req)
                .await
                .unwrap_or_else(|infallible| match infallible {});
            Ok(resp.into_response())
        })
    }
}

/// Extract bearer token from the Authorization header.
pub fn extract_bearer_token<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{AuthenticatedUser, SessionStore};
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;
    use warden_core::PrincipalId;

    /// Mock inner service that captures the AuthenticatedUser.
    #[derive(Clone)]
    struct MockService {
        captured_user: Arc<Mutex<Option<AuthenticatedUser>>>,
    }

    impl MockService {
        fn new() -> Self {
            Self {
                captured_user: Arc::new(Mutex::new(None)),
            }
        }
    }

    impl Service<Request<Body>> for MockService {
        type Response = axum::response::Response;
        type Error = Infallible;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: Request<Body>) -> Self::Future {
            let captured = self.captured_user.clone();
            Box::pin(async move {
                let user = req.extensions().get::<AuthenticatedUser>().cloned();
                *captured.lock().unwrap() = user;
                Ok((StatusCode::OK, "ok").into_response())
            })
        }
    }

    fn sessions() -> Arc<SessionStore> {
        Arc::new(SessionStore::new(Duration::from_secs(60)))
    }

    #[test]
    fn test_extract_bearer_token_valid() {
        let req = Request::builder()
            .header("Authorization", "Bearer my-token-123")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_bearer_token(&req), Some("my-token-123"));
    }

    #[test]
    fn test_extract_bearer_token_wrong_scheme() {
        let req = Request::builder()
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_bearer_token(&req), None);
    }

    #[tokio::test]
    async fn test_missing_token_passes_through_anonymous() {
        let mock = MockService::new();
        let captured = mock.captured_user.clone();
        let service = AuthLayer::new(sessions()).layer(mock);

        let req = Request::builder().body(Body::empty()).unwrap();
        let resp = service.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(captured.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_token_returns_401() {
        let service = AuthLayer::new(sessions()).layer(MockService::new());
        let req = Request::builder()
            .header("Authorization", "Bearer bad-token")
            .body(Body::empty())
            .unwrap();
        let resp = service.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_expired_token_returns_401() {
        let store = Arc::new(SessionStore::new(Duration::ZERO));
        let session = store.issue(PrincipalId::new(1), "a@example.com");
        let service = AuthLayer::new(store).layer(MockService::new());
        let req = Request::builder()
            .header("Authorization", format!("Bearer {}", session.token))
            .body(Body::empty())
            .unwrap();
        let resp = service.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_token_injects_user() {
        let store = sessions();
        let session = store.issue(PrincipalId::new(9), "alice@example.com");
        let mock = MockService::new();
        let captured = mock.captured_user.clone();
        let service = AuthLayer::new(store).layer(mock);

        let req = Request::builder()
            .header("Authorization", format!("Bearer {}", session.token))
            .body(Body::empty())
            .unwrap();
        let resp = service.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let user = captured.lock().unwrap().clone().unwrap();
        assert_eq!(user.principal_id, PrincipalId::new(9));
        assert_eq!(user.email, "alice@example.com");
    }
}
