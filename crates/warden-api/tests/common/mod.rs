//! Shared harness for the HTTP tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::response::Response;
use http::{Request, StatusCode};
use tower::ServiceExt;
use warden_acl::{PrincipalInput, Rbac, RbacConfig};
use warden_api::{AppState, SeedConfig, build_router, seed};
use warden_auth::AuthConfig;
use warden_core::{PrincipalId, RoleName};
use warden_store::InMemoryStore;

pub const ADMIN_EMAIL: &str = "admin@admin.com";
pub const PASSWORD: &str = "password";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// A seeded app: full catalog, moderator and super roles, admin account.
    pub async fn seeded() -> Self {
        let rbac = Rbac::new(Arc::new(InMemoryStore::new()), RbacConfig::default());
        seed(&rbac, &SeedConfig::default()).await.unwrap();
        let state = AppState::new(rbac, AuthConfig::default());
        Self {
            router: build_router(state.clone()),
            state,
        }
    }

    pub fn rbac(&self) -> &Rbac {
        &self.state.rbac
    }

    /// Creates a user directly through the engine.
    pub async fn user(&self, email: &str, roles: &[&str]) -> PrincipalId {
        let roles: Vec<RoleName> = roles.iter().map(|r| RoleName::from(*r)).collect();
        self.rbac()
            .mutator()
            .create_principal(
                PrincipalInput {
                    display_name: email.to_string(),
                    email: email.to_string(),
                    password: PASSWORD.to_string(),
                },
                &roles,
            )
            .await
            .unwrap()
            .id
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Logs in and returns the bearer token.
    pub async fn login(&self, email: &str) -> String {
        let resp = self
            .send(
                "POST",
                "/login",
                None,
                Some(serde_json::json!({"email": email, "password": PASSWORD})),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK, "login as {email}");
        read_json(resp).await["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL).await
    }
}

pub async fn read_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn read_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
