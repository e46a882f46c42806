//! Router wiring and shared application state.
//!
//! Every route declares its access requirement next to its handler. The
//! requirement is enforced by a [`RequireLayer`] on that method only, and
//! the whole router sits behind an [`AuthLayer`] that turns bearer tokens
//! into an [`AuthenticatedUser`](warden_auth::AuthenticatedUser).

use std::sync::Arc;

use axum::Router;
use axum::routing::{MethodRouter, delete, get, post};
use warden_acl::Rbac;
use warden_auth::{AuthConfig, AuthLayer, RequireLayer, Requirement, SessionStore};

use crate::routes::{health, permissions, posts, roles, session, users};

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The authorization engine.
    pub rbac: Rbac,
    /// Issued session tokens.
    pub sessions: Arc<SessionStore>,
    /// Login path and session lifetime.
    pub auth: AuthConfig,
}

impl AppState {
    /// Creates state with an empty session table.
    pub fn new(rbac: Rbac, auth: AuthConfig) -> Self {
        let sessions = Arc::new(SessionStore::new(auth.session_ttl()));
        Self {
            rbac,
            sessions,
            auth,
        }
    }
}

/// Attaches `requirement` to every method currently on `route`.
fn guarded(
    state: &AppState,
    route: MethodRouter<AppState>,
    requirement: Requirement,
) -> MethodRouter<AppState> {
    route.route_layer(RequireLayer::new(
        state.rbac.gate_handle(),
        requirement,
        state.auth.login_path.as_str(),
    ))
}

/// Builds the admin API.
pub fn build_router(state: AppState) -> Router {
    let can = |route: MethodRouter<AppState>, ability: &str| {
        guarded(&state, route, Requirement::can(ability))
    };
    let authenticated =
        |route: MethodRouter<AppState>| guarded(&state, route, Requirement::Authenticated);

    Router::new()
        .route("/health", get(health::health))
        .route("/login", post(session::login))
        .route("/logout", authenticated(post(session::logout)))
        .route("/me", authenticated(get(session::me)))
        .route(
            "/users",
            can(get(users::list_users), "view_any_users")
                .merge(can(post(users::create_user), "create_users")),
        )
        .route(
            "/users/{id}",
            can(get(users::show_user).put(users::update_user), "update_users")
                .merge(can(delete(users::delete_user), "delete_users")),
        )
        .route(
            "/roles",
            can(get(roles::list_roles), "view_any_roles")
                .merge(can(post(roles::create_role), "create_roles")),
        )
        .route(
            "/roles/assignable",
            can(get(roles::assignable_roles), "view_any_roles"),
        )
        .route(
            "/roles/{id}",
            can(get(roles::show_role).put(roles::update_role), "update_roles")
                .merge(can(delete(roles::delete_role), "delete_roles")),
        )
        .route(
            "/permissions",
            can(get(permissions::list_permissions), "view_any_permissions")
                .merge(can(post(permissions::create_permission), "create_permissions")),
        )
        .route(
            "/permissions/{id}",
            can(
                get(permissions::show_permission).put(permissions::update_permission),
                "update_permissions",
            )
            .merge(can(delete(permissions::delete_permission), "delete_permissions")),
        )
        .route(
            "/posts",
            can(get(posts::list_posts), "view_any_posts")
                .merge(can(post(posts::create_post), "create_posts")),
        )
        .route(
            "/posts/{id}",
            can(get(posts::show_post).put(posts::update_post), "update_posts")
                .merge(can(delete(posts::delete_post), "delete_posts")),
        )
        .layer(AuthLayer::new(Arc::clone(&state.sessions)))
        .with_state(state)
}

/// Serves `router` on `listener` until Ctrl-C.
pub async fn serve(listener: tokio::net::TcpListener, router: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "warden admin API listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
            }
        })
        .await
}

