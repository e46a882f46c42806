//! Login, logout, and the current user.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use http::StatusCode;
use warden_auth::{AuthenticatedUser, extract_bearer_token};
use warden_core::PasswordHash;

use crate::app::AppState;
use crate::error::{ApiError, api_unauthenticated, json_body};
use crate::routes::users::user_view;
use crate::types::{LoginRequest, LoginResponse, MeResponse};

pub(crate) async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let body = json_body(payload)?;
    let found = state.rbac.store().principal_by_email(&body.email).await?;
    // Unknown emails verify against the decoy, same cost as a wrong password.
    let digest = found
        .as_ref()
        .map_or(PasswordHash::decoy(), |p| &p.password_hash);
    let verified = digest.verify(&body.password);
    let Some(principal) = found.filter(|_| verified) else {
        tracing::warn!(email = %body.email, "login rejected");
        return Err(api_unauthenticated("invalid credentials"));
    };

    let session = state.sessions.issue(principal.id, principal.email.clone());
    tracing::info!(principal = %principal.id, "login");
    let user = user_view(&state, principal).await?;
    Ok(Json(LoginResponse {
        token: session.token,
        expires_at: session.expires_at,
        user,
    }))
}

pub(crate) async fn logout(State(state): State<AppState>, request: Request) -> StatusCode {
    if let Some(token) = extract_bearer_token(&request) {
        state.sessions.revoke(token);
    }
    StatusCode::NO_CONTENT
}

pub(crate) async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<MeResponse>, ApiError> {
    let gate = state.rbac.gate();
    let permissions = gate
        .effective_permissions(user.principal_id)
        .await?
        .into_iter()
        .collect();
    let is_super = gate.is_super(user.principal_id).await?;
    let principal = state.rbac.store().principal(user.principal_id).await?;
    Ok(Json(MeResponse {
        user: user_view(&state, principal).await?,
        permissions,
        is_super,
    }))
}
