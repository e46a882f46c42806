//! User administration.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use http::StatusCode;
use warden_acl::{PrincipalInput, PrincipalUpdate};
use warden_auth::AuthenticatedUser;
use warden_core::{Principal, PrincipalId};

use crate::app::AppState;
use crate::error::{ApiError, json_body};
use crate::types::{CreateUserRequest, ListResponse, UpdateUserRequest, UserResponse};

/// Attaches role names to a principal record.
pub(crate) async fn user_view(
    state: &AppState,
    principal: Principal,
) -> Result<UserResponse, ApiError> {
    let roles = state.rbac.store().roles_of(principal.id).await?;
    Ok(UserResponse::from_principal(principal, roles))
}

pub(crate) async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<UserResponse>>, ApiError> {
    let principals = state.rbac.store().principals().await?;
    let mut items = Vec::with_capacity(principals.len());
    for principal in principals {
        items.push(user_view(&state, principal).await?);
    }
    Ok(Json(items.into()))
}

pub(crate) async fn create_user(
    State(state): State<AppState>,
    actor: AuthenticatedUser,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = json_body(payload)?;
    let principal = state
        .rbac
        .mutator()
        .as_actor(actor.principal_id)
        .create_principal(
            PrincipalInput {
                display_name: body.name,
                email: body.email,
                password: body.password,
            },
            &body.roles,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(user_view(&state, principal).await?)))
}

pub(crate) async fn show_user(
    State(state): State<AppState>,
    Path(id): Path<PrincipalId>,
) -> Result<Json<UserResponse>, ApiError> {
    let principal = state.rbac.store().principal(id).await?;
    Ok(Json(user_view(&state, principal).await?))
}

pub(crate) async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<PrincipalId>,
    actor: AuthenticatedUser,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let body = json_body(payload)?;
    let principal = state
        .rbac
        .mutator()
        .as_actor(actor.principal_id)
        .update_principal(
            id,
            PrincipalUpdate {
                display_name: body.name,
                email: body.email,
                password: body.password,
            },
            body.roles.as_deref(),
        )
        .await?;
    Ok(Json(user_view(&state, principal).await?))
}

pub(crate) async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<PrincipalId>,
    actor: AuthenticatedUser,
) -> Result<StatusCode, ApiError> {
    state
        .rbac
        .mutator()
        .as_actor(actor.principal_id)
        .delete_principal(id)
        .await?;
    let revoked = state.sessions.revoke_principal(id);
    tracing::info!(principal = %id, revoked, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
