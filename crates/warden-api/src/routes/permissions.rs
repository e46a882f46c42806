//! Permission administration.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use http::StatusCode;
use warden_auth::AuthenticatedUser;
use warden_core::{Permission, PermissionId};

use crate::app::AppState;
use crate::error::{ApiError, json_body};
use crate::types::{ListResponse, PermissionRequest, PermissionResponse};

async fn permission_view(
    state: &AppState,
    permission: Permission,
) -> Result<PermissionResponse, ApiError> {
    let roles = state
        .rbac
        .store()
        .roles_with_permission(permission.id)
        .await?;
    Ok(PermissionResponse::from_permission(permission, roles))
}

pub(crate) async fn list_permissions(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<PermissionResponse>>, ApiError> {
    let permissions = state.rbac.store().permissions().await?;
    let mut items = Vec::with_capacity(permissions.len());
    for permission in permissions {
        items.push(permission_view(&state, permission).await?);
    }
    Ok(Json(items.into()))
}

pub(crate) async fn create_permission(
    State(state): State<AppState>,
    actor: AuthenticatedUser,
    payload: Result<Json<PermissionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = json_body(payload)?;
    let permission = state
        .rbac
        .mutator()
        .as_actor(actor.principal_id)
        .create_permission(body.name, &body.roles)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(permission_view(&state, permission).await?),
    ))
}

pub(crate) async fn show_permission(
    State(state): State<AppState>,
    Path(id): Path<PermissionId>,
) -> Result<Json<PermissionResponse>, ApiError> {
    let permission = state.rbac.store().permission(id).await?;
    Ok(Json(permission_view(&state, permission).await?))
}

pub(crate) async fn update_permission(
    State(state): State<AppState>,
    Path(id): Path<PermissionId>,
    actor: AuthenticatedUser,
    payload: Result<Json<PermissionRequest>, JsonRejection>,
) -> Result<Json<PermissionResponse>, ApiError> {
    let body = json_body(payload)?;
    let permission = state
        .rbac
        .mutator()
        .as_actor(actor.principal_id)
        .update_permission(id, body.name, &body.roles)
        .await?;
    Ok(Json(permission_view(&state, permission).await?))
}

pub(crate) async fn delete_permission(
    State(state): State<AppState>,
    Path(id): Path<PermissionId>,
    actor: AuthenticatedUser,
) -> Result<StatusCode, ApiError> {
    state
        .rbac
        .mutator()
        .as_actor(actor.principal_id)
        .delete_permission(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
