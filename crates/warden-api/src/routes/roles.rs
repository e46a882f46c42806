//! Role administration.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use http::StatusCode;
use warden_auth::AuthenticatedUser;
use warden_core::{Grantee, Role, RoleId};

use crate::app::AppState;
use crate::error::{ApiError, json_body};
use crate::types::{ListResponse, RoleRequest, RoleResponse};

async fn role_view(state: &AppState, role: Role) -> Result<RoleResponse, ApiError> {
    let permissions = state.rbac.store().permissions_of(Grantee::Role(role.id)).await?;
    Ok(RoleResponse::from_role(role, permissions))
}

async fn role_views(state: &AppState, roles: Vec<Role>) -> Result<Vec<RoleResponse>, ApiError> {
    let mut items = Vec::with_capacity(roles.len());
    for role in roles {
        items.push(role_view(state, role).await?);
    }
    Ok(items)
}

pub(crate) async fn list_roles(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<RoleResponse>>, ApiError> {
    let roles = state.rbac.store().roles().await?;
    Ok(Json(role_views(&state, roles).await?.into()))
}

/// Roles offered on the user form. The super role is left out so it can
/// only be handed out from the command line or by seeding.
pub(crate) async fn assignable_roles(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<RoleResponse>>, ApiError> {
    let super_role = &state.rbac.config().super_role;
    let roles = state
        .rbac
        .store()
        .roles()
        .await?
        .into_iter()
        .filter(|r| &r.name != super_role)
        .collect();
    Ok(Json(role_views(&state, roles).await?.into()))
}

pub(crate) async fn create_role(
    State(state): State<AppState>,
    actor: AuthenticatedUser,
    payload: Result<Json<RoleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = json_body(payload)?;
    let role = state
        .rbac
        .mutator()
        .as_actor(actor.principal_id)
        .create_role(body.name, &body.permissions)
        .await?;
    Ok((StatusCode::CREATED, Json(role_view(&state, role).await?)))
}

pub(crate) async fn show_role(
    State(state): State<AppState>,
    Path(id): Path<RoleId>,
) -> Result<Json<RoleResponse>, ApiError> {
    let role = state.rbac.store().role(id).await?;
    Ok(Json(role_view(&state, role).await?))
}

pub(crate) async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<RoleId>,
    actor: AuthenticatedUser,
    payload: Result<Json<RoleRequest>, JsonRejection>,
) -> Result<Json<RoleResponse>, ApiError> {
    let body = json_body(payload)?;
    let role = state
        .rbac
        .mutator()
        .as_actor(actor.principal_id)
        .update_role(id, body.name, &body.permissions)
        .await?;
    Ok(Json(role_view(&state, role).await?))
}

pub(crate) async fn delete_role(
    State(state): State<AppState>,
    Path(id): Path<RoleId>,
    actor: AuthenticatedUser,
) -> Result<StatusCode, ApiError> {
    state
        .rbac
        .mutator()
        .as_actor(actor.principal_id)
        .delete_role(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
