//! Blog posts, the resource the permission catalog guards.
//!
//! Posts are plain records: writes go straight to the store and never touch
//! the grant cache.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use http::StatusCode;
use warden_acl::MAX_FIELD_CHARS;
use warden_auth::AuthenticatedUser;
use warden_core::{Error, NewPost, PostChanges, PostId, Result};

use crate::app::AppState;
use crate::error::{ApiError, json_body};
use crate::types::{ListResponse, PostRequest, PostResponse};

/// Longest accepted post body, in characters.
pub const MAX_CONTENT_CHARS: usize = 500;

fn validate(post: &PostRequest) -> Result<()> {
    let bounded = |field: &str, value: &str, max: usize| {
        if value.is_empty() {
            Err(Error::validation_field(field, "is required"))
        } else if value.chars().count() > max {
            Err(Error::validation_field(
                field,
                format!("may not be greater than {max} characters"),
            ))
        } else {
            Ok(())
        }
    };
    bounded("title", &post.title, MAX_FIELD_CHARS)?;
    bounded("content", &post.content, MAX_CONTENT_CHARS)
}

pub(crate) async fn list_posts(
    State(state): State<AppState>,
) -> std::result::Result<Json<ListResponse<PostResponse>>, ApiError> {
    let posts = state.rbac.store().posts().await?;
    let items: Vec<PostResponse> = posts.into_iter().map(PostResponse::from).collect();
    Ok(Json(items.into()))
}

pub(crate) async fn create_post(
    State(state): State<AppState>,
    author: AuthenticatedUser,
    payload: std::result::Result<Json<PostRequest>, JsonRejection>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let body = json_body(payload)?;
    validate(&body)?;
    let post = state
        .rbac
        .store()
        .create_post(NewPost {
            title: body.title,
            content: body.content,
            author_id: author.principal_id,
        })
        .await?;
    tracing::info!(post = %post.id, author = %author.principal_id, "post created");
    Ok((StatusCode::CREATED, Json(PostResponse::from(post))))
}

pub(crate) async fn show_post(
    State(state): State<AppState>,
    Path(id): Path<PostId>,
) -> std::result::Result<Json<PostResponse>, ApiError> {
    let post = state.rbac.store().post(id).await?;
    Ok(Json(post.into()))
}

pub(crate) async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<PostId>,
    payload: std::result::Result<Json<PostRequest>, JsonRejection>,
) -> std::result::Result<Json<PostResponse>, ApiError> {
    let body = json_body(payload)?;
    validate(&body)?;
    let post = state
        .rbac
        .store()
        .update_post(
            id,
            PostChanges {
                title: Some(body.title),
                content: Some(body.content),
            },
        )
        .await?;
    tracing::info!(post = %id, "post updated");
    Ok(Json(post.into()))
}

pub(crate) async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<PostId>,
) -> std::result::Result<StatusCode, ApiError> {
    state.rbac.store().delete_post(id).await?;
    tracing::info!(post = %id, "post deleted");
    Ok(StatusCode::NO_CONTENT)
}
