//! Request and response bodies.
//!
//! Responses are built from store records through `from_*` constructors so
//! that no response type ever carries a password digest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::{
    Permission, PermissionId, PermissionName, Post, PostId, Principal, PrincipalId, Role, RoleId,
    RoleName,
};

/// Wrapper for collection responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    /// Items in store order.
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

// ----------------------------------------------------------------------
// Session
// ----------------------------------------------------------------------

/// `POST /login` body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Login email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// `POST /login` response.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// When the token stops working.
    pub expires_at: DateTime<Utc>,
    /// The logged-in user.
    pub user: UserResponse,
}

/// `GET /me` response.
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    /// The current user.
    pub user: UserResponse,
    /// Effective permissions, direct and through roles.
    pub permissions: Vec<PermissionName>,
    /// Whether the user holds the super role.
    pub is_super: bool,
}

// ----------------------------------------------------------------------
// Users
// ----------------------------------------------------------------------

/// A principal as the API shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserResponse {
    /// Id.
    pub id: PrincipalId,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Role names held.
    pub roles: Vec<RoleName>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl UserResponse {
    /// Builds the view of `principal` holding `roles`.
    pub fn from_principal(principal: Principal, roles: Vec<Role>) -> Self {
        Self {
            id: principal.id,
            name: principal.display_name,
            email: principal.email,
            roles: roles.into_iter().map(|r| r.name).collect(),
            created_at: principal.created_at,
            updated_at: principal.updated_at,
        }
    }
}

/// `POST /users` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
    /// Role names to assign.
    #[serde(default)]
    pub roles: Vec<RoleName>,
}

/// `PUT /users/{id}` body.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserRequest {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// New password; absent or empty keeps the current one.
    #[serde(default)]
    pub password: Option<String>,
    /// When present, the user's roles become exactly this set.
    #[serde(default)]
    pub roles: Option<Vec<RoleName>>,
}

// ----------------------------------------------------------------------
// Roles and permissions
// ----------------------------------------------------------------------

/// A role with the permissions it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleResponse {
    /// Id.
    pub id: RoleId,
    /// Name.
    pub name: RoleName,
    /// Permission names held.
    pub permissions: Vec<PermissionName>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl RoleResponse {
    /// Builds the view of `role` holding `permissions`.
    pub fn from_role(role: Role, permissions: Vec<Permission>) -> Self {
        Self {
            id: role.id,
            name: role.name,
            permissions: permissions.into_iter().map(|p| p.name).collect(),
            created_at: role.created_at,
            updated_at: role.updated_at,
        }
    }
}

/// `POST /roles` and `PUT /roles/{id}` body.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleRequest {
    /// Role name.
    pub name: RoleName,
    /// Exact permission set the role should hold.
    #[serde(default)]
    pub permissions: Vec<PermissionName>,
}

/// A permission with the roles holding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionResponse {
    /// Id.
    pub id: PermissionId,
    /// Name.
    pub name: PermissionName,
    /// Names of roles holding it.
    pub roles: Vec<RoleName>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl PermissionResponse {
    /// Builds the view of `permission` held by `roles`.
    pub fn from_permission(permission: Permission, roles: Vec<Role>) -> Self {
        Self {
            id: permission.id,
            name: permission.name,
            roles: roles.into_iter().map(|r| r.name).collect(),
            created_at: permission.created_at,
            updated_at: permission.updated_at,
        }
    }
}

/// `POST /permissions` and `PUT /permissions/{id}` body.
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionRequest {
    /// Permission name.
    pub name: PermissionName,
    /// Exact role set that should hold it.
    #[serde(default)]
    pub roles: Vec<RoleName>,
}

// ----------------------------------------------------------------------
// Posts
// ----------------------------------------------------------------------

/// A blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostResponse {
    /// Id.
    pub id: PostId,
    /// Title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Author id. The author may since have been deleted.
    pub author_id: PrincipalId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            author_id: post.author_id,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

/// `POST /posts` and `PUT /posts/{id}` body.
#[derive(Debug, Clone, Deserialize)]
pub struct PostRequest {
    /// Title.
    pub title: String,
    /// Body text.
    pub content: String,
}

/// `GET /health` response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server answers.
    pub status: &'static str,
    /// Crate version.
    pub version: &'static str,
}
