//! Stored entity records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{PermissionId, PostId, PrincipalId, RoleId};
use crate::names::{PermissionName, RoleName};
use crate::password::PasswordHash;

/// An authenticable actor (a user account).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    /// Stable id.
    pub id: PrincipalId,
    /// Display name.
    pub display_name: String,
    /// Login email; unique and case-sensitive.
    pub email: String,
    /// Salted password digest.
    pub password_hash: PasswordHash,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A named bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Stable id.
    pub id: RoleId,
    /// Unique, case-sensitive name.
    pub name: RoleName,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A named atomic capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Stable id.
    pub id: PermissionId,
    /// Unique, case-sensitive name.
    pub name: PermissionName,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A blog post, the consumer of the authorization checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Stable id.
    pub id: PostId,
    /// Title, at most 255 characters.
    pub title: String,
    /// Body, at most 500 characters.
    pub content: String,
    /// Principal that wrote the post.
    pub author_id: PrincipalId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Something permissions can be granted to directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Grantee {
    /// Direct grant to a principal.
    Principal(PrincipalId),
    /// Grant to a role, inherited by its members.
    Role(RoleId),
}

impl std::fmt::Display for Grantee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grantee::Principal(id) => write!(f, "principal {id}"),
            Grantee::Role(id) => write!(f, "role {id}"),
        }
    }
}

/// Fields for a new principal. The store assigns the id and timestamps.
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    /// Display name.
    pub display_name: String,
    /// Login email.
    pub email: String,
    /// Password digest.
    pub password_hash: PasswordHash,
}

/// Partial update of a principal; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct PrincipalChanges {
    /// New display name.
    pub display_name: Option<String>,
    /// New email.
    pub email: Option<String>,
    /// New password digest.
    pub password_hash: Option<PasswordHash>,
}

/// Fields for a new post.
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Title.
    pub title: String,
    /// Body.
    pub content: String,
    /// Author.
    pub author_id: PrincipalId,
}

/// Partial update of a post.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    /// New title.
    pub title: Option<String>,
    /// New body.
    pub content: Option<String>,
}

/// Net effect of a sync: rows added and rows removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncDelta {
    /// Association rows inserted.
    pub added: usize,
    /// Association rows deleted.
    pub removed: usize,
}

impl SyncDelta {
    /// Returns `true` if the sync changed nothing.
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}
