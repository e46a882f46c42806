//! Warden Core: shared types and errors for the access-control engine.
//!
//! This crate has no internal Warden dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error taxonomy and Result alias
//! - [`ids`]: Sequential entity identifiers
//! - [`names`]: Case-sensitive role and permission names
//! - [`model`]: Stored entity records
//! - [`password`]: Salted password digests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod ids;
pub mod model;
pub mod names;
pub mod password;

mod proptests;

// Re-export key types at crate root for convenience
pub use error::{EntityKind, Error, Result};
pub use ids::{PermissionId, PostId, PrincipalId, RoleId};
pub use model::{
    Grantee, NewPost, NewPrincipal, Permission, Post, PostChanges, Principal, PrincipalChanges,
    Role, SyncDelta,
};
pub use names::{PermissionName, RoleName, names};
pub use password::PasswordHash;
