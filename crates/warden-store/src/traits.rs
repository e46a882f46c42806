//! The entity store contract.
//!
//! Every method is atomic with respect to the tables it touches. Writes that
//! reference ids validate *all* of them before writing anything, so a failed
//! call leaves no partial association rows behind.

use async_trait::async_trait;
use warden_core::{
    Grantee, NewPost, NewPrincipal, Permission, PermissionId, PermissionName, Post, PostChanges,
    PostId, Principal, PrincipalChanges, PrincipalId, Result, Role, RoleId, RoleName, SyncDelta,
};

/// Durable records for principals, roles, permissions, posts, and the three
/// association tables (principal↔role, role↔permission, principal↔permission).
///
/// Lookups by id fail with `Error::NotFound`; lookups by name or email
/// return `Ok(None)` when absent. Uniqueness violations fail with a
/// field-level `Error::Validation`.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // ------------------------------------------------------------------
    // Principals
    // ------------------------------------------------------------------

    /// Inserts a principal. Fails if the email is taken.
    async fn create_principal(&self, principal: NewPrincipal) -> Result<Principal>;

    /// Fetches a principal by id.
    async fn principal(&self, id: PrincipalId) -> Result<Principal>;

    /// Fetches a principal by exact email.
    async fn principal_by_email(&self, email: &str) -> Result<Option<Principal>>;

    /// Lists all principals ordered by id.
    async fn principals(&self) -> Result<Vec<Principal>>;

    /// Applies a partial update. Changing the email to one held by another
    /// principal fails.
    async fn update_principal(&self, id: PrincipalId, changes: PrincipalChanges)
    -> Result<Principal>;

    /// Deletes a principal and its role and direct-permission rows.
    async fn delete_principal(&self, id: PrincipalId) -> Result<Principal>;

    // ------------------------------------------------------------------
    // Roles
    // ------------------------------------------------------------------

    /// Inserts a role. Fails if the name is taken.
    async fn create_role(&self, name: RoleName) -> Result<Role>;

    /// Fetches a role by id.
    async fn role(&self, id: RoleId) -> Result<Role>;

    /// Fetches a role by exact name.
    async fn role_by_name(&self, name: &RoleName) -> Result<Option<Role>>;

    /// Lists all roles ordered by id.
    async fn roles(&self) -> Result<Vec<Role>>;

    /// Renames a role. Renaming to its own current name succeeds.
    async fn rename_role(&self, id: RoleId, name: RoleName) -> Result<Role>;

    /// Deletes a role and its principal and permission rows.
    async fn delete_role(&self, id: RoleId) -> Result<Role>;

    // ------------------------------------------------------------------
    // Permissions
    // ------------------------------------------------------------------

    /// Inserts a permission. Fails if the name is taken.
    async fn create_permission(&self, name: PermissionName) -> Result<Permission>;

    /// Fetches a permission by id.
    async fn permission(&self, id: PermissionId) -> Result<Permission>;

    /// Fetches a permission by exact name.
    async fn permission_by_name(&self, name: &PermissionName) -> Result<Option<Permission>>;

    /// Lists all permissions ordered by id.
    async fn permissions(&self) -> Result<Vec<Permission>>;

    /// Renames a permission. Renaming to its own current name succeeds.
    async fn rename_permission(&self, id: PermissionId, name: PermissionName)
    -> Result<Permission>;

    /// Deletes a permission and every grant of it.
    async fn delete_permission(&self, id: PermissionId) -> Result<Permission>;

    // ------------------------------------------------------------------
    // Association reads
    // ------------------------------------------------------------------

    /// Roles assigned to a principal.
    async fn roles_of(&self, principal: PrincipalId) -> Result<Vec<Role>>;

    /// Permissions granted directly to a principal or to a role.
    async fn permissions_of(&self, grantee: Grantee) -> Result<Vec<Permission>>;

    /// Principals holding a role.
    async fn principals_with_role(&self, role: RoleId) -> Result<Vec<PrincipalId>>;

    /// Roles holding a permission.
    async fn roles_with_permission(&self, permission: PermissionId) -> Result<Vec<Role>>;

    // ------------------------------------------------------------------
    // Association writes
    // ------------------------------------------------------------------

    /// Adds role rows for a principal; returns how many were new.
    async fn attach_roles(&self, principal: PrincipalId, roles: &[RoleId]) -> Result<usize>;

    /// Removes role rows for a principal; returns how many existed.
    async fn detach_roles(&self, principal: PrincipalId, roles: &[RoleId]) -> Result<usize>;

    /// Makes a principal's roles exactly `roles`.
    async fn sync_roles(&self, principal: PrincipalId, roles: &[RoleId]) -> Result<SyncDelta>;

    /// Adds permission rows for a grantee; returns how many were new.
    async fn attach_permissions(&self, grantee: Grantee, permissions: &[PermissionId])
    -> Result<usize>;

    /// Removes permission rows for a grantee; returns how many existed.
    async fn detach_permissions(&self, grantee: Grantee, permissions: &[PermissionId])
    -> Result<usize>;

    /// Makes a grantee's direct permissions exactly `permissions`.
    async fn sync_permissions(&self, grantee: Grantee, permissions: &[PermissionId])
    -> Result<SyncDelta>;

    /// Makes the set of roles holding `permission` exactly `roles`.
    async fn sync_permission_roles(&self, permission: PermissionId, roles: &[RoleId])
    -> Result<SyncDelta>;

    // ------------------------------------------------------------------
    // Entity writes together with their associations
    //
    // Each is one atomic write: either the entity and its association
    // rows both change, or nothing does.
    // ------------------------------------------------------------------

    /// Inserts a principal holding exactly `roles`.
    async fn create_principal_with(&self, principal: NewPrincipal, roles: &[RoleId])
    -> Result<Principal>;

    /// Applies a partial update and, when `roles` is given, makes the
    /// principal's roles exactly that set.
    async fn update_principal_with(
        &self,
        id: PrincipalId,
        changes: PrincipalChanges,
        roles: Option<&[RoleId]>,
    ) -> Result<(Principal, Option<SyncDelta>)>;

    /// Inserts a role holding exactly `permissions`.
    async fn create_role_with(&self, name: RoleName, permissions: &[PermissionId]) -> Result<Role>;

    /// Renames a role and makes its permissions exactly `permissions`.
    async fn update_role(
        &self,
        id: RoleId,
        name: RoleName,
        permissions: &[PermissionId],
    ) -> Result<(Role, SyncDelta)>;

    /// Inserts a permission held by exactly `roles`.
    async fn create_permission_with(&self, name: PermissionName, roles: &[RoleId])
    -> Result<Permission>;

    /// Renames a permission and makes the roles holding it exactly `roles`.
    async fn update_permission(
        &self,
        id: PermissionId,
        name: PermissionName,
        roles: &[RoleId],
    ) -> Result<(Permission, SyncDelta)>;

    // ------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------

    /// Inserts a post.
    async fn create_post(&self, post: NewPost) -> Result<Post>;

    /// Fetches a post by id.
    async fn post(&self, id: PostId) -> Result<Post>;

    /// Lists all posts ordered by id.
    async fn posts(&self) -> Result<Vec<Post>>;

    /// Applies a partial update to a post.
    async fn update_post(&self, id: PostId, changes: PostChanges) -> Result<Post>;

    /// Deletes a post.
    async fn delete_post(&self, id: PostId) -> Result<Post>;
}
