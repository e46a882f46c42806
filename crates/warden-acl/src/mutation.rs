//! The mutation API: the only path that changes grants.
//!
//! Each operation makes exactly one store write, then invalidates the grant
//! cache, then records an audit event. Operations that touch an entity and
//! its associations (create or update with a `roles`/`permissions` list)
//! use the store's combined writes, so a failure leaves nothing behind. Invalidation happens after the
//! durable write so a crash in between costs at most a cache miss.
//! Before returning, every operation checks that the relevant cache token
//! actually advanced and fails with [`Error::Consistency`] otherwise.
//!
//! Names referenced in payloads (`roles`, `permissions`) must exist; an
//! unknown name fails the whole call with a field-level validation error
//! before anything is written.

use chrono::Utc;
use std::sync::Arc;
use warden_core::{
    Error, Grantee, NewPrincipal, PasswordHash, Permission, PermissionId, PermissionName,
    Principal, PrincipalChanges, PrincipalId, Result, Role, RoleId, RoleName, SyncDelta,
};
use warden_store::EntityStore;

use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::cache::{CacheToken, GrantCache};
use crate::validate;

/// Fields for creating a principal through the admin surface.
#[derive(Debug, Clone)]
pub struct PrincipalInput {
    /// Display name.
    pub display_name: String,
    /// Login email.
    pub email: String,
    /// Plaintext password; hashed before storage.
    pub password: String,
}

/// Fields for editing a principal. An absent or empty password keeps the
/// current digest.
#[derive(Debug, Clone)]
pub struct PrincipalUpdate {
    /// Display name.
    pub display_name: String,
    /// Login email.
    pub email: String,
    /// New plaintext password.
    pub password: Option<String>,
}

/// Which cache entries a write can affect.
#[derive(Debug, Clone, Copy)]
enum Scope {
    Principal(PrincipalId),
    Everyone,
}

impl From<Grantee> for Scope {
    fn from(grantee: Grantee) -> Self {
        match grantee {
            Grantee::Principal(id) => Scope::Principal(id),
            Grantee::Role(_) => Scope::Everyone,
        }
    }
}

/// Fails unless `after` is strictly newer than `before`.
fn ensure_advanced(before: CacheToken, after: CacheToken, what: &str) -> Result<()> {
    if after > before {
        Ok(())
    } else {
        Err(Error::consistency(format!(
            "{what}: cache token did not advance ({before:?} -> {after:?})"
        )))
    }
}

/// Write side of the engine.
#[derive(Clone)]
pub struct Mutator {
    store: Arc<dyn EntityStore>,
    cache: Arc<GrantCache>,
    audit: Arc<dyn AuditSink>,
    actor: Option<PrincipalId>,
}

impl std::fmt::Debug for Mutator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mutator")
            .field("actor", &self.actor)
            .finish_non_exhaustive()
    }
}

impl Mutator {
    /// Creates a mutator with no actor attached.
    pub fn new(
        store: Arc<dyn EntityStore>,
        cache: Arc<GrantCache>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            cache,
            audit,
            actor: None,
        }
    }

    /// Returns a copy whose audit events name `actor`.
    pub fn as_actor(&self, actor: PrincipalId) -> Self {
        Self {
            actor: Some(actor),
            ..self.clone()
        }
    }

    /// The attached actor, if any.
    pub fn actor(&self) -> Option<PrincipalId> {
        self.actor
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    fn invalidate(&self, scope: Scope, what: &str) -> Result<()> {
        match scope {
            Scope::Principal(id) => {
                let before = self.cache.token(id);
                self.cache.invalidate(id);
                ensure_advanced(before, self.cache.token(id), what)
            }
            Scope::Everyone => {
                let before = self.cache.epoch();
                let after = self.cache.invalidate_all();
                let token = |epoch| CacheToken { epoch, generation: 0 };
                ensure_advanced(token(before), token(after), what)
            }
        }
    }

    fn record(&self, action: AuditAction) {
        log::info!("{action}");
        self.audit.record(&AuditEvent {
            actor: self.actor,
            action,
            at: Utc::now(),
        });
    }

    async fn role_ids(&self, names: &[RoleName]) -> Result<Vec<RoleId>> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            match self.store.role_by_name(name).await? {
                Some(role) => ids.push(role.id),
                None => {
                    return Err(Error::validation_field(
                        "roles",
                        format!("role '{name}' does not exist"),
                    ));
                }
            }
        }
        Ok(ids)
    }

    async fn permission_ids(&self, names: &[PermissionName]) -> Result<Vec<PermissionId>> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            match self.store.permission_by_name(name).await? {
                Some(permission) => ids.push(permission.id),
                None => {
                    return Err(Error::validation_field(
                        "permissions",
                        format!("permission '{name}' does not exist"),
                    ));
                }
            }
        }
        Ok(ids)
    }

    // ------------------------------------------------------------------
    // Role membership
    // ------------------------------------------------------------------

    /// Assigns roles to a principal. Already-held roles are left alone.
    pub async fn assign_role(&self, principal: PrincipalId, roles: &[RoleName]) -> Result<usize> {
        let ids = self.role_ids(roles).await?;
        let added = self.store.attach_roles(principal, &ids).await?;
        self.invalidate(Scope::Principal(principal), "assign_role")?;
        self.record(AuditAction::RolesAssigned { principal, added });
        Ok(added)
    }

    /// Removes roles from a principal. Roles not held are ignored.
    pub async fn remove_role(&self, principal: PrincipalId, roles: &[RoleName]) -> Result<usize> {
        let ids = self.role_ids(roles).await?;
        let removed = self.store.detach_roles(principal, &ids).await?;
        self.invalidate(Scope::Principal(principal), "remove_role")?;
        self.record(AuditAction::RolesRemoved { principal, removed });
        Ok(removed)
    }

    /// Makes a principal's roles exactly `roles`.
    pub async fn sync_roles(&self, principal: PrincipalId, roles: &[RoleName]) -> Result<SyncDelta> {
        let ids = self.role_ids(roles).await?;
        let delta = self.store.sync_roles(principal, &ids).await?;
        self.invalidate(Scope::Principal(principal), "sync_roles")?;
        self.record(AuditAction::RolesSynced { principal, delta });
        Ok(delta)
    }

    // ------------------------------------------------------------------
    // Permission grants
    // ------------------------------------------------------------------

    /// Grants permissions to a principal or a role.
    pub async fn give_permission_to(
        &self,
        grantee: Grantee,
        permissions: &[PermissionName],
    ) -> Result<usize> {
        let ids = self.permission_ids(permissions).await?;
        let added = self.store.attach_permissions(grantee, &ids).await?;
        self.invalidate(grantee.into(), "give_permission_to")?;
        self.record(AuditAction::PermissionsGiven { grantee, added });
        Ok(added)
    }

    /// Revokes permissions from a principal or a role.
    pub async fn revoke_permission_to(
        &self,
        grantee: Grantee,
        permissions: &[PermissionName],
    ) -> Result<usize> {
        let ids = self.permission_ids(permissions).await?;
        let removed = self.store.detach_permissions(grantee, &ids).await?;
        self.invalidate(grantee.into(), "revoke_permission_to")?;
        self.record(AuditAction::PermissionsRevoked { grantee, removed });
        Ok(removed)
    }

    /// Makes a grantee's direct permissions exactly `permissions`.
    pub async fn sync_permissions(
        &self,
        grantee: Grantee,
        permissions: &[PermissionName],
    ) -> Result<SyncDelta> {
        let ids = self.permission_ids(permissions).await?;
        let delta = self.store.sync_permissions(grantee, &ids).await?;
        self.invalidate(grantee.into(), "sync_permissions")?;
        self.record(AuditAction::PermissionsSynced { grantee, delta });
        Ok(delta)
    }

    // ------------------------------------------------------------------
    // Roles
    // ------------------------------------------------------------------

    /// Creates a role holding `permissions`.
    pub async fn create_role(&self, name: RoleName, permissions: &[PermissionName]) -> Result<Role> {
        validate::role_name(&name)?;
        let ids = self.permission_ids(permissions).await?;
        let role = self.store.create_role_with(name, &ids).await?;
        self.invalidate(Scope::Everyone, "create_role")?;
        self.record(AuditAction::RoleCreated { role: role.id });
        Ok(role)
    }

    /// Renames a role and makes its permissions exactly `permissions`.
    pub async fn update_role(
        &self,
        id: RoleId,
        name: RoleName,
        permissions: &[PermissionName],
    ) -> Result<Role> {
        validate::role_name(&name)?;
        let ids = self.permission_ids(permissions).await?;
        let (role, delta) = self.store.update_role(id, name, &ids).await?;
        self.invalidate(Scope::Everyone, "update_role")?;
        self.record(AuditAction::PermissionsSynced {
            grantee: Grantee::Role(id),
            delta,
        });
        self.record(AuditAction::RoleUpdated { role: id });
        Ok(role)
    }

    /// Renames a role, leaving its grants alone.
    pub async fn rename_role(&self, id: RoleId, name: RoleName) -> Result<Role> {
        validate::role_name(&name)?;
        let role = self.store.rename_role(id, name).await?;
        self.invalidate(Scope::Everyone, "rename_role")?;
        self.record(AuditAction::RoleUpdated { role: id });
        Ok(role)
    }

    /// Deletes a role. Principals and permissions that referenced it stay.
    pub async fn delete_role(&self, id: RoleId) -> Result<Role> {
        let role = self.store.delete_role(id).await?;
        self.invalidate(Scope::Everyone, "delete_role")?;
        self.record(AuditAction::RoleDeleted { role: id });
        Ok(role)
    }

    // ------------------------------------------------------------------
    // Permissions
    // ------------------------------------------------------------------

    /// Creates a permission held by `roles`.
    pub async fn create_permission(
        &self,
        name: PermissionName,
        roles: &[RoleName],
    ) -> Result<Permission> {
        validate::permission_name(&name)?;
        let ids = self.role_ids(roles).await?;
        let permission = self.store.create_permission_with(name, &ids).await?;
        self.invalidate(Scope::Everyone, "create_permission")?;
        self.record(AuditAction::PermissionCreated {
            permission: permission.id,
        });
        Ok(permission)
    }

    /// Renames a permission and makes the set of roles holding it exactly
    /// `roles`.
    pub async fn update_permission(
        &self,
        id: PermissionId,
        name: PermissionName,
        roles: &[RoleName],
    ) -> Result<Permission> {
        validate::permission_name(&name)?;
        let ids = self.role_ids(roles).await?;
        let (permission, delta) = self.store.update_permission(id, name, &ids).await?;
        self.invalidate(Scope::Everyone, "update_permission")?;
        self.record(AuditAction::PermissionRolesSynced {
            permission: id,
            delta,
        });
        self.record(AuditAction::PermissionUpdated { permission: id });
        Ok(permission)
    }

    /// Renames a permission, leaving its grants alone.
    pub async fn rename_permission(&self, id: PermissionId, name: PermissionName) -> Result<Permission> {
        validate::permission_name(&name)?;
        let permission = self.store.rename_permission(id, name).await?;
        self.invalidate(Scope::Everyone, "rename_permission")?;
        self.record(AuditAction::PermissionUpdated { permission: id });
        Ok(permission)
    }

    /// Deletes a permission and every grant of it.
    pub async fn delete_permission(&self, id: PermissionId) -> Result<Permission> {
        let permission = self.store.delete_permission(id).await?;
        self.invalidate(Scope::Everyone, "delete_permission")?;
        self.record(AuditAction::PermissionDeleted { permission: id });
        Ok(permission)
    }

    // ------------------------------------------------------------------
    // Principals
    // ------------------------------------------------------------------

    /// Creates a principal and assigns `roles`.
    pub async fn create_principal(
        &self,
        input: PrincipalInput,
        roles: &[RoleName],
    ) -> Result<Principal> {
        validate::display_name(&input.display_name)?;
        validate::email(&input.email)?;
        validate::password(&input.password)?;
        let ids = self.role_ids(roles).await?;

        let principal = self
            .store
            .create_principal_with(
                NewPrincipal {
                    display_name: input.display_name,
                    email: input.email,
                    password_hash: PasswordHash::digest(&input.password),
                },
                &ids,
            )
            .await?;
        self.invalidate(Scope::Principal(principal.id), "create_principal")?;
        self.record(AuditAction::PrincipalCreated {
            principal: principal.id,
        });
        Ok(principal)
    }

    /// Edits a principal. When `roles` is given, the principal's roles
    /// become exactly that set.
    pub async fn update_principal(
        &self,
        id: PrincipalId,
        update: PrincipalUpdate,
        roles: Option<&[RoleName]>,
    ) -> Result<Principal> {
        validate::display_name(&update.display_name)?;
        validate::email(&update.email)?;
        let password = update.password.filter(|p| !p.is_empty());
        if let Some(password) = &password {
            validate::password(password)?;
        }
        let ids = match roles {
            Some(names) => Some(self.role_ids(names).await?),
            None => None,
        };

        let (principal, delta) = self
            .store
            .update_principal_with(
                id,
                PrincipalChanges {
                    display_name: Some(update.display_name),
                    email: Some(update.email),
                    password_hash: password.as_deref().map(PasswordHash::digest),
                },
                ids.as_deref(),
            )
            .await?;
        self.invalidate(Scope::Principal(id), "update_principal")?;
        if let Some(delta) = delta {
            self.record(AuditAction::RolesSynced {
                principal: id,
                delta,
            });
        }
        self.record(AuditAction::PrincipalUpdated { principal: id });
        Ok(principal)
    }

    /// Deletes a principal and its grants. Its posts are kept.
    pub async fn delete_principal(&self, id: PrincipalId) -> Result<Principal> {
        let principal = self.store.delete_principal(id).await?;
        self.invalidate(Scope::Principal(id), "delete_principal")?;
        self.record(AuditAction::PrincipalDeleted { principal: id });
        Ok(principal)
    }
}
