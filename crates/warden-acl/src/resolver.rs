//! Effective-permission resolution.
//!
//! Roles are flat: a role holds permissions, never other roles. The
//! effective set of a principal is its direct grants unioned with the
//! grants of every role it holds.

use std::collections::BTreeSet;
use std::sync::Arc;
use warden_core::{EntityKind, Grantee, PermissionName, PrincipalId, Result, RoleName};
use warden_store::EntityStore;

/// Everything a principal holds, as names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grants {
    /// Assigned role names.
    pub roles: BTreeSet<RoleName>,
    /// Effective permission names (direct ∪ via roles).
    pub permissions: BTreeSet<PermissionName>,
}

impl Grants {
    /// Literal role membership.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Literal membership in the effective permission set.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

/// Computes [`Grants`] straight from the store, with no caching.
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn EntityStore>,
}

impl Resolver {
    /// Creates a resolver reading from `store`.
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Resolves roles and effective permissions for `principal`.
    ///
    /// Fails with `NotFound` for an unknown principal. A principal with no
    /// grants resolves to empty sets.
    pub async fn resolve(&self, principal: PrincipalId) -> Result<Grants> {
        let roles = self.store.roles_of(principal).await?;
        let mut grants = Grants::default();

        for permission in self
            .store
            .permissions_of(Grantee::Principal(principal))
            .await?
        {
            grants.permissions.insert(permission.name);
        }

        for role in roles {
            match self.store.permissions_of(Grantee::Role(role.id)).await {
                Ok(perms) => grants
                    .permissions
                    .extend(perms.into_iter().map(|p| p.name)),
                // Deleted between the two reads. The deletion bumped the
                // cache epoch, so this result will not be memoized.
                Err(e) if e.is_not_found(EntityKind::Role) => continue,
                Err(e) => return Err(e),
            }
            grants.roles.insert(role.name);
        }

        log::debug!(
            "Resolved principal {principal}: {} roles, {} permissions",
            grants.roles.len(),
            grants.permissions.len()
        );
        Ok(grants)
    }

    /// Effective permission names of `principal`.
    pub async fn effective_permissions(
        &self,
        principal: PrincipalId,
    ) -> Result<BTreeSet<PermissionName>> {
        Ok(self.resolve(principal).await?.permissions)
    }

    /// Role names of `principal`.
    pub async fn role_names(&self, principal: PrincipalId) -> Result<BTreeSet<RoleName>> {
        let roles = self.store.roles_of(principal).await?;
        Ok(roles.into_iter().map(|r| r.name).collect())
    }
}
