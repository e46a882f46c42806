//! The authorization gate.
//!
//! [`Gate::can`] answers "may this principal perform this ability". It is
//! the only check the super role bypasses. The `has_*` predicates report
//! literal membership and never consult the bypass: a super admin without
//! the `editor` role is not an editor, even though every `can` check
//! passes for them.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use warden_core::{PermissionName, Principal, PrincipalId, Result, RoleName};
use warden_store::EntityStore;

use crate::cache::GrantCache;
use crate::resolver::{Grants, Resolver};

/// A custom ability rule, evaluated when the permission set alone does not
/// grant the ability.
pub type AbilityRule = Arc<dyn Fn(&Principal) -> bool + Send + Sync>;

/// Decision functions over resolved grants.
pub struct Gate {
    store: Arc<dyn EntityStore>,
    resolver: Resolver,
    cache: Arc<GrantCache>,
    super_role: RoleName,
    abilities: RwLock<HashMap<String, AbilityRule>>,
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("super_role", &self.super_role)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl Gate {
    /// Creates a gate over `store`, memoizing through `cache`.
    pub fn new(store: Arc<dyn EntityStore>, cache: Arc<GrantCache>, super_role: RoleName) -> Self {
        Self {
            resolver: Resolver::new(Arc::clone(&store)),
            store,
            cache,
            super_role,
            abilities: RwLock::new(HashMap::new()),
        }
    }

    /// The bypass role name.
    pub fn super_role(&self) -> &RoleName {
        &self.super_role
    }

    /// Registers a custom rule for `ability`, replacing any previous one.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use warden_acl::{Gate, GrantCache};
    /// # use warden_store::InMemoryStore;
    /// let gate = Gate::new(
    ///     Arc::new(InMemoryStore::new()),
    ///     Arc::new(GrantCache::default()),
    ///     "super_admin".into(),
    /// );
    /// gate.define("edit_settings", |p| p.email.ends_with("@example.com"));
    /// ```
    pub fn define<F>(&self, ability: impl Into<String>, rule: F)
    where
        F: Fn(&Principal) -> bool + Send + Sync + 'static,
    {
        let ability = ability.into();
        log::debug!("Defining ability rule '{ability}'");
        self.abilities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(ability, Arc::new(rule));
    }

    fn rule(&self, ability: &str) -> Option<AbilityRule> {
        self.abilities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(ability)
            .cloned()
    }

    /// Resolved grants for `principal`, through the cache.
    pub async fn grants(&self, principal: PrincipalId) -> Result<Arc<Grants>> {
        self.cache
            .get_or_compute(principal, || self.resolver.resolve(principal))
            .await
    }

    /// Effective permission names.
    pub async fn effective_permissions(
        &self,
        principal: PrincipalId,
    ) -> Result<BTreeSet<PermissionName>> {
        Ok(self.grants(principal).await?.permissions.clone())
    }

    /// Assigned role names.
    pub async fn role_names(&self, principal: PrincipalId) -> Result<BTreeSet<RoleName>> {
        Ok(self.grants(principal).await?.roles.clone())
    }

    /// Returns `true` if `principal` holds the super role.
    pub async fn is_super(&self, principal: PrincipalId) -> Result<bool> {
        Ok(self.grants(principal).await?.has_role(self.super_role.as_str()))
    }

    /// May `principal` perform `ability`?
    ///
    /// Checked in order: super role, effective permissions, custom rule.
    /// An unknown ability is simply denied.
    pub async fn can(&self, principal: PrincipalId, ability: &str) -> Result<bool> {
        let grants = self.grants(principal).await?;
        if grants.has_role(self.super_role.as_str()) {
            log::debug!("Principal {principal} passes '{ability}' via super role");
            return Ok(true);
        }
        if grants.has_permission(ability) {
            return Ok(true);
        }
        match self.rule(ability) {
            Some(rule) => {
                let record = self.store.principal(principal).await?;
                Ok(rule(&record))
            }
            None => Ok(false),
        }
    }

    /// Literal role membership. No bypass.
    pub async fn has_role(&self, principal: PrincipalId, role: &RoleName) -> Result<bool> {
        Ok(self.grants(principal).await?.has_role(role.as_str()))
    }

    /// True if any of `roles` is held. Empty input is `false`.
    pub async fn has_any_role(&self, principal: PrincipalId, roles: &[RoleName]) -> Result<bool> {
        let grants = self.grants(principal).await?;
        Ok(roles.iter().any(|r| grants.has_role(r.as_str())))
    }

    /// True if every one of `roles` is held. Empty input is `true`.
    pub async fn has_all_roles(&self, principal: PrincipalId, roles: &[RoleName]) -> Result<bool> {
        let grants = self.grants(principal).await?;
        Ok(roles.iter().all(|r| grants.has_role(r.as_str())))
    }

    /// Literal membership in the effective permission set. No bypass.
    pub async fn has_permission_to(
        &self,
        principal: PrincipalId,
        permission: &PermissionName,
    ) -> Result<bool> {
        Ok(self
            .grants(principal)
            .await?
            .has_permission(permission.as_str()))
    }

    /// True if any of `permissions` is effective. Empty input is `false`.
    pub async fn has_any_permission(
        &self,
        principal: PrincipalId,
        permissions: &[PermissionName],
    ) -> Result<bool> {
        let grants = self.grants(principal).await?;
        Ok(permissions.iter().any(|p| grants.has_permission(p.as_str())))
    }

    /// True if every one of `permissions` is effective. Empty input is
    /// `true`.
    pub async fn has_all_permissions(
        &self,
        principal: PrincipalId,
        permissions: &[PermissionName],
    ) -> Result<bool> {
        let grants = self.grants(principal).await?;
        Ok(permissions.iter().all(|p| grants.has_permission(p.as_str())))
    }
}
