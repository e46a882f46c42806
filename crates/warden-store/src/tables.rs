//! The in-memory table set and its synchronous operations.
//!
//! Every operation validates first and mutates second, so an `Err` return
//! leaves the tables untouched.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use warden_core::{
    EntityKind, Error, Grantee, NewPost, NewPrincipal, Permission, PermissionId, PermissionName,
    Post, PostChanges, PostId, Principal, PrincipalChanges, PrincipalId, Result, Role, RoleId,
    RoleName, SyncDelta,
};

const TAKEN: &str = "has already been taken";

/// Last id handed out per table. Ids are never reused.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct Sequences {
    principal: u64,
    role: u64,
    permission: u64,
    post: u64,
}

impl Sequences {
    pub(crate) fn next_principal(&mut self) -> PrincipalId {
        self.principal += 1;
        PrincipalId::new(self.principal)
    }

    pub(crate) fn next_role(&mut self) -> RoleId {
        self.role += 1;
        RoleId::new(self.role)
    }

    pub(crate) fn next_permission(&mut self) -> PermissionId {
        self.permission += 1;
        PermissionId::new(self.permission)
    }

    pub(crate) fn next_post(&mut self) -> PostId {
        self.post += 1;
        PostId::new(self.post)
    }

    pub(crate) fn raise_to(&mut self, principal: u64, role: u64, permission: u64, post: u64) {
        self.principal = self.principal.max(principal);
        self.role = self.role.max(role);
        self.permission = self.permission.max(permission);
        self.post = self.post.max(post);
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    pub(crate) sequences: Sequences,
    pub(crate) principals: BTreeMap<PrincipalId, Principal>,
    pub(crate) roles: BTreeMap<RoleId, Role>,
    pub(crate) permissions: BTreeMap<PermissionId, Permission>,
    pub(crate) posts: BTreeMap<PostId, Post>,
    pub(crate) principal_roles: BTreeSet<(PrincipalId, RoleId)>,
    pub(crate) role_permissions: BTreeSet<(RoleId, PermissionId)>,
    pub(crate) principal_permissions: BTreeSet<(PrincipalId, PermissionId)>,
}

impl Tables {
    // ------------------------------------------------------------------
    // Existence checks
    // ------------------------------------------------------------------

    fn require_principal(&self, id: PrincipalId) -> Result<&Principal> {
        self.principals
            .get(&id)
            .ok_or_else(|| Error::not_found(EntityKind::Principal, id))
    }

    fn require_role(&self, id: RoleId) -> Result<&Role> {
        self.roles
            .get(&id)
            .ok_or_else(|| Error::not_found(EntityKind::Role, id))
    }

    fn require_permission(&self, id: PermissionId) -> Result<&Permission> {
        self.permissions
            .get(&id)
            .ok_or_else(|| Error::not_found(EntityKind::Permission, id))
    }

    fn require_grantee(&self, grantee: Grantee) -> Result<()> {
        match grantee {
            Grantee::Principal(id) => self.require_principal(id).map(|_| ()),
            Grantee::Role(id) => self.require_role(id).map(|_| ()),
        }
    }

    fn role_set(&self, ids: &[RoleId]) -> Result<BTreeSet<RoleId>> {
        ids.iter()
            .map(|id| self.require_role(*id).map(|r| r.id))
            .collect()
    }

    fn permission_set(&self, ids: &[PermissionId]) -> Result<BTreeSet<PermissionId>> {
        ids.iter()
            .map(|id| self.require_permission(*id).map(|p| p.id))
            .collect()
    }

    fn email_taken(&self, email: &str, except: Option<PrincipalId>) -> bool {
        self.principals
            .values()
            .any(|p| p.email == email && Some(p.id) != except)
    }

    // ------------------------------------------------------------------
    // Principals
    // ------------------------------------------------------------------

    pub(crate) fn create_principal(&mut self, new: NewPrincipal) -> Result<Principal> {
        if self.email_taken(&new.email, None) {
            return Err(Error::validation_field("email", TAKEN));
        }
        let now = Utc::now();
        let principal = Principal {
            id: self.sequences.next_principal(),
            display_name: new.display_name,
            email: new.email,
            password_hash: new.password_hash,
            created_at: now,
            updated_at: now,
        };
        self.principals.insert(principal.id, principal.clone());
        Ok(principal)
    }

    pub(crate) fn principal(&self, id: PrincipalId) -> Result<Principal> {
        self.require_principal(id).cloned()
    }

    pub(crate) fn principal_by_email(&self, email: &str) -> Option<Principal> {
        self.principals.values().find(|p| p.email == email).cloned()
    }

    pub(crate) fn update_principal(
        &mut self,
        id: PrincipalId,
        changes: PrincipalChanges,
    ) -> Result<Principal> {
        self.require_principal(id)?;
        if let Some(email) = &changes.email
            && self.email_taken(email, Some(id))
        {
            return Err(Error::validation_field("email", TAKEN));
        }
        let principal = self
            .principals
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(EntityKind::Principal, id))?;
        if let Some(name) = changes.display_name {
            principal.display_name = name;
        }
        if let Some(email) = changes.email {
            principal.email = email;
        }
        if let Some(hash) = changes.password_hash {
            principal.password_hash = hash;
        }
        principal.updated_at = Utc::now();
        Ok(principal.clone())
    }

    pub(crate) fn delete_principal(&mut self, id: PrincipalId) -> Result<Principal> {
        let principal = self
            .principals
            .remove(&id)
            .ok_or_else(|| Error::not_found(EntityKind::Principal, id))?;
        self.principal_roles.retain(|(pid, _)| *pid != id);
        self.principal_permissions.retain(|(pid, _)| *pid != id);
        Ok(principal)
    }

    // ------------------------------------------------------------------
    // Roles
    // ------------------------------------------------------------------

    pub(crate) fn create_role(&mut self, name: RoleName) -> Result<Role> {
        if self.role_by_name(&name).is_some() {
            return Err(Error::validation_field("name", TAKEN));
        }
        let now = Utc::now();
        let role = Role {
            id: self.sequences.next_role(),
            name,
            created_at: now,
            updated_at: now,
        };
        self.roles.insert(role.id, role.clone());
        Ok(role)
    }

    pub(crate) fn role(&self, id: RoleId) -> Result<Role> {
        self.require_role(id).cloned()
    }

    pub(crate) fn role_by_name(&self, name: &RoleName) -> Option<Role> {
        self.roles.values().find(|r| &r.name == name).cloned()
    }

    pub(crate) fn rename_role(&mut self, id: RoleId, name: RoleName) -> Result<Role> {
        self.require_role(id)?;
        if self.roles.values().any(|r| r.name == name && r.id != id) {
            return Err(Error::validation_field("name", TAKEN));
        }
        let role = self
            .roles
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(EntityKind::Role, id))?;
        role.name = name;
        role.updated_at = Utc::now();
        Ok(role.clone())
    }

    pub(crate) fn delete_role(&mut self, id: RoleId) -> Result<Role> {
        let role = self
            .roles
            .remove(&id)
            .ok_or_else(|| Error::not_found(EntityKind::Role, id))?;
        self.principal_roles.retain(|(_, rid)| *rid != id);
        self.role_permissions.retain(|(rid, _)| *rid != id);
        Ok(role)
    }

    // ------------------------------------------------------------------
    // Permissions
    // ------------------------------------------------------------------

    pub(crate) fn create_permission(&mut self, name: PermissionName) -> Result<Permission> {
        if self.permission_by_name(&name).is_some() {
            return Err(Error::validation_field("name", TAKEN));
        }
        let now = Utc::now();
        let permission = Permission {
            id: self.sequences.next_permission(),
            name,
            created_at: now,
            updated_at: now,
        };
        self.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    pub(crate) fn permission(&self, id: PermissionId) -> Result<Permission> {
        self.require_permission(id).cloned()
    }

    pub(crate) fn permission_by_name(&self, name: &PermissionName) -> Option<Permission> {
        self.permissions.values().find(|p| &p.name == name).cloned()
    }

    pub(crate) fn rename_permission(
        &mut self,
        id: PermissionId,
        name: PermissionName,
    ) -> Result<Permission> {
        self.require_permission(id)?;
        if self.permissions.values().any(|p| p.name == name && p.id != id) {
            return Err(Error::validation_field("name", TAKEN));
        }
        let permission = self
            .permissions
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(EntityKind::Permission, id))?;
        permission.name = name;
        permission.updated_at = Utc::now();
        Ok(permission.clone())
    }

    pub(crate) fn delete_permission(&mut self, id: PermissionId) -> Result<Permission> {
        let permission = self
            .permissions
            .remove(&id)
            .ok_or_else(|| Error::not_found(EntityKind::Permission, id))?;
        self.role_permissions.retain(|(_, perm)| *perm != id);
        self.principal_permissions.retain(|(_, perm)| *perm != id);
        Ok(permission)
    }

    // ------------------------------------------------------------------
    // Association reads
    // ------------------------------------------------------------------

    pub(crate) fn roles_of(&self, principal: PrincipalId) -> Result<Vec<Role>> {
        self.require_principal(principal)?;
        Ok(self
            .principal_roles
            .range((principal, RoleId::new(0))..=(principal, RoleId::new(u64::MAX)))
            .filter_map(|(_, rid)| self.roles.get(rid).cloned())
            .collect())
    }

    pub(crate) fn permissions_of(&self, grantee: Grantee) -> Result<Vec<Permission>> {
        self.require_grantee(grantee)?;
        let ids: Vec<PermissionId> = match grantee {
            Grantee::Principal(pid) => self
                .principal_permissions
                .range((pid, PermissionId::new(0))..=(pid, PermissionId::new(u64::MAX)))
                .map(|(_, perm)| *perm)
                .collect(),
            Grantee::Role(rid) => self
                .role_permissions
                .range((rid, PermissionId::new(0))..=(rid, PermissionId::new(u64::MAX)))
                .map(|(_, perm)| *perm)
                .collect(),
        };
        Ok(ids
            .iter()
            .filter_map(|id| self.permissions.get(id).cloned())
            .collect())
    }

    pub(crate) fn principals_with_role(&self, role: RoleId) -> Result<Vec<PrincipalId>> {
        self.require_role(role)?;
        Ok(self
            .principal_roles
            .iter()
            .filter(|(_, rid)| *rid == role)
            .map(|(pid, _)| *pid)
            .collect())
    }

    pub(crate) fn roles_with_permission(&self, permission: PermissionId) -> Result<Vec<Role>> {
        self.require_permission(permission)?;
        Ok(self
            .role_permissions
            .iter()
            .filter(|(_, perm)| *perm == permission)
            .filter_map(|(rid, _)| self.roles.get(rid).cloned())
            .collect())
    }

    // ------------------------------------------------------------------
    // Association writes
    // ------------------------------------------------------------------

    pub(crate) fn attach_roles(&mut self, principal: PrincipalId, roles: &[RoleId]) -> Result<usize> {
        self.require_principal(principal)?;
        let wanted = self.role_set(roles)?;
        Ok(wanted
            .into_iter()
            .filter(|rid| self.principal_roles.insert((principal, *rid)))
            .count())
    }

    pub(crate) fn detach_roles(&mut self, principal: PrincipalId, roles: &[RoleId]) -> Result<usize> {
        self.require_principal(principal)?;
        let wanted = self.role_set(roles)?;
        Ok(wanted
            .into_iter()
            .filter(|rid| self.principal_roles.remove(&(principal, *rid)))
            .count())
    }

    pub(crate) fn sync_roles(&mut self, principal: PrincipalId, roles: &[RoleId]) -> Result<SyncDelta> {
        self.require_principal(principal)?;
        let wanted = self.role_set(roles)?;
        let current: BTreeSet<RoleId> = self
            .principal_roles
            .iter()
            .filter(|(pid, _)| *pid == principal)
            .map(|(_, rid)| *rid)
            .collect();
        Ok(apply_sync(
            &mut self.principal_roles,
            &current,
            &wanted,
            |rid| (principal, rid),
        ))
    }

    pub(crate) fn attach_permissions(
        &mut self,
        grantee: Grantee,
        permissions: &[PermissionId],
    ) -> Result<usize> {
        self.require_grantee(grantee)?;
        let wanted = self.permission_set(permissions)?;
        Ok(match grantee {
            Grantee::Principal(pid) => wanted
                .into_iter()
                .filter(|perm| self.principal_permissions.insert((pid, *perm)))
                .count(),
            Grantee::Role(rid) => wanted
                .into_iter()
                .filter(|perm| self.role_permissions.insert((rid, *perm)))
                .count(),
        })
    }

    pub(crate) fn detach_permissions(
        &mut self,
        grantee: Grantee,
        permissions: &[PermissionId],
    ) -> Result<usize> {
        self.require_grantee(grantee)?;
        let wanted = self.permission_set(permissions)?;
        Ok(match grantee {
            Grantee::Principal(pid) => wanted
                .into_iter()
                .filter(|perm| self.principal_permissions.remove(&(pid, *perm)))
                .count(),
            Grantee::Role(rid) => wanted
                .into_iter()
                .filter(|perm| self.role_permissions.remove(&(rid, *perm)))
                .count(),
        })
    }

    pub(crate) fn sync_permissions(
        &mut self,
        grantee: Grantee,
        permissions: &[PermissionId],
    ) -> Result<SyncDelta> {
        self.require_grantee(grantee)?;
        let wanted = self.permission_set(permissions)?;
        Ok(match grantee {
            Grantee::Principal(pid) => {
                let current: BTreeSet<PermissionId> = self
                    .principal_permissions
                    .iter()
                    .filter(|(p, _)| *p == pid)
                    .map(|(_, perm)| *perm)
                    .collect();
                apply_sync(&mut self.principal_permissions, &current, &wanted, |perm| {
                    (pid, perm)
                })
            }
            Grantee::Role(rid) => {
                let current: BTreeSet<PermissionId> = self
                    .role_permissions
                    .iter()
                    .filter(|(r, _)| *r == rid)
                    .map(|(_, perm)| *perm)
                    .collect();
                apply_sync(&mut self.role_permissions, &current, &wanted, |perm| {
                    (rid, perm)
                })
            }
        })
    }

    pub(crate) fn sync_permission_roles(
        &mut self,
        permission: PermissionId,
        roles: &[RoleId],
    ) -> Result<SyncDelta> {
        self.require_permission(permission)?;
        let wanted = self.role_set(roles)?;
        let current: BTreeSet<RoleId> = self
            .role_permissions
            .iter()
            .filter(|(_, perm)| *perm == permission)
            .map(|(rid, _)| *rid)
            .collect();
        Ok(apply_sync(
            &mut self.role_permissions,
            &current,
            &wanted,
            |rid| (rid, permission),
        ))
    }

    // ------------------------------------------------------------------
    // Entity writes together with their associations
    //
    // Each validates the association ids first, so once the entity write
    // succeeds the association write cannot fail.
    // ------------------------------------------------------------------

    pub(crate) fn create_principal_with(
        &mut self,
        new: NewPrincipal,
        roles: &[RoleId],
    ) -> Result<Principal> {
        self.role_set(roles)?;
        let principal = self.create_principal(new)?;
        self.sync_roles(principal.id, roles)?;
        Ok(principal)
    }

    pub(crate) fn update_principal_with(
        &mut self,
        id: PrincipalId,
        changes: PrincipalChanges,
        roles: Option<&[RoleId]>,
    ) -> Result<(Principal, Option<SyncDelta>)> {
        if let Some(roles) = roles {
            self.role_set(roles)?;
        }
        let principal = self.update_principal(id, changes)?;
        let delta = roles.map(|roles| self.sync_roles(id, roles)).transpose()?;
        Ok((principal, delta))
    }

    pub(crate) fn create_role_with(
        &mut self,
        name: RoleName,
        permissions: &[PermissionId],
    ) -> Result<Role> {
        self.permission_set(permissions)?;
        let role = self.create_role(name)?;
        self.sync_permissions(Grantee::Role(role.id), permissions)?;
        Ok(role)
    }

    pub(crate) fn update_role(
        &mut self,
        id: RoleId,
        name: RoleName,
        permissions: &[PermissionId],
    ) -> Result<(Role, SyncDelta)> {
        self.permission_set(permissions)?;
        let role = self.rename_role(id, name)?;
        let delta = self.sync_permissions(Grantee::Role(id), permissions)?;
        Ok((role, delta))
    }

    pub(crate) fn create_permission_with(
        &mut self,
        name: PermissionName,
        roles: &[RoleId],
    ) -> Result<Permission> {
        self.role_set(roles)?;
        let permission = self.create_permission(name)?;
        self.sync_permission_roles(permission.id, roles)?;
        Ok(permission)
    }

    pub(crate) fn update_permission(
        &mut self,
        id: PermissionId,
        name: PermissionName,
        roles: &[RoleId],
    ) -> Result<(Permission, SyncDelta)> {
        self.role_set(roles)?;
        let permission = self.rename_permission(id, name)?;
        let delta = self.sync_permission_roles(id, roles)?;
        Ok((permission, delta))
    }

    // ------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------

    pub(crate) fn create_post(&mut self, new: NewPost) -> Result<Post> {
        self.require_principal(new.author_id)?;
        let now = Utc::now();
        let post = Post {
            id: self.sequences.next_post(),
            title: new.title,
            content: new.content,
            author_id: new.author_id,
            created_at: now,
            updated_at: now,
        };
        self.posts.insert(post.id, post.clone());
        Ok(post)
    }

    pub(crate) fn post(&self, id: PostId) -> Result<Post> {
        self.posts
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(EntityKind::Post, id))
    }

    pub(crate) fn update_post(&mut self, id: PostId, changes: PostChanges) -> Result<Post> {
        let post = self
            .posts
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(EntityKind::Post, id))?;
        if let Some(title) = changes.title {
            post.title = title;
        }
        if let Some(content) = changes.content {
            post.content = content;
        }
        post.updated_at = Utc::now();
        Ok(post.clone())
    }

    pub(crate) fn delete_post(&mut self, id: PostId) -> Result<Post> {
        self.posts
            .remove(&id)
            .ok_or_else(|| Error::not_found(EntityKind::Post, id))
    }
}

/// Moves `rows` from `current` to `wanted` for one owner.
fn apply_sync<K, R>(
    rows: &mut BTreeSet<R>,
    current: &BTreeSet<K>,
    wanted: &BTreeSet<K>,
    row: impl Fn(K) -> R,
) -> SyncDelta
where
    K: Ord + Copy,
    R: Ord,
{
    let mut delta = SyncDelta::default();
    for k in current.difference(wanted) {
        if rows.remove(&row(*k)) {
            delta.removed += 1;
        }
    }
    for k in wanted.difference(current) {
        if rows.insert(row(*k)) {
            delta.added += 1;
        }
    }
    delta
}
