//! In-memory [`EntityStore`] with optional JSON snapshot durability.
//!
//! All tables sit behind one [`tokio::sync::RwLock`], so every operation
//! (including multi-row syncs) is atomic with respect to readers. In
//! durable mode a write is applied to a copy of the tables, the copy is
//! persisted, and only then swapped in: a failed persist leaves both the
//! file and the live tables at their previous state.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use warden_core::{
    Grantee, NewPost, NewPrincipal, Permission, PermissionId, PermissionName, Post, PostChanges,
    PostId, Principal, PrincipalChanges, PrincipalId, Result, Role, RoleId, RoleName, SyncDelta,
};

use crate::snapshot::SnapshotFile;
use crate::tables::Tables;
use crate::traits::EntityStore;

/// The entity store used by Warden.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    snapshot: Option<SnapshotFile>,
}

impl InMemoryStore {
    /// Creates an empty, volatile store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a durable store backed by the snapshot at `path`.
    ///
    /// A missing file yields an empty store; the file is created on the
    /// first write.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let file = SnapshotFile::new(path);
        let tables = match file.load().await? {
            Some(tables) => {
                log::info!(
                    "Loaded snapshot {} ({} principals, {} roles, {} permissions)",
                    file.path().display(),
                    tables.principals.len(),
                    tables.roles.len(),
                    tables.permissions.len()
                );
                tables
            }
            None => {
                log::info!("No snapshot at {}; starting empty", file.path().display());
                Tables::default()
            }
        };
        Ok(Self {
            tables: RwLock::new(tables),
            snapshot: Some(file),
        })
    }

    /// Path of the backing snapshot, if durable.
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_ref().map(|f| f.path())
    }

    /// Returns `true` if no principals, roles, or permissions exist.
    pub async fn is_empty(&self) -> bool {
        let t = self.tables.read().await;
        t.principals.is_empty() && t.roles.is_empty() && t.permissions.is_empty()
    }

    async fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        let guard = self.tables.read().await;
        f(&guard)
    }

    async fn write<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        let mut guard = self.tables.write().await;
        match &self.snapshot {
            None => f(&mut guard),
            Some(file) => {
                let mut working = guard.clone();
                let out = f(&mut working)?;
                file.save(&working).await?;
                *guard = working;
                Ok(out)
            }
        }
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn create_principal(&self, principal: NewPrincipal) -> Result<Principal> {
        self.write(|t| t.create_principal(principal)).await
    }

    async fn principal(&self, id: PrincipalId) -> Result<Principal> {
        self.read(|t| t.principal(id)).await
    }

    async fn principal_by_email(&self, email: &str) -> Result<Option<Principal>> {
        Ok(self.read(|t| t.principal_by_email(email)).await)
    }

    async fn principals(&self) -> Result<Vec<Principal>> {
        Ok(self.read(|t| t.principals.values().cloned().collect()).await)
    }

    async fn update_principal(
        &self,
        id: PrincipalId,
        changes: PrincipalChanges,
    ) -> Result<Principal> {
        self.write(|t| t.update_principal(id, changes)).await
    }

    async fn delete_principal(&self, id: PrincipalId) -> Result<Principal> {
        self.write(|t| t.delete_principal(id)).await
    }

    async fn create_role(&self, name: RoleName) -> Result<Role> {
        self.write(|t| t.create_role(name)).await
    }

    async fn role(&self, id: RoleId) -> Result<Role> {
        self.read(|t| t.role(id)).await
    }

    async fn role_by_name(&self, name: &RoleName) -> Result<Option<Role>> {
        Ok(self.read(|t| t.role_by_name(name)).await)
    }

    async fn roles(&self) -> Result<Vec<Role>> {
        Ok(self.read(|t| t.roles.values().cloned().collect()).await)
    }

    async fn rename_role(&self, id: RoleId, name: RoleName) -> Result<Role> {
        self.write(|t| t.rename_role(id, name)).await
    }

    async fn delete_role(&self, id: RoleId) -> Result<Role> {
        self.write(|t| t.delete_role(id)).await
    }

    async fn create_permission(&self, name: PermissionName) -> Result<Permission> {
        self.write(|t| t.create_permission(name)).await
    }

    async fn permission(&self, id: PermissionId) -> Result<Permission> {
        self.read(|t| t.permission(id)).await
    }

    async fn permission_by_name(&self, name: &PermissionName) -> Result<Option<Permission>> {
        Ok(self.read(|t| t.permission_by_name(name)).await)
    }

    async fn permissions(&self) -> Result<Vec<Permission>> {
        Ok(self.read(|t| t.permissions.values().cloned().collect()).await)
    }

    async fn rename_permission(
        &self,
        id: PermissionId,
        name: PermissionName,
    ) -> Result<Permission> {
        self.write(|t| t.rename_permission(id, name)).await
    }

    async fn delete_permission(&self, id: PermissionId) -> Result<Permission> {
        self.write(|t| t.delete_permission(id)).await
    }

    async fn roles_of(&self, principal: PrincipalId) -> Result<Vec<Role>> {
        self.read(|t| t.roles_of(principal)).await
    }

    async fn permissions_of(&self, grantee: Grantee) -> Result<Vec<Permission>> {
        self.read(|t| t.permissions_of(grantee)).await
    }

    async fn principals_with_role(&self, role: RoleId) -> Result<Vec<PrincipalId>> {
        self.read(|t| t.principals_with_role(role)).await
    }

    async fn roles_with_permission(&self, permission: PermissionId) -> Result<Vec<Role>> {
        self.read(|t| t.roles_with_permission(permission)).await
    }

    async fn attach_roles(&self, principal: PrincipalId, roles: &[RoleId]) -> Result<usize> {
        self.write(|t| t.attach_roles(principal, roles)).await
    }

    async fn detach_roles(&self, principal: PrincipalId, roles: &[RoleId]) -> Result<usize> {
        self.write(|t| t.detach_roles(principal, roles)).await
    }

    async fn sync_roles(&self, principal: PrincipalId, roles: &[RoleId]) -> Result<SyncDelta> {
        self.write(|t| t.sync_roles(principal, roles)).await
    }

    async fn attach_permissions(
        &self,
        grantee: Grantee,
        permissions: &[PermissionId],
    ) -> Result<usize> {
        self.write(|t| t.attach_permissions(grantee, permissions))
            .await
    }

    async fn detach_permissions(
        &self,
        grantee: Grantee,
        permissions: &[PermissionId],
    ) -> Result<usize> {
        self.write(|t| t.detach_permissions(grantee, permissions))
            .await
    }

    async fn sync_permissions(
        &self,
        grantee: Grantee,
        permissions: &[PermissionId],
    ) -> Result<SyncDelta> {
        self.write(|t| t.sync_permissions(grantee, permissions))
            .await
    }

    async fn sync_permission_roles(
        &self,
        permission: PermissionId,
        roles: &[RoleId],
    ) -> Result<SyncDelta> {
        self.write(|t| t.sync_permission_roles(permission, roles))
            .await
    }

    async fn create_principal_with(
        &self,
        principal: NewPrincipal,
        roles: &[RoleId],
    ) -> Result<Principal> {
        self.write(|t| t.create_principal_with(principal, roles))
            .await
    }

    async fn update_principal_with(
        &self,
        id: PrincipalId,
        changes: PrincipalChanges,
        roles: Option<&[RoleId]>,
    ) -> Result<(Principal, Option<SyncDelta>)> {
        self.write(|t| t.update_principal_with(id, changes, roles))
            .await
    }

    async fn create_role_with(&self, name: RoleName, permissions: &[PermissionId]) -> Result<Role> {
        self.write(|t| t.create_role_with(name, permissions)).await
    }

    async fn update_role(
        &self,
        id: RoleId,
        name: RoleName,
        permissions: &[PermissionId],
    ) -> Result<(Role, SyncDelta)> {
        self.write(|t| t.update_role(id, name, permissions)).await
    }

    async fn create_permission_with(
        &self,
        name: PermissionName,
        roles: &[RoleId],
    ) -> Result<Permission> {
        self.write(|t| t.create_permission_with(name, roles)).await
    }

    async fn update_permission(
        &self,
        id: PermissionId,
        name: PermissionName,
        roles: &[RoleId],
    ) -> Result<(Permission, SyncDelta)> {
        self.write(|t| t.update_permission(id, name, roles)).await
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        self.write(|t| t.create_post(post)).await
    }

    async fn post(&self, id: PostId) -> Result<Post> {
        self.read(|t| t.post(id)).await
    }

    async fn posts(&self) -> Result<Vec<Post>> {
        Ok(self.read(|t| t.posts.values().cloned().collect()).await)
    }

    async fn update_post(&self, id: PostId, changes: PostChanges) -> Result<Post> {
        self.write(|t| t.update_post(id, changes)).await
    }

    async fn delete_post(&self, id: PostId) -> Result<Post> {
        self.write(|t| t.delete_post(id)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use warden_core::{EntityKind, Error, PasswordHash};

    fn alice() -> NewPrincipal {
        NewPrincipal {
            display_name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: PasswordHash::digest("password"),
        }
    }

    #[tokio::test]
    async fn test_volatile_store_basic_crud() {
        let store = InMemoryStore::new();
        assert!(store.is_empty().await);

        let p = store.create_principal(alice()).await.unwrap();
        let found = store.principal_by_email("alice@example.com").await.unwrap();
        assert_eq!(found.map(|f| f.id), Some(p.id));
        assert!(store.principal_by_email("ALICE@example.com").await.unwrap().is_none());

        let role = store.create_role(RoleName::new("editor")).await.unwrap();
        assert_eq!(
            store.role_by_name(&RoleName::new("editor")).await.unwrap(),
            Some(role.clone())
        );
        assert!(store.role(RoleId::new(42)).await.unwrap_err().is_not_found(EntityKind::Role));
        assert!(store.snapshot_path().is_none());
    }

    #[tokio::test]
    async fn test_durable_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warden.json");

        let (pid, rid) = {
            let store = InMemoryStore::open(&path).await.unwrap();
            let p = store.create_principal(alice()).await.unwrap();
            let r = store.create_role(RoleName::new("editor")).await.unwrap();
            let perm = store
                .create_permission(PermissionName::new("edit_posts"))
                .await
                .unwrap();
            store.attach_roles(p.id, &[r.id]).await.unwrap();
            store
                .attach_permissions(Grantee::Role(r.id), &[perm.id])
                .await
                .unwrap();
            (p.id, r.id)
        };

        let reopened = InMemoryStore::open(&path).await.unwrap();
        let roles = reopened.roles_of(pid).await.unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].id, rid);
        let perms = reopened.permissions_of(Grantee::Role(rid)).await.unwrap();
        assert_eq!(perms[0].name.as_str(), "edit_posts");

        // Sequences resume past persisted ids.
        let next = reopened.create_role(RoleName::new("writer")).await.unwrap();
        assert_eq!(next.id, RoleId::new(2));
    }

    #[tokio::test]
    async fn test_failed_write_does_not_touch_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warden.json");
        let store = InMemoryStore::open(&path).await.unwrap();
        store.create_role(RoleName::new("editor")).await.unwrap();
        let before = std::fs::read(&path).unwrap();

        let err = store.create_role(RoleName::new("editor")).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_failed_persist_rolls_back_combined_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warden.json");
        let store = InMemoryStore::open(&path).await.unwrap();
        let perm = store
            .create_permission(PermissionName::new("edit_posts"))
            .await
            .unwrap();

        // A directory where the snapshot should be makes the rename fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        let err = store
            .create_role_with(RoleName::new("editor"), &[perm.id])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
        assert!(store.role_by_name(&RoleName::new("editor")).await.unwrap().is_none());

        std::fs::remove_dir(&path).unwrap();
        let role = store
            .create_role_with(RoleName::new("editor"), &[perm.id])
            .await
            .unwrap();
        let held = store.permissions_of(Grantee::Role(role.id)).await.unwrap();
        assert_eq!(held.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warden.json");
        std::fs::write(&path, b"{ not json").unwrap();
        let err = InMemoryStore::open(&path).await.unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[tokio::test]
    async fn test_concurrent_attaches_are_all_applied() {
        let store = Arc::new(InMemoryStore::new());
        let p = store.create_principal(alice()).await.unwrap().id;
        let mut ids = Vec::new();
        for i in 0..16 {
            ids.push(store.create_role(RoleName::new(format!("r{i}"))).await.unwrap().id);
        }

        let handles: Vec<_> = ids
            .iter()
            .map(|rid| {
                let store = Arc::clone(&store);
                let rid = *rid;
                tokio::spawn(async move { store.attach_roles(p, &[rid]).await })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(store.roles_of(p).await.unwrap().len(), 16);
    }
}
