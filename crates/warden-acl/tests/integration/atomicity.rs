//! Mutations that write an entity together with its associations either
//! apply completely or leave the store as it was.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use warden_acl::{MemoryAuditSink, PrincipalInput, PrincipalUpdate, Rbac, RbacConfig};
use warden_core::{
    EntityKind, Error, Grantee, NewPost, NewPrincipal, Permission, PermissionId, PermissionName,
    Post, PostChanges, PostId, Principal, PrincipalChanges, PrincipalId, Result, Role, RoleId,
    RoleName, SyncDelta, names,
};
use warden_store::{EntityStore, InMemoryStore};

/// Store whose standalone sync writes always fail, and which can delete a
/// role or permission right after handing it out by name, as a concurrent
/// admin would.
#[derive(Default)]
struct RacingStore {
    inner: InMemoryStore,
    delete_after_lookup: AtomicBool,
}

impl RacingStore {
    fn arm(&self) {
        self.delete_after_lookup.store(true, Ordering::SeqCst);
    }

    fn fire(&self) -> bool {
        self.delete_after_lookup.swap(false, Ordering::SeqCst)
    }
}

fn sync_failed() -> Error {
    Error::storage("persist failed")
}

#[async_trait]
impl EntityStore for RacingStore {
    async fn create_principal(&self, principal: NewPrincipal) -> Result<Principal> {
        self.inner.create_principal(principal).await
    }

    async fn principal(&self, id: PrincipalId) -> Result<Principal> {
        self.inner.principal(id).await
    }

    async fn principal_by_email(&self, email: &str) -> Result<Option<Principal>> {
        self.inner.principal_by_email(email).await
    }

    async fn principals(&self) -> Result<Vec<Principal>> {
        self.inner.principals().await
    }

    async fn update_principal(
        &self,
        id: PrincipalId,
        changes: PrincipalChanges,
    ) -> Result<Principal> {
        self.inner.update_principal(id, changes).await
    }

    async fn delete_principal(&self, id: PrincipalId) -> Result<Principal> {
        self.inner.delete_principal(id).await
    }

    async fn create_role(&self, name: RoleName) -> Result<Role> {
        self.inner.create_role(name).await
    }

    async fn role(&self, id: RoleId) -> Result<Role> {
        self.inner.role(id).await
    }

    async fn role_by_name(&self, name: &RoleName) -> Result<Option<Role>> {
        let found = self.inner.role_by_name(name).await?;
        if let Some(role) = &found
            && self.fire()
        {
            self.inner.delete_role(role.id).await?;
        }
        Ok(found)
    }

    async fn roles(&self) -> Result<Vec<Role>> {
        self.inner.roles().await
    }

    async fn rename_role(&self, id: RoleId, name: RoleName) -> Result<Role> {
        self.inner.rename_role(id, name).await
    }

    async fn delete_role(&self, id: RoleId) -> Result<Role> {
        self.inner.delete_role(id).await
    }

    async fn create_permission(&self, name: PermissionName) -> Result<Permission> {
        self.inner.create_permission(name).await
    }

    async fn permission(&self, id: PermissionId) -> Result<Permission> {
        self.inner.permission(id).await
    }

    async fn permission_by_name(&self, name: &PermissionName) -> Result<Option<Permission>> {
        let found = self.inner.permission_by_name(name).await?;
        if let Some(permission) = &found
            && self.fire()
        {
            self.inner.delete_permission(permission.id).await?;
        }
        Ok(found)
    }

    async fn permissions(&self) -> Result<Vec<Permission>> {
        self.inner.permissions().await
    }

    async fn rename_permission(
        &self,
        id: PermissionId,
        name: PermissionName,
    ) -> Result<Permission> {
        self.inner.rename_permission(id, name).await
    }

    async fn delete_permission(&self, id: PermissionId) -> Result<Permission> {
        self.inner.delete_permission(id).await
    }

    async fn roles_of(&self, principal: PrincipalId) -> Result<Vec<Role>> {
        self.inner.roles_of(principal).await
    }

    async fn permissions_of(&self, grantee: Grantee) -> Result<Vec<Permission>> {
        self.inner.permissions_of(grantee).await
    }

    async fn principals_with_role(&self, role: RoleId) -> Result<Vec<PrincipalId>> {
        self.inner.principals_with_role(role).await
    }

    async fn roles_with_permission(&self, permission: PermissionId) -> Result<Vec<Role>> {
        self.inner.roles_with_permission(permission).await
    }

    async fn attach_roles(&self, principal: PrincipalId, roles: &[RoleId]) -> Result<usize> {
        self.inner.attach_roles(principal, roles).await
    }

    async fn detach_roles(&self, principal: PrincipalId, roles: &[RoleId]) -> Result<usize> {
        self.inner.detach_roles(principal, roles).await
    }

    async fn sync_roles(&self, _principal: PrincipalId, _roles: &[RoleId]) -> Result<SyncDelta> {
        Err(sync_failed())
    }

    async fn attach_permissions(
        &self,
        grantee: Grantee,
        permissions: &[PermissionId],
    ) -> Result<usize> {
        self.inner.attach_permissions(grantee, permissions).await
    }

    async fn detach_permissions(
        &self,
        grantee: Grantee,
        permissions: &[PermissionId],
    ) -> Result<usize> {
        self.inner.detach_permissions(grantee, permissions).await
    }

    async fn sync_permissions(
        &self,
        _grantee: Grantee,
        _permissions: &[PermissionId],
    ) -> Result<SyncDelta> {
        Err(sync_failed())
    }

    async fn sync_permission_roles(
        &self,
        _permission: PermissionId,
        _roles: &[RoleId],
    ) -> Result<SyncDelta> {
        Err(sync_failed())
    }

    async fn create_principal_with(
        &self,
        principal: NewPrincipal,
        roles: &[RoleId],
    ) -> Result<Principal> {
        self.inner.create_principal_with(principal, roles).await
    }

    async fn update_principal_with(
        &self,
        id: PrincipalId,
        changes: PrincipalChanges,
        roles: Option<&[RoleId]>,
    ) -> Result<(Principal, Option<SyncDelta>)> {
        self.inner.update_principal_with(id, changes, roles).await
    }

    async fn create_role_with(&self, name: RoleName, permissions: &[PermissionId]) -> Result<Role> {
        self.inner.create_role_with(name, permissions).await
    }

    async fn update_role(
        &self,
        id: RoleId,
        name: RoleName,
        permissions: &[PermissionId],
    ) -> Result<(Role, SyncDelta)> {
        self.inner.update_role(id, name, permissions).await
    }

    async fn create_permission_with(
        &self,
        name: PermissionName,
        roles: &[RoleId],
    ) -> Result<Permission> {
        self.inner.create_permission_with(name, roles).await
    }

    async fn update_permission(
        &self,
        id: PermissionId,
        name: PermissionName,
        roles: &[RoleId],
    ) -> Result<(Permission, SyncDelta)> {
        self.inner.update_permission(id, name, roles).await
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        self.inner.create_post(post).await
    }

    async fn post(&self, id: PostId) -> Result<Post> {
        self.inner.post(id).await
    }

    async fn posts(&self) -> Result<Vec<Post>> {
        self.inner.posts().await
    }

    async fn update_post(&self, id: PostId, changes: PostChanges) -> Result<Post> {
        self.inner.update_post(id, changes).await
    }

    async fn delete_post(&self, id: PostId) -> Result<Post> {
        self.inner.delete_post(id).await
    }
}

struct Racing {
    store: Arc<RacingStore>,
    rbac: Rbac,
    audit: Arc<MemoryAuditSink>,
}

fn racing() -> Racing {
    let store = Arc::new(RacingStore::default());
    let audit = Arc::new(MemoryAuditSink::new());
    let rbac = Rbac::with_audit_sink(store.clone(), RbacConfig::default(), audit.clone());
    Racing { store, rbac, audit }
}

fn input(email: &str) -> PrincipalInput {
    PrincipalInput {
        display_name: "User".to_string(),
        email: email.to_string(),
        password: "password".to_string(),
    }
}

#[tokio::test]
async fn test_forms_never_issue_a_separate_sync() {
    let r = racing();
    let m = r.rbac.mutator();
    m.create_permission("p".into(), &[]).await.unwrap();
    let role = m.create_role("editor".into(), &names(["p"])).await.unwrap();
    m.update_role(role.id, "writer".into(), &names(["p"]))
        .await
        .unwrap();
    let perm = m
        .create_permission("q".into(), &names(["writer"]))
        .await
        .unwrap();
    m.update_permission(perm.id, "q2".into(), &names(["writer"]))
        .await
        .unwrap();
    let u = m
        .create_principal(input("u@example.com"), &names(["writer"]))
        .await
        .unwrap();
    let roles: Vec<RoleName> = names(["writer"]);
    m.update_principal(
        u.id,
        PrincipalUpdate {
            display_name: "Renamed".to_string(),
            email: "u@example.com".to_string(),
            password: None,
        },
        Some(roles.as_slice()),
    )
    .await
    .unwrap();

    assert!(r.rbac.gate().can(u.id, "p").await.unwrap());
    assert!(r.rbac.gate().can(u.id, "q2").await.unwrap());
}

#[tokio::test]
async fn test_role_deleted_during_create_principal_leaves_no_principal() {
    let r = racing();
    let m = r.rbac.mutator();
    m.create_role("editor".into(), &[]).await.unwrap();
    let audited = r.audit.events().len();

    r.store.arm();
    let err = m
        .create_principal(input("u@example.com"), &names(["editor"]))
        .await
        .unwrap_err();
    assert!(err.is_not_found(EntityKind::Role));
    assert!(
        r.store
            .principal_by_email("u@example.com")
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(r.audit.events().len(), audited);

    // The email is still free for a retry.
    m.create_role("editor".into(), &[]).await.unwrap();
    let u = m
        .create_principal(input("u@example.com"), &names(["editor"]))
        .await
        .unwrap();
    assert!(r.rbac.gate().has_role(u.id, &"editor".into()).await.unwrap());
}

#[tokio::test]
async fn test_permission_deleted_during_create_role_leaves_no_role() {
    let r = racing();
    let m = r.rbac.mutator();
    m.create_permission("p".into(), &[]).await.unwrap();

    r.store.arm();
    let err = m
        .create_role("fresh".into(), &names(["p"]))
        .await
        .unwrap_err();
    assert!(err.is_not_found(EntityKind::Permission));
    assert!(
        r.store
            .role_by_name(&"fresh".into())
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_permission_deleted_during_update_role_keeps_old_name() {
    let r = racing();
    let m = r.rbac.mutator();
    m.create_permission("p".into(), &[]).await.unwrap();
    m.create_permission("q".into(), &[]).await.unwrap();
    let role = m.create_role("editor".into(), &names(["q"])).await.unwrap();
    let epoch = r.rbac.cache().epoch();

    r.store.arm();
    let err = m
        .update_role(role.id, "renamed".into(), &names(["p"]))
        .await
        .unwrap_err();
    assert!(err.is_not_found(EntityKind::Permission));

    let kept = r.store.role(role.id).await.unwrap();
    assert_eq!(kept.name.as_str(), "editor");
    let held = r.store.permissions_of(Grantee::Role(role.id)).await.unwrap();
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].name.as_str(), "q");
    // Nothing changed, so nothing was invalidated.
    assert_eq!(r.rbac.cache().epoch(), epoch);
}

#[tokio::test]
async fn test_role_deleted_during_update_principal_keeps_old_fields() {
    let r = racing();
    let m = r.rbac.mutator();
    m.create_role("editor".into(), &[]).await.unwrap();
    let u = m.create_principal(input("u@example.com"), &[]).await.unwrap();

    r.store.arm();
    let roles: Vec<RoleName> = names(["editor"]);
    let err = m
        .update_principal(
            u.id,
            PrincipalUpdate {
                display_name: "Renamed".to_string(),
                email: "new@example.com".to_string(),
                password: None,
            },
            Some(roles.as_slice()),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found(EntityKind::Role));

    let kept = r.store.principal(u.id).await.unwrap();
    assert_eq!(kept.display_name, "User");
    assert_eq!(kept.email, "u@example.com");
}

#[tokio::test]
async fn test_role_deleted_during_update_permission_keeps_old_name() {
    let r = racing();
    let m = r.rbac.mutator();
    m.create_role("editor".into(), &[]).await.unwrap();
    let perm = m.create_permission("p".into(), &[]).await.unwrap();

    r.store.arm();
    let err = m
        .update_permission(perm.id, "renamed".into(), &names(["editor"]))
        .await
        .unwrap_err();
    assert!(err.is_not_found(EntityKind::Role));
    assert_eq!(r.store.permission(perm.id).await.unwrap().name.as_str(), "p");
}
