//! End-to-end authorization scenarios.

use crate::common::TestHarness;
use warden_acl::RbacConfig;
use warden_core::{EntityKind, Error, Grantee, PermissionName, PrincipalId, RoleName, names};

#[tokio::test]
async fn test_role_grant_then_removal() {
    let h = TestHarness::new();
    h.permissions(&["create_posts"]).await;
    h.role("editor", &["create_posts"]).await;
    let u = h.user("u@example.com").await;

    h.rbac.mutator().assign_role(u, &names(["editor"])).await.unwrap();
    assert!(h.can(u, "create_posts").await);

    h.rbac.mutator().remove_role(u, &names(["editor"])).await.unwrap();
    assert!(!h.can(u, "create_posts").await);
}

#[tokio::test]
async fn test_permission_names_are_case_sensitive() {
    let h = TestHarness::new();
    h.permissions(&["Test Permission"]).await;
    let u = h.user("u@example.com").await;
    h.rbac
        .mutator()
        .give_permission_to(Grantee::Principal(u), &names(["Test Permission"]))
        .await
        .unwrap();

    assert!(h.can(u, "Test Permission").await);
    assert!(!h.can(u, "test permission").await);
}

#[tokio::test]
async fn test_duplicate_role_rejected_but_self_rename_allowed() {
    let h = TestHarness::new();
    let x = h.rbac.mutator().create_role("x".into(), &[]).await.unwrap();
    let err = h.rbac.mutator().create_role("x".into(), &[]).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Validation { field: Some(ref f), .. } if f == "name"
    ));
    let renamed = h.rbac.mutator().rename_role(x.id, "x".into()).await.unwrap();
    assert_eq!(renamed.name.as_str(), "x");
}

async fn give_p1(h: &TestHarness, u: PrincipalId) {
    h.rbac
        .mutator()
        .give_permission_to(Grantee::Principal(u), &names(["p1"]))
        .await
        .unwrap();
}

async fn assign_r(h: &TestHarness, u: PrincipalId) {
    h.rbac.mutator().assign_role(u, &names(["r"])).await.unwrap();
}

#[tokio::test]
async fn test_direct_and_role_grants_union_in_any_order() {
    for direct_first in [true, false] {
        let h = TestHarness::new();
        h.permissions(&["p1", "p2"]).await;
        h.role("r", &["p2"]).await;
        let u = h.user("u@example.com").await;

        if direct_first {
            give_p1(&h, u).await;
            assign_r(&h, u).await;
        } else {
            assign_r(&h, u).await;
            give_p1(&h, u).await;
        }

        let effective = h.rbac.gate().effective_permissions(u).await.unwrap();
        let expected: Vec<PermissionName> = names(["p1", "p2"]);
        assert_eq!(effective.into_iter().collect::<Vec<_>>(), expected);
    }
}

#[tokio::test]
async fn test_super_role_passes_everything_even_denying_rules() {
    let h = TestHarness::new();
    h.rbac.mutator().create_role("super_admin".into(), &[]).await.unwrap();
    let admin = h.user("admin@example.com").await;
    let plain = h.user("plain@example.com").await;
    h.rbac
        .mutator()
        .assign_role(admin, &names(["super_admin"]))
        .await
        .unwrap();
    h.rbac.gate().define("delete_everything", |_| false);

    assert!(h.can(admin, "delete_everything").await);
    assert!(h.can(admin, "not_even_a_permission").await);
    assert!(!h.can(plain, "delete_everything").await);
    assert!(h.rbac.gate().effective_permissions(admin).await.unwrap().is_empty());
}

/// The bypass only covers `can`. Literal membership queries report what
/// is actually assigned, even for super admins.
#[tokio::test]
async fn test_bypass_does_not_extend_to_membership_queries() {
    let h = TestHarness::new();
    h.permissions(&["create_posts"]).await;
    h.role("editor", &["create_posts"]).await;
    h.rbac.mutator().create_role("super_admin".into(), &[]).await.unwrap();
    let admin = h.user("admin@example.com").await;
    h.rbac
        .mutator()
        .assign_role(admin, &names(["super_admin"]))
        .await
        .unwrap();
    let gate = h.rbac.gate();

    assert!(gate.can(admin, "create_posts").await.unwrap());
    assert!(!gate
        .has_permission_to(admin, &"create_posts".into())
        .await
        .unwrap());
    assert!(!gate.has_role(admin, &"editor".into()).await.unwrap());
    assert!(!gate
        .has_any_permission(admin, &names(["create_posts"]))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_custom_super_role_name() {
    let h = TestHarness::with_config(RbacConfig::default().with_super_role("root"));
    h.rbac.mutator().create_role("root".into(), &[]).await.unwrap();
    h.rbac.mutator().create_role("super_admin".into(), &[]).await.unwrap();
    let a = h.user("a@example.com").await;
    let b = h.user("b@example.com").await;
    h.rbac.mutator().assign_role(a, &names(["root"])).await.unwrap();
    h.rbac.mutator().assign_role(b, &names(["super_admin"])).await.unwrap();

    assert!(h.can(a, "anything").await);
    assert!(!h.can(b, "anything").await);
}

#[tokio::test]
async fn test_vacuous_quantifiers() {
    let h = TestHarness::new();
    let u = h.user("u@example.com").await;
    let gate = h.rbac.gate();
    assert!(!gate.has_any_role(u, &[]).await.unwrap());
    assert!(gate.has_all_roles(u, &[]).await.unwrap());
    assert!(!gate.has_any_permission(u, &[]).await.unwrap());
    assert!(gate.has_all_permissions(u, &[]).await.unwrap());
}

#[tokio::test]
async fn test_role_deletion_does_not_cascade_to_entities() {
    let h = TestHarness::new();
    h.permissions(&["p1", "p2"]).await;
    h.role("r", &["p1", "p2"]).await;
    h.role("keep", &["p1"]).await;
    let u = h.user("u@example.com").await;
    h.rbac.mutator().assign_role(u, &names(["r", "keep"])).await.unwrap();
    assert!(h.can(u, "p2").await);

    let store = h.rbac.store();
    let r = store.role_by_name(&RoleName::new("r")).await.unwrap().unwrap();
    h.rbac.mutator().delete_role(r.id).await.unwrap();

    let roles = h.rbac.gate().role_names(u).await.unwrap();
    assert_eq!(roles.into_iter().collect::<Vec<_>>(), vec![RoleName::new("keep")]);
    assert!(h.can(u, "p1").await);
    assert!(!h.can(u, "p2").await);
    // The permissions and the principal still exist.
    assert_eq!(store.permissions().await.unwrap().len(), 2);
    assert!(store.principal(u).await.is_ok());
}

#[tokio::test]
async fn test_permission_deletion_revokes_everywhere() {
    let h = TestHarness::new();
    h.permissions(&["p"]).await;
    h.role("r", &["p"]).await;
    let u = h.user("u@example.com").await;
    h.rbac.mutator().assign_role(u, &names(["r"])).await.unwrap();
    h.rbac
        .mutator()
        .give_permission_to(Grantee::Principal(u), &names(["p"]))
        .await
        .unwrap();
    assert!(h.can(u, "p").await);

    let p = h
        .rbac
        .store()
        .permission_by_name(&PermissionName::new("p"))
        .await
        .unwrap()
        .unwrap();
    h.rbac.mutator().delete_permission(p.id).await.unwrap();
    assert!(!h.can(u, "p").await);
    assert!(h.rbac.gate().has_role(u, &"r".into()).await.unwrap());
}

#[tokio::test]
async fn test_role_rename_is_visible_immediately() {
    let h = TestHarness::new();
    let role = h.rbac.mutator().create_role("editor".into(), &[]).await.unwrap();
    let u = h.user("u@example.com").await;
    h.rbac.mutator().assign_role(u, &names(["editor"])).await.unwrap();
    assert!(h.rbac.gate().has_role(u, &"editor".into()).await.unwrap());

    h.rbac.mutator().rename_role(role.id, "writer".into()).await.unwrap();
    assert!(!h.rbac.gate().has_role(u, &"editor".into()).await.unwrap());
    assert!(h.rbac.gate().has_role(u, &"writer".into()).await.unwrap());
}

#[tokio::test]
async fn test_principal_deletion_then_check_is_not_found() {
    let h = TestHarness::new();
    let u = h.user("u@example.com").await;
    assert!(!h.can(u, "x").await);
    h.rbac.mutator().delete_principal(u).await.unwrap();
    let err = h.rbac.gate().can(u, "x").await.unwrap_err();
    assert!(err.is_not_found(EntityKind::Principal));
}

#[tokio::test]
async fn test_every_mutation_is_audited() {
    let h = TestHarness::new();
    h.permissions(&["p"]).await;
    h.role("r", &["p"]).await;
    let u = h.user("u@example.com").await;
    h.rbac.mutator().as_actor(u).assign_role(u, &names(["r"])).await.unwrap();

    let events = h.audit.events();
    assert_eq!(events.len(), 4);
    assert_eq!(events.last().unwrap().actor, Some(u));
}
