//! Property tests: closure correctness and sync exactness.

use crate::common::TestHarness;
use proptest::prelude::*;
use std::collections::BTreeSet;
use warden_core::{Grantee, PermissionName, RoleName};

const PERMS: usize = 6;
const ROLES: usize = 4;

fn perm(i: usize) -> String {
    format!("perm_{i}")
}

fn role(i: usize) -> String {
    format!("role_{i}")
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Random grant layout: per-role permission subsets, the principal's
/// direct subset, and the roles it holds.
fn layout() -> impl Strategy<Value = (Vec<BTreeSet<usize>>, BTreeSet<usize>, BTreeSet<usize>)> {
    (
        prop::collection::vec(prop::collection::btree_set(0..PERMS, 0..=PERMS), ROLES),
        prop::collection::btree_set(0..PERMS, 0..=PERMS),
        prop::collection::btree_set(0..ROLES, 0..=ROLES),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_effective_set_is_exact_union((role_perms, direct, held) in layout()) {
        let rt = runtime();
        let (actual, expected) = rt.block_on(async {
            let h = TestHarness::new();
            let all: Vec<String> = (0..PERMS).map(perm).collect();
            let all: Vec<&str> = all.iter().map(String::as_str).collect();
            h.permissions(&all).await;
            for (i, perms) in role_perms.iter().enumerate() {
                let names: Vec<String> = perms.iter().map(|p| perm(*p)).collect();
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                h.role(&role(i), &names).await;
            }
            let u = h.user("u@example.com").await;

            let direct_names: Vec<PermissionName> =
                direct.iter().map(|p| PermissionName::new(perm(*p))).collect();
            h.rbac
                .mutator()
                .give_permission_to(Grantee::Principal(u), &direct_names)
                .await
                .unwrap();
            let held_names: Vec<RoleName> = held.iter().map(|r| RoleName::new(role(*r))).collect();
            h.rbac.mutator().assign_role(u, &held_names).await.unwrap();

            let mut expected: BTreeSet<PermissionName> =
                direct.iter().map(|p| PermissionName::new(perm(*p))).collect();
            for r in &held {
                expected.extend(role_perms[*r].iter().map(|p| PermissionName::new(perm(*p))));
            }
            (h.rbac.gate().effective_permissions(u).await.unwrap(), expected)
        });
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_sync_roles_is_exact_and_idempotent(
        initial in prop::collection::btree_set(0..ROLES, 0..=ROLES),
        target in prop::collection::btree_set(0..ROLES, 0..=ROLES),
    ) {
        let rt = runtime();
        let (after_first, delta_second, after_second, expected) = rt.block_on(async {
            let h = TestHarness::new();
            for i in 0..ROLES {
                h.role(&role(i), &[]).await;
            }
            let u = h.user("u@example.com").await;
            let to_names = |set: &BTreeSet<usize>| -> Vec<RoleName> {
                set.iter().map(|r| RoleName::new(role(*r))).collect()
            };
            h.rbac.mutator().assign_role(u, &to_names(&initial)).await.unwrap();

            let target_names = to_names(&target);
            h.rbac.mutator().sync_roles(u, &target_names).await.unwrap();
            let after_first = h.rbac.gate().role_names(u).await.unwrap();
            let delta = h.rbac.mutator().sync_roles(u, &target_names).await.unwrap();
            let after_second = h.rbac.gate().role_names(u).await.unwrap();
            let expected: BTreeSet<RoleName> = target_names.into_iter().collect();
            (after_first, delta, after_second, expected)
        });
        prop_assert_eq!(&after_first, &expected);
        prop_assert!(delta_second.is_noop());
        prop_assert_eq!(after_second, after_first);
    }
}
