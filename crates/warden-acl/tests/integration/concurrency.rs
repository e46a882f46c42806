//! Checks racing against mutations.
//!
//! Background readers keep the cache warm with whatever they observe while
//! a writer flips grants. Once a mutation returns, no read (by the writer or
//! anyone else) may observe the previous state.

use crate::common::TestHarness;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use warden_core::{Error, Grantee, names};

const ROUNDS: usize = 50;
const READERS: usize = 4;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_stale_read_after_role_toggle() {
    let h = Arc::new(TestHarness::new());
    h.permissions(&["create_posts"]).await;
    h.role("editor", &["create_posts"]).await;
    let u = h.user("u@example.com").await;

    let stop = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let h = Arc::clone(&h);
            let stop = Arc::clone(&stop);
            tokio::spawn(async move {
                while !stop.load(Ordering::Relaxed) {
                    h.rbac.gate().can(u, "create_posts").await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for _ in 0..ROUNDS {
        h.rbac.mutator().assign_role(u, &names(["editor"])).await.unwrap();
        assert!(h.can(u, "create_posts").await, "stale deny after assign");
        h.rbac.mutator().remove_role(u, &names(["editor"])).await.unwrap();
        assert!(!h.can(u, "create_posts").await, "stale allow after remove");
    }

    stop.store(true, Ordering::Relaxed);
    for r in readers {
        r.await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_stale_read_after_role_permission_toggle() {
    let h = Arc::new(TestHarness::new());
    h.permissions(&["publish"]).await;
    let role = h.rbac.mutator().create_role("editor".into(), &[]).await.unwrap();
    let u = h.user("u@example.com").await;
    h.rbac.mutator().assign_role(u, &names(["editor"])).await.unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let h = Arc::clone(&h);
            let stop = Arc::clone(&stop);
            tokio::spawn(async move {
                while !stop.load(Ordering::Relaxed) {
                    h.rbac.gate().effective_permissions(u).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for _ in 0..ROUNDS {
        h.rbac
            .mutator()
            .give_permission_to(Grantee::Role(role.id), &names(["publish"]))
            .await
            .unwrap();
        assert!(h.can(u, "publish").await, "stale deny after grant");
        h.rbac
            .mutator()
            .revoke_permission_to(Grantee::Role(role.id), &names(["publish"]))
            .await
            .unwrap();
        assert!(!h.can(u, "publish").await, "stale allow after revoke");
    }

    stop.store(true, Ordering::Relaxed);
    for r in readers {
        r.await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_mutations_never_report_consistency_failures() {
    let h = Arc::new(TestHarness::new());
    h.permissions(&["p"]).await;
    h.role("r", &["p"]).await;
    let mut users = Vec::new();
    for i in 0..8 {
        users.push(h.user(&format!("u{i}@example.com")).await);
    }

    let tasks: Vec<_> = users
        .iter()
        .copied()
        .map(|u| {
            let h = Arc::clone(&h);
            tokio::spawn(async move {
                for _ in 0..10 {
                    h.rbac.mutator().sync_roles(u, &names(["r"])).await?;
                    h.rbac.mutator().sync_roles(u, &[]).await?;
                    h.rbac
                        .mutator()
                        .sync_permissions(Grantee::Principal(u), &names(["p"]))
                        .await?;
                }
                Ok::<_, Error>(())
            })
        })
        .collect();

    for t in tasks {
        t.await.unwrap().unwrap();
    }
    for u in users {
        // Final state: no roles, direct grant of `p`.
        assert!(h.rbac.gate().role_names(u).await.unwrap().is_empty());
        assert!(h.can(u, "p").await);
    }
}
