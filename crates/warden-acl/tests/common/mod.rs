//! Common test utilities and harness for warden-acl integration tests.

use std::sync::Arc;
use warden_acl::{MemoryAuditSink, PrincipalInput, Rbac, RbacConfig};
use warden_core::{names, PrincipalId};
use warden_store::InMemoryStore;

/// Test harness wiring an engine over a fresh volatile store.
pub struct TestHarness {
    /// The engine under test.
    pub rbac: Rbac,
    /// Captured audit events.
    pub audit: Arc<MemoryAuditSink>,
}

impl TestHarness {
    /// Creates a harness with the default `super_admin` bypass role.
    pub fn new() -> Self {
        Self::with_config(RbacConfig::default())
    }

    /// Creates a harness with custom engine settings.
    pub fn with_config(config: RbacConfig) -> Self {
        let audit = Arc::new(MemoryAuditSink::new());
        let rbac = Rbac::with_audit_sink(Arc::new(InMemoryStore::new()), config, audit.clone());
        Self { rbac, audit }
    }

    /// Creates a principal with the given email and no grants.
    pub async fn user(&self, email: &str) -> PrincipalId {
        self.rbac
            .mutator()
            .create_principal(
                PrincipalInput {
                    display_name: email.to_string(),
                    email: email.to_string(),
                    password: "password".to_string(),
                },
                &[],
            )
            .await
            .unwrap()
            .id
    }

    /// Creates permissions by name.
    pub async fn permissions(&self, perms: &[&str]) {
        for name in perms {
            self.rbac
                .mutator()
                .create_permission((*name).into(), &[])
                .await
                .unwrap();
        }
    }

    /// Creates a role holding existing permissions.
    pub async fn role(&self, name: &str, perms: &[&str]) {
        self.rbac
            .mutator()
            .create_role(name.into(), &names(perms.iter().copied()))
            .await
            .unwrap();
    }

    /// Checks an ability through the gate.
    pub async fn can(&self, user: PrincipalId, ability: &str) -> bool {
        self.rbac.gate().can(user, ability).await.unwrap()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
