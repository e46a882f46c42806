//! Bootstrap catalog.
//!
//! Seeding is first-or-create throughout, so it is safe to run against a
//! store that has already been seeded: existing permissions, roles, and the
//! admin account are found by name or email and left as they are, missing
//! grants are added, and nothing is ever removed.

use serde::{Deserialize, Serialize};
use warden_acl::{PrincipalInput, Rbac};
use warden_core::{Grantee, PermissionName, Result, RoleName};

/// Actions every resource gets a permission for.
pub const ACTIONS: [&str; 11] = [
    "view_any",
    "view",
    "create",
    "update",
    "delete",
    "restore",
    "force_delete",
    "force_delete_any",
    "restore_any",
    "replicate",
    "reorder",
];

/// Resources in the catalog.
pub const RESOURCES: [&str; 4] = ["posts", "users", "roles", "permissions"];

/// Name of the moderator role.
pub const MODERATOR_ROLE: &str = "moderator";

/// Resources the moderator role covers in full.
pub const MODERATOR_RESOURCES: [&str; 2] = ["users", "posts"];

/// The admin account created by seeding, the `[seed]` config section.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Display name.
    pub admin_name: String,
    /// Login email.
    pub admin_email: String,
    /// Initial password.
    pub admin_password: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            admin_name: "admin".to_string(),
            admin_email: "admin@admin.com".to_string(),
            admin_password: "password".to_string(),
        }
    }
}

impl std::fmt::Debug for SeedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedConfig")
            .field("admin_name", &self.admin_name)
            .field("admin_email", &self.admin_email)
            .finish_non_exhaustive()
    }
}

/// What a seeding run created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    /// Permissions created.
    pub permissions_created: usize,
    /// Roles created.
    pub roles_created: usize,
    /// Grants added to roles or the admin.
    pub grants_added: usize,
    /// Whether the admin account was created.
    pub admin_created: bool,
}

/// `<action>_<resource>` for the given resources.
pub fn permission_names(resources: &[&str]) -> Vec<PermissionName> {
    resources
        .iter()
        .flat_map(|resource| {
            ACTIONS
                .iter()
                .map(move |action| PermissionName::new(format!("{action}_{resource}")))
        })
        .collect()
}

/// The full permission catalog.
pub fn catalog() -> Vec<PermissionName> {
    permission_names(&RESOURCES)
}

/// Seeds the catalog, the moderator and super roles, and the admin account.
pub async fn seed(rbac: &Rbac, config: &SeedConfig) -> Result<SeedReport> {
    let store = rbac.store();
    let mutator = rbac.mutator();
    let mut report = SeedReport::default();

    for name in catalog() {
        if store.permission_by_name(&name).await?.is_none() {
            mutator.create_permission(name, &[]).await?;
            report.permissions_created += 1;
        }
    }

    let moderator = RoleName::from(MODERATOR_ROLE);
    let moderator_id = match store.role_by_name(&moderator).await? {
        Some(role) => role.id,
        None => {
            report.roles_created += 1;
            mutator.create_role(moderator, &[]).await?.id
        }
    };
    report.grants_added += mutator
        .give_permission_to(
            Grantee::Role(moderator_id),
            &permission_names(&MODERATOR_RESOURCES),
        )
        .await?;

    let super_role = rbac.config().super_role.clone();
    if store.role_by_name(&super_role).await?.is_none() {
        mutator.create_role(super_role.clone(), &[]).await?;
        report.roles_created += 1;
    }

    let admin = match store.principal_by_email(&config.admin_email).await? {
        Some(principal) => principal.id,
        None => {
            report.admin_created = true;
            mutator
                .create_principal(
                    PrincipalInput {
                        display_name: config.admin_name.clone(),
                        email: config.admin_email.clone(),
                        password: config.admin_password.clone(),
                    },
                    &[],
                )
                .await?
                .id
        }
    };
    report.grants_added += mutator.assign_role(admin, &[super_role]).await?;

    tracing::info!(
        permissions = report.permissions_created,
        roles = report.roles_created,
        grants = report.grants_added,
        admin_created = report.admin_created,
        "seed complete"
    );
    Ok(report)
}
