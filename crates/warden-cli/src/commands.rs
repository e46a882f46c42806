//! Subcommand implementations.
//!
//! Each command opens the store described by the config, builds the engine
//! over it, and does one thing. Output formatting lives here too so the
//! binary stays a thin dispatcher.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use warden_acl::Rbac;
use warden_api::{AppState, SeedReport, build_router};
use warden_core::{PermissionName, PrincipalId, RoleName};
use warden_store::{EntityStore, InMemoryStore};

use crate::config::WardenConfig;
use crate::error::{Error, Result};

/// How often expired sessions are swept while serving.
pub const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// The engine over the configured store.
pub struct Engine {
    /// Concrete store, for emptiness checks.
    pub store: Arc<InMemoryStore>,
    /// The engine.
    pub rbac: Rbac,
}

/// Opens the configured store and builds the engine over it.
pub async fn open(config: &WardenConfig) -> Result<Engine> {
    let store = match &config.storage.path {
        Some(path) => {
            tracing::info!(path = %path.display(), "opening snapshot store");
            InMemoryStore::open(path.clone()).await?
        }
        None => {
            tracing::warn!("no storage path configured; state is lost on exit");
            InMemoryStore::new()
        }
    };
    let store = Arc::new(store);
    let rbac = Rbac::new(
        Arc::clone(&store) as Arc<dyn EntityStore>,
        config.rbac.clone(),
    );
    Ok(Engine { store, rbac })
}

/// `warden seed`.
pub async fn seed(engine: &Engine, config: &WardenConfig) -> Result<SeedReport> {
    Ok(warden_api::seed(&engine.rbac, &config.seed).await?)
}

/// `warden serve`: seeds an empty store, then serves until Ctrl-C.
pub async fn serve(engine: Engine, config: &WardenConfig) -> anyhow::Result<()> {
    use anyhow::Context;

    if engine.store.is_empty().await {
        tracing::info!("store is empty; seeding");
        seed(&engine, config).await?;
    }

    let addr = config.bind_addr()?;
    let state = AppState::new(engine.rbac, config.auth.clone());
    let sessions = Arc::clone(&state.sessions);
    let sweeper = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = sessions.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "expired sessions swept");
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    let result = warden_api::serve(listener, build_router(state)).await;
    sweeper.abort();
    result.context("serve admin API")
}

/// Outcome of `warden check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The ability is granted.
    Allow,
    /// The ability is not granted.
    Deny,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allow => f.write_str("allow"),
            Decision::Deny => f.write_str("deny"),
        }
    }
}

async fn principal_id(engine: &Engine, email: &str) -> Result<PrincipalId> {
    engine
        .rbac
        .store()
        .principal_by_email(email)
        .await?
        .map(|p| p.id)
        .ok_or_else(|| Error::UnknownEmail(email.to_string()))
}

/// `warden check`: may the principal with `email` perform `ability`?
pub async fn check(engine: &Engine, email: &str, ability: &str) -> Result<Decision> {
    let id = principal_id(engine, email).await?;
    Ok(if engine.rbac.gate().can(id, ability).await? {
        Decision::Allow
    } else {
        Decision::Deny
    })
}

/// Output of `warden grants`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantsReport {
    /// Login email.
    pub email: String,
    /// Assigned roles.
    pub roles: Vec<RoleName>,
    /// Effective permissions.
    pub permissions: Vec<PermissionName>,
    /// Holds the super role.
    pub is_super: bool,
}

impl fmt::Display for GrantsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "principal: {}", self.email)?;
        write!(f, "roles:")?;
        for role in &self.roles {
            write!(f, " {role}")?;
        }
        if self.is_super {
            write!(f, " (super)")?;
        }
        writeln!(f)?;
        writeln!(f, "permissions:")?;
        for permission in &self.permissions {
            writeln!(f, "  {permission}")?;
        }
        Ok(())
    }
}

/// `warden grants`: roles and effective permissions of a principal.
pub async fn grants(engine: &Engine, email: &str) -> Result<GrantsReport> {
    let id = principal_id(engine, email).await?;
    let gate = engine.rbac.gate();
    let grants = gate.grants(id).await?;
    Ok(GrantsReport {
        email: email.to_string(),
        roles: grants.roles.iter().cloned().collect(),
        permissions: grants.permissions.iter().cloned().collect(),
        is_super: gate.is_super(id).await?,
    })
}
