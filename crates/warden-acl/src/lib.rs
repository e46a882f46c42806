//! # warden-acl
//!
//! Role-based access control engine for Warden.
//!
//! This crate provides:
//! - [`Resolver`]: effective permissions = direct grants ∪ role grants
//! - [`GrantCache`]: per-principal memoization with epoch/generation
//!   invalidation
//! - [`Gate`]: `can` (with the super-role bypass) and the literal
//!   `has_*` membership predicates
//! - [`Mutator`]: the write path, which invalidates before returning
//! - [`AuditSink`]: an additive trail of committed mutations
//! - [`Rbac`]: wires the above together over one store
//!
//! ```no_run
//! # async fn demo(user: warden_core::PrincipalId) -> warden_core::Result<()> {
//! use std::sync::Arc;
//! use warden_acl::{Rbac, RbacConfig};
//! use warden_core::names;
//! use warden_store::InMemoryStore;
//!
//! let rbac = Rbac::new(Arc::new(InMemoryStore::new()), RbacConfig::default());
//! rbac.mutator().create_permission("create_posts".into(), &[]).await?;
//! rbac.mutator().create_role("editor".into(), &names(["create_posts"])).await?;
//! rbac.mutator().assign_role(user, &names(["editor"])).await?;
//! assert!(rbac.gate().can(user, "create_posts").await?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod audit;
pub mod cache;
pub mod config;
pub mod gate;
pub mod mutation;
pub mod resolver;
mod validate;

use std::sync::Arc;
use warden_store::EntityStore;

pub use audit::{AuditAction, AuditEvent, AuditSink, LogAuditSink, MemoryAuditSink, NullAuditSink};
pub use cache::{CacheStats, CacheToken, GrantCache, MAX_TRACKED_GENERATIONS};
pub use config::RbacConfig;
pub use gate::{AbilityRule, Gate};
pub use mutation::{Mutator, PrincipalInput, PrincipalUpdate};
pub use resolver::{Grants, Resolver};
pub use validate::{MAX_FIELD_CHARS, MIN_PASSWORD_CHARS};
pub use warden_core::{Error, Result};

/// The engine: one store, one cache, a gate for reads, and a mutator for
/// writes. Cheap to clone.
#[derive(Clone)]
pub struct Rbac {
    store: Arc<dyn EntityStore>,
    cache: Arc<GrantCache>,
    gate: Arc<Gate>,
    mutator: Mutator,
    config: RbacConfig,
}

impl std::fmt::Debug for Rbac {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rbac")
            .field("config", &self.config)
            .field("cache", &self.cache.stats())
            .finish_non_exhaustive()
    }
}

impl Rbac {
    /// Builds the engine over `store`, auditing through [`LogAuditSink`].
    pub fn new(store: Arc<dyn EntityStore>, config: RbacConfig) -> Self {
        Self::with_audit_sink(store, config, Arc::new(LogAuditSink))
    }

    /// Builds the engine with a custom audit sink.
    pub fn with_audit_sink(
        store: Arc<dyn EntityStore>,
        config: RbacConfig,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let cache = Arc::new(GrantCache::new(config.cache_enabled));
        let gate = Arc::new(Gate::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            config.super_role.clone(),
        ));
        let mutator = Mutator::new(Arc::clone(&store), Arc::clone(&cache), audit);
        Self {
            store,
            cache,
            gate,
            mutator,
            config,
        }
    }

    /// The read side.
    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// A shared handle to the read side, for request-time adapters.
    pub fn gate_handle(&self) -> Arc<Gate> {
        Arc::clone(&self.gate)
    }

    /// The write side, with no actor attached.
    pub fn mutator(&self) -> &Mutator {
        &self.mutator
    }

    /// The underlying store, for plain record reads.
    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    /// The grant cache.
    pub fn cache(&self) -> &GrantCache {
        &self.cache
    }

    /// Engine settings.
    pub fn config(&self) -> &RbacConfig {
        &self.config
    }
}
