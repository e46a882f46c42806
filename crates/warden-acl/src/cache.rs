//! Per-principal memoization of resolved grants.
//!
//! Staleness is tracked with two counters:
//!
//! - a global **epoch**, bumped by any role or permission change that can
//!   affect many principals at once, and
//! - a per-principal **generation**, bumped by changes scoped to one
//!   principal (role assignment, direct grants).
//!
//! A lookup captures the [`CacheToken`] *before* computing, and the result
//! is stored tagged with that token. An entry is served only while both
//! counters still match, so a computation that raced with a mutation can
//! never be served after the mutation returns.
//!
//! Generations are tracked only for principals invalidated in the current
//! epoch. Once more than [`MAX_TRACKED_GENERATIONS`] are tracked, the next
//! single-principal invalidation rolls the whole cache over to a new epoch
//! instead, which keeps the map bounded (deleted principals included)
//! without ever letting a token move backwards.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use warden_core::{PrincipalId, Result};

use crate::resolver::Grants;

/// Principals whose generation is tracked before the cache rolls over to a
/// new epoch.
pub const MAX_TRACKED_GENERATIONS: usize = 4096;

/// Snapshot of the invalidation counters relevant to one principal.
///
/// Ordered by epoch, then generation; every invalidation yields a strictly
/// greater token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CacheToken {
    /// Global epoch.
    pub epoch: u64,
    /// Principal generation within the epoch.
    pub generation: u64,
}

/// Counters exposed for tests and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that ran the resolver.
    pub misses: u64,
    /// Entries currently held.
    pub entries: usize,
    /// Current epoch.
    pub epoch: u64,
}

#[derive(Debug)]
struct Entry {
    token: CacheToken,
    grants: Arc<Grants>,
}

#[derive(Debug, Default)]
struct State {
    epoch: u64,
    generations: HashMap<PrincipalId, u64>,
    entries: HashMap<PrincipalId, Entry>,
}

impl State {
    fn token(&self, principal: PrincipalId) -> CacheToken {
        CacheToken {
            epoch: self.epoch,
            generation: self.generations.get(&principal).copied().unwrap_or(0),
        }
    }
}

/// Grant cache shared by the gate and the mutation API.
#[derive(Debug)]
pub struct GrantCache {
    enabled: bool,
    generation_limit: usize,
    state: RwLock<State>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for GrantCache {
    fn default() -> Self {
        Self::new(true)
    }
}

impl GrantCache {
    /// Creates a cache. When `enabled` is false nothing is memoized, but
    /// the counters still advance so mutations can verify invalidation.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            generation_limit: MAX_TRACKED_GENERATIONS,
            state: RwLock::new(State::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[cfg(test)]
    fn with_generation_limit(mut self, limit: usize) -> Self {
        self.generation_limit = limit;
        self
    }

    // Entries are plain values; a panic while holding the lock cannot leave
    // them half-written, so a poisoned lock is still usable.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current token for `principal`.
    pub fn token(&self, principal: PrincipalId) -> CacheToken {
        self.read().token(principal)
    }

    /// Current global epoch.
    pub fn epoch(&self) -> u64 {
        self.read().epoch
    }

    /// Returns the cached grants if the entry is still current.
    pub fn lookup(&self, principal: PrincipalId) -> Option<Arc<Grants>> {
        let state = self.read();
        let entry = state.entries.get(&principal)?;
        (entry.token == state.token(principal)).then(|| Arc::clone(&entry.grants))
    }

    /// Stores `grants` computed under `token`, unless the token has since
    /// gone stale. Returns whether the entry was kept.
    pub fn store(&self, principal: PrincipalId, token: CacheToken, grants: Arc<Grants>) -> bool {
        if !self.enabled {
            return false;
        }
        let mut state = self.write();
        if state.token(principal) != token {
            log::debug!("Discarding grants for principal {principal}: invalidated during resolve");
            return false;
        }
        state.entries.insert(principal, Entry { token, grants });
        true
    }

    /// Returns cached grants, or runs `compute` and caches its result.
    ///
    /// Errors from `compute` are returned and never cached.
    pub async fn get_or_compute<F, Fut>(
        &self,
        principal: PrincipalId,
        compute: F,
    ) -> Result<Arc<Grants>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Grants>>,
    {
        if self.enabled
            && let Some(grants) = self.lookup(principal)
        {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("Grant cache hit for principal {principal}");
            return Ok(grants);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let token = self.token(principal);
        let grants = Arc::new(compute().await?);
        self.store(principal, token, Arc::clone(&grants));
        Ok(grants)
    }

    /// Drops every entry and advances the epoch. Returns the new epoch.
    pub fn invalidate_all(&self) -> u64 {
        let mut state = self.write();
        state.epoch += 1;
        state.entries.clear();
        state.generations.clear();
        log::debug!("Grant cache flushed (epoch {})", state.epoch);
        state.epoch
    }

    /// Drops one principal's entry and advances its generation.
    ///
    /// When the generation map is full and `principal` is not yet in it,
    /// the epoch advances instead and every entry is dropped.
    pub fn invalidate(&self, principal: PrincipalId) {
        let mut state = self.write();
        if state.generations.len() >= self.generation_limit
            && !state.generations.contains_key(&principal)
        {
            state.epoch += 1;
            state.entries.clear();
            state.generations.clear();
            log::debug!(
                "Grant cache rolled over to epoch {} after {} tracked generations",
                state.epoch,
                self.generation_limit
            );
            return;
        }
        *state.generations.entry(principal).or_insert(0) += 1;
        state.entries.remove(&principal);
    }

    /// Number of principals with a tracked generation.
    pub fn tracked_generations(&self) -> usize {
        self.read().generations.len()
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        let state = self.read();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: state.entries.len(),
            epoch: state.epoch,
        }
    }
}
