//! # warden-store
//!
//! Entity storage for Warden.
//!
//! This crate provides:
//! - The [`EntityStore`] trait: principals, roles, permissions, posts, and
//!   the three association tables
//! - [`InMemoryStore`]: the lock-guarded implementation, volatile or backed
//!   by an atomically replaced JSON snapshot
//!
//! Uniqueness and referential checks live here. Authorization semantics
//! (effective permissions, bypass, caching) live in `warden-acl`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod memory;
mod snapshot;
mod tables;
pub mod traits;

pub use memory::InMemoryStore;
pub use traits::EntityStore;
