//! # warden-api
//!
//! The admin back-office as a JSON API over the Warden engine:
//!
//! - session endpoints (`/login`, `/logout`, `/me`)
//! - CRUD for users, roles, permissions, and posts, each route guarded by a
//!   `can:*` requirement
//! - the bootstrap [`seed`] catalog
//!
//! ```no_run
//! use std::sync::Arc;
//! use warden_acl::{Rbac, RbacConfig};
//! use warden_api::{AppState, build_router, serve};
//! use warden_auth::AuthConfig;
//! use warden_store::InMemoryStore;
//!
//! # async fn run() -> std::io::Result<()> {
//! let rbac = Rbac::new(Arc::new(InMemoryStore::new()), RbacConfig::default());
//! let router = build_router(AppState::new(rbac, AuthConfig::default()));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! serve(listener, router).await
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod app;
pub mod error;
mod routes;
pub mod seed;
pub mod types;

pub use app::{AppState, build_router, serve};
pub use error::{ApiError, ErrorBody};
pub use seed::{SeedConfig, SeedReport, seed};
