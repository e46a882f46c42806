//! # warden-cli
//!
//! Library half of the `warden` binary:
//!
//! - [`WardenConfig`]: TOML config with environment overrides
//! - [`commands`]: `serve`, `seed`, `check`, and `grants`
//! - [`logging`]: subscriber setup

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;

pub use config::WardenConfig;
pub use error::{Error, Result};
