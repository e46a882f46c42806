//! Error types for warden-cli.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for warden-cli operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in warden-cli.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from the engine or the store.
    #[error(transparent)]
    Core(#[from] warden_core::Error),

    /// Config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadConfig {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`WardenConfig`](crate::WardenConfig).
    #[error("invalid config: {0}")]
    ParseConfig(#[from] toml::de::Error),

    /// A config value is present but unusable.
    #[error("invalid config value for {key}: {message}")]
    InvalidValue {
        /// Dotted key or environment variable.
        key: String,
        /// What is wrong with it.
        message: String,
    },

    /// No principal has the given email.
    #[error("no principal with email '{0}'")]
    UnknownEmail(String),
}
