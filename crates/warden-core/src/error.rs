//! Error types for warden-core.
//!
//! One taxonomy is shared by the store, the resolution engine, and the
//! mutation API:
//!
//! - [`Error::Validation`]: bad input (duplicate name, unknown referenced
//!   name). Recoverable by resubmitting.
//! - [`Error::NotFound`]: an id or name that does not exist.
//! - [`Error::Consistency`]: an internal ordering bug (a write committed
//!   without its cache invalidation). Never swallowed.
//!
//! A negative authorization decision is *not* an error; the gate returns
//! `Ok(false)`.

use std::fmt;

/// Kind of entity an id or name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A user account.
    Principal,
    /// A named bundle of permissions.
    Role,
    /// A named capability.
    Permission,
    /// A blog post.
    Post,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Principal => write!(f, "principal"),
            EntityKind::Role => write!(f, "role"),
            EntityKind::Permission => write!(f, "permission"),
            EntityKind::Post => write!(f, "post"),
        }
    }
}

/// Errors that can occur anywhere in the access-control core.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Input failed validation.
    #[error("Validation error: {}", display_validation(.field, .message))]
    Validation {
        /// Field that failed, when the failure is field-level.
        field: Option<String>,
        /// What went wrong.
        message: String,
    },

    /// Referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind.
        kind: EntityKind,
        /// Id or name that was looked up.
        id: String,
    },

    /// A write was committed without the matching cache invalidation.
    #[error("Consistency failure: {message}")]
    Consistency {
        /// Description of the broken ordering.
        message: String,
    },

    /// Storage backend failure.
    #[error("Storage error: {message}")]
    Storage {
        /// Human-readable error message
        message: String,
        /// Source error if available
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// I/O error (snapshot files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },
}

fn display_validation(field: &Option<String>, message: &str) -> String {
    match field {
        Some(field) => format!("{field} {message}"),
        None => message.to_string(),
    }
}

/// Convenience `Result` alias used across warden crates.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns `true` for errors caused by the caller's input.
    ///
    /// These propagate to the CRUD layer for display; everything else is a
    /// server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Validation { .. } | Error::NotFound { .. })
    }

    /// Creates a validation error without a field.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Error::Validation {
            field: None,
            message: message.into(),
        }
    }

    /// Creates a field-level validation error.
    pub fn validation_field<F, M>(field: F, message: M) -> Self
    where
        F: Into<String>,
        M: Into<String>,
    {
        Error::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(kind: EntityKind, id: impl fmt::Display) -> Self {
        Error::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Creates a consistency error.
    pub fn consistency<S: Into<String>>(message: S) -> Self {
        Error::Consistency {
            message: message.into(),
        }
    }

    /// Creates a storage error with a message.
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Error::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a storage error with a message and source error.
    pub fn storage_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not-found error for the given kind.
    pub fn is_not_found(&self, kind: EntityKind) -> bool {
        matches!(self, Error::NotFound { kind: k, .. } if *k == kind)
    }
}
