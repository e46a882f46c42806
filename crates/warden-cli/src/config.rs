//! Configuration for the `warden` binary.
//!
//! Loaded from a TOML file, then overridden from the environment:
//!
//! | variable            | overrides              |
//! |---------------------|------------------------|
//! | `WARDEN_CONFIG`     | config file path       |
//! | `WARDEN_BIND`       | `server.bind_addr`     |
//! | `WARDEN_DATA`       | `storage.path`         |
//! | `WARDEN_SUPER_ROLE` | `rbac.super_role`      |
//!
//! Every section is optional. With no file at all the server binds to
//! `127.0.0.1:8080` and keeps everything in memory.
//!
//! Environment lookup is passed in as a closure, so loading can be tested
//! without touching the process environment.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use warden_acl::RbacConfig;
use warden_api::SeedConfig;
use warden_auth::AuthConfig;
use warden_core::RoleName;

use crate::error::{Error, Result};

/// Names the config file.
pub const ENV_CONFIG: &str = "WARDEN_CONFIG";
/// Overrides `server.bind_addr`.
pub const ENV_BIND: &str = "WARDEN_BIND";
/// Overrides `storage.path`.
pub const ENV_DATA: &str = "WARDEN_DATA";
/// Overrides `rbac.super_role`.
pub const ENV_SUPER_ROLE: &str = "WARDEN_SUPER_ROLE";

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, `host:port`.
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Snapshot file. Absent means nothing survives a restart.
    pub path: Option<PathBuf>,
}

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    /// HTTP listener.
    pub server: ServerConfig,
    /// Persistence.
    pub storage: StorageConfig,
    /// Authorization engine.
    pub rbac: RbacConfig,
    /// Sessions and login redirect.
    pub auth: AuthConfig,
    /// Bootstrap admin account.
    pub seed: SeedConfig,
}

impl WardenConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Loads from `path`, falling back to the file named by
    /// `WARDEN_CONFIG`, then to defaults, and applies environment overrides.
    pub fn load<F>(path: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path.map(Path::to_path_buf).or_else(|| env(ENV_CONFIG).map(PathBuf::from));
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(&path).map_err(|source| {
                    Error::ReadConfig {
                        path: path.clone(),
                        source,
                    }
                })?;
                log::debug!("Loaded config from {}", path.display());
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };
        config.apply_env(env)?;
        Ok(config)
    }

    /// Loads using the process environment.
    pub fn load_from_process_env(path: Option<&Path>) -> Result<Self> {
        Self::load(path, |key| std::env::var(key).ok())
    }

    fn apply_env<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = env(ENV_BIND) {
            self.server.bind_addr = bind;
        }
        if let Some(data) = env(ENV_DATA) {
            self.storage.path = (!data.is_empty()).then(|| PathBuf::from(data));
        }
        if let Some(role) = env(ENV_SUPER_ROLE) {
            if role.is_empty() {
                return Err(Error::InvalidValue {
                    key: ENV_SUPER_ROLE.to_string(),
                    message: "must not be empty".to_string(),
                });
            }
            self.rbac.super_role = RoleName::from(role);
        }
        Ok(())
    }

    /// The parsed listen address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind_addr
            .parse()
            .map_err(|e: std::net::AddrParseError| Error::InvalidValue {
                key: "server.bind_addr".to_string(),
                message: e.to_string(),
            })
    }
}
