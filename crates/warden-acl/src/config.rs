//! Engine configuration.

use serde::{Deserialize, Serialize};
use warden_core::RoleName;

/// Default name of the bypass role.
pub const DEFAULT_SUPER_ROLE: &str = "super_admin";

/// Settings for the authorization engine, the `[rbac]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RbacConfig {
    /// Holders of this role pass every `can` check.
    pub super_role: RoleName,
    /// Memoize resolved grants per principal. Turning this off recomputes
    /// on every check, which is only useful for debugging.
    pub cache_enabled: bool,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            super_role: RoleName::new(DEFAULT_SUPER_ROLE),
            cache_enabled: true,
        }
    }
}

impl RbacConfig {
    /// Sets the super role name.
    pub fn with_super_role(mut self, role: impl Into<RoleName>) -> Self {
        self.super_role = role.into();
        self
    }

    /// Enables or disables the grant cache.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }
}
