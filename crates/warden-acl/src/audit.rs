//! Audit trail of committed mutations.
//!
//! Sinks are called after the write and the cache invalidation have both
//! succeeded. Recording is synchronous and must not block; a sink that
//! needs I/O should hand the event off to its own task.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use warden_core::{Grantee, PermissionId, PrincipalId, RoleId, SyncDelta};

/// What was changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
#[non_exhaustive]
pub enum AuditAction {
    /// Roles attached to a principal.
    RolesAssigned {
        /// Target principal.
        principal: PrincipalId,
        /// Rows added.
        added: usize,
    },
    /// Roles detached from a principal.
    RolesRemoved {
        /// Target principal.
        principal: PrincipalId,
        /// Rows removed.
        removed: usize,
    },
    /// A principal's roles replaced.
    RolesSynced {
        /// Target principal.
        principal: PrincipalId,
        /// Net change.
        delta: SyncDelta,
    },
    /// Permissions granted.
    PermissionsGiven {
        /// Grant target.
        grantee: Grantee,
        /// Rows added.
        added: usize,
    },
    /// Permissions revoked.
    PermissionsRevoked {
        /// Grant target.
        grantee: Grantee,
        /// Rows removed.
        removed: usize,
    },
    /// A grantee's permissions replaced.
    PermissionsSynced {
        /// Grant target.
        grantee: Grantee,
        /// Net change.
        delta: SyncDelta,
    },
    /// The roles holding a permission replaced.
    PermissionRolesSynced {
        /// The permission.
        permission: PermissionId,
        /// Net change.
        delta: SyncDelta,
    },
    /// Role created.
    RoleCreated {
        /// New role.
        role: RoleId,
    },
    /// Role renamed or edited.
    RoleUpdated {
        /// Edited role.
        role: RoleId,
    },
    /// Role deleted.
    RoleDeleted {
        /// Deleted role.
        role: RoleId,
    },
    /// Permission created.
    PermissionCreated {
        /// New permission.
        permission: PermissionId,
    },
    /// Permission renamed or edited.
    PermissionUpdated {
        /// Edited permission.
        permission: PermissionId,
    },
    /// Permission deleted.
    PermissionDeleted {
        /// Deleted permission.
        permission: PermissionId,
    },
    /// Principal created.
    PrincipalCreated {
        /// New principal.
        principal: PrincipalId,
    },
    /// Principal profile changed.
    PrincipalUpdated {
        /// Edited principal.
        principal: PrincipalId,
    },
    /// Principal deleted.
    PrincipalDeleted {
        /// Deleted principal.
        principal: PrincipalId,
    },
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditAction::RolesAssigned { principal, added } => {
                write!(f, "assigned {added} role(s) to principal {principal}")
            }
            AuditAction::RolesRemoved { principal, removed } => {
                write!(f, "removed {removed} role(s) from principal {principal}")
            }
            AuditAction::RolesSynced { principal, delta } => write!(
                f,
                "synced roles of principal {principal} (+{} -{})",
                delta.added, delta.removed
            ),
            AuditAction::PermissionsGiven { grantee, added } => {
                write!(f, "gave {added} permission(s) to {grantee}")
            }
            AuditAction::PermissionsRevoked { grantee, removed } => {
                write!(f, "revoked {removed} permission(s) from {grantee}")
            }
            AuditAction::PermissionsSynced { grantee, delta } => write!(
                f,
                "synced permissions of {grantee} (+{} -{})",
                delta.added, delta.removed
            ),
            AuditAction::PermissionRolesSynced { permission, delta } => write!(
                f,
                "synced roles holding permission {permission} (+{} -{})",
                delta.added, delta.removed
            ),
            AuditAction::RoleCreated { role } => write!(f, "created role {role}"),
            AuditAction::RoleUpdated { role } => write!(f, "updated role {role}"),
            AuditAction::RoleDeleted { role } => write!(f, "deleted role {role}"),
            AuditAction::PermissionCreated { permission } => {
                write!(f, "created permission {permission}")
            }
            AuditAction::PermissionUpdated { permission } => {
                write!(f, "updated permission {permission}")
            }
            AuditAction::PermissionDeleted { permission } => {
                write!(f, "deleted permission {permission}")
            }
            AuditAction::PrincipalCreated { principal } => {
                write!(f, "created principal {principal}")
            }
            AuditAction::PrincipalUpdated { principal } => {
                write!(f, "updated principal {principal}")
            }
            AuditAction::PrincipalDeleted { principal } => {
                write!(f, "deleted principal {principal}")
            }
        }
    }
}

/// One committed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    /// Principal that performed the change; `None` for system actions such
    /// as seeding.
    pub actor: Option<PrincipalId>,
    /// The change.
    #[serde(flatten)]
    pub action: AuditAction,
    /// Commit time.
    pub at: DateTime<Utc>,
}

/// Receiver for audit events.
pub trait AuditSink: Send + Sync {
    /// Records an event. Must not block.
    fn record(&self, event: &AuditEvent);
}

/// Writes events through the `log` facade at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn record(&self, event: &AuditEvent) {
        match event.actor {
            Some(actor) => log::info!(target: "warden::audit", "principal {actor} {}", event.action),
            None => log::info!(target: "warden::audit", "system {}", event.action),
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out the events recorded so far.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
