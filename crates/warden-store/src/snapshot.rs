//! JSON snapshot persistence for [`InMemoryStore`](crate::InMemoryStore).
//!
//! The whole table set is written as one pretty-printed JSON document.
//! Writes go to a hidden temp file next to the target and are renamed into
//! place, so a crash mid-write leaves the previous snapshot intact.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use warden_core::{
    Error, Permission, PermissionId, Post, Principal, PrincipalId, Result, Role, RoleId,
};

use crate::tables::{Sequences, Tables};

const FORMAT_VERSION: u32 = 1;

/// On-disk form of the tables. Maps become vectors so ids stay plain numbers.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    version: u32,
    sequences: Sequences,
    principals: Vec<Principal>,
    roles: Vec<Role>,
    permissions: Vec<Permission>,
    posts: Vec<Post>,
    principal_roles: Vec<(PrincipalId, RoleId)>,
    role_permissions: Vec<(RoleId, PermissionId)>,
    principal_permissions: Vec<(PrincipalId, PermissionId)>,
}

impl From<&Tables> for Snapshot {
    fn from(t: &Tables) -> Self {
        Self {
            version: FORMAT_VERSION,
            sequences: t.sequences,
            principals: t.principals.values().cloned().collect(),
            roles: t.roles.values().cloned().collect(),
            permissions: t.permissions.values().cloned().collect(),
            posts: t.posts.values().cloned().collect(),
            principal_roles: t.principal_roles.iter().copied().collect(),
            role_permissions: t.role_permissions.iter().copied().collect(),
            principal_permissions: t.principal_permissions.iter().copied().collect(),
        }
    }
}

impl Snapshot {
    /// Rebuilds tables, rejecting association rows that point nowhere.
    pub(crate) fn into_tables(self) -> Result<Tables> {
        if self.version != FORMAT_VERSION {
            return Err(Error::storage(format!(
                "unsupported snapshot version {} (expected {FORMAT_VERSION})",
                self.version
            )));
        }

        let mut t = Tables {
            sequences: self.sequences,
            ..Tables::default()
        };
        t.principals = self.principals.into_iter().map(|p| (p.id, p)).collect();
        t.roles = self.roles.into_iter().map(|r| (r.id, r)).collect();
        t.permissions = self.permissions.into_iter().map(|p| (p.id, p)).collect();
        t.posts = self.posts.into_iter().map(|p| (p.id, p)).collect();

        for (pid, rid) in self.principal_roles {
            if !t.principals.contains_key(&pid) || !t.roles.contains_key(&rid) {
                return Err(dangling("principal_roles", pid, rid));
            }
            t.principal_roles.insert((pid, rid));
        }
        for (rid, perm) in self.role_permissions {
            if !t.roles.contains_key(&rid) || !t.permissions.contains_key(&perm) {
                return Err(dangling("role_permissions", rid, perm));
            }
            t.role_permissions.insert((rid, perm));
        }
        for (pid, perm) in self.principal_permissions {
            if !t.principals.contains_key(&pid) || !t.permissions.contains_key(&perm) {
                return Err(dangling("principal_permissions", pid, perm));
            }
            t.principal_permissions.insert((pid, perm));
        }

        // Never hand out an id that is already present, even if the stored
        // counters were edited by hand.
        t.sequences.raise_to(
            t.principals.keys().next_back().map_or(0, |id| id.get()),
            t.roles.keys().next_back().map_or(0, |id| id.get()),
            t.permissions.keys().next_back().map_or(0, |id| id.get()),
            t.posts.keys().next_back().map_or(0, |id| id.get()),
        );
        Ok(t)
    }
}

fn dangling(table: &str, a: impl std::fmt::Display, b: impl std::fmt::Display) -> Error {
    Error::storage(format!("snapshot row ({a}, {b}) in {table} references a missing record"))
}

/// Location of a snapshot on disk.
#[derive(Debug, Clone)]
pub(crate) struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "warden".to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }

    /// Reads the snapshot, or `None` when the file does not exist yet.
    pub(crate) async fn load(&self) -> Result<Option<Tables>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        snapshot.into_tables().map(Some)
    }

    /// Writes the tables atomically (temp file, then rename).
    pub(crate) async fn save(&self, tables: &Tables) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(&Snapshot::from(tables))?;
        let temp = self.temp_path();
        fs::write(&temp, &json)
            .await
            .map_err(|e| Error::storage_with_source(format!("writing {}", temp.display()), e))?;
        fs::rename(&temp, &self.path).await.map_err(|e| {
            Error::storage_with_source(format!("replacing {}", self.path.display()), e)
        })?;
        Ok(())
    }
}
