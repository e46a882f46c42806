//! Route access requirements.
//!
//! A route declares what it needs as a [`Requirement`], either built in code
//! or parsed from a metadata string:
//!
//! | string                        | meaning                                   |
//! |-------------------------------|-------------------------------------------|
//! | `auth`                        | any authenticated principal               |
//! | `role:admin\|editor`          | holds any listed role                     |
//! | `permission:edit\|publish`    | holds any listed permission               |
//! | `role_or_permission:a\|b`     | each item tried as a role and a permission |
//! | `role_or_permission:a;x\|y`   | role `a`, or permission `x` or `y`         |
//! | `can:view_any_users`          | the gate's `can`, super role included     |
//!
//! [`Requirement`]'s `Display` prints these forms, and the printed string
//! parses back to an equal requirement.
//!
//! Role and permission requirements are literal membership checks and do
//! not honour the super-role bypass; use `can:` for that.

use std::fmt;
use std::str::FromStr;
use warden_acl::Gate;
use warden_core::{PermissionName, PrincipalId, Result, RoleName};

/// What a principal must satisfy to reach a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Any authenticated principal.
    Authenticated,
    /// Any of these roles.
    Role(Vec<RoleName>),
    /// Any of these permissions.
    Permission(Vec<PermissionName>),
    /// Any of these roles, or any of these permissions.
    RoleOrPermission {
        /// Accepted roles.
        roles: Vec<RoleName>,
        /// Accepted permissions.
        permissions: Vec<PermissionName>,
    },
    /// The named ability, via [`Gate::can`].
    Ability(String),
}

impl Requirement {
    /// Requires one role.
    pub fn role(name: impl Into<RoleName>) -> Self {
        Requirement::Role(vec![name.into()])
    }

    /// Requires one permission.
    pub fn permission(name: impl Into<PermissionName>) -> Self {
        Requirement::Permission(vec![name.into()])
    }

    /// Requires a role or a permission.
    pub fn either(role: impl Into<RoleName>, permission: impl Into<PermissionName>) -> Self {
        Requirement::RoleOrPermission {
            roles: vec![role.into()],
            permissions: vec![permission.into()],
        }
    }

    /// Requires an ability.
    pub fn can(ability: impl Into<String>) -> Self {
        Requirement::Ability(ability.into())
    }

    /// Decides the requirement for `principal`.
    pub async fn is_met(&self, gate: &Gate, principal: PrincipalId) -> Result<bool> {
        match self {
            Requirement::Authenticated => Ok(true),
            Requirement::Role(roles) => gate.has_any_role(principal, roles).await,
            Requirement::Permission(perms) => gate.has_any_permission(principal, perms).await,
            Requirement::RoleOrPermission { roles, permissions } => {
                if gate.has_any_role(principal, roles).await? {
                    return Ok(true);
                }
                gate.has_any_permission(principal, permissions).await
            }
            Requirement::Ability(ability) => gate.can(principal, ability).await,
        }
    }
}

fn join<T: AsRef<str>>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.as_ref())
        .collect::<Vec<_>>()
        .join("|")
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Authenticated => f.write_str("auth"),
            Requirement::Role(roles) => write!(f, "role:{}", join(roles)),
            Requirement::Permission(perms) => write!(f, "permission:{}", join(perms)),
            Requirement::RoleOrPermission { roles, permissions } => {
                let same = roles.len() == permissions.len()
                    && roles
                        .iter()
                        .zip(permissions)
                        .all(|(r, p)| r.as_str() == p.as_str());
                if same {
                    write!(f, "role_or_permission:{}", join(roles))
                } else {
                    write!(
                        f,
                        "role_or_permission:{};{}",
                        join(roles),
                        join(permissions)
                    )
                }
            }
            Requirement::Ability(ability) => write!(f, "can:{ability}"),
        }
    }
}

/// A requirement string that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseRequirementError {
    /// The prefix before `:` is not recognised.
    #[error("unknown requirement kind '{0}'")]
    UnknownKind(String),
    /// No names after the `:`, or an empty name between pipes.
    #[error("requirement '{0}' has an empty name")]
    EmptyName(String),
}

fn split_names(source: &str, list: &str) -> std::result::Result<Vec<String>, ParseRequirementError> {
    let names: Vec<String> = list.split('|').map(str::to_string).collect();
    if names.iter().any(String::is_empty) {
        return Err(ParseRequirementError::EmptyName(source.to_string()));
    }
    Ok(names)
}

impl FromStr for Requirement {
    type Err = ParseRequirementError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s == "auth" {
            return Ok(Requirement::Authenticated);
        }
        let Some((kind, list)) = s.split_once(':') else {
            return Err(ParseRequirementError::UnknownKind(s.to_string()));
        };
        match kind {
            "role" => Ok(Requirement::Role(
                split_names(s, list)?.into_iter().map(RoleName::from).collect(),
            )),
            "permission" => Ok(Requirement::Permission(
                split_names(s, list)?
                    .into_iter()
                    .map(PermissionName::from)
                    .collect(),
            )),
            "role_or_permission" => match list.split_once(';') {
                Some((roles, permissions)) => Ok(Requirement::RoleOrPermission {
                    roles: split_names(s, roles)?
                        .into_iter()
                        .map(RoleName::from)
                        .collect(),
                    permissions: split_names(s, permissions)?
                        .into_iter()
                        .map(PermissionName::from)
                        .collect(),
                }),
                None => {
                    let names = split_names(s, list)?;
                    Ok(Requirement::RoleOrPermission {
                        roles: names.iter().cloned().map(RoleName::from).collect(),
                        permissions: names.into_iter().map(PermissionName::from).collect(),
                    })
                }
            },
            "can" if !list.is_empty() => Ok(Requirement::Ability(list.to_string())),
            "can" => Err(ParseRequirementError::EmptyName(s.to_string())),
            other => Err(ParseRequirementError::UnknownKind(other.to_string())),
        }
    }
}
