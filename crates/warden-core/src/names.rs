//! Role and permission names.
//!
//! Names are exact, case-sensitive strings. No trimming, case folding, or
//! wildcard segmentation is applied: `"Test Permission"` and
//! `"test permission"` are different capabilities. The two newtypes keep
//! role slots and permission slots from being mixed up at compile time.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Name of a role, e.g. `"editor"` or `"super_admin"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(String);

/// Name of a permission (a capability), e.g. `"create_posts"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionName(String);

macro_rules! name_impls {
    ($name:ident) => {
        impl $name {
            /// Creates a name from any string, verbatim.
            pub fn new<S: Into<String>>(name: S) -> Self {
                Self(name.into())
            }

            /// Returns the name as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` if the name is the empty string.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// Converts into the inner string.
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

name_impls!(RoleName);
name_impls!(PermissionName);

/// Collects string-like values into a list of names.
///
/// ```
/// use warden_core::{names, RoleName};
///
/// let roles: Vec<RoleName> = names(["admin", "editor"]);
/// assert_eq!(roles[1].as_str(), "editor");
/// ```
pub fn names<N, I, S>(items: I) -> Vec<N>
where
    N: From<String>,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(|s| N::from(s.into())).collect()
}
