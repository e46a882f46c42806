//! Stable identifiers for stored entities.
//!
//! Ids are sequential per table and assigned by the store; they are never
//! reused. Each entity gets its own newtype so a role id cannot be passed
//! where a permission id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw id.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Returns the raw id.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    };
}

define_id!(
    /// Identifier of a [`Principal`](crate::Principal).
    PrincipalId
);
define_id!(
    /// Identifier of a [`Role`](crate::Role).
    RoleId
);
define_id!(
    /// Identifier of a [`Permission`](crate::Permission).
    PermissionId
);
define_id!(
    /// Identifier of a [`Post`](crate::Post).
    PostId
);
