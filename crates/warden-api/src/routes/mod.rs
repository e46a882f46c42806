//! Route handlers, one module per resource.

pub(crate) mod health;
pub(crate) mod permissions;
pub(crate) mod posts;
pub(crate) mod roles;
pub(crate) mod session;
pub(crate) mod users;
