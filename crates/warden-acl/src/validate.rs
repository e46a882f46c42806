//! Field rules for administrative input.

use warden_core::{Error, PermissionName, Result, RoleName};

/// Longest accepted display name or email, in characters.
pub const MAX_FIELD_CHARS: usize = 255;

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_CHARS: usize = 8;

pub(crate) fn display_name(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::validation_field("name", "is required"));
    }
    if value.chars().count() > MAX_FIELD_CHARS {
        return Err(Error::validation_field(
            "name",
            format!("may not be greater than {MAX_FIELD_CHARS} characters"),
        ));
    }
    Ok(())
}

pub(crate) fn email(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::validation_field("email", "is required"));
    }
    if !value.contains('@') {
        return Err(Error::validation_field(
            "email",
            "must be a valid email address",
        ));
    }
    if value.chars().count() > MAX_FIELD_CHARS {
        return Err(Error::validation_field(
            "email",
            format!("may not be greater than {MAX_FIELD_CHARS} characters"),
        ));
    }
    Ok(())
}

pub(crate) fn password(value: &str) -> Result<()> {
    if value.chars().count() < MIN_PASSWORD_CHARS {
        return Err(Error::validation_field(
            "password",
            format!("must be at least {MIN_PASSWORD_CHARS} characters"),
        ));
    }
    Ok(())
}

pub(crate) fn role_name(name: &RoleName) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation_field("name", "is required"));
    }
    Ok(())
}

pub(crate) fn permission_name(name: &PermissionName) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation_field("name", "is required"));
    }
    Ok(())
}
