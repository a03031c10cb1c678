//! Staff identification for incoming calls.
//!
//! Authentication happens upstream; the gateway forwards the caller's role and staff id in two
//! headers, which are turned into the core's [`Actor`] here.

use bedflow_core::{Actor, StaffRole};

pub const ROLE_HEADER: &str = "x-staff-role";
pub const STAFF_ID_HEADER: &str = "x-staff-id";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    #[error("unknown staff role: '{0}'")]
    UnknownRole(String),
}

/// Builds the calling [`Actor`] from the raw header values.
///
/// # Errors
///
/// Returns `AuthError::MissingHeader` if either value is absent or blank, and
/// `AuthError::UnknownRole` if the role is not one of the staff roles.
pub fn actor_from_headers(role: Option<&str>, staff_id: Option<&str>) -> Result<Actor, AuthError> {
    let role = role
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or(AuthError::MissingHeader(ROLE_HEADER))?;
    let staff_id = staff_id
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(AuthError::MissingHeader(STAFF_ID_HEADER))?;
    let role: StaffRole = role
        .parse()
        .map_err(|_| AuthError::UnknownRole(role.to_owned()))?;
    Ok(Actor::new(staff_id, role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_from_headers() {
        let actor = actor_from_headers(Some("icu_manager"), Some(" icu-7 ")).unwrap();
        assert_eq!(actor.role, StaffRole::IcuManager);
        assert_eq!(actor.staff_id, "icu-7");
    }

    #[test]
    fn test_missing_or_unknown_headers_rejected() {
        assert_eq!(
            actor_from_headers(None, Some("x")),
            Err(AuthError::MissingHeader(ROLE_HEADER))
        );
        assert_eq!(
            actor_from_headers(Some("ER_STAFF"), Some("  ")),
            Err(AuthError::MissingHeader(STAFF_ID_HEADER))
        );
        assert_eq!(
            actor_from_headers(Some("JANITOR"), Some("j-1")),
            Err(AuthError::UnknownRole("JANITOR".into()))
        );
    }
}
