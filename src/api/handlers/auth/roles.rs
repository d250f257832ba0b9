//! Hierarchical role policy.
//!
//! Roles form a total order; a principal satisfies a requirement when its
//! rank is at least the required rank. Role strings that are not in the
//! hierarchy rank lowest, so an unrecognized role never grants elevated
//! access.

use super::principal::{AuthError, Principal};

/// Requirement levels an endpoint can demand, lowest to highest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Customer,
    VenueStaff,
    VenueAdmin,
    SuperAdmin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::VenueStaff => "venue_staff",
            Self::VenueAdmin => "venue_admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Customer => 0,
            Self::VenueStaff => 1,
            Self::VenueAdmin => 2,
            Self::SuperAdmin => 3,
        }
    }
}

/// Rank of a stored role string; unknown roles rank 0.
#[must_use]
pub fn role_rank(role: &str) -> u8 {
    match role {
        "venue_staff" => 1,
        "venue_admin" => 2,
        "super_admin" => 3,
        // "customer" and anything unrecognized
        _ => 0,
    }
}

/// Require the principal's role to satisfy `minimum`, passing the principal
/// through unchanged so the check composes with identity resolution.
///
/// # Errors
/// Returns `AuthError::InsufficientPermissions` when the principal's rank is
/// below the required rank.
pub fn require_role(principal: Principal, minimum: Role) -> Result<Principal, AuthError> {
    if role_rank(&principal.role) < minimum.rank() {
        return Err(AuthError::InsufficientPermissions);
    }
    Ok(principal)
}
