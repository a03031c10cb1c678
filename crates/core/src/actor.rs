//! The already-authenticated staff member on whose behalf an operation runs.
//!
//! Authentication itself happens outside the core; callers hand in an [`Actor`] and the
//! operations check its role against the roles allowed for the transition.

use crate::error::{AllocationError, AllocationResult, UnknownVariant};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffRole {
    HospitalAdmin,
    IcuManager,
    ErStaff,
    WardStaff,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::HospitalAdmin => "HOSPITAL_ADMIN",
            StaffRole::IcuManager => "ICU_MANAGER",
            StaffRole::ErStaff => "ER_STAFF",
            StaffRole::WardStaff => "WARD_STAFF",
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StaffRole {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HOSPITAL_ADMIN" => Ok(StaffRole::HospitalAdmin),
            "ICU_MANAGER" => Ok(StaffRole::IcuManager),
            "ER_STAFF" => Ok(StaffRole::ErStaff),
            "WARD_STAFF" => Ok(StaffRole::WardStaff),
            _ => Err(UnknownVariant {
                kind: "staff role",
                value: s.to_owned(),
            }),
        }
    }
}

/// Roles allowed to approve, reserve for, or reject a bed request.
pub const APPROVER_ROLES: &[StaffRole] = &[StaffRole::HospitalAdmin, StaffRole::IcuManager];

/// Roles allowed to cancel a request they did not file themselves.
pub const CANCEL_ROLES: &[StaffRole] = &[
    StaffRole::HospitalAdmin,
    StaffRole::IcuManager,
    StaffRole::ErStaff,
];

/// Roles allowed to file emergency-mode requests and check emergency availability.
pub const EMERGENCY_INTAKE_ROLES: &[StaffRole] = &[StaffRole::ErStaff, StaffRole::HospitalAdmin];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub staff_id: String,
    pub role: StaffRole,
}

impl Actor {
    pub fn new(staff_id: impl Into<String>, role: StaffRole) -> Self {
        Self {
            staff_id: staff_id.into(),
            role,
        }
    }

    /// Fails with [`AllocationError::Forbidden`] unless this actor holds one of `allowed`.
    pub fn require(&self, allowed: &[StaffRole], action: &'static str) -> AllocationResult<()> {
        if allowed.contains(&self.role) {
            return Ok(());
        }
        tracing::warn!(staff = %self.staff_id, role = %self.role, action, "operation refused");
        Err(AllocationError::Forbidden {
            role: self.role,
            action,
        })
    }
}
