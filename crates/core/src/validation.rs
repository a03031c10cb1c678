//! Input validation utilities.
//!
//! Admission input is checked here once, before any store access, so operations can work with
//! already-normalised values.

use crate::constants::{
    DEFAULT_DEPARTMENT, DEFAULT_EMERGENCY_REASON, EMERGENCY_DEPARTMENT, MAX_AGE, MAX_NAME_LEN,
    MAX_STAY_DAYS,
};
use crate::error::{AllocationError, AllocationResult};
use crate::patient::Demographics;
use bedflow_types::NonEmptyText;

/// How strictly demographics are checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intake {
    /// Planned admission by ward staff: name, age and reason are required.
    Ward,
    /// Emergency walk-in: only a name is required; the rest is defaulted.
    WalkIn,
}

/// Demographics that passed validation, with defaults applied.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidDemographics {
    pub name: NonEmptyText,
    pub department: String,
    pub reason_for_admission: String,
    pub demographics: Demographics,
}

/// Validates admission demographics.
///
/// # Arguments
///
/// * `demographics` - The submitted demographics.
/// * `intake` - Whether this is a ward admission or an emergency walk-in.
///
/// # Errors
///
/// Returns `AllocationError::Validation` naming the first field that failed.
pub fn validate_demographics(
    demographics: &Demographics,
    intake: Intake,
) -> AllocationResult<ValidDemographics> {
    let name = NonEmptyText::new(&demographics.name)
        .map_err(|_| AllocationError::Validation("patient name is required".into()))?;
    if name.as_str().chars().count() > MAX_NAME_LEN {
        return Err(AllocationError::Validation(format!(
            "patient name exceeds maximum length of {MAX_NAME_LEN} characters"
        )));
    }

    match demographics.age {
        Some(age) if age > MAX_AGE => {
            return Err(AllocationError::Validation(format!(
                "age must be at most {MAX_AGE}, got {age}"
            )))
        }
        None if intake == Intake::Ward => {
            return Err(AllocationError::Validation("age is required".into()))
        }
        _ => {}
    }

    if let Some(days) = demographics.estimated_stay_days {
        if days > MAX_STAY_DAYS {
            return Err(AllocationError::Validation(format!(
                "estimated stay must be at most {MAX_STAY_DAYS} days, got {days}"
            )));
        }
    }

    let reason = non_blank(demographics.reason_for_admission.as_deref());
    let reason_for_admission = match (reason, intake) {
        (Some(r), _) => r,
        (None, Intake::WalkIn) => DEFAULT_EMERGENCY_REASON.to_owned(),
        (None, Intake::Ward) => {
            return Err(AllocationError::Validation(
                "reason for admission is required".into(),
            ))
        }
    };

    let department = non_blank(demographics.department.as_deref()).unwrap_or_else(|| {
        match intake {
            Intake::Ward => DEFAULT_DEPARTMENT,
            Intake::WalkIn => EMERGENCY_DEPARTMENT,
        }
        .to_owned()
    });

    Ok(ValidDemographics {
        name,
        department,
        reason_for_admission,
        demographics: demographics.clone(),
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
