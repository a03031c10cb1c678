//! Patient records.
//!
//! Patients are created on admission and never deleted; after discharge the record keeps its
//! last `assigned_bed` as history.

use crate::error::UnknownVariant;
use bedflow_types::{BedNumber, NonEmptyText};
use bedflow_uuid::{PatientCode, RecordUuid};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(UnknownVariant {
                kind: "gender",
                value: s.to_owned(),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl PatientPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientPriority::Low => "low",
            PatientPriority::Medium => "medium",
            PatientPriority::High => "high",
            PatientPriority::Critical => "critical",
        }
    }
}

impl FromStr for PatientPriority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(PatientPriority::Low),
            "medium" => Ok(PatientPriority::Medium),
            "high" => Ok(PatientPriority::High),
            "critical" => Ok(PatientPriority::Critical),
            _ => Err(UnknownVariant {
                kind: "patient priority",
                value: s.to_owned(),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientStatus {
    Admitted,
    Discharged,
    Transferred,
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PatientStatus::Admitted => "admitted",
            PatientStatus::Discharged => "discharged",
            PatientStatus::Transferred => "transferred",
        })
    }
}

/// Admission details supplied by staff, or captured on an emergency walk-in request.
///
/// Only `name` is mandatory at the type level; [`validate_demographics`] applies the
/// admission rules.
///
/// [`validate_demographics`]: crate::validation::validate_demographics
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub name: String,
    /// `None` when unknown; `Some(0)` is a newborn.
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub reason_for_admission: Option<String>,
    #[serde(default)]
    pub priority: PatientPriority,
    #[serde(default)]
    pub estimated_stay_days: Option<u32>,
    /// Explicit expected discharge; wins over `estimated_stay_days`.
    #[serde(default)]
    pub expected_discharge: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: RecordUuid,
    pub code: PatientCode,
    pub name: NonEmptyText,
    #[serde(default)]
    pub age: Option<u8>,
    pub gender: Gender,
    pub department: String,
    pub reason_for_admission: String,
    pub priority: PatientPriority,
    pub status: PatientStatus,
    pub assigned_bed: Option<BedNumber>,
    pub admitted_at: DateTime<Utc>,
    #[serde(default)]
    pub discharged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub estimated_stay_days: Option<u32>,
    #[serde(default)]
    pub expected_discharge: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: u64,
}

impl Patient {
    /// Builds a not-yet-admitted patient record from validated demographics.
    ///
    /// The record starts as `discharged` with no bed; [`apply_admission`] is the only way to
    /// make it `admitted`, so the bed side is always updated alongside it.
    ///
    /// [`apply_admission`]: crate::repositories::admissions::apply_admission
    pub(crate) fn register(
        code: PatientCode,
        name: NonEmptyText,
        demographics: Demographics,
        department: String,
        reason_for_admission: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RecordUuid::new(),
            code,
            name,
            age: demographics.age,
            gender: demographics.gender,
            department,
            reason_for_admission,
            priority: demographics.priority,
            status: PatientStatus::Discharged,
            assigned_bed: None,
            admitted_at: now,
            discharged_at: None,
            estimated_stay_days: demographics.estimated_stay_days,
            expected_discharge: demographics.expected_discharge,
            version: 0,
        }
    }

    pub fn is_admitted(&self) -> bool {
        self.status == PatientStatus::Admitted
    }

    /// `admitted_at + estimated_stay_days`, unless an explicit date was supplied.
    pub(crate) fn refresh_expected_discharge(&mut self) {
        if let Some(days) = self.estimated_stay_days.filter(|d| *d > 0) {
            if self.expected_discharge.is_none() {
                self.expected_discharge = Some(self.admitted_at + Duration::days(i64::from(days)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(days: Option<u32>, explicit: Option<DateTime<Utc>>) -> Patient {
        let demographics = Demographics {
            name: "Ada".into(),
            estimated_stay_days: days,
            expected_discharge: explicit,
            ..Demographics::default()
        };
        Patient::register(
            PatientCode::parse("AB123").unwrap(),
            NonEmptyText::new("Ada").unwrap(),
            demographics,
            "General".into(),
            "Observation".into(),
            Utc::now(),
        )
    }

    #[test]
    fn test_expected_discharge_derived_from_stay() {
        let mut p = patient(Some(3), None);
        p.refresh_expected_discharge();

        assert_eq!(p.expected_discharge, Some(p.admitted_at + Duration::days(3)));
    }

    #[test]
    fn test_explicit_expected_discharge_is_kept() {
        let explicit = Utc::now() + Duration::days(10);
        let mut p = patient(Some(3), Some(explicit));
        p.refresh_expected_discharge();

        assert_eq!(p.expected_discharge, Some(explicit));
    }

    #[test]
    fn test_zero_day_stay_sets_nothing() {
        let mut p = patient(Some(0), None);
        p.refresh_expected_discharge();

        assert_eq!(p.expected_discharge, None);
    }

    #[test]
    fn test_demographics_defaults_from_minimal_json() {
        let d: Demographics = serde_json::from_str(r#"{"name":"Walk In"}"#).unwrap();

        assert_eq!(d.gender, Gender::Other);
        assert_eq!(d.priority, PatientPriority::Medium);
        assert_eq!(d.age, None);
    }
}
