//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the core services.
//! The helpers below parse raw environment values but never read the environment themselves, so
//! binaries and tests control exactly what the services see.

use crate::bed::{BedSpec, BedStatus};
use crate::constants::{
    ALERT_DEDUP_MINUTES, DEFAULT_CLEANING_MINUTES, DEFAULT_OVERFLOW_WARD, DEFAULT_WARD_PRIORITY,
    MAX_CLEANING_MINUTES, PATIENT_CODE_ATTEMPTS, RECOMMENDATION_LIMIT,
};
use crate::error::{AllocationError, AllocationResult};
use bedflow_types::WardName;
use chrono::Duration;
use std::collections::HashSet;
use std::path::Path;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    overflow_ward: WardName,
    ward_priority: Vec<WardName>,
    cleaning_duration: Duration,
    recommendation_limit: usize,
    patient_code_attempts: usize,
    alert_window: Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `AllocationError::Validation` if the ward priority list is empty or the cleaning
    /// duration is outside `1..=1440` minutes.
    pub fn new(
        overflow_ward: WardName,
        ward_priority: Vec<WardName>,
        cleaning_minutes: i64,
    ) -> AllocationResult<Self> {
        if ward_priority.is_empty() {
            return Err(AllocationError::Validation(
                "ward priority list cannot be empty".into(),
            ));
        }
        if !(1..=MAX_CLEANING_MINUTES).contains(&cleaning_minutes) {
            return Err(AllocationError::Validation(format!(
                "cleaning duration must be between 1 and {MAX_CLEANING_MINUTES} minutes, got {cleaning_minutes}"
            )));
        }

        Ok(Self {
            overflow_ward,
            ward_priority,
            cleaning_duration: Duration::minutes(cleaning_minutes),
            recommendation_limit: RECOMMENDATION_LIMIT,
            patient_code_attempts: PATIENT_CODE_ATTEMPTS,
            alert_window: Duration::minutes(ALERT_DEDUP_MINUTES),
        })
    }

    pub fn overflow_ward(&self) -> &WardName {
        &self.overflow_ward
    }

    pub fn ward_priority(&self) -> &[WardName] {
        &self.ward_priority
    }

    pub fn cleaning_duration(&self) -> Duration {
        self.cleaning_duration
    }

    pub fn recommendation_limit(&self) -> usize {
        self.recommendation_limit
    }

    pub fn patient_code_attempts(&self) -> usize {
        self.patient_code_attempts
    }

    pub fn alert_window(&self) -> Duration {
        self.alert_window
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        let ward = |name: &str| WardName::new(name).unwrap_or_else(|_| unreachable!());
        Self {
            overflow_ward: ward(DEFAULT_OVERFLOW_WARD),
            ward_priority: DEFAULT_WARD_PRIORITY.iter().map(|w| ward(w)).collect(),
            cleaning_duration: Duration::minutes(DEFAULT_CLEANING_MINUTES),
            recommendation_limit: RECOMMENDATION_LIMIT,
            patient_code_attempts: PATIENT_CODE_ATTEMPTS,
            alert_window: Duration::minutes(ALERT_DEDUP_MINUTES),
        }
    }
}

/// Parse the overflow ward from an optional value, defaulting to `Emergency`.
pub fn overflow_ward_from_env_value(value: Option<String>) -> AllocationResult<WardName> {
    let value = value.filter(|v| !v.trim().is_empty());
    Ok(WardName::new(
        value.as_deref().unwrap_or(DEFAULT_OVERFLOW_WARD),
    )?)
}

/// Parse a comma separated ward priority list, e.g. `Emergency,ICU,General Ward`.
///
/// Blank entries are skipped and duplicates (case-insensitive) rejected. `None` or an empty
/// value yields the default order.
pub fn ward_priority_from_env_value(value: Option<String>) -> AllocationResult<Vec<WardName>> {
    let Some(raw) = value.filter(|v| !v.trim().is_empty()) else {
        return Ok(CoreConfig::default().ward_priority);
    };

    let mut seen = HashSet::new();
    let mut wards = Vec::new();
    for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let ward = WardName::new(part)?;
        if !seen.insert(ward.as_str().to_ascii_lowercase()) {
            return Err(AllocationError::Validation(format!(
                "ward '{ward}' appears more than once in the priority list"
            )));
        }
        wards.push(ward);
    }
    Ok(wards)
}

/// Parse the cleaning duration in minutes, defaulting to 30.
pub fn cleaning_minutes_from_env_value(value: Option<String>) -> AllocationResult<i64> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    match value {
        None => Ok(DEFAULT_CLEANING_MINUTES),
        Some(v) => v.parse::<i64>().map_err(|e| {
            AllocationError::Validation(format!("invalid cleaning duration '{v}': {e}"))
        }),
    }
}

/// Load bed provisioning entries from a YAML seed file.
///
/// The file is a list of [`BedSpec`] entries:
///
/// ```yaml
/// - number: ICU-001
///   ward: ICU
///   floor: 2
///   equipment: [Ventilator]
/// ```
///
/// # Errors
///
/// Fails on unreadable or malformed files, duplicate bed numbers, or an initial status other
/// than `available`/`maintenance`.
pub fn load_bed_seed(path: &Path) -> AllocationResult<Vec<BedSpec>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AllocationError::Validation(format!("cannot read seed file {}: {e}", path.display()))
    })?;
    let specs: Vec<BedSpec> = serde_yaml::from_str(&raw).map_err(|e| {
        AllocationError::Validation(format!("invalid seed file {}: {e}", path.display()))
    })?;
    validate_bed_specs(&specs)?;
    Ok(specs)
}

pub fn validate_bed_specs(specs: &[BedSpec]) -> AllocationResult<()> {
    let mut seen = HashSet::new();
    for spec in specs {
        if !seen.insert(&spec.number) {
            return Err(AllocationError::Validation(format!(
                "bed {} is listed more than once",
                spec.number
            )));
        }
        if spec.floor == 0 {
            return Err(AllocationError::Validation(format!(
                "bed {} must be on floor 1 or above",
                spec.number
            )));
        }
        if let Some(status) = spec.status {
            if !matches!(status, BedStatus::Available | BedStatus::Maintenance) {
                return Err(AllocationError::Validation(format!(
                    "bed {} cannot be provisioned as {status}",
                    spec.number
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_new_rejects_empty_priority() {
        let err = CoreConfig::new(WardName::new("Emergency").unwrap(), vec![], 30)
            .expect_err("empty priority should fail");
        assert!(matches!(err, AllocationError::Validation(_)));
    }

    #[test]
    fn test_new_rejects_out_of_range_cleaning() {
        let wards = ward_priority_from_env_value(None).unwrap();
        assert!(CoreConfig::new(WardName::new("ER").unwrap(), wards.clone(), 0).is_err());
        assert!(CoreConfig::new(WardName::new("ER").unwrap(), wards, 24 * 60 + 1).is_err());
    }

    #[test]
    fn test_default_priority_order() {
        let cfg = CoreConfig::default();
        let names: Vec<&str> = cfg.ward_priority().iter().map(WardName::as_str).collect();

        assert_eq!(names, ["Emergency", "ICU", "General Ward"]);
        assert_eq!(cfg.overflow_ward().as_str(), "Emergency");
        assert_eq!(cfg.cleaning_duration(), Duration::minutes(30));
    }

    #[test]
    fn test_ward_priority_parsing() {
        let wards = ward_priority_from_env_value(Some(" ER , ICU,,Cardiology ".into())).unwrap();
        let names: Vec<&str> = wards.iter().map(WardName::as_str).collect();
        assert_eq!(names, ["ER", "ICU", "Cardiology"]);

        let err = ward_priority_from_env_value(Some("ICU,icu".into()));
        assert!(err.is_err(), "duplicate wards should be rejected");
    }

    #[test]
    fn test_cleaning_minutes_parsing() {
        assert_eq!(cleaning_minutes_from_env_value(None).unwrap(), 30);
        assert_eq!(cleaning_minutes_from_env_value(Some(" 45 ".into())).unwrap(), 45);
        assert!(cleaning_minutes_from_env_value(Some("half an hour".into())).is_err());
    }

    #[test]
    fn test_load_bed_seed() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            "- number: ICU-001\n  ward: ICU\n  floor: 2\n  equipment: [Ventilator]\n- number: ER-001\n  ward: Emergency\n  status: maintenance\n"
        )
        .unwrap();

        let specs = load_bed_seed(file.path()).expect("seed should load");
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].equipment.len(), 1);
        assert_eq!(specs[1].floor, 1, "floor defaults to 1");
        assert_eq!(specs[1].status, Some(BedStatus::Maintenance));
    }

    #[test]
    fn test_seed_rejects_duplicates_and_occupied() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            "- number: ICU-001\n  ward: ICU\n- number: ICU-001\n  ward: ICU\n"
        )
        .unwrap();
        assert!(load_bed_seed(file.path()).is_err());

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "- number: ICU-001\n  ward: ICU\n  status: occupied\n").unwrap();
        assert!(load_bed_seed(file.path()).is_err());
    }
}
