//! Record allocation utilities.
//!
//! This module contains helpers that allocate identifiers which must be unique across a store.

use crate::error::AllocationResult;
use crate::store::Store;
use bedflow_uuid::PatientCode;
use chrono::{DateTime, Utc};

/// Allocates a patient code not yet used by any stored patient.
///
/// Candidates come from `code_source`; each is checked against the store, up to `attempts`
/// times. When every candidate collides the last five digits of the millisecond timestamp are
/// used instead, without a further check.
///
/// # Arguments
///
/// * `store` - Store whose patients the code must not collide with.
/// * `code_source` - A mutable closure producing candidate codes.
/// * `attempts` - Number of candidates to try.
/// * `now` - Timestamp for the fallback code.
///
/// # Errors
///
/// Returns `AllocationError::Internal` if the store cannot be read.
pub(crate) fn allocate_patient_code(
    store: &dyn Store,
    mut code_source: impl FnMut() -> PatientCode,
    attempts: usize,
    now: DateTime<Utc>,
) -> AllocationResult<PatientCode> {
    for attempt in 0..attempts {
        let code = code_source();
        if !store.patient_code_exists(&code)? {
            return Ok(code);
        }
        tracing::debug!(%code, attempt, "patient code collision");
    }

    let fallback = PatientCode::from_timestamp(now);
    tracing::warn!(code = %fallback, attempts, "patient code attempts exhausted, using timestamp code");
    Ok(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::{Demographics, Patient};
    use crate::store::{MemoryStore, WriteBatch};
    use bedflow_types::NonEmptyText;
    use chrono::TimeZone;

    fn store_with_code(code: &str) -> MemoryStore {
        let store = MemoryStore::new();
        let patient = Patient::register(
            PatientCode::parse(code).unwrap(),
            NonEmptyText::new("Ada").unwrap(),
            Demographics::default(),
            "General".into(),
            "Observation".into(),
            Utc::now(),
        );
        let mut batch = WriteBatch::new();
        batch.put_patient(patient);
        store.commit(batch).unwrap();
        store
    }

    #[test]
    fn test_retries_past_collision() {
        let store = store_with_code("AAAAA");
        let mut candidates = vec!["BBBBB", "AAAAA"];

        let code = allocate_patient_code(
            &store,
            || PatientCode::parse(candidates.pop().unwrap()).unwrap(),
            5,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(code.as_str(), "BBBBB");
    }

    #[test]
    fn test_falls_back_to_timestamp_after_attempts() {
        let store = store_with_code("AAAAA");
        let mut calls = 0;
        let now = Utc.timestamp_millis_opt(1_700_000_012_345).unwrap();

        let code = allocate_patient_code(
            &store,
            || {
                calls += 1;
                PatientCode::parse("AAAAA").unwrap()
            },
            5,
            now,
        )
        .unwrap();
        assert_eq!(calls, 5, "every attempt should be used before falling back");
        assert_eq!(code.as_str(), "12345");
    }
}
