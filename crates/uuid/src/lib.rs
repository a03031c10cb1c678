//! Record identifiers for bedflow.
//!
//! Patients and bed requests are keyed by a *canonical* UUID: **32 lowercase hexadecimal
//! characters** (no hyphens), the same value `Uuid::new_v4().simple().to_string()` produces.
//! Externally supplied identifiers (REST paths, CLI arguments) must already be canonical;
//! [`RecordUuid::parse`] rejects anything else rather than normalising it.
//!
//! Patients additionally carry a short, human-friendly [`PatientCode`] (e.g. `9X2A1`) that staff
//! read out at the bedside. Codes are random and must be checked for collisions by the caller
//! against the patient store.

mod code;
mod record;

pub use code::PatientCode;
pub use record::{RecordUuid, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
