use crate::actor::StaffRole;
use crate::bed::BedStatus;
use crate::patient::PatientStatus;
use crate::request::{RequestAction, RequestStatus};
use bedflow_types::BedNumber;
use bedflow_uuid::RecordUuid;
use std::fmt;

/// The record collections held by a [`Store`](crate::store::Store).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Bed,
    Patient,
    Request,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordKind::Bed => "bed",
            RecordKind::Patient => "patient",
            RecordKind::Request => "request",
        })
    }
}

/// Failures raised by store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {id} changed since it was read (expected version {expected}, found {found:?})")]
    StaleRecord {
        kind: RecordKind,
        id: String,
        expected: u64,
        found: Option<u64>,
    },
    #[error("{kind} {id} appears more than once in a single commit")]
    DuplicateWrite { kind: RecordKind, id: String },
    #[error("failed to read store file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write store file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize store document: {0}")]
    Serialization(serde_yaml::Error),
    #[error("failed to deserialize store document: {0}")]
    Deserialization(serde_yaml::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Preconditions that failed because of the current state of a record.
#[derive(Debug, thiserror::Error)]
pub enum ConflictKind {
    #[error("bed {bed} is not available (status: {status})")]
    BedNotAvailable { bed: BedNumber, status: BedStatus },
    #[error("bed {bed} is not occupied (status: {status})")]
    BedNotOccupied { bed: BedNumber, status: BedStatus },
    #[error("request already processed (status: {status})")]
    AlreadyProcessed { status: RequestStatus },
    #[error("cannot {action} a request with status {from}")]
    InvalidTransition {
        from: RequestStatus,
        action: RequestAction,
    },
    #[error("no bed selected for request {request}; supply a bed before approving")]
    NoBedSelected { request: RecordUuid },
    #[error("patient {patient} is already discharged")]
    AlreadyDischarged { patient: RecordUuid },
    #[error("patient {patient} is not admitted (status: {status})")]
    NotAdmitted {
        patient: RecordUuid,
        status: PatientStatus,
    },
    #[error("bed {bed} still has patient {patient} assigned; discharge or transfer the patient first")]
    PatientStillLinked { bed: BedNumber, patient: RecordUuid },
    #[error("bed {bed} can only become occupied through an admission")]
    OccupancyRequiresAdmission { bed: BedNumber },
    #[error("{kind} {id} was modified by another operation; reload and retry")]
    StaleRecord { kind: RecordKind, id: String },
}

/// Error taxonomy for every allocation operation.
///
/// The REST layer maps these one-to-one onto status codes: `Validation` → 400,
/// `Forbidden` → 403, `NotFound` → 404, `Conflict` → 409, `Internal` → 500.
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },
    #[error("{0}")]
    Conflict(#[from] ConflictKind),
    #[error("role {role} is not permitted to {action}")]
    Forbidden { role: StaffRole, action: &'static str },
    #[error("store failure: {0}")]
    Internal(#[source] StoreError),
}

impl AllocationError {
    pub fn not_found(kind: RecordKind, id: impl ToString) -> Self {
        AllocationError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for AllocationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::StaleRecord { kind, id, .. } => {
                AllocationError::Conflict(ConflictKind::StaleRecord { kind, id })
            }
            other => AllocationError::Internal(other),
        }
    }
}

impl From<bedflow_types::TextError> for AllocationError {
    fn from(err: bedflow_types::TextError) -> Self {
        AllocationError::Validation(err.to_string())
    }
}

impl From<bedflow_uuid::UuidError> for AllocationError {
    fn from(err: bedflow_uuid::UuidError) -> Self {
        AllocationError::Validation(err.to_string())
    }
}

pub type AllocationResult<T> = std::result::Result<T, AllocationError>;

/// Returned by `FromStr` implementations of the status and role enums.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown {kind}: '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl From<UnknownVariant> for AllocationError {
    fn from(err: UnknownVariant) -> Self {
        AllocationError::Validation(err.to_string())
    }
}
