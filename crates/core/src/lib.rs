//! # Bedflow Core
//!
//! Core logic for hospital bed recommendation and allocation.
//!
//! This crate contains the data model and every operation that reads or changes it:
//! - Bed matching over a snapshot of the bed pool, with cascading fallbacks
//! - The bed request lifecycle (create, reserve, approve, reject, cancel, fulfil)
//! - Admission, discharge and transfer, keeping beds and patients linked both ways
//! - Versioned record stores (in memory, or a single YAML file)
//! - Ward occupancy alerts and state-change events
//!
//! **No API concerns**: authentication, HTTP servers and CLIs belong in `api-rest`,
//! `api-shared` and `bedflow-cli`. Callers pass an already-identified [`Actor`].

pub mod actor;
pub mod alerts;
pub mod bed;
pub mod config;
pub mod consistency;
pub mod constants;
pub mod error;
pub mod events;
pub mod matcher;
pub mod patient;
mod repo;
pub mod repositories;
pub mod request;
pub mod service;
pub mod store;
pub mod validation;

pub use actor::{Actor, StaffRole};
pub use alerts::{Alert, AlertKind, Severity, WardOccupancy};
pub use bed::{Bed, BedSpec, BedStatus};
pub use config::CoreConfig;
pub use consistency::Inconsistency;
pub use error::{AllocationError, AllocationResult, ConflictKind, RecordKind, StoreError};
pub use events::{Event, EventSink, LogSink, MemorySink};
pub use patient::{Demographics, Gender, Patient, PatientPriority, PatientStatus};
pub use request::{
    BedRequest, NewRequest, RequestMode, RequestPriority, RequestStatus, RequestSubject,
};
pub use service::{AllocationService, Availability};
pub use store::{FileStore, MemoryStore, Store, WriteBatch};

pub use bedflow_types::{BedNumber, EquipmentTag, NonEmptyText, WardName};
pub use bedflow_uuid::{PatientCode, RecordUuid};
