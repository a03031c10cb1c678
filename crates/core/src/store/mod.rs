//! Record storage.
//!
//! The core talks to persistence through the [`Store`] trait: point reads, full collection reads,
//! and an atomic [`WriteBatch`] commit guarded by record versions. A record's `version` is the
//! version it was read at (`0` for a record that has never been stored); a commit succeeds only if
//! every record in the batch still has that version in the store, and then bumps each one.
//!
//! Two implementations are provided: [`MemoryStore`] for tests and ephemeral servers, and
//! [`FileStore`], which keeps the three collections in one YAML document.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::bed::Bed;
use crate::error::{RecordKind, StoreError, StoreResult};
use crate::patient::Patient;
use crate::request::BedRequest;
use bedflow_types::BedNumber;
use bedflow_uuid::{PatientCode, RecordUuid};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Storage backend for beds, patients and requests.
pub trait Store: Send + Sync {
    /// All beds, ordered by bed number.
    fn beds(&self) -> StoreResult<Vec<Bed>>;

    fn bed(&self, number: &BedNumber) -> StoreResult<Option<Bed>>;

    fn patients(&self) -> StoreResult<Vec<Patient>>;

    fn patient(&self, id: &RecordUuid) -> StoreResult<Option<Patient>>;

    fn patient_code_exists(&self, code: &PatientCode) -> StoreResult<bool>;

    /// All requests, oldest first.
    fn requests(&self) -> StoreResult<Vec<BedRequest>>;

    fn request(&self, id: &RecordUuid) -> StoreResult<Option<BedRequest>>;

    /// Applies every write in `batch` or none of them.
    ///
    /// Returns the written records carrying their new versions.
    ///
    /// # Errors
    ///
    /// `StoreError::StaleRecord` when any record changed since it was read,
    /// `StoreError::DuplicateWrite` when the batch writes one record twice, or an I/O error from
    /// the backend.
    fn commit(&self, batch: WriteBatch) -> StoreResult<WriteBatch>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    Bed(Bed),
    Patient(Patient),
    Request(BedRequest),
}

impl Record {
    fn key(&self) -> (RecordKind, String) {
        match self {
            Record::Bed(b) => (RecordKind::Bed, b.number.to_string()),
            Record::Patient(p) => (RecordKind::Patient, p.id.to_string()),
            Record::Request(r) => (RecordKind::Request, r.id.to_string()),
        }
    }

    fn version(&self) -> u64 {
        match self {
            Record::Bed(b) => b.version,
            Record::Patient(p) => p.version,
            Record::Request(r) => r.version,
        }
    }
}

/// A set of record writes committed together.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteBatch {
    records: Vec<Record>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_bed(&mut self, bed: Bed) -> &mut Self {
        self.records.push(Record::Bed(bed));
        self
    }

    pub fn put_patient(&mut self, patient: Patient) -> &mut Self {
        self.records.push(Record::Patient(patient));
        self
    }

    pub fn put_request(&mut self, request: BedRequest) -> &mut Self {
        self.records.push(Record::Request(request));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn beds(&self) -> impl Iterator<Item = &Bed> {
        self.records.iter().filter_map(|r| match r {
            Record::Bed(b) => Some(b),
            _ => None,
        })
    }

    pub fn patients(&self) -> impl Iterator<Item = &Patient> {
        self.records.iter().filter_map(|r| match r {
            Record::Patient(p) => Some(p),
            _ => None,
        })
    }

    pub fn requests(&self) -> impl Iterator<Item = &BedRequest> {
        self.records.iter().filter_map(|r| match r {
            Record::Request(r) => Some(r),
            _ => None,
        })
    }

    pub fn bed(&self, number: &BedNumber) -> Option<&Bed> {
        self.beds().find(|b| &b.number == number)
    }

    pub fn patient(&self, id: &RecordUuid) -> Option<&Patient> {
        self.patients().find(|p| &p.id == id)
    }

    pub fn request(&self, id: &RecordUuid) -> Option<&BedRequest> {
        self.requests().find(|r| &r.id == id)
    }
}

/// The three record collections, shared by both store implementations.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "Document", into = "Document")]
pub(crate) struct Collections {
    beds: BTreeMap<BedNumber, Bed>,
    patients: BTreeMap<RecordUuid, Patient>,
    requests: BTreeMap<RecordUuid, BedRequest>,
}

/// On-disk layout: three lists rather than maps keyed by id.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    beds: Vec<Bed>,
    #[serde(default)]
    patients: Vec<Patient>,
    #[serde(default)]
    requests: Vec<BedRequest>,
}

impl From<Document> for Collections {
    fn from(doc: Document) -> Self {
        Self {
            beds: doc.beds.into_iter().map(|b| (b.number.clone(), b)).collect(),
            patients: doc.patients.into_iter().map(|p| (p.id, p)).collect(),
            requests: doc.requests.into_iter().map(|r| (r.id, r)).collect(),
        }
    }
}

impl From<Collections> for Document {
    fn from(c: Collections) -> Self {
        let mut requests: Vec<BedRequest> = c.requests.into_values().collect();
        requests.sort_by(|a, b| a.requested_at.cmp(&b.requested_at));
        Self {
            beds: c.beds.into_values().collect(),
            patients: c.patients.into_values().collect(),
            requests,
        }
    }
}

impl Collections {
    pub(crate) fn beds(&self) -> Vec<Bed> {
        self.beds.values().cloned().collect()
    }

    pub(crate) fn bed(&self, number: &BedNumber) -> Option<Bed> {
        self.beds.get(number).cloned()
    }

    pub(crate) fn patients(&self) -> Vec<Patient> {
        let mut patients: Vec<Patient> = self.patients.values().cloned().collect();
        patients.sort_by(|a, b| a.admitted_at.cmp(&b.admitted_at));
        patients
    }

    pub(crate) fn patient(&self, id: &RecordUuid) -> Option<Patient> {
        self.patients.get(id).cloned()
    }

    pub(crate) fn patient_code_exists(&self, code: &PatientCode) -> bool {
        self.patients.values().any(|p| &p.code == code)
    }

    pub(crate) fn requests(&self) -> Vec<BedRequest> {
        let mut requests: Vec<BedRequest> = self.requests.values().cloned().collect();
        requests.sort_by(|a, b| a.requested_at.cmp(&b.requested_at));
        requests
    }

    pub(crate) fn request(&self, id: &RecordUuid) -> Option<BedRequest> {
        self.requests.get(id).cloned()
    }

    fn stored_version(&self, record: &Record) -> Option<u64> {
        match record {
            Record::Bed(b) => self.beds.get(&b.number).map(|s| s.version),
            Record::Patient(p) => self.patients.get(&p.id).map(|s| s.version),
            Record::Request(r) => self.requests.get(&r.id).map(|s| s.version),
        }
    }

    /// Validates every write against the stored versions before touching anything, then applies
    /// the batch with bumped versions.
    pub(crate) fn apply(&mut self, batch: WriteBatch) -> StoreResult<WriteBatch> {
        let mut seen = HashSet::new();
        for record in batch.records() {
            let (kind, id) = record.key();
            if !seen.insert((kind, id.clone())) {
                return Err(StoreError::DuplicateWrite { kind, id });
            }

            let expected = record.version();
            let found = self.stored_version(record);
            let fresh = match found {
                None => expected == 0,
                Some(v) => v == expected,
            };
            if !fresh {
                return Err(StoreError::StaleRecord {
                    kind,
                    id,
                    expected,
                    found,
                });
            }
        }

        let mut committed = WriteBatch::new();
        for record in batch.records {
            match record {
                Record::Bed(mut b) => {
                    b.version += 1;
                    self.beds.insert(b.number.clone(), b.clone());
                    committed.put_bed(b);
                }
                Record::Patient(mut p) => {
                    p.version += 1;
                    self.patients.insert(p.id, p.clone());
                    committed.put_patient(p);
                }
                Record::Request(mut r) => {
                    r.version += 1;
                    self.requests.insert(r.id, r.clone());
                    committed.put_request(r);
                }
            }
        }
        Ok(committed)
    }
}
