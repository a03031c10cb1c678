use super::{Collections, Store, WriteBatch};
use crate::bed::Bed;
use crate::error::{StoreError, StoreResult};
use crate::patient::Patient;
use crate::request::BedRequest;
use bedflow_types::BedNumber;
use bedflow_uuid::{PatientCode, RecordUuid};
use std::sync::{RwLock, RwLockReadGuard};

/// In-process store; contents are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Collections>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }
}

impl Store for MemoryStore {
    fn beds(&self) -> StoreResult<Vec<Bed>> {
        Ok(self.read()?.beds())
    }

    fn bed(&self, number: &BedNumber) -> StoreResult<Option<Bed>> {
        Ok(self.read()?.bed(number))
    }

    fn patients(&self) -> StoreResult<Vec<Patient>> {
        Ok(self.read()?.patients())
    }

    fn patient(&self, id: &RecordUuid) -> StoreResult<Option<Patient>> {
        Ok(self.read()?.patient(id))
    }

    fn patient_code_exists(&self, code: &PatientCode) -> StoreResult<bool> {
        Ok(self.read()?.patient_code_exists(code))
    }

    fn requests(&self) -> StoreResult<Vec<BedRequest>> {
        Ok(self.read()?.requests())
    }

    fn request(&self, id: &RecordUuid) -> StoreResult<Option<BedRequest>> {
        Ok(self.read()?.request(id))
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<WriteBatch> {
        let mut guard = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        guard.apply(batch)
    }
}
