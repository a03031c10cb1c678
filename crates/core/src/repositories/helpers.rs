//! Shared lookups for the allocation services.
//!
//! Each loader turns a missing record into `AllocationError::NotFound` so operations can use `?`
//! directly on ids supplied by callers.

use crate::bed::Bed;
use crate::error::{AllocationError, AllocationResult, RecordKind};
use crate::events::{Event, EventSink};
use crate::patient::Patient;
use crate::request::BedRequest;
use crate::store::Store;
use bedflow_types::BedNumber;
use bedflow_uuid::RecordUuid;

pub(crate) fn load_bed(store: &dyn Store, number: &BedNumber) -> AllocationResult<Bed> {
    store
        .bed(number)?
        .ok_or_else(|| AllocationError::not_found(RecordKind::Bed, number))
}

pub(crate) fn load_patient(store: &dyn Store, id: &RecordUuid) -> AllocationResult<Patient> {
    store
        .patient(id)?
        .ok_or_else(|| AllocationError::not_found(RecordKind::Patient, id))
}

pub(crate) fn load_request(store: &dyn Store, id: &RecordUuid) -> AllocationResult<BedRequest> {
    store
        .request(id)?
        .ok_or_else(|| AllocationError::not_found(RecordKind::Request, id))
}

pub(crate) fn publish_all(sink: &dyn EventSink, events: impl IntoIterator<Item = Event>) {
    for event in events {
        sink.publish(&event);
    }
}
