//! Outbound notifications.
//!
//! Operations publish an [`Event`] for every committed change. Delivery (sockets, queues) lives
//! behind the [`EventSink`] trait; publishing happens after the store commit and cannot fail the
//! operation.

use crate::alerts::Alert;
use crate::bed::{Bed, BedStatus};
use crate::patient::Patient;
use crate::request::{BedRequest, RequestMode, RequestPriority, RequestStatus};
use bedflow_types::{BedNumber, WardName};
use bedflow_uuid::{PatientCode, RecordUuid};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "bed:updated")]
    BedUpdated {
        bed: BedNumber,
        ward: WardName,
        status: BedStatus,
        current_patient: Option<RecordUuid>,
    },
    #[serde(rename = "patient:admitted")]
    PatientAdmitted {
        patient: RecordUuid,
        code: PatientCode,
        name: String,
        bed: Option<BedNumber>,
    },
    #[serde(rename = "patient:discharged")]
    PatientDischarged {
        patient: RecordUuid,
        code: PatientCode,
        bed: Option<BedNumber>,
    },
    #[serde(rename = "patient:transferred")]
    PatientTransferred {
        patient: RecordUuid,
        from: Option<BedNumber>,
        to: BedNumber,
    },
    #[serde(rename = "request:created")]
    RequestCreated {
        request: RecordUuid,
        ward: WardName,
        priority: RequestPriority,
        mode: RequestMode,
        recommended_beds: Vec<BedNumber>,
    },
    #[serde(rename = "request:approved")]
    RequestApproved {
        request: RecordUuid,
        status: RequestStatus,
        bed: Option<BedNumber>,
        patient: Option<RecordUuid>,
    },
    #[serde(rename = "request:rejected")]
    RequestRejected {
        request: RecordUuid,
        notes: Option<String>,
    },
    #[serde(rename = "request:cancelled")]
    RequestCancelled { request: RecordUuid },
    #[serde(rename = "request:fulfilled")]
    RequestFulfilled {
        request: RecordUuid,
        bed: Option<BedNumber>,
    },
    #[serde(rename = "alert:new")]
    AlertRaised(Alert),
}

impl Event {
    /// Wire name, e.g. `bed:updated`.
    pub fn name(&self) -> &'static str {
        match self {
            Event::BedUpdated { .. } => "bed:updated",
            Event::PatientAdmitted { .. } => "patient:admitted",
            Event::PatientDischarged { .. } => "patient:discharged",
            Event::PatientTransferred { .. } => "patient:transferred",
            Event::RequestCreated { .. } => "request:created",
            Event::RequestApproved { .. } => "request:approved",
            Event::RequestRejected { .. } => "request:rejected",
            Event::RequestCancelled { .. } => "request:cancelled",
            Event::RequestFulfilled { .. } => "request:fulfilled",
            Event::AlertRaised(_) => "alert:new",
        }
    }

    pub fn bed_updated(bed: &Bed) -> Self {
        Event::BedUpdated {
            bed: bed.number.clone(),
            ward: bed.ward.clone(),
            status: bed.status,
            current_patient: bed.current_patient,
        }
    }

    pub fn patient_admitted(patient: &Patient) -> Self {
        Event::PatientAdmitted {
            patient: patient.id,
            code: patient.code.clone(),
            name: patient.name.to_string(),
            bed: patient.assigned_bed.clone(),
        }
    }

    pub fn patient_discharged(patient: &Patient) -> Self {
        Event::PatientDischarged {
            patient: patient.id,
            code: patient.code.clone(),
            bed: patient.assigned_bed.clone(),
        }
    }

    pub fn request_created(request: &BedRequest) -> Self {
        Event::RequestCreated {
            request: request.id,
            ward: request.ward.clone(),
            priority: request.priority,
            mode: request.mode,
            recommended_beds: request.recommended_beds.clone(),
        }
    }

    pub fn request_approved(request: &BedRequest) -> Self {
        Event::RequestApproved {
            request: request.id,
            status: request.status,
            bed: request.assigned_bed.clone(),
            patient: request.patient_ref(),
        }
    }
}

/// Receiver of published events.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &Event);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn publish(&self, event: &Event) {
        (**self).publish(event)
    }
}

/// Writes each event to the `tracing` log as JSON.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&self, event: &Event) {
        match serde_json::to_string(event) {
            Ok(payload) => tracing::info!(event = event.name(), %payload, "event published"),
            Err(e) => tracing::warn!(event = event.name(), error = %e, "event not serializable"),
        }
    }
}

/// Keeps every event in memory; used by tests and the CLI.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(Event::name).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventSink for MemorySink {
    fn publish(&self, event: &Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::bed;

    #[test]
    fn test_events_serialize_with_type_tag() {
        let event = Event::bed_updated(&bed("ICU-001", "ICU", &[]));
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "bed:updated");
        assert_eq!(json["bed"], "ICU-001");
        assert_eq!(json["status"], "available");
        assert_eq!(event.name(), "bed:updated");
    }

    #[test]
    fn test_memory_sink_through_arc() {
        let sink = Arc::new(MemorySink::new());
        let shared: Arc<dyn EventSink> = sink.clone();
        shared.publish(&Event::RequestCancelled {
            request: RecordUuid::new(),
        });

        assert_eq!(sink.names(), ["request:cancelled"]);
        sink.clear();
        assert!(sink.events().is_empty());
    }
}
