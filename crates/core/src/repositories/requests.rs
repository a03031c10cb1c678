//! Bed request lifecycle.
//!
//! Creating a request only records the matcher's proposal; no bed changes state. Reserving holds
//! one bed for the request. Approving performs the admission. Every transition writes the
//! request together with the beds and patient it touches in one commit, so a request never says
//! `assigned` for an admission that did not happen.

use super::admissions::{ensure_bed_admissible, AdmissionService};
use super::helpers::{load_bed, load_patient, load_request, publish_all};
use crate::actor::{Actor, APPROVER_ROLES, CANCEL_ROLES, EMERGENCY_INTAKE_ROLES};
use crate::bed::BedStatus;
use crate::error::{AllocationError, AllocationResult, ConflictKind, RecordKind};
use crate::events::Event;
use crate::matcher::BedMatcher;
use crate::request::{
    BedRequest, NewRequest, RequestAction, RequestMode, RequestStatus, RequestSubject,
};
use crate::store::{Store, WriteBatch};
use crate::validation::{validate_demographics, Intake};
use bedflow_types::BedNumber;
use bedflow_uuid::RecordUuid;
use chrono::Utc;

/// Service for the bed request state machine.
#[derive(Clone)]
pub struct RequestService {
    admissions: AdmissionService,
}

impl RequestService {
    pub fn new(admissions: AdmissionService) -> Self {
        Self { admissions }
    }

    fn store(&self) -> &dyn Store {
        self.admissions.store.as_ref()
    }

    /// Files a new request and records up to three recommended beds.
    ///
    /// Emergency-mode requests are matched with the global ward-priority search and may only be
    /// filed by ER staff or administrators.
    ///
    /// # Errors
    ///
    /// - `Forbidden` for an emergency request from another role,
    /// - `NotFound` if the referenced patient does not exist,
    /// - `Validation` if walk-in demographics lack a name.
    pub fn create_request(&self, actor: &Actor, new: NewRequest) -> AllocationResult<BedRequest> {
        if new.mode == RequestMode::Emergency {
            actor.require(EMERGENCY_INTAKE_ROLES, "file an emergency request")?;
        }
        match &new.subject {
            RequestSubject::Patient { patient } => {
                load_patient(self.store(), patient)?;
            }
            RequestSubject::WalkIn { demographics } => {
                validate_demographics(demographics, Intake::WalkIn)?;
            }
        }

        let now = Utc::now();
        let cfg = self.admissions.cfg.as_ref();
        let beds = self.store().beds()?;
        let matcher = BedMatcher::new(&beds, cfg);
        let ranked = match new.mode {
            RequestMode::Emergency => matcher.rank_global(&new.equipment, cfg.recommendation_limit()),
            RequestMode::Standard => {
                matcher.rank(&new.ward, &new.equipment, cfg.recommendation_limit())
            }
        };

        let request = BedRequest {
            id: RecordUuid::new(),
            subject: new.subject,
            ward: new.ward,
            equipment: new.equipment,
            priority: new.priority,
            mode: new.mode,
            status: RequestStatus::Pending,
            recommended_beds: ranked.iter().map(|b| b.number.clone()).collect(),
            assigned_bed: None,
            patient: None,
            notes: new
                .notes
                .map(|n| n.trim().to_owned())
                .filter(|n| !n.is_empty()),
            requested_by: actor.staff_id.clone(),
            requested_at: now,
            resolved_at: None,
            fulfilled_at: None,
            version: 0,
        };

        let mut batch = WriteBatch::new();
        batch.put_request(request);
        let committed = self.store().commit(batch)?;
        let request = single_request(committed)?;

        tracing::info!(
            staff = %actor.staff_id,
            request = %request.id,
            ward = %request.ward,
            mode = ?request.mode,
            recommended = request.recommended_beds.len(),
            "bed request created"
        );
        self.admissions
            .events
            .publish(&Event::request_created(&request));
        Ok(request)
    }

    /// Holds a bed for a pending request without admitting anyone.
    ///
    /// The bed is the explicit `bed`, else the first recommended bed. The request moves to
    /// `approved` and the bed to `reserved`.
    pub fn reserve_bed(
        &self,
        actor: &Actor,
        id: &RecordUuid,
        bed: Option<&BedNumber>,
    ) -> AllocationResult<BedRequest> {
        actor.require(APPROVER_ROLES, "reserve a bed")?;
        let now = Utc::now();
        let mut request = load_request(self.store(), id)?;
        let next = self.transition(&request, RequestAction::Reserve)?;

        let target = bed
            .cloned()
            .or_else(|| request.recommended_beds.first().cloned())
            .ok_or(ConflictKind::NoBedSelected { request: *id })?;
        let mut bed = load_bed(self.store(), &target)?;
        ensure_bed_admissible(&bed, None)
            .inspect_err(|e| tracing::warn!(request = %id, error = %e, "reservation refused"))?;

        bed.reserve(request.id, now);
        request.status = next;
        request.assigned_bed = Some(target);

        let mut batch = WriteBatch::new();
        batch.put_bed(bed).put_request(request);
        let committed = self.store().commit(batch)?;

        let request = request_in(&committed, id)?;
        tracing::info!(staff = %actor.staff_id, request = %id, bed = ?request.assigned_bed, "bed reserved");
        publish_all(
            self.admissions.events.as_ref(),
            std::iter::once(Event::request_approved(&request))
                .chain(committed.beds().map(Event::bed_updated)),
        );
        Ok(request)
    }

    /// Approves a request and admits its patient.
    ///
    /// The bed is resolved as: the explicit `bed`, else the bed reserved for the request, else
    /// the first recommended bed. It must be available, reserved for this request, or already
    /// occupied by the request's patient. A walk-in becomes a new patient record; a referenced
    /// patient is admitted (or moved, if already admitted elsewhere). Choosing a bed other than
    /// the reserved one releases the reservation.
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless the actor is an administrator or ICU manager,
    /// - `NotFound` for an unknown request, bed or patient,
    /// - `Conflict(AlreadyProcessed)` if the request was already approved, rejected or cancelled,
    /// - `Conflict(NoBedSelected)` if no bed could be resolved,
    /// - `Conflict(BedNotAvailable)` if the bed was taken,
    /// - `Conflict(StaleRecord)` if a concurrent operation won the race for a record.
    pub fn approve_request(
        &self,
        actor: &Actor,
        id: &RecordUuid,
        bed: Option<&BedNumber>,
    ) -> AllocationResult<BedRequest> {
        actor.require(APPROVER_ROLES, "approve a bed request")?;
        let now = Utc::now();
        let mut request = load_request(self.store(), id)?;
        let next = self.transition(&request, RequestAction::Approve)?;

        let target = bed
            .cloned()
            .or_else(|| request.assigned_bed.clone())
            .or_else(|| request.recommended_beds.first().cloned())
            .ok_or(ConflictKind::NoBedSelected { request: *id })
            .inspect_err(|e| tracing::warn!(request = %id, error = %e, "approval refused"))?;

        let mut batch = WriteBatch::new();
        if let Some(reserved) = request.assigned_bed.as_ref().filter(|n| **n != target) {
            if let Some(mut held) = self
                .store()
                .bed(reserved)?
                .filter(|b| b.is_reserved_for(id))
            {
                held.set_status(BedStatus::Available, now);
                batch.put_bed(held);
            }
        }

        let bed = load_bed(self.store(), &target)?;
        let plan = match &request.subject {
            RequestSubject::Patient { patient } => {
                let patient = load_patient(self.store(), patient)?;
                self.admissions
                    .plan_existing_admission(patient, bed, Some(id), now)
            }
            RequestSubject::WalkIn { demographics } => {
                let valid = validate_demographics(demographics, Intake::WalkIn)?;
                self.admissions.plan_new_admission(valid, bed, Some(id), now)
            }
        }
        .inspect_err(|e| tracing::warn!(request = %id, bed = %target, error = %e, "approval refused"))?;

        request.status = next;
        request.assigned_bed = Some(target);
        request.patient = Some(plan.patient.id);
        request.resolved_at = Some(now);
        request.fulfilled_at = Some(now);
        batch.put_request(request);

        let (patient, committed) = self.admissions.commit_admission(&plan, batch, now)?;
        let request = request_in(&committed, id)?;
        tracing::info!(
            staff = %actor.staff_id,
            request = %id,
            patient = %patient.id,
            bed = ?request.assigned_bed,
            "bed request approved"
        );

        let released = committed
            .beds()
            .filter(|b| b.number != plan.bed.number)
            .filter(|b| plan.vacated.as_ref().map_or(true, |v| v.number != b.number))
            .map(Event::bed_updated);
        publish_all(
            self.admissions.events.as_ref(),
            std::iter::once(Event::request_approved(&request)).chain(released),
        );
        Ok(request)
    }

    /// Rejects a pending request, appending `Rejected: <reason>` to its notes.
    pub fn reject_request(
        &self,
        actor: &Actor,
        id: &RecordUuid,
        reason: &str,
    ) -> AllocationResult<BedRequest> {
        actor.require(APPROVER_ROLES, "reject a bed request")?;
        let now = Utc::now();
        let mut request = load_request(self.store(), id)?;
        request.status = self.transition(&request, RequestAction::Reject)?;

        let reason = match reason.trim() {
            "" => "no reason given",
            r => r,
        };
        request.append_note(format!("Rejected: {reason}"));
        request.resolved_at = Some(now);

        let mut batch = WriteBatch::new();
        batch.put_request(request);
        let request = single_request(self.store().commit(batch)?)?;

        tracing::info!(staff = %actor.staff_id, request = %id, "bed request rejected");
        self.admissions.events.publish(&Event::RequestRejected {
            request: request.id,
            notes: request.notes.clone(),
        });
        Ok(request)
    }

    /// Cancels a request. A bed reserved for it returns to `available`; an admission already
    /// made through the request is left in place.
    ///
    /// The requester may always cancel their own request; anyone else needs an ER, ICU manager
    /// or administrator role.
    pub fn cancel_request(&self, actor: &Actor, id: &RecordUuid) -> AllocationResult<BedRequest> {
        let now = Utc::now();
        let mut request = load_request(self.store(), id)?;
        if actor.staff_id != request.requested_by {
            actor.require(CANCEL_ROLES, "cancel another staff member's request")?;
        }
        request.status = self.transition(&request, RequestAction::Cancel)?;
        request.resolved_at = Some(now);

        let mut batch = WriteBatch::new();
        if let Some(number) = &request.assigned_bed {
            if let Some(mut held) = self.store().bed(number)?.filter(|b| b.is_reserved_for(id)) {
                held.set_status(BedStatus::Available, now);
                batch.put_bed(held);
            }
        }
        batch.put_request(request);
        let committed = self.store().commit(batch)?;

        let request = request_in(&committed, id)?;
        tracing::info!(staff = %actor.staff_id, request = %id, "bed request cancelled");
        publish_all(
            self.admissions.events.as_ref(),
            std::iter::once(Event::RequestCancelled { request: *id })
                .chain(committed.beds().map(Event::bed_updated)),
        );
        Ok(request)
    }

    /// Marks an approved or assigned request fulfilled once its bed is occupied.
    pub fn fulfil_request(&self, actor: &Actor, id: &RecordUuid) -> AllocationResult<BedRequest> {
        let now = Utc::now();
        let mut request = load_request(self.store(), id)?;
        let next = self.transition(&request, RequestAction::Fulfil)?;

        let number = request
            .assigned_bed
            .clone()
            .ok_or(ConflictKind::NoBedSelected { request: *id })?;
        let bed = load_bed(self.store(), &number)?;
        // Only the request's own admitted patient counts; a reserved walk-in has none yet.
        let occupied = request
            .patient_ref()
            .is_some_and(|patient| bed.is_occupied_by(&patient));
        if !occupied {
            tracing::warn!(request = %id, bed = %number, status = %bed.status, "fulfilment refused");
            return Err(ConflictKind::BedNotOccupied {
                bed: number,
                status: bed.status,
            }
            .into());
        }

        request.status = next;
        request.fulfilled_at = request.fulfilled_at.or(Some(now));
        request.resolved_at = request.resolved_at.or(Some(now));

        let mut batch = WriteBatch::new();
        batch.put_request(request);
        let request = single_request(self.store().commit(batch)?)?;

        tracing::info!(staff = %actor.staff_id, request = %id, "bed request fulfilled");
        self.admissions.events.publish(&Event::RequestFulfilled {
            request: request.id,
            bed: request.assigned_bed.clone(),
        });
        Ok(request)
    }

    fn transition(
        &self,
        request: &BedRequest,
        action: RequestAction,
    ) -> AllocationResult<RequestStatus> {
        request.status.transition(action).map_err(|e| {
            tracing::warn!(request = %request.id, status = %request.status, %action, "transition refused");
            e.into()
        })
    }
}

fn request_in(committed: &WriteBatch, id: &RecordUuid) -> AllocationResult<BedRequest> {
    committed
        .request(id)
        .cloned()
        .ok_or_else(|| AllocationError::not_found(RecordKind::Request, id))
}

fn single_request(committed: WriteBatch) -> AllocationResult<BedRequest> {
    committed
        .requests()
        .next()
        .cloned()
        .ok_or_else(|| AllocationError::Validation("commit returned no request".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::StaffRole;
    use crate::bed::Bed;
    use crate::config::CoreConfig;
    use crate::consistency::audit;
    use crate::events::MemorySink;
    use crate::patient::{Demographics, PatientStatus};
    use crate::request::RequestPriority;
    use crate::store::test_support::{bed, bed_with_status};
    use crate::store::MemoryStore;
    use bedflow_types::{EquipmentTag, WardName};
    use std::sync::Arc;
    use std::thread;

    struct Harness {
        requests: RequestService,
        admissions: AdmissionService,
        store: Arc<MemoryStore>,
        sink: Arc<MemorySink>,
        admin: Actor,
        er: Actor,
        nurse: Actor,
    }

    fn harness(beds: Vec<Bed>) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let mut batch = WriteBatch::new();
        for b in beds {
            batch.put_bed(b);
        }
        if !batch.is_empty() {
            store.commit(batch).unwrap();
        }
        let sink = Arc::new(MemorySink::new());
        let admissions = AdmissionService::new(
            Arc::new(CoreConfig::default()),
            store.clone(),
            sink.clone(),
        );
        Harness {
            requests: RequestService::new(admissions.clone()),
            admissions,
            store,
            sink,
            admin: Actor::new("admin-1", StaffRole::HospitalAdmin),
            er: Actor::new("er-1", StaffRole::ErStaff),
            nurse: Actor::new("nurse-1", StaffRole::WardStaff),
        }
    }

    fn walk_in(ward: &str, equipment: &[&str]) -> NewRequest {
        NewRequest {
            subject: RequestSubject::WalkIn {
                demographics: Demographics {
                    name: "John Doe".into(),
                    ..Demographics::default()
                },
            },
            ward: WardName::new(ward).unwrap(),
            equipment: equipment
                .iter()
                .map(|t| EquipmentTag::new(t).unwrap())
                .collect(),
            priority: RequestPriority::Urgent,
            mode: RequestMode::Standard,
            notes: Some("Respiratory failure".into()),
        }
    }

    fn number(s: &str) -> BedNumber {
        BedNumber::new(s).unwrap()
    }

    fn stored_bed(h: &Harness, n: &str) -> Bed {
        h.store.bed(&number(n)).unwrap().unwrap()
    }

    fn assert_consistent(h: &Harness) {
        let problems = audit(&h.store.beds().unwrap(), &h.store.patients().unwrap());
        assert!(problems.is_empty(), "bed/patient links broken: {problems:?}");
    }

    #[test]
    fn test_icu_ventilator_request_end_to_end() {
        let h = harness(vec![
            bed("ICU-001", "ICU", &[]),
            bed("ICU-002", "ICU", &["Ventilator"]),
            bed_with_status("ICU-003", "ICU", BedStatus::Occupied),
        ]);

        let request = h
            .requests
            .create_request(&h.nurse, walk_in("ICU", &["Ventilator"]))
            .unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.recommended_beds.first(), Some(&number("ICU-002")));
        assert_eq!(
            stored_bed(&h, "ICU-002").status,
            BedStatus::Available,
            "creating a request must not reserve anything"
        );

        let approved = h
            .requests
            .approve_request(&h.admin, &request.id, None)
            .unwrap();
        assert_eq!(approved.status, RequestStatus::Assigned);
        assert_eq!(approved.assigned_bed, Some(number("ICU-002")));
        assert!(approved.fulfilled_at.is_some());

        let patient_id = approved.patient.expect("approval links the admitted patient");
        let patient = h.store.patient(&patient_id).unwrap().unwrap();
        assert_eq!(patient.status, PatientStatus::Admitted);
        assert_eq!(patient.department, "ER");
        assert_eq!(stored_bed(&h, "ICU-002").current_patient, Some(patient_id));

        let names = h.sink.names();
        for expected in ["request:created", "request:approved", "bed:updated", "patient:admitted"] {
            assert!(names.contains(&expected), "missing {expected} in {names:?}");
        }
    }

    #[test]
    fn test_no_beds_then_approve_without_bed_fails() {
        let h = harness(vec![bed_with_status("ICU-001", "ICU", BedStatus::Occupied)]);

        let request = h
            .requests
            .create_request(&h.nurse, walk_in("ICU", &[]))
            .expect("request is still filed");
        assert!(request.recommended_beds.is_empty());

        let err = h
            .requests
            .approve_request(&h.admin, &request.id, None)
            .unwrap_err();
        assert!(matches!(
            err,
            AllocationError::Conflict(ConflictKind::NoBedSelected { .. })
        ));
        assert_eq!(
            h.store.request(&request.id).unwrap().unwrap().status,
            RequestStatus::Pending
        );
    }

    #[test]
    fn test_second_approval_never_double_admits() {
        let h = harness(vec![bed("ICU-001", "ICU", &[])]);
        let request = h
            .requests
            .create_request(&h.nurse, walk_in("ICU", &[]))
            .unwrap();
        h.requests
            .approve_request(&h.admin, &request.id, None)
            .unwrap();

        let err = h
            .requests
            .approve_request(&h.admin, &request.id, Some(&number("ICU-001")))
            .unwrap_err();
        assert!(matches!(
            err,
            AllocationError::Conflict(ConflictKind::AlreadyProcessed {
                status: RequestStatus::Assigned
            })
        ));
        assert_eq!(h.store.patients().unwrap().len(), 1, "no duplicate patient");
        assert_consistent(&h);
    }

    #[test]
    fn test_racing_approvals_admit_one_patient() {
        let h = harness(vec![bed("ICU-001", "ICU", &[])]);
        let ids: Vec<RecordUuid> = (0..4)
            .map(|_| {
                h.requests
                    .create_request(&h.nurse, walk_in("ICU", &[]))
                    .unwrap()
                    .id
            })
            .collect();

        let handles: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let service = h.requests.clone();
                let admin = h.admin.clone();
                thread::spawn(move || service.approve_request(&admin, &id, None))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|t| t.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                matches!(
                    err,
                    AllocationError::Conflict(
                        ConflictKind::BedNotAvailable { .. } | ConflictKind::StaleRecord { .. }
                    )
                ),
                "losers must see a conflict, got {err}"
            );
        }
        assert_eq!(h.store.patients().unwrap().len(), 1);
        assert_consistent(&h);
    }

    #[test]
    fn test_reject_appends_reason_and_is_terminal() {
        let h = harness(vec![bed("ICU-001", "ICU", &[])]);
        let request = h
            .requests
            .create_request(&h.nurse, walk_in("ICU", &[]))
            .unwrap();

        let rejected = h
            .requests
            .reject_request(&h.admin, &request.id, "ICU full")
            .unwrap();
        assert_eq!(rejected.status, RequestStatus::Rejected);
        assert_eq!(
            rejected.notes.as_deref(),
            Some("Respiratory failure | Rejected: ICU full")
        );
        assert!(rejected.resolved_at.is_some());

        assert!(h
            .requests
            .reject_request(&h.admin, &request.id, "again")
            .is_err());
        assert!(h
            .requests
            .approve_request(&h.admin, &request.id, None)
            .is_err());
        assert_eq!(stored_bed(&h, "ICU-001").status, BedStatus::Available);
    }

    #[test]
    fn test_approver_roles_enforced() {
        let h = harness(vec![bed("ICU-001", "ICU", &[])]);
        let request = h
            .requests
            .create_request(&h.nurse, walk_in("ICU", &[]))
            .unwrap();

        for actor in [&h.nurse, &h.er] {
            let err = h
                .requests
                .approve_request(actor, &request.id, None)
                .unwrap_err();
            assert!(matches!(err, AllocationError::Forbidden { .. }));
        }
        assert!(h
            .requests
            .approve_request(&Actor::new("icu-1", StaffRole::IcuManager), &request.id, None)
            .is_ok());
    }

    #[test]
    fn test_reserve_then_cancel_releases_bed() {
        let h = harness(vec![bed("ICU-001", "ICU", &[])]);
        let request = h
            .requests
            .create_request(&h.nurse, walk_in("ICU", &[]))
            .unwrap();

        let reserved = h
            .requests
            .reserve_bed(&h.admin, &request.id, None)
            .unwrap();
        assert_eq!(reserved.status, RequestStatus::Approved);
        let b = stored_bed(&h, "ICU-001");
        assert!(b.is_reserved_for(&request.id));

        let cancelled = h.requests.cancel_request(&h.nurse, &request.id).unwrap();
        assert_eq!(cancelled.status, RequestStatus::Cancelled);
        let b = stored_bed(&h, "ICU-001");
        assert_eq!(b.status, BedStatus::Available);
        assert_eq!(b.reserved_for, None);
    }

    #[test]
    fn test_reserved_bed_is_used_on_approval() {
        let h = harness(vec![bed("ICU-001", "ICU", &[]), bed("ICU-002", "ICU", &[])]);
        let request = h
            .requests
            .create_request(&h.nurse, walk_in("ICU", &[]))
            .unwrap();
        h.requests
            .reserve_bed(&h.admin, &request.id, Some(&number("ICU-002")))
            .unwrap();

        let other = h
            .requests
            .create_request(&h.nurse, walk_in("ICU", &[]))
            .unwrap();
        let err = h
            .requests
            .approve_request(&h.admin, &other.id, Some(&number("ICU-002")))
            .unwrap_err();
        assert!(
            matches!(err, AllocationError::Conflict(ConflictKind::BedNotAvailable { .. })),
            "a bed reserved for another request is not available"
        );

        let approved = h
            .requests
            .approve_request(&h.admin, &request.id, None)
            .unwrap();
        assert_eq!(approved.status, RequestStatus::Assigned);
        assert_eq!(approved.assigned_bed, Some(number("ICU-002")));
        assert_eq!(stored_bed(&h, "ICU-002").status, BedStatus::Occupied);
        assert_consistent(&h);
    }

    #[test]
    fn test_approving_other_bed_releases_reservation() {
        let h = harness(vec![bed("ICU-001", "ICU", &[]), bed("ICU-002", "ICU", &[])]);
        let request = h
            .requests
            .create_request(&h.nurse, walk_in("ICU", &[]))
            .unwrap();
        h.requests
            .reserve_bed(&h.admin, &request.id, Some(&number("ICU-001")))
            .unwrap();

        h.requests
            .approve_request(&h.admin, &request.id, Some(&number("ICU-002")))
            .unwrap();
        assert_eq!(stored_bed(&h, "ICU-001").status, BedStatus::Available);
        assert_eq!(stored_bed(&h, "ICU-002").status, BedStatus::Occupied);
        assert_consistent(&h);
    }

    #[test]
    fn test_cancel_permissions() {
        let h = harness(vec![bed("ICU-001", "ICU", &[])]);
        let request = h
            .requests
            .create_request(&h.nurse, walk_in("ICU", &[]))
            .unwrap();

        let other_nurse = Actor::new("nurse-2", StaffRole::WardStaff);
        assert!(matches!(
            h.requests.cancel_request(&other_nurse, &request.id),
            Err(AllocationError::Forbidden { .. })
        ));
        assert!(h.requests.cancel_request(&h.er, &request.id).is_ok());
        assert!(matches!(
            h.requests.cancel_request(&h.nurse, &request.id),
            Err(AllocationError::Conflict(ConflictKind::AlreadyProcessed { .. }))
        ));
    }

    #[test]
    fn test_cancel_after_assignment_keeps_admission() {
        let h = harness(vec![bed("ICU-001", "ICU", &[])]);
        let request = h
            .requests
            .create_request(&h.nurse, walk_in("ICU", &[]))
            .unwrap();
        h.requests
            .approve_request(&h.admin, &request.id, None)
            .unwrap();

        let cancelled = h.requests.cancel_request(&h.admin, &request.id).unwrap();
        assert_eq!(cancelled.status, RequestStatus::Cancelled);
        assert_eq!(stored_bed(&h, "ICU-001").status, BedStatus::Occupied);
        assert_consistent(&h);
    }

    #[test]
    fn test_emergency_mode_uses_global_priority() {
        let h = harness(vec![
            bed("GW-001", "General Ward", &[]),
            bed("ER-001", "Emergency", &[]),
            bed("ICU-001", "ICU", &[]),
        ]);
        let mut new = walk_in("General Ward", &[]);
        new.mode = RequestMode::Emergency;

        assert!(matches!(
            h.requests.create_request(&h.nurse, new.clone()),
            Err(AllocationError::Forbidden { .. })
        ));
        let request = h.requests.create_request(&h.er, new).unwrap();
        assert_eq!(request.recommended_beds, vec![number("ER-001")]);
        assert_eq!(
            stored_bed(&h, "ER-001").status,
            BedStatus::Available,
            "emergency requests still have no side effects at creation"
        );
    }

    #[test]
    fn test_existing_patient_request_moves_patient() {
        let h = harness(vec![bed("GW-001", "General Ward", &[]), bed("ICU-001", "ICU", &[])]);
        let patient = h
            .admissions
            .admit_patient(
                &h.nurse,
                &Demographics {
                    name: "Ada".into(),
                    age: Some(70),
                    reason_for_admission: Some("Pneumonia".into()),
                    ..Demographics::default()
                },
                &number("GW-001"),
            )
            .unwrap();

        let mut new = walk_in("ICU", &[]);
        new.subject = RequestSubject::Patient {
            patient: patient.id,
        };
        let request = h.requests.create_request(&h.nurse, new).unwrap();
        let approved = h
            .requests
            .approve_request(&h.admin, &request.id, None)
            .unwrap();

        assert_eq!(approved.patient, Some(patient.id));
        assert_eq!(stored_bed(&h, "GW-001").status, BedStatus::Cleaning);
        assert!(stored_bed(&h, "ICU-001").is_occupied_by(&patient.id));
        assert_eq!(h.store.patients().unwrap().len(), 1);
        assert_consistent(&h);
    }

    #[test]
    fn test_fulfil_requires_occupied_bed() {
        let h = harness(vec![bed("ICU-001", "ICU", &[]), bed("ICU-002", "ICU", &[])]);
        let pending = h
            .requests
            .create_request(&h.nurse, walk_in("ICU", &[]))
            .unwrap();
        assert!(matches!(
            h.requests.fulfil_request(&h.nurse, &pending.id),
            Err(AllocationError::Conflict(ConflictKind::InvalidTransition { .. }))
        ));

        h.requests
            .reserve_bed(&h.admin, &pending.id, None)
            .unwrap();
        assert!(matches!(
            h.requests.fulfil_request(&h.nurse, &pending.id),
            Err(AllocationError::Conflict(ConflictKind::BedNotOccupied { .. }))
        ));

        h.requests
            .approve_request(&h.admin, &pending.id, None)
            .unwrap();
        let fulfilled = h.requests.fulfil_request(&h.nurse, &pending.id).unwrap();
        assert_eq!(fulfilled.status, RequestStatus::Fulfilled);
        assert!(h.sink.names().contains(&"request:fulfilled"));
    }

    #[test]
    fn test_fulfil_ignores_unrelated_occupant() {
        let h = harness(vec![bed("ICU-001", "ICU", &[])]);
        let request = h
            .requests
            .create_request(&h.nurse, walk_in("ICU", &[]))
            .unwrap();
        h.requests
            .reserve_bed(&h.admin, &request.id, None)
            .unwrap();
        h.admissions
            .set_bed_status(&h.admin, &number("ICU-001"), BedStatus::Available, None)
            .unwrap();
        let stranger = h
            .admissions
            .admit_patient(
                &h.nurse,
                &Demographics {
                    name: "Someone Else".into(),
                    age: Some(50),
                    reason_for_admission: Some("Fracture".into()),
                    ..Demographics::default()
                },
                &number("ICU-001"),
            )
            .unwrap();
        assert!(stored_bed(&h, "ICU-001").is_occupied_by(&stranger.id));

        let err = h
            .requests
            .fulfil_request(&h.nurse, &request.id)
            .expect_err("another patient in the bed must not fulfil the request");
        assert!(
            matches!(err, AllocationError::Conflict(ConflictKind::BedNotOccupied { .. })),
            "unexpected error: {err}"
        );
        assert_eq!(
            h.store.request(&request.id).unwrap().unwrap().status,
            RequestStatus::Approved,
            "request must stay approved"
        );
    }

    #[test]
    fn test_walk_in_without_name_rejected() {
        let h = harness(vec![]);
        let mut new = walk_in("ICU", &[]);
        new.subject = RequestSubject::WalkIn {
            demographics: Demographics::default(),
        };
        assert!(matches!(
            h.requests.create_request(&h.nurse, new),
            Err(AllocationError::Validation(_))
        ));
    }
}
