//! The allocation service facade.
//!
//! [`AllocationService`] is the single entry point the REST router and the CLI hold. Writes are
//! delegated to the admission and request services; reads and matcher queries run here.

use crate::actor::Actor;
use crate::alerts::WardOccupancy;
use crate::bed::{Bed, BedSpec, BedStatus};
use crate::config::CoreConfig;
use crate::consistency::{audit, Inconsistency};
use crate::error::AllocationResult;
use crate::events::EventSink;
use crate::matcher::BedMatcher;
use crate::patient::{Demographics, Patient};
use crate::repositories::admissions::AdmissionService;
use crate::repositories::helpers::{load_bed, load_patient, load_request};
use crate::repositories::requests::RequestService;
use crate::request::{BedRequest, NewRequest};
use crate::store::Store;
use bedflow_types::{BedNumber, EquipmentTag, WardName};
use bedflow_uuid::RecordUuid;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Result of an availability check: the matcher's pick plus the beds it chose from.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Availability {
    pub recommended: Option<Bed>,
    pub candidates: Vec<Bed>,
}

/// Bed allocation operations over one store.
#[derive(Clone)]
pub struct AllocationService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn Store>,
    admissions: AdmissionService,
    requests: RequestService,
}

impl AllocationService {
    /// Creates a new instance of AllocationService.
    ///
    /// # Arguments
    ///
    /// * `cfg` - Resolved core configuration.
    /// * `store` - Record store shared by every operation.
    /// * `events` - Sink receiving every state-change event and alert.
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn Store>, events: Arc<dyn EventSink>) -> Self {
        let admissions = AdmissionService::new(cfg.clone(), store.clone(), events);
        Self {
            requests: RequestService::new(admissions.clone()),
            cfg,
            store,
            admissions,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    // Reads

    pub fn beds(&self) -> AllocationResult<Vec<Bed>> {
        let mut beds = self.store.beds()?;
        beds.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(beds)
    }

    pub fn bed(&self, number: &BedNumber) -> AllocationResult<Bed> {
        load_bed(self.store.as_ref(), number)
    }

    /// Available beds, optionally limited to one ward, in bed-number order.
    pub fn available_beds(&self, ward: Option<&WardName>) -> AllocationResult<Vec<Bed>> {
        let beds = self.store.beds()?;
        let matcher = BedMatcher::new(&beds, &self.cfg);
        let wards: Vec<&WardName> = ward.into_iter().collect();
        Ok(matcher.available_in(&wards).into_iter().cloned().collect())
    }

    pub fn patients(&self) -> AllocationResult<Vec<Patient>> {
        let mut patients = self.store.patients()?;
        patients.sort_by(|a, b| b.admitted_at.cmp(&a.admitted_at));
        Ok(patients)
    }

    pub fn patient(&self, id: &RecordUuid) -> AllocationResult<Patient> {
        load_patient(self.store.as_ref(), id)
    }

    /// Every request, newest first.
    pub fn requests(&self) -> AllocationResult<Vec<BedRequest>> {
        let mut requests = self.store.requests()?;
        requests.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(requests)
    }

    pub fn request(&self, id: &RecordUuid) -> AllocationResult<BedRequest> {
        load_request(self.store.as_ref(), id)
    }

    pub fn ward_occupancy(&self, ward: &WardName) -> AllocationResult<WardOccupancy> {
        Ok(WardOccupancy::from_beds(ward, &self.store.beds()?))
    }

    /// Checks both directions of every bed/patient link in the store.
    pub fn audit(&self) -> AllocationResult<Vec<Inconsistency>> {
        Ok(audit(&self.store.beds()?, &self.store.patients()?))
    }

    // Matcher

    pub fn recommend_bed(
        &self,
        ward: &WardName,
        tags: &[EquipmentTag],
    ) -> AllocationResult<Option<Bed>> {
        let beds = self.store.beds()?;
        Ok(BedMatcher::new(&beds, &self.cfg).recommend(ward, tags).cloned())
    }

    /// Ward-only query: no overflow or hospital-wide fallback.
    pub fn recommend_bed_in_ward(
        &self,
        ward: &WardName,
        tags: &[EquipmentTag],
    ) -> AllocationResult<Option<Bed>> {
        let beds = self.store.beds()?;
        Ok(BedMatcher::new(&beds, &self.cfg)
            .recommend_in_ward(ward, tags)
            .cloned())
    }

    pub fn recommend_bed_global(&self, tags: &[EquipmentTag]) -> AllocationResult<Option<Bed>> {
        let beds = self.store.beds()?;
        Ok(BedMatcher::new(&beds, &self.cfg)
            .recommend_global(tags)
            .cloned())
    }

    /// Matcher output without filing a request.
    ///
    /// In emergency mode the recommendation comes from the ward-priority search and the
    /// candidates are the available beds of the priority wards, in priority order. Otherwise the
    /// candidates are the available beds of `ward`.
    pub fn check_availability(
        &self,
        ward: &WardName,
        tags: &[EquipmentTag],
        emergency: bool,
    ) -> AllocationResult<Availability> {
        let beds = self.store.beds()?;
        let matcher = BedMatcher::new(&beds, &self.cfg);
        let (recommended, candidates) = if emergency {
            let candidates = self
                .cfg
                .ward_priority()
                .iter()
                .flat_map(|w| matcher.available_in(&[w]))
                .collect::<Vec<_>>();
            (matcher.recommend_global(tags), candidates)
        } else {
            (matcher.recommend(ward, tags), matcher.available_in(&[ward]))
        };
        tracing::debug!(
            %ward,
            emergency,
            recommended = ?recommended.map(|b| &b.number),
            candidates = candidates.len(),
            "availability checked"
        );
        Ok(Availability {
            recommended: recommended.cloned(),
            candidates: candidates.into_iter().cloned().collect(),
        })
    }

    // Requests

    pub fn create_request(&self, actor: &Actor, new: NewRequest) -> AllocationResult<BedRequest> {
        self.requests.create_request(actor, new)
    }

    pub fn reserve_bed(
        &self,
        actor: &Actor,
        id: &RecordUuid,
        bed: Option<&BedNumber>,
    ) -> AllocationResult<BedRequest> {
        self.requests.reserve_bed(actor, id, bed)
    }

    pub fn approve_request(
        &self,
        actor: &Actor,
        id: &RecordUuid,
        bed: Option<&BedNumber>,
    ) -> AllocationResult<BedRequest> {
        self.requests.approve_request(actor, id, bed)
    }

    pub fn reject_request(
        &self,
        actor: &Actor,
        id: &RecordUuid,
        reason: &str,
    ) -> AllocationResult<BedRequest> {
        self.requests.reject_request(actor, id, reason)
    }

    pub fn cancel_request(&self, actor: &Actor, id: &RecordUuid) -> AllocationResult<BedRequest> {
        self.requests.cancel_request(actor, id)
    }

    pub fn fulfil_request(&self, actor: &Actor, id: &RecordUuid) -> AllocationResult<BedRequest> {
        self.requests.fulfil_request(actor, id)
    }

    // Admissions

    pub fn admit_patient(
        &self,
        actor: &Actor,
        demographics: &Demographics,
        bed: &BedNumber,
    ) -> AllocationResult<Patient> {
        self.admissions.admit_patient(actor, demographics, bed)
    }

    pub fn admit_existing(
        &self,
        actor: &Actor,
        patient: &RecordUuid,
        bed: &BedNumber,
    ) -> AllocationResult<Patient> {
        self.admissions.admit_existing(actor, patient, bed)
    }

    pub fn discharge_patient(&self, actor: &Actor, patient: &RecordUuid) -> AllocationResult<Patient> {
        self.admissions.discharge_patient(actor, patient)
    }

    pub fn transfer_patient(
        &self,
        actor: &Actor,
        patient: &RecordUuid,
        bed: &BedNumber,
    ) -> AllocationResult<Patient> {
        self.admissions.transfer_patient(actor, patient, bed)
    }

    pub fn set_bed_status(
        &self,
        actor: &Actor,
        bed: &BedNumber,
        status: BedStatus,
        ready_at: Option<DateTime<Utc>>,
    ) -> AllocationResult<Bed> {
        self.admissions.set_bed_status(actor, bed, status, ready_at)
    }

    pub fn complete_cleaning(&self, now: DateTime<Utc>) -> AllocationResult<Vec<Bed>> {
        self.admissions.complete_cleaning(now)
    }

    pub fn provision_beds(&self, specs: Vec<BedSpec>) -> AllocationResult<Vec<Bed>> {
        self.admissions.provision_beds(specs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::StaffRole;
    use crate::error::{AllocationError, ConflictKind};
    use crate::events::MemorySink;
    use crate::patient::PatientStatus;
    use crate::request::{RequestMode, RequestPriority, RequestStatus, RequestSubject};
    use crate::store::{FileStore, MemoryStore};
    use tempfile::TempDir;

    fn spec(number: &str, ward: &str, equipment: &[&str]) -> BedSpec {
        BedSpec {
            number: BedNumber::new(number).unwrap(),
            ward: WardName::new(ward).unwrap(),
            floor: 1,
            equipment: equipment
                .iter()
                .map(|t| EquipmentTag::new(t).unwrap())
                .collect(),
            status: None,
        }
    }

    fn hospital() -> Vec<BedSpec> {
        vec![
            spec("ER-001", "Emergency", &[]),
            spec("ER-002", "Emergency", &["Monitor"]),
            spec("GW-001", "General Ward", &[]),
            spec("ICU-001", "ICU", &["Monitor"]),
            spec("ICU-002", "ICU", &["Ventilator", "Monitor"]),
        ]
    }

    fn service_over(store: Arc<dyn Store>) -> (AllocationService, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let service = AllocationService::new(Arc::new(CoreConfig::default()), store, sink.clone());
        service.provision_beds(hospital()).unwrap();
        sink.clear();
        (service, sink)
    }

    fn service() -> (AllocationService, Arc<MemorySink>) {
        service_over(Arc::new(MemoryStore::new()))
    }

    fn tags(t: &[&str]) -> Vec<EquipmentTag> {
        t.iter().map(|t| EquipmentTag::new(t).unwrap()).collect()
    }

    fn ward(w: &str) -> WardName {
        WardName::new(w).unwrap()
    }

    fn number(n: &str) -> BedNumber {
        BedNumber::new(n).unwrap()
    }

    fn nurse() -> Actor {
        Actor::new("nurse-1", StaffRole::WardStaff)
    }

    fn admin() -> Actor {
        Actor::new("admin-1", StaffRole::HospitalAdmin)
    }

    fn adult(name: &str) -> Demographics {
        Demographics {
            name: name.into(),
            age: Some(54),
            reason_for_admission: Some("Chest pain".into()),
            estimated_stay_days: Some(3),
            ..Demographics::default()
        }
    }

    #[test]
    fn test_provisioning_is_idempotent() {
        let (service, sink) = service();
        assert!(service.provision_beds(hospital()).unwrap().is_empty());
        assert!(sink.events().is_empty(), "nothing new, nothing published");
        assert_eq!(service.beds().unwrap().len(), 5);
    }

    #[test]
    fn test_recommendation_reads_do_not_write() {
        let (service, sink) = service();
        let before = service.beds().unwrap();

        let best = service
            .recommend_bed(&ward("ICU"), &tags(&["Ventilator"]))
            .unwrap()
            .expect("ICU-002 has a ventilator");
        assert_eq!(best.number, number("ICU-002"));
        assert_eq!(
            service.recommend_bed_global(&[]).unwrap().map(|b| b.number),
            Some(number("ER-001"))
        );

        assert_eq!(service.beds().unwrap(), before);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_ward_only_query_has_no_fallback() {
        let (service, _) = service();
        service
            .admit_patient(&nurse(), &adult("Ada"), &number("GW-001"))
            .unwrap();

        assert_eq!(
            service.recommend_bed_in_ward(&ward("General Ward"), &[]).unwrap(),
            None,
            "a full ward has nothing to offer on its own"
        );
        assert_eq!(
            service
                .recommend_bed(&ward("General Ward"), &[])
                .unwrap()
                .map(|b| b.number),
            Some(number("ER-001")),
            "the cascade falls back to the overflow ward"
        );
        assert_eq!(
            service
                .recommend_bed_in_ward(&ward("ICU"), &tags(&["Ventilator"]))
                .unwrap()
                .map(|b| b.number),
            Some(number("ICU-002"))
        );
    }

    #[test]
    fn test_check_availability_modes() {
        let (service, _) = service();

        let standard = service
            .check_availability(&ward("ICU"), &tags(&["Monitor"]), false)
            .unwrap();
        assert_eq!(
            standard.recommended.map(|b| b.number),
            Some(number("ICU-001"))
        );
        let numbers: Vec<_> = standard.candidates.iter().map(|b| b.number.as_str()).collect();
        assert_eq!(numbers, vec!["ICU-001", "ICU-002"]);

        let emergency = service
            .check_availability(&ward("ICU"), &[], true)
            .unwrap();
        assert_eq!(
            emergency.recommended.map(|b| b.number),
            Some(number("ER-001"))
        );
        let numbers: Vec<_> = emergency.candidates.iter().map(|b| b.number.as_str()).collect();
        assert_eq!(
            numbers,
            vec!["ER-001", "ER-002", "ICU-001", "ICU-002", "GW-001"],
            "candidates follow the ward priority order"
        );
    }

    #[test]
    fn test_admit_discharge_scenario() {
        let (service, sink) = service();
        let patient = service
            .admit_patient(&nurse(), &adult("Ada"), &number("GW-001"))
            .unwrap();
        assert_eq!(patient.status, PatientStatus::Admitted);
        assert!(patient.expected_discharge.is_some());
        assert_eq!(
            service.bed(&number("GW-001")).unwrap().current_patient,
            Some(patient.id)
        );

        let discharged = service.discharge_patient(&nurse(), &patient.id).unwrap();
        assert_eq!(discharged.status, PatientStatus::Discharged);
        assert_eq!(discharged.assigned_bed, Some(number("GW-001")));
        let bed = service.bed(&number("GW-001")).unwrap();
        assert_eq!(bed.status, BedStatus::Cleaning);
        assert!(bed.estimated_available_at.is_some());

        let err = service.discharge_patient(&nurse(), &patient.id).unwrap_err();
        assert!(matches!(
            err,
            AllocationError::Conflict(ConflictKind::AlreadyDischarged { .. })
        ));
        assert!(sink.names().contains(&"patient:discharged"));
        assert!(service.audit().unwrap().is_empty());
    }

    #[test]
    fn test_occupancy_alert_after_filling_ward() {
        let (service, sink) = service();
        service
            .admit_patient(&nurse(), &adult("Ada"), &number("GW-001"))
            .unwrap();

        let occupancy = service.ward_occupancy(&ward("General Ward")).unwrap();
        assert_eq!((occupancy.total, occupancy.occupied), (1, 1));
        assert!(
            sink.names().contains(&"alert:new"),
            "a full ward raises an alert"
        );
    }

    #[test]
    fn test_complete_cleaning_returns_beds() {
        let (service, sink) = service();
        let patient = service
            .admit_patient(&nurse(), &adult("Ada"), &number("GW-001"))
            .unwrap();
        service.discharge_patient(&nurse(), &patient.id).unwrap();
        sink.clear();

        assert!(service.complete_cleaning(Utc::now()).unwrap().is_empty());
        let later = Utc::now() + chrono::Duration::hours(1);
        let ready = service.complete_cleaning(later).unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].status, BedStatus::Available);
        assert!(sink.names().contains(&"bed:updated"));
    }

    #[test]
    fn test_request_flow_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bedflow.yaml");

        let request_id = {
            let store = Arc::new(FileStore::open(&path).unwrap());
            let (service, _) = service_over(store);
            let request = service
                .create_request(
                    &nurse(),
                    NewRequest {
                        subject: RequestSubject::WalkIn {
                            demographics: Demographics {
                                name: "Walk In".into(),
                                ..Demographics::default()
                            },
                        },
                        ward: ward("ICU"),
                        equipment: tags(&["Ventilator"]),
                        priority: RequestPriority::Critical,
                        mode: RequestMode::Standard,
                        notes: None,
                    },
                )
                .unwrap();
            service.approve_request(&admin(), &request.id, None).unwrap();
            request.id
        };

        let store = Arc::new(FileStore::open(&path).unwrap());
        let service = AllocationService::new(
            Arc::new(CoreConfig::default()),
            store,
            Arc::new(MemorySink::new()),
        );
        let request = service.request(&request_id).unwrap();
        assert_eq!(request.status, RequestStatus::Assigned);
        assert_eq!(request.assigned_bed, Some(number("ICU-002")));
        assert_eq!(service.requests().unwrap().len(), 1);
        assert!(service.audit().unwrap().is_empty(), "reloaded links stay consistent");
    }
}
