//! Admission, discharge and transfer.
//!
//! Beds and patients reference each other (`Bed::current_patient`, `Patient::assigned_bed`).
//! The `apply_*` functions below are the only code that changes either side of that link, and
//! they always change both; the service then writes every touched record in a single
//! [`WriteBatch`], so a reader never sees a half-linked pair.
//!
//! A concurrent operation that changed one of the records first makes the commit fail with
//! `ConflictKind::StaleRecord`. Re-running an admission for the same patient and bed after such a
//! failure is safe: a bed already occupied by that patient is accepted as-is.

use super::helpers::{load_bed, load_patient, publish_all};
use crate::actor::Actor;
use crate::alerts::{bed_available_alert, AlertMonitor, WardOccupancy};
use crate::bed::{Bed, BedSpec, BedStatus};
use crate::config::{validate_bed_specs, CoreConfig};
use crate::error::{AllocationError, AllocationResult, ConflictKind, RecordKind};
use crate::events::{Event, EventSink};
use crate::patient::{Demographics, Patient, PatientStatus};
use crate::repo::allocate_patient_code;
use crate::store::{Store, WriteBatch};
use crate::validation::{validate_demographics, Intake, ValidDemographics};
use bedflow_types::{BedNumber, WardName};
use bedflow_uuid::{PatientCode, RecordUuid};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// Links `patient` and `bed`: the patient becomes admitted to the bed and the bed occupied by
/// the patient.
pub(crate) fn apply_admission(patient: &mut Patient, bed: &mut Bed, now: DateTime<Utc>) {
    if patient.discharged_at.is_some() {
        // Re-admission: the previous stay's estimate no longer applies.
        patient.expected_discharge = None;
    }
    patient.status = PatientStatus::Admitted;
    patient.assigned_bed = Some(bed.number.clone());
    patient.admitted_at = now;
    patient.discharged_at = None;
    patient.refresh_expected_discharge();
    bed.occupy(patient.id, now);
}

/// Discharges `patient`; the bed they held, if given, goes to cleaning until `ready_at`.
///
/// `assigned_bed` is kept on the patient as history.
pub(crate) fn apply_discharge(
    patient: &mut Patient,
    bed: Option<&mut Bed>,
    ready_at: DateTime<Utc>,
    now: DateTime<Utc>,
) {
    patient.status = PatientStatus::Discharged;
    patient.discharged_at = Some(now);
    if let Some(bed) = bed {
        bed.begin_cleaning(ready_at, now);
    }
}

/// Moves an admitted patient from `old` (if still linked) to `new`.
pub(crate) fn apply_transfer(
    patient: &mut Patient,
    old: Option<&mut Bed>,
    new: &mut Bed,
    ready_at: DateTime<Utc>,
    now: DateTime<Utc>,
) {
    if let Some(old) = old {
        old.begin_cleaning(ready_at, now);
    }
    new.occupy(patient.id, now);
    patient.assigned_bed = Some(new.number.clone());
}

/// A bed may receive a patient when it is available, or reserved for the request being served.
pub(crate) fn ensure_bed_admissible(
    bed: &Bed,
    reservation: Option<&RecordUuid>,
) -> Result<(), ConflictKind> {
    if bed.is_available() || reservation.is_some_and(|r| bed.is_reserved_for(r)) {
        return Ok(());
    }
    Err(ConflictKind::BedNotAvailable {
        bed: bed.number.clone(),
        status: bed.status,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum PlanKind {
    Admitted,
    Transferred { from: Option<BedNumber> },
    /// The patient already occupies the bed; nothing to write.
    Unchanged,
}

/// Records touched by an admission, ready to be written together.
#[derive(Clone, Debug)]
pub(crate) struct AdmissionPlan {
    pub(crate) patient: Patient,
    pub(crate) bed: Bed,
    pub(crate) vacated: Option<Bed>,
    pub(crate) kind: PlanKind,
}

impl AdmissionPlan {
    pub(crate) fn is_unchanged(&self) -> bool {
        self.kind == PlanKind::Unchanged
    }

    pub(crate) fn write_into(&self, batch: &mut WriteBatch) {
        if self.is_unchanged() {
            return;
        }
        batch.put_patient(self.patient.clone());
        batch.put_bed(self.bed.clone());
        if let Some(vacated) = &self.vacated {
            batch.put_bed(vacated.clone());
        }
    }

    /// The patient as committed, or as planned when nothing was written.
    pub(crate) fn committed_patient(&self, committed: &WriteBatch) -> Patient {
        committed
            .patient(&self.patient.id)
            .cloned()
            .unwrap_or_else(|| self.patient.clone())
    }

    pub(crate) fn events(&self, committed: &WriteBatch) -> Vec<Event> {
        if self.is_unchanged() {
            return Vec::new();
        }
        let patient = self.committed_patient(committed);
        let mut events: Vec<Event> = self
            .vacated
            .iter()
            .chain(std::iter::once(&self.bed))
            .map(|planned| Event::bed_updated(committed.bed(&planned.number).unwrap_or(planned)))
            .collect();
        events.push(match &self.kind {
            PlanKind::Transferred { from } => Event::PatientTransferred {
                patient: patient.id,
                from: from.clone(),
                to: self.bed.number.clone(),
            },
            _ => Event::patient_admitted(&patient),
        });
        events
    }
}

/// Service for bed-holding patient operations.
///
/// Holds the shared store, event sink and alert monitor; cloning is cheap.
#[derive(Clone)]
pub struct AdmissionService {
    pub(crate) cfg: Arc<CoreConfig>,
    pub(crate) store: Arc<dyn Store>,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) alerts: Arc<AlertMonitor>,
}

impl AdmissionService {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn Store>, events: Arc<dyn EventSink>) -> Self {
        let alerts = Arc::new(AlertMonitor::new(cfg.alert_window()));
        Self {
            cfg,
            store,
            events,
            alerts,
        }
    }

    /// Admits a new patient to an available bed.
    ///
    /// # Arguments
    ///
    /// * `actor` - Staff member performing the admission.
    /// * `demographics` - Patient details; name, age and reason for admission are required.
    /// * `bed_number` - The bed to admit to.
    ///
    /// # Returns
    ///
    /// The committed patient record, with a freshly allocated patient code.
    ///
    /// # Errors
    ///
    /// - `Validation` if the demographics are incomplete,
    /// - `NotFound` if the bed does not exist,
    /// - `Conflict(BedNotAvailable)` if the bed is not available,
    /// - `Conflict(StaleRecord)` if the bed changed while the admission was prepared.
    pub fn admit_patient(
        &self,
        actor: &Actor,
        demographics: &Demographics,
        bed_number: &BedNumber,
    ) -> AllocationResult<Patient> {
        let valid = validate_demographics(demographics, Intake::Ward)?;
        let now = Utc::now();
        let bed = load_bed(self.store.as_ref(), bed_number)?;
        let plan = self
            .plan_new_admission(valid, bed, None, now)
            .inspect_err(|e| tracing::warn!(bed = %bed_number, error = %e, "admission refused"))?;

        let (patient, _) = self.commit_admission(&plan, WriteBatch::new(), now)?;
        tracing::info!(
            staff = %actor.staff_id,
            patient = %patient.id,
            code = %patient.code,
            bed = %bed_number,
            "patient admitted"
        );
        Ok(patient)
    }

    /// Admits a patient already on record.
    ///
    /// Succeeds without writing anything when the patient already occupies `bed_number`. A
    /// patient admitted elsewhere is moved, leaving the old bed to cleaning.
    pub fn admit_existing(
        &self,
        actor: &Actor,
        patient_id: &RecordUuid,
        bed_number: &BedNumber,
    ) -> AllocationResult<Patient> {
        let now = Utc::now();
        let patient = load_patient(self.store.as_ref(), patient_id)?;
        let bed = load_bed(self.store.as_ref(), bed_number)?;
        let plan = self
            .plan_existing_admission(patient, bed, None, now)
            .inspect_err(|e| tracing::warn!(bed = %bed_number, error = %e, "admission refused"))?;

        let (patient, _) = self.commit_admission(&plan, WriteBatch::new(), now)?;
        tracing::info!(
            staff = %actor.staff_id,
            patient = %patient.id,
            bed = %bed_number,
            unchanged = plan.is_unchanged(),
            "existing patient admitted"
        );
        Ok(patient)
    }

    /// Discharges an admitted patient and sends their bed to cleaning.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the patient does not exist,
    /// - `Conflict(AlreadyDischarged)` if the patient was discharged before,
    /// - `Conflict(NotAdmitted)` for any other non-admitted status.
    pub fn discharge_patient(
        &self,
        actor: &Actor,
        patient_id: &RecordUuid,
    ) -> AllocationResult<Patient> {
        let now = Utc::now();
        let mut patient = load_patient(self.store.as_ref(), patient_id)?;
        match patient.status {
            PatientStatus::Admitted => {}
            PatientStatus::Discharged => {
                tracing::warn!(patient = %patient_id, "discharge refused: already discharged");
                return Err(ConflictKind::AlreadyDischarged {
                    patient: *patient_id,
                }
                .into());
            }
            status => {
                tracing::warn!(patient = %patient_id, %status, "discharge refused: not admitted");
                return Err(ConflictKind::NotAdmitted {
                    patient: *patient_id,
                    status,
                }
                .into());
            }
        }

        let mut bed = self.linked_bed(&patient)?;
        apply_discharge(&mut patient, bed.as_mut(), self.ready_at(now), now);

        let mut batch = WriteBatch::new();
        batch.put_patient(patient);
        if let Some(bed) = bed {
            batch.put_bed(bed);
        }
        let committed = self.store.commit(batch)?;

        let patient = load_committed_patient(&committed, patient_id)?;
        tracing::info!(
            staff = %actor.staff_id,
            patient = %patient.id,
            bed = ?patient.assigned_bed,
            "patient discharged"
        );
        publish_all(
            self.events.as_ref(),
            std::iter::once(Event::patient_discharged(&patient))
                .chain(committed.beds().map(Event::bed_updated)),
        );
        Ok(patient)
    }

    /// Moves an admitted patient to another available bed.
    ///
    /// The old bed goes to cleaning, the new bed becomes occupied and the patient stays
    /// admitted. All three records are written in one commit.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the patient or the new bed does not exist,
    /// - `Conflict(NotAdmitted)` if the patient is not admitted,
    /// - `Conflict(BedNotAvailable)` if the new bed is not available.
    pub fn transfer_patient(
        &self,
        actor: &Actor,
        patient_id: &RecordUuid,
        new_bed: &BedNumber,
    ) -> AllocationResult<Patient> {
        let now = Utc::now();
        let mut patient = load_patient(self.store.as_ref(), patient_id)?;
        if !patient.is_admitted() {
            tracing::warn!(patient = %patient_id, status = %patient.status, "transfer refused");
            return Err(ConflictKind::NotAdmitted {
                patient: *patient_id,
                status: patient.status,
            }
            .into());
        }

        let mut bed = load_bed(self.store.as_ref(), new_bed)?;
        ensure_bed_admissible(&bed, None)
            .inspect_err(|e| tracing::warn!(bed = %new_bed, error = %e, "transfer refused"))?;

        let from = patient.assigned_bed.clone();
        let mut old = self.linked_bed(&patient)?;
        apply_transfer(&mut patient, old.as_mut(), &mut bed, self.ready_at(now), now);

        let plan = AdmissionPlan {
            patient,
            bed,
            vacated: old,
            kind: PlanKind::Transferred { from },
        };
        let (patient, _) = self.commit_admission(&plan, WriteBatch::new(), now)?;
        tracing::info!(
            staff = %actor.staff_id,
            patient = %patient.id,
            to = %new_bed,
            "patient transferred"
        );
        Ok(patient)
    }

    /// Operator override of a bed's status.
    ///
    /// `occupied` can only be reached through an admission, and an occupied bed with a linked
    /// patient cannot be changed until the patient is discharged or transferred. Moving to
    /// `cleaning` sets the estimated available time to `ready_at`, or the configured cleaning
    /// duration from now.
    pub fn set_bed_status(
        &self,
        actor: &Actor,
        bed_number: &BedNumber,
        status: BedStatus,
        ready_at: Option<DateTime<Utc>>,
    ) -> AllocationResult<Bed> {
        let now = Utc::now();
        let mut bed = load_bed(self.store.as_ref(), bed_number)?;

        if status == BedStatus::Occupied {
            return Err(ConflictKind::OccupancyRequiresAdmission {
                bed: bed.number.clone(),
            }
            .into());
        }
        if let Some(patient) = bed.current_patient.filter(|_| bed.status == BedStatus::Occupied) {
            tracing::warn!(bed = %bed_number, %patient, %status, "status change refused: patient still linked");
            return Err(ConflictKind::PatientStillLinked {
                bed: bed.number.clone(),
                patient,
            }
            .into());
        }
        if let Some(at) = ready_at.filter(|at| *at <= now) {
            return Err(AllocationError::Validation(format!(
                "estimated available time {at} is not in the future"
            )));
        }

        match status {
            BedStatus::Cleaning => bed.begin_cleaning(ready_at.unwrap_or(self.ready_at(now)), now),
            other => bed.set_status(other, now),
        }

        let mut batch = WriteBatch::new();
        batch.put_bed(bed);
        let committed = self.store.commit(batch)?;
        let bed = load_committed_bed(&committed, bed_number)?;

        tracing::info!(staff = %actor.staff_id, bed = %bed.number, status = %bed.status, "bed status set");
        self.events.publish(&Event::bed_updated(&bed));
        Ok(bed)
    }

    /// Returns every bed whose cleaning estimate has passed to `available`.
    pub fn complete_cleaning(&self, now: DateTime<Utc>) -> AllocationResult<Vec<Bed>> {
        let mut batch = WriteBatch::new();
        for mut bed in self.store.beds()? {
            if bed.cleaning_finished(now) {
                bed.set_status(BedStatus::Available, now);
                batch.put_bed(bed);
            }
        }
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let committed = self.store.commit(batch)?;
        let beds: Vec<Bed> = committed.beds().cloned().collect();
        tracing::info!(count = beds.len(), "cleaning completed");

        publish_all(self.events.as_ref(), beds.iter().map(Event::bed_updated));
        let alerts = beds.iter().map(|b| bed_available_alert(b, now)).collect();
        publish_all(
            self.events.as_ref(),
            self.alerts.admit(alerts).into_iter().map(Event::AlertRaised),
        );
        Ok(beds)
    }

    /// Adds beds from `specs` that are not in the store yet.
    ///
    /// Existing beds are left untouched, so provisioning the same seed twice is harmless.
    pub fn provision_beds(&self, specs: Vec<BedSpec>) -> AllocationResult<Vec<Bed>> {
        validate_bed_specs(&specs)?;
        let now = Utc::now();
        let existing: HashSet<BedNumber> =
            self.store.beds()?.into_iter().map(|b| b.number).collect();

        let mut batch = WriteBatch::new();
        for spec in specs {
            if existing.contains(&spec.number) {
                tracing::debug!(bed = %spec.number, "bed already provisioned");
                continue;
            }
            batch.put_bed(spec.into_bed(now));
        }
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let committed = self.store.commit(batch)?;
        let beds: Vec<Bed> = committed.beds().cloned().collect();
        tracing::info!(count = beds.len(), "beds provisioned");
        publish_all(self.events.as_ref(), beds.iter().map(Event::bed_updated));
        Ok(beds)
    }

    pub(crate) fn plan_new_admission(
        &self,
        valid: ValidDemographics,
        mut bed: Bed,
        reservation: Option<&RecordUuid>,
        now: DateTime<Utc>,
    ) -> AllocationResult<AdmissionPlan> {
        ensure_bed_admissible(&bed, reservation)?;
        let code = allocate_patient_code(
            self.store.as_ref(),
            || PatientCode::random(&mut rand::thread_rng()),
            self.cfg.patient_code_attempts(),
            now,
        )?;
        let mut patient = Patient::register(
            code,
            valid.name,
            valid.demographics,
            valid.department,
            valid.reason_for_admission,
            now,
        );
        apply_admission(&mut patient, &mut bed, now);
        Ok(AdmissionPlan {
            patient,
            bed,
            vacated: None,
            kind: PlanKind::Admitted,
        })
    }

    pub(crate) fn plan_existing_admission(
        &self,
        mut patient: Patient,
        mut bed: Bed,
        reservation: Option<&RecordUuid>,
        now: DateTime<Utc>,
    ) -> AllocationResult<AdmissionPlan> {
        let already_there = patient.is_admitted()
            && bed.is_occupied_by(&patient.id)
            && patient.assigned_bed.as_ref() == Some(&bed.number);
        if already_there {
            return Ok(AdmissionPlan {
                patient,
                bed,
                vacated: None,
                kind: PlanKind::Unchanged,
            });
        }

        ensure_bed_admissible(&bed, reservation)?;
        if patient.is_admitted() {
            let from = patient.assigned_bed.clone();
            let mut vacated = self.linked_bed(&patient)?;
            apply_transfer(&mut patient, vacated.as_mut(), &mut bed, self.ready_at(now), now);
            return Ok(AdmissionPlan {
                patient,
                bed,
                vacated,
                kind: PlanKind::Transferred { from },
            });
        }

        apply_admission(&mut patient, &mut bed, now);
        Ok(AdmissionPlan {
            patient,
            bed,
            vacated: None,
            kind: PlanKind::Admitted,
        })
    }

    /// Writes `plan` together with whatever `batch` already holds, then publishes the admission
    /// events and evaluates occupancy alerts for the bed's ward.
    ///
    /// Returns the committed patient and every committed record.
    pub(crate) fn commit_admission(
        &self,
        plan: &AdmissionPlan,
        mut batch: WriteBatch,
        now: DateTime<Utc>,
    ) -> AllocationResult<(Patient, WriteBatch)> {
        plan.write_into(&mut batch);
        if batch.is_empty() {
            return Ok((plan.patient.clone(), batch));
        }
        let committed = self.store.commit(batch)?;
        publish_all(self.events.as_ref(), plan.events(&committed));
        if !plan.is_unchanged() {
            self.raise_occupancy_alerts(&plan.bed.ward, now);
        }
        Ok((plan.committed_patient(&committed), committed))
    }

    pub(crate) fn raise_occupancy_alerts(&self, ward: &WardName, now: DateTime<Utc>) {
        let beds = match self.store.beds() {
            Ok(beds) => beds,
            Err(e) => {
                tracing::warn!(%ward, error = %e, "occupancy check skipped");
                return;
            }
        };
        let alerts = WardOccupancy::from_beds(ward, &beds).evaluate(now);
        for alert in self.alerts.admit(alerts) {
            tracing::info!(%ward, kind = ?alert.kind, severity = ?alert.severity, "{}", alert.message);
            self.events.publish(&Event::AlertRaised(alert));
        }
    }

    /// The patient's bed, if it still points back at them.
    fn linked_bed(&self, patient: &Patient) -> AllocationResult<Option<Bed>> {
        let Some(number) = &patient.assigned_bed else {
            return Ok(None);
        };
        let bed = self.store.bed(number)?;
        if bed.as_ref().is_some_and(|b| b.is_occupied_by(&patient.id)) {
            return Ok(bed);
        }
        tracing::warn!(patient = %patient.id, bed = %number, "assigned bed is not linked back; leaving it untouched");
        Ok(None)
    }

    fn ready_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.cfg.cleaning_duration()
    }
}

fn load_committed_patient(committed: &WriteBatch, id: &RecordUuid) -> AllocationResult<Patient> {
    committed
        .patient(id)
        .cloned()
        .ok_or_else(|| AllocationError::not_found(RecordKind::Patient, id))
}

fn load_committed_bed(committed: &WriteBatch, number: &BedNumber) -> AllocationResult<Bed> {
    committed
        .bed(number)
        .cloned()
        .ok_or_else(|| AllocationError::not_found(RecordKind::Bed, number))
}
