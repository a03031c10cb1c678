//! Wire types for the REST API.
//!
//! Enum-valued fields travel as lowercase strings and are parsed into core types by the `into_*`
//! conversions, so a bad value surfaces as `AllocationError::Validation` rather than a JSON
//! decoding failure.

use bedflow_core::{
    AllocationError, AllocationResult, Availability, Bed, BedNumber, BedRequest, Demographics,
    EquipmentTag, NewRequest, Patient, RecordUuid, RequestSubject, WardName, WardOccupancy,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    /// Error class: `validation`, `not_found`, `conflict`, `forbidden`, `unauthorised` or
    /// `internal`.
    pub error: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BedRes {
    pub number: String,
    pub ward: String,
    pub floor: u16,
    pub status: String,
    pub equipment: Vec<String>,
    pub current_patient: Option<String>,
    pub reserved_for: Option<String>,
    pub estimated_available_at: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

impl From<&Bed> for BedRes {
    fn from(bed: &Bed) -> Self {
        Self {
            number: bed.number.to_string(),
            ward: bed.ward.to_string(),
            floor: bed.floor,
            status: bed.status.as_str().into(),
            equipment: bed.equipment.iter().map(ToString::to_string).collect(),
            current_patient: bed.current_patient.map(|p| p.to_string()),
            reserved_for: bed.reserved_for.map(|r| r.to_string()),
            estimated_available_at: bed.estimated_available_at,
            last_updated: bed.last_updated,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListBedsRes {
    pub beds: Vec<BedRes>,
}

impl From<Vec<Bed>> for ListBedsRes {
    fn from(beds: Vec<Bed>) -> Self {
        Self {
            beds: beds.iter().map(BedRes::from).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub id: String,
    pub code: String,
    pub name: String,
    pub age: Option<u8>,
    pub gender: String,
    pub department: String,
    pub reason_for_admission: String,
    pub priority: String,
    pub status: String,
    pub assigned_bed: Option<String>,
    pub admitted_at: DateTime<Utc>,
    pub discharged_at: Option<DateTime<Utc>>,
    pub estimated_stay_days: Option<u32>,
    pub expected_discharge: Option<DateTime<Utc>>,
}

impl From<&Patient> for PatientRes {
    fn from(p: &Patient) -> Self {
        Self {
            id: p.id.to_string(),
            code: p.code.to_string(),
            name: p.name.to_string(),
            age: p.age,
            gender: p.gender.as_str().into(),
            department: p.department.clone(),
            reason_for_admission: p.reason_for_admission.clone(),
            priority: p.priority.as_str().into(),
            status: p.status.to_string(),
            assigned_bed: p.assigned_bed.as_ref().map(ToString::to_string),
            admitted_at: p.admitted_at,
            discharged_at: p.discharged_at,
            estimated_stay_days: p.estimated_stay_days,
            expected_discharge: p.expected_discharge,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientRes>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RequestRes {
    pub id: String,
    /// Referenced patient, or the patient admitted for a walk-in once approved.
    pub patient: Option<String>,
    /// Name given for a walk-in request.
    pub walk_in_name: Option<String>,
    pub ward: String,
    pub equipment: Vec<String>,
    pub priority: String,
    pub mode: String,
    pub status: String,
    pub recommended_beds: Vec<String>,
    pub assigned_bed: Option<String>,
    pub notes: Option<String>,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub fulfilled_at: Option<DateTime<Utc>>,
}

impl From<&BedRequest> for RequestRes {
    fn from(r: &BedRequest) -> Self {
        let walk_in_name = match &r.subject {
            RequestSubject::WalkIn { demographics } => Some(demographics.name.clone()),
            RequestSubject::Patient { .. } => None,
        };
        Self {
            id: r.id.to_string(),
            patient: r.patient_ref().map(|p| p.to_string()),
            walk_in_name,
            ward: r.ward.to_string(),
            equipment: r.equipment.iter().map(ToString::to_string).collect(),
            priority: r.priority.as_str().into(),
            mode: r.mode.as_str().into(),
            status: r.status.as_str().into(),
            recommended_beds: r.recommended_beds.iter().map(ToString::to_string).collect(),
            assigned_bed: r.assigned_bed.as_ref().map(ToString::to_string),
            notes: r.notes.clone(),
            requested_by: r.requested_by.clone(),
            requested_at: r.requested_at,
            resolved_at: r.resolved_at,
            fulfilled_at: r.fulfilled_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListRequestsRes {
    pub requests: Vec<RequestRes>,
}

/// Patient details as entered at admission or on a walk-in request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DemographicsReq {
    pub name: String,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub reason_for_admission: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub estimated_stay_days: Option<u32>,
    #[serde(default)]
    pub expected_discharge: Option<DateTime<Utc>>,
}

impl DemographicsReq {
    pub fn into_demographics(self) -> AllocationResult<Demographics> {
        Ok(Demographics {
            name: self.name,
            age: self.age,
            gender: parse_or_default(self.gender.as_deref())?,
            department: self.department,
            reason_for_admission: self.reason_for_admission,
            priority: parse_or_default(self.priority.as_deref())?,
            estimated_stay_days: self.estimated_stay_days,
            expected_discharge: self.expected_discharge,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdmitPatientReq {
    pub bed: String,
    pub patient: DemographicsReq,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TransferReq {
    pub bed: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SetBedStatusReq {
    pub status: String,
    /// Only meaningful when moving to `cleaning`; defaults to now plus the cleaning duration.
    #[serde(default)]
    pub estimated_available_at: Option<DateTime<Utc>>,
}

/// Body of `/beds/recommend` and `/beds/check-availability`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecommendReq {
    /// Requested ward; may be omitted in emergency mode.
    #[serde(default)]
    pub ward: Option<String>,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub emergency: bool,
    /// Stay inside `ward`; no overflow or hospital-wide fallback. Ignored in emergency mode.
    #[serde(default)]
    pub ward_only: bool,
}

impl RecommendReq {
    /// The requested ward, or `fallback` for an emergency query that names none.
    pub fn ward_or(&self, fallback: &WardName) -> AllocationResult<WardName> {
        match self.ward.as_deref() {
            Some(w) => Ok(WardName::new(w)?),
            None if self.emergency => Ok(fallback.clone()),
            None => Err(AllocationError::Validation("ward is required".into())),
        }
    }

    pub fn equipment_tags(&self) -> AllocationResult<Vec<EquipmentTag>> {
        parse_tags(&self.equipment)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecommendRes {
    pub bed: Option<BedRes>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityRes {
    pub recommended: Option<BedRes>,
    pub candidates: Vec<BedRes>,
}

impl From<Availability> for AvailabilityRes {
    fn from(a: Availability) -> Self {
        Self {
            recommended: a.recommended.as_ref().map(BedRes::from),
            candidates: a.candidates.iter().map(BedRes::from).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreateRequestReq {
    /// Existing patient id. Exactly one of `patient` and `walk_in` must be given.
    #[serde(default)]
    pub patient: Option<String>,
    #[serde(default)]
    pub walk_in: Option<DemographicsReq>,
    pub ward: String,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateRequestReq {
    pub fn into_new_request(self) -> AllocationResult<NewRequest> {
        let subject = match (self.patient, self.walk_in) {
            (Some(id), None) => RequestSubject::Patient {
                patient: RecordUuid::parse(&id)?,
            },
            (None, Some(demographics)) => RequestSubject::WalkIn {
                demographics: demographics.into_demographics()?,
            },
            _ => {
                return Err(AllocationError::Validation(
                    "exactly one of patient and walk_in is required".into(),
                ))
            }
        };
        Ok(NewRequest {
            subject,
            ward: WardName::new(&self.ward)?,
            equipment: parse_tags(&self.equipment)?,
            priority: parse_or_default(self.priority.as_deref())?,
            mode: parse_or_default(self.mode.as_deref())?,
            notes: self.notes,
        })
    }
}

/// Body of the approve and reserve actions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BedChoiceReq {
    /// Overrides the reserved or first recommended bed.
    #[serde(default)]
    pub bed: Option<String>,
}

impl BedChoiceReq {
    pub fn bed_number(&self) -> AllocationResult<Option<BedNumber>> {
        Ok(self.bed.as_deref().map(BedNumber::new).transpose()?)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RejectReq {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OccupancyRes {
    pub ward: String,
    pub total: usize,
    pub available: usize,
    pub occupied: usize,
    pub cleaning: usize,
    pub reserved: usize,
    pub maintenance: usize,
    pub occupancy_percent: f64,
}

impl From<&WardOccupancy> for OccupancyRes {
    fn from(o: &WardOccupancy) -> Self {
        Self {
            ward: o.ward.to_string(),
            total: o.total,
            available: o.available,
            occupied: o.occupied,
            cleaning: o.cleaning,
            reserved: o.reserved,
            maintenance: o.maintenance,
            occupancy_percent: o.occupancy_percent(),
        }
    }
}

fn parse_or_default<T>(value: Option<&str>) -> AllocationResult<T>
where
    T: Default + std::str::FromStr,
    AllocationError: From<T::Err>,
{
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => Ok(v.parse()?),
        None => Ok(T::default()),
    }
}

fn parse_tags(tags: &[String]) -> AllocationResult<Vec<EquipmentTag>> {
    tags.iter()
        .map(|t| EquipmentTag::new(t).map_err(AllocationError::from))
        .collect()
}
