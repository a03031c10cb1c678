//! Bed records and their status.
//!
//! A bed's fields are public so stores can (de)serialize them, but every status change made by
//! this crate goes through the methods below, which keep `current_patient`, `reserved_for` and
//! the cleaning timestamps consistent with `status`.

use crate::error::UnknownVariant;
use bedflow_types::{BedNumber, EquipmentTag, WardName};
use bedflow_uuid::RecordUuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedStatus {
    Available,
    Occupied,
    Cleaning,
    Reserved,
    Maintenance,
}

impl BedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BedStatus::Available => "available",
            BedStatus::Occupied => "occupied",
            BedStatus::Cleaning => "cleaning",
            BedStatus::Reserved => "reserved",
            BedStatus::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for BedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BedStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(BedStatus::Available),
            "occupied" => Ok(BedStatus::Occupied),
            "cleaning" => Ok(BedStatus::Cleaning),
            "reserved" => Ok(BedStatus::Reserved),
            "maintenance" => Ok(BedStatus::Maintenance),
            _ => Err(UnknownVariant {
                kind: "bed status",
                value: s.to_owned(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bed {
    pub number: BedNumber,
    pub ward: WardName,
    pub floor: u16,
    pub status: BedStatus,
    #[serde(default)]
    pub equipment: Vec<EquipmentTag>,
    #[serde(default)]
    pub current_patient: Option<RecordUuid>,
    /// Request holding this bed while `status == reserved`.
    #[serde(default)]
    pub reserved_for: Option<RecordUuid>,
    #[serde(default)]
    pub estimated_available_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cleaning_started_at: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
    /// Store version this copy was read at; `0` for a bed that has never been committed.
    #[serde(default)]
    pub version: u64,
}

impl Bed {
    /// A freshly provisioned, available bed.
    pub fn new(
        number: BedNumber,
        ward: WardName,
        floor: u16,
        equipment: Vec<EquipmentTag>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            number,
            ward,
            floor,
            status: BedStatus::Available,
            equipment,
            current_patient: None,
            reserved_for: None,
            estimated_available_at: None,
            cleaning_started_at: None,
            last_updated: now,
            version: 0,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == BedStatus::Available
    }

    pub fn is_occupied_by(&self, patient: &RecordUuid) -> bool {
        self.status == BedStatus::Occupied && self.current_patient.as_ref() == Some(patient)
    }

    pub fn is_reserved_for(&self, request: &RecordUuid) -> bool {
        self.status == BedStatus::Reserved && self.reserved_for.as_ref() == Some(request)
    }

    pub fn in_ward(&self, ward: &WardName) -> bool {
        self.ward.matches(ward)
    }

    /// True when the bed carries every tag in `required` (vacuously true for an empty list).
    pub fn has_all(&self, required: &[EquipmentTag]) -> bool {
        required.iter().all(|tag| self.equipment.contains(tag))
    }

    pub fn has_any(&self, required: &[EquipmentTag]) -> bool {
        required.iter().any(|tag| self.equipment.contains(tag))
    }

    pub(crate) fn occupy(&mut self, patient: RecordUuid, now: DateTime<Utc>) {
        self.set_status(BedStatus::Occupied, now);
        self.current_patient = Some(patient);
    }

    pub(crate) fn reserve(&mut self, request: RecordUuid, now: DateTime<Utc>) {
        self.set_status(BedStatus::Reserved, now);
        self.reserved_for = Some(request);
    }

    /// Moves the bed to `cleaning`, unlinking any patient.
    pub(crate) fn begin_cleaning(&mut self, ready_at: DateTime<Utc>, now: DateTime<Utc>) {
        self.set_status(BedStatus::Cleaning, now);
        self.cleaning_started_at = Some(now);
        self.estimated_available_at = Some(ready_at);
    }

    /// Operator override and housekeeping transitions other than occupy/reserve/clean.
    pub(crate) fn set_status(&mut self, status: BedStatus, now: DateTime<Utc>) {
        if status != BedStatus::Occupied {
            self.current_patient = None;
        }
        if status != BedStatus::Reserved {
            self.reserved_for = None;
        }
        if status != BedStatus::Cleaning {
            self.cleaning_started_at = None;
            self.estimated_available_at = None;
        }
        self.status = status;
        self.last_updated = now;
    }

    /// Cleaning bed whose estimated ready time has passed.
    pub fn cleaning_finished(&self, now: DateTime<Utc>) -> bool {
        self.status == BedStatus::Cleaning
            && self.estimated_available_at.is_some_and(|ready| ready <= now)
    }
}

/// Seed entry describing a bed to provision, as read from a YAML seed file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BedSpec {
    pub number: BedNumber,
    pub ward: WardName,
    #[serde(default = "default_floor")]
    pub floor: u16,
    #[serde(default)]
    pub equipment: Vec<EquipmentTag>,
    /// Provisioning status; only `available` and `maintenance` are accepted.
    #[serde(default)]
    pub status: Option<BedStatus>,
}

fn default_floor() -> u16 {
    1
}

impl BedSpec {
    pub fn into_bed(self, now: DateTime<Utc>) -> Bed {
        let status = self.status.unwrap_or(BedStatus::Available);
        let mut bed = Bed::new(self.number, self.ward, self.floor, self.equipment, now);
        if status == BedStatus::Maintenance {
            bed.set_status(BedStatus::Maintenance, now);
        }
        bed
    }
}
