//! Bed/patient link audit.
//!
//! Every write path keeps beds and patients linked in both directions inside one commit, so a
//! healthy store never reports anything here. The audit exists for stores edited by hand or
//! imported from elsewhere, and runs at startup.

use crate::bed::{Bed, BedStatus};
use crate::patient::Patient;
use bedflow_types::BedNumber;
use bedflow_uuid::RecordUuid;
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inconsistency {
    /// Occupied bed with no patient linked.
    OccupiedWithoutPatient { bed: BedNumber },
    /// Bed links a patient while not occupied.
    PatientOnFreeBed {
        bed: BedNumber,
        status: BedStatus,
        patient: RecordUuid,
    },
    /// Bed links a patient id that is not in the store.
    UnknownPatient { bed: BedNumber, patient: RecordUuid },
    /// Bed links a patient who is not admitted to it.
    PatientElsewhere { bed: BedNumber, patient: RecordUuid },
    /// Admitted patient without a bed.
    AdmittedWithoutBed { patient: RecordUuid },
    /// Admitted patient whose bed does not exist.
    UnknownBed { patient: RecordUuid, bed: BedNumber },
    /// Admitted patient whose bed is not occupied by them.
    BedNotHeld {
        patient: RecordUuid,
        bed: BedNumber,
        status: BedStatus,
    },
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inconsistency::OccupiedWithoutPatient { bed } => {
                write!(f, "bed {bed} is occupied but has no patient")
            }
            Inconsistency::PatientOnFreeBed {
                bed,
                status,
                patient,
            } => write!(f, "bed {bed} is {status} but links patient {patient}"),
            Inconsistency::UnknownPatient { bed, patient } => {
                write!(f, "bed {bed} links unknown patient {patient}")
            }
            Inconsistency::PatientElsewhere { bed, patient } => {
                write!(f, "bed {bed} links patient {patient}, who is not admitted to it")
            }
            Inconsistency::AdmittedWithoutBed { patient } => {
                write!(f, "patient {patient} is admitted without a bed")
            }
            Inconsistency::UnknownBed { patient, bed } => {
                write!(f, "patient {patient} is admitted to unknown bed {bed}")
            }
            Inconsistency::BedNotHeld {
                patient,
                bed,
                status,
            } => write!(
                f,
                "patient {patient} is admitted to bed {bed}, which is {status} and not linked back"
            ),
        }
    }
}

/// Checks both directions of the bed/patient link.
pub fn audit(beds: &[Bed], patients: &[Patient]) -> Vec<Inconsistency> {
    let by_id: HashMap<&RecordUuid, &Patient> = patients.iter().map(|p| (&p.id, p)).collect();
    let by_number: HashMap<&BedNumber, &Bed> = beds.iter().map(|b| (&b.number, b)).collect();
    let mut found = Vec::new();

    for bed in beds {
        match (bed.status, bed.current_patient) {
            (BedStatus::Occupied, None) => found.push(Inconsistency::OccupiedWithoutPatient {
                bed: bed.number.clone(),
            }),
            (BedStatus::Occupied, Some(id)) => match by_id.get(&id) {
                None => found.push(Inconsistency::UnknownPatient {
                    bed: bed.number.clone(),
                    patient: id,
                }),
                Some(p) if !p.is_admitted() || p.assigned_bed.as_ref() != Some(&bed.number) => {
                    found.push(Inconsistency::PatientElsewhere {
                        bed: bed.number.clone(),
                        patient: id,
                    })
                }
                Some(_) => {}
            },
            (status, Some(id)) => found.push(Inconsistency::PatientOnFreeBed {
                bed: bed.number.clone(),
                status,
                patient: id,
            }),
            (_, None) => {}
        }
    }

    for patient in patients.iter().filter(|p| p.is_admitted()) {
        let Some(number) = &patient.assigned_bed else {
            found.push(Inconsistency::AdmittedWithoutBed {
                patient: patient.id,
            });
            continue;
        };
        match by_number.get(number) {
            None => found.push(Inconsistency::UnknownBed {
                patient: patient.id,
                bed: number.clone(),
            }),
            Some(bed) if !bed.is_occupied_by(&patient.id) => {
                found.push(Inconsistency::BedNotHeld {
                    patient: patient.id,
                    bed: number.clone(),
                    status: bed.status,
                })
            }
            Some(_) => {}
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::{Demographics, PatientStatus};
    use crate::store::test_support::bed;
    use bedflow_types::NonEmptyText;
    use bedflow_uuid::PatientCode;
    use chrono::Utc;

    fn admitted_to(bed: &mut Bed) -> Patient {
        let mut patient = Patient::register(
            PatientCode::parse("AB123").unwrap(),
            NonEmptyText::new("Ada").unwrap(),
            Demographics::default(),
            "General".into(),
            "Observation".into(),
            Utc::now(),
        );
        patient.status = PatientStatus::Admitted;
        patient.assigned_bed = Some(bed.number.clone());
        bed.occupy(patient.id, Utc::now());
        patient
    }

    #[test]
    fn test_linked_pair_is_consistent() {
        let mut b = bed("ICU-001", "ICU", &[]);
        let p = admitted_to(&mut b);

        assert!(audit(&[b], &[p]).is_empty());
    }

    #[test]
    fn test_half_updated_admission_is_reported_both_ways() {
        let mut b = bed("ICU-001", "ICU", &[]);
        let p = admitted_to(&mut b);

        let free = bed("ICU-001", "ICU", &[]);
        assert_eq!(
            audit(&[free], &[p.clone()]),
            vec![Inconsistency::BedNotHeld {
                patient: p.id,
                bed: b.number.clone(),
                status: BedStatus::Available,
            }]
        );

        let mut discharged = p.clone();
        discharged.status = PatientStatus::Discharged;
        assert_eq!(
            audit(&[b.clone()], &[discharged]),
            vec![Inconsistency::PatientElsewhere {
                bed: b.number.clone(),
                patient: p.id,
            }]
        );
    }

    #[test]
    fn test_occupied_without_patient() {
        let mut b = bed("ICU-001", "ICU", &[]);
        b.status = BedStatus::Occupied;

        let found = audit(&[b], &[]);
        assert_eq!(found.len(), 1);
        assert!(found[0].to_string().contains("no patient"));
    }
}
