//! Ward occupancy alerts.
//!
//! Alerts are a side reaction to admissions and housekeeping. They never affect whether an
//! operation succeeds, and identical alerts are suppressed for a configurable window.

use crate::bed::{Bed, BedStatus};
use crate::constants::{
    FEW_AVAILABLE_BEDS, OCCUPANCY_CRITICAL_PERCENT, OCCUPANCY_WARNING_PERCENT,
    UNAVAILABLE_WARNING_PERCENT,
};
use bedflow_types::{BedNumber, WardName};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    CriticalOccupancy,
    BedUnavailable,
    BedAvailable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub ward: WardName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bed: Option<BedNumber>,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

/// Bed counts for one ward.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WardOccupancy {
    pub ward: WardName,
    pub total: usize,
    pub available: usize,
    pub occupied: usize,
    pub cleaning: usize,
    pub reserved: usize,
    pub maintenance: usize,
}

impl WardOccupancy {
    /// Counts the beds of `ward` in `beds`; other wards are ignored.
    pub fn from_beds(ward: &WardName, beds: &[Bed]) -> Self {
        let mut occupancy = WardOccupancy {
            ward: ward.clone(),
            total: 0,
            available: 0,
            occupied: 0,
            cleaning: 0,
            reserved: 0,
            maintenance: 0,
        };
        for bed in beds.iter().filter(|b| b.in_ward(ward)) {
            occupancy.total += 1;
            match bed.status {
                BedStatus::Available => occupancy.available += 1,
                BedStatus::Occupied => occupancy.occupied += 1,
                BedStatus::Cleaning => occupancy.cleaning += 1,
                BedStatus::Reserved => occupancy.reserved += 1,
                BedStatus::Maintenance => occupancy.maintenance += 1,
            }
        }
        occupancy
    }

    pub fn unavailable(&self) -> usize {
        self.cleaning + self.reserved + self.maintenance
    }

    /// Occupied share of all beds, in percent. `0.0` for an empty ward.
    pub fn occupancy_percent(&self) -> f64 {
        percent(self.occupied, self.total)
    }

    pub fn unavailable_percent(&self) -> f64 {
        percent(self.unavailable(), self.total)
    }

    /// Alerts warranted by these counts, before de-duplication.
    ///
    /// At most one occupancy band fires (no available bed, then >= 90%, then >= 80%), plus an
    /// unavailable-beds warning when at least 30% of the ward is cleaning, reserved or under
    /// maintenance and fewer than 3 beds are available.
    pub fn evaluate(&self, now: DateTime<Utc>) -> Vec<Alert> {
        if self.total == 0 {
            return Vec::new();
        }

        let mut alerts = Vec::new();
        let pct = self.occupancy_percent();
        let band = if self.available == 0 {
            Some((
                Severity::Critical,
                100,
                format!(
                    "{} has no available beds ({} occupied, {} cleaning, {} maintenance, {} reserved)",
                    self.ward, self.occupied, self.cleaning, self.maintenance, self.reserved
                ),
            ))
        } else if pct >= OCCUPANCY_CRITICAL_PERCENT {
            Some((Severity::Critical, 90, self.capacity_message(pct)))
        } else if pct >= OCCUPANCY_WARNING_PERCENT {
            Some((Severity::Warning, 80, self.capacity_message(pct)))
        } else {
            None
        };

        if let Some((severity, threshold, message)) = band {
            alerts.push(Alert {
                kind: AlertKind::CriticalOccupancy,
                severity,
                ward: self.ward.clone(),
                threshold: Some(threshold),
                bed: None,
                message,
                raised_at: now,
            });
        }

        if self.unavailable_percent() >= UNAVAILABLE_WARNING_PERCENT
            && self.available < FEW_AVAILABLE_BEDS
        {
            alerts.push(Alert {
                kind: AlertKind::BedUnavailable,
                severity: Severity::Warning,
                ward: self.ward.clone(),
                threshold: None,
                bed: None,
                message: format!(
                    "{}: {} beds unavailable ({} cleaning, {} maintenance, {} reserved), only {} available",
                    self.ward,
                    self.unavailable(),
                    self.cleaning,
                    self.maintenance,
                    self.reserved,
                    self.available
                ),
                raised_at: now,
            });
        }

        alerts
    }

    fn capacity_message(&self, pct: f64) -> String {
        format!(
            "{} is at {pct:.1}% capacity ({}/{} beds occupied, {} available)",
            self.ward, self.occupied, self.total, self.available
        )
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

/// Alert raised when a cleaned bed returns to service.
pub fn bed_available_alert(bed: &Bed, now: DateTime<Utc>) -> Alert {
    Alert {
        kind: AlertKind::BedAvailable,
        severity: Severity::Info,
        ward: bed.ward.clone(),
        threshold: None,
        bed: Some(bed.number.clone()),
        message: format!("Bed {} in {} is now available", bed.number, bed.ward),
        raised_at: now,
    }
}

type AlertKey = (AlertKind, String, Option<u8>, Option<BedNumber>);

/// Drops alerts identical (kind, ward, threshold, bed) to one raised within the window.
#[derive(Debug)]
pub struct AlertMonitor {
    window: Duration,
    recent: Mutex<HashMap<AlertKey, DateTime<Utc>>>,
}

impl AlertMonitor {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            recent: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the alerts that should be published, recording them as raised.
    pub fn admit(&self, alerts: Vec<Alert>) -> Vec<Alert> {
        let Ok(mut recent) = self.recent.lock() else {
            tracing::warn!("alert monitor lock poisoned; publishing without de-duplication");
            return alerts;
        };

        alerts
            .into_iter()
            .filter(|alert| {
                let key = (
                    alert.kind,
                    alert.ward.as_str().to_ascii_lowercase(),
                    alert.threshold,
                    alert.bed.clone(),
                );
                match recent.get(&key) {
                    Some(at) if alert.raised_at - *at < self.window => {
                        tracing::debug!(ward = %alert.ward, kind = ?alert.kind, "duplicate alert suppressed");
                        false
                    }
                    _ => {
                        recent.insert(key, alert.raised_at);
                        true
                    }
                }
            })
            .collect()
    }
}
