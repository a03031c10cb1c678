//! Bed requests and their lifecycle state machine.
//!
//! Standard ward requests and emergency walk-in requests share one record type; they differ in
//! their [`RequestSubject`] and in which matcher variant proposes beds at creation time.
//!
//! ```text
//! pending                      --reserve-->  approved
//! pending | approved           --approve-->  assigned
//! pending                      --reject--->  rejected
//! pending | approved | assigned --cancel-->  cancelled
//! approved | assigned          --fulfil--->  fulfilled
//! ```

use crate::error::{ConflictKind, UnknownVariant};
use crate::patient::Demographics;
use bedflow_types::{BedNumber, EquipmentTag, WardName};
use bedflow_uuid::RecordUuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPriority {
    #[default]
    Routine,
    Moderate,
    Urgent,
    Critical,
}

impl RequestPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestPriority::Routine => "routine",
            RequestPriority::Moderate => "moderate",
            RequestPriority::Urgent => "urgent",
            RequestPriority::Critical => "critical",
        }
    }
}

impl FromStr for RequestPriority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "routine" => Ok(RequestPriority::Routine),
            "moderate" => Ok(RequestPriority::Moderate),
            "urgent" => Ok(RequestPriority::Urgent),
            "critical" => Ok(RequestPriority::Critical),
            _ => Err(UnknownVariant {
                kind: "request priority",
                value: s.to_owned(),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestMode {
    #[default]
    Standard,
    /// Mass-casualty intake: beds are proposed by the global ward-priority matcher.
    Emergency,
}

impl RequestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMode::Standard => "standard",
            RequestMode::Emergency => "emergency",
        }
    }
}

impl FromStr for RequestMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(RequestMode::Standard),
            "emergency" => Ok(RequestMode::Emergency),
            _ => Err(UnknownVariant {
                kind: "request mode",
                value: s.to_owned(),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    /// A bed is reserved for the request; no patient has been admitted yet.
    Approved,
    /// The patient has been admitted to the assigned bed.
    Assigned,
    Fulfilled,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Assigned => "assigned",
            RequestStatus::Fulfilled => "fulfilled",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    /// Applies `action` to this status, returning the next status.
    ///
    /// # Errors
    ///
    /// `ConflictKind::AlreadyProcessed` when a request that has left `pending` is approved,
    /// rejected, reserved or cancelled again; `ConflictKind::InvalidTransition` for the
    /// remaining combinations (e.g. fulfilling a pending request).
    pub fn transition(self, action: RequestAction) -> Result<RequestStatus, ConflictKind> {
        use RequestAction as A;
        use RequestStatus as S;

        match (self, action) {
            (S::Pending, A::Reserve) => Ok(S::Approved),
            (S::Pending | S::Approved, A::Approve) => Ok(S::Assigned),
            (S::Pending, A::Reject) => Ok(S::Rejected),
            (S::Pending | S::Approved | S::Assigned, A::Cancel) => Ok(S::Cancelled),
            (S::Approved | S::Assigned, A::Fulfil) => Ok(S::Fulfilled),
            (S::Pending, A::Fulfil) => Err(ConflictKind::InvalidTransition { from: self, action }),
            (status, _) => Err(ConflictKind::AlreadyProcessed { status }),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestAction {
    Reserve,
    Approve,
    Reject,
    Cancel,
    Fulfil,
}

impl fmt::Display for RequestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequestAction::Reserve => "reserve",
            RequestAction::Approve => "approve",
            RequestAction::Reject => "reject",
            RequestAction::Cancel => "cancel",
            RequestAction::Fulfil => "fulfil",
        })
    }
}

/// Who the bed is for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestSubject {
    /// A patient already on record.
    Patient { patient: RecordUuid },
    /// An emergency arrival not yet in the patient table.
    WalkIn { demographics: Demographics },
}

/// Input to [`RequestService::create_request`](crate::repositories::requests::RequestService::create_request).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewRequest {
    pub subject: RequestSubject,
    pub ward: WardName,
    #[serde(default)]
    pub equipment: Vec<EquipmentTag>,
    #[serde(default)]
    pub priority: RequestPriority,
    #[serde(default)]
    pub mode: RequestMode,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BedRequest {
    pub id: RecordUuid,
    pub subject: RequestSubject,
    pub ward: WardName,
    #[serde(default)]
    pub equipment: Vec<EquipmentTag>,
    pub priority: RequestPriority,
    pub mode: RequestMode,
    pub status: RequestStatus,
    /// Best-first matcher output at creation time. Never reserved.
    #[serde(default)]
    pub recommended_beds: Vec<BedNumber>,
    #[serde(default)]
    pub assigned_bed: Option<BedNumber>,
    /// Patient admitted through this request.
    #[serde(default)]
    pub patient: Option<RecordUuid>,
    #[serde(default)]
    pub notes: Option<String>,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fulfilled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: u64,
}

impl BedRequest {
    /// Patient the request refers to, either from the subject or from a completed approval.
    pub fn patient_ref(&self) -> Option<RecordUuid> {
        match &self.subject {
            RequestSubject::Patient { patient } => Some(*patient),
            RequestSubject::WalkIn { .. } => self.patient,
        }
    }

    /// Appends `line` to the notes, separated by ` | `.
    pub(crate) fn append_note(&mut self, line: String) {
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.trim().is_empty() => format!("{existing} | {line}"),
            _ => line,
        });
    }
}
