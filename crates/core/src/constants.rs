//! Constants used throughout the bedflow core crate.
//!
//! Ward names, timing defaults and alert bands live here so the matcher, the admission
//! operations and the configuration layer agree on them.

/// Ward searched after the requested ward is exhausted.
pub const DEFAULT_OVERFLOW_WARD: &str = "Emergency";

/// Ward order used by the emergency (global) matcher.
pub const DEFAULT_WARD_PRIORITY: [&str; 3] = ["Emergency", "ICU", "General Ward"];

/// Minutes a bed spends in `cleaning` after a discharge or transfer.
pub const DEFAULT_CLEANING_MINUTES: i64 = 30;

/// Upper bound accepted for a configured cleaning duration.
pub const MAX_CLEANING_MINUTES: i64 = 24 * 60;

/// Number of bed references stored on a request at creation time.
pub const RECOMMENDATION_LIMIT: usize = 3;

/// Random patient code attempts before falling back to a timestamp-derived code.
pub const PATIENT_CODE_ATTEMPTS: usize = 5;

/// Window during which an identical alert is not raised again.
pub const ALERT_DEDUP_MINUTES: i64 = 60;

/// Occupancy percentage at which a warning alert is raised.
pub const OCCUPANCY_WARNING_PERCENT: f64 = 80.0;

/// Occupancy percentage at which a critical alert is raised.
pub const OCCUPANCY_CRITICAL_PERCENT: f64 = 90.0;

/// Share of cleaning/maintenance/reserved beds that triggers an unavailable-beds alert.
pub const UNAVAILABLE_WARNING_PERCENT: f64 = 30.0;

/// The unavailable-beds alert only fires when fewer beds than this are available.
pub const FEW_AVAILABLE_BEDS: usize = 3;

/// Department recorded for patients admitted from an emergency request.
pub const EMERGENCY_DEPARTMENT: &str = "ER";

/// Admission reason used when an emergency request carries no notes.
pub const DEFAULT_EMERGENCY_REASON: &str = "Emergency Admission";

/// Default location of the file-backed store.
pub const DEFAULT_DATA_FILE: &str = "bedflow_data.yaml";

/// Department recorded when an admission names none.
pub const DEFAULT_DEPARTMENT: &str = "General";

/// Longest accepted patient name.
pub const MAX_NAME_LEN: usize = 200;

/// Oldest accepted patient age.
pub const MAX_AGE: u8 = 150;

/// Longest accepted estimated stay, in days.
pub const MAX_STAY_DAYS: u32 = 365;
