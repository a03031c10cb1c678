//! Services that write records.
//!
//! `admissions` owns the bed/patient link; `requests` drives the request state machine and
//! performs approvals through the admission service.

pub mod admissions;
pub(crate) mod helpers;
pub mod requests;
