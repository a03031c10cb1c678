//! # API Shared
//!
//! Shared definitions for the Bedflow front ends.
//!
//! Contains:
//! - Wire DTOs (`dto` module) and their conversions to and from core types
//! - Shared services like `HealthService`
//! - Staff identification from request headers
//!
//! Used by `api-rest` and `bedflow-cli` for common functionality.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{actor_from_headers, AuthError, ROLE_HEADER, STAFF_ID_HEADER};
pub use dto::*;
pub use health::HealthService;
