//! # API REST
//!
//! REST API implementation for Bedflow.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status codes)
//!
//! Uses `api-shared` for wire types and staff identification. The server binary lives in the
//! workspace root (`bedflow-run`), which builds the [`AllocationService`] and calls [`router`].

#![warn(rust_2018_idioms)]

pub mod error;
pub mod handlers;

use api_shared as dto;
use axum::{
    routing::{get, patch, post},
    Router,
};
use bedflow_core::AllocationService;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use error::{ApiError, Staff};

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: AllocationService,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::list_beds,
        handlers::available_beds,
        handlers::get_bed,
        handlers::recommend_bed,
        handlers::check_availability,
        handlers::set_bed_status,
        handlers::list_patients,
        handlers::get_patient,
        handlers::admit_patient,
        handlers::discharge_patient,
        handlers::transfer_patient,
        handlers::list_requests,
        handlers::get_request,
        handlers::create_request,
        handlers::approve_request,
        handlers::reserve_bed,
        handlers::reject_request,
        handlers::cancel_request,
        handlers::fulfil_request,
        handlers::ward_occupancy,
    ),
    components(schemas(
        dto::HealthRes,
        dto::ErrorRes,
        dto::BedRes,
        dto::ListBedsRes,
        dto::PatientRes,
        dto::ListPatientsRes,
        dto::RequestRes,
        dto::ListRequestsRes,
        dto::DemographicsReq,
        dto::AdmitPatientReq,
        dto::TransferReq,
        dto::SetBedStatusReq,
        dto::RecommendReq,
        dto::RecommendRes,
        dto::AvailabilityRes,
        dto::CreateRequestReq,
        dto::BedChoiceReq,
        dto::RejectReq,
        dto::OccupancyRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router over `service`, including the Swagger UI.
pub fn router(service: AllocationService) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/beds", get(handlers::list_beds))
        .route("/beds/available", get(handlers::available_beds))
        .route("/beds/recommend", post(handlers::recommend_bed))
        .route("/beds/check-availability", post(handlers::check_availability))
        .route(
            "/beds/:number",
            get(handlers::get_bed).patch(handlers::set_bed_status),
        )
        .route(
            "/patients",
            get(handlers::list_patients).post(handlers::admit_patient),
        )
        .route("/patients/:id", get(handlers::get_patient))
        .route("/patients/:id/discharge", post(handlers::discharge_patient))
        .route("/patients/:id/transfer", post(handlers::transfer_patient))
        .route(
            "/requests",
            get(handlers::list_requests).post(handlers::create_request),
        )
        .route("/requests/:id", get(handlers::get_request))
        .route("/requests/:id/approve", patch(handlers::approve_request))
        .route("/requests/:id/reserve", patch(handlers::reserve_bed))
        .route("/requests/:id/reject", patch(handlers::reject_request))
        .route("/requests/:id/cancel", patch(handlers::cancel_request))
        .route("/requests/:id/fulfil", patch(handlers::fulfil_request))
        .route("/wards/:ward/occupancy", get(handlers::ward_occupancy))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(AppState { service })
}
