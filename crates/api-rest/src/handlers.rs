//! Route handlers.
//!
//! Handlers parse the wire DTOs, call [`AllocationService`](bedflow_core::AllocationService) and
//! convert the result back. Every failure goes through [`ApiError`], which picks the status code.

use crate::error::{ApiError, Staff};
use crate::AppState;
use api_shared::{
    AdmitPatientReq, AvailabilityRes, BedChoiceReq, BedRes, CreateRequestReq, ErrorRes, HealthRes,
    HealthService, ListBedsRes, ListPatientsRes, ListRequestsRes, OccupancyRes, PatientRes,
    RecommendReq, RecommendRes, RejectReq, RequestRes, SetBedStatusReq, TransferReq,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use bedflow_core::{AllocationError, BedNumber, BedStatus, RecordUuid, WardName};
use serde::Deserialize;

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct WardQuery {
    /// Restrict the listing to one ward.
    pub ward: Option<String>,
}

fn parse_id(raw: &str) -> Result<RecordUuid, ApiError> {
    Ok(RecordUuid::parse(raw).map_err(AllocationError::from)?)
}

fn parse_bed(raw: &str) -> Result<BedNumber, ApiError> {
    Ok(BedNumber::new(raw).map_err(AllocationError::from)?)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint used by monitoring and load balancers.
pub async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/beds",
    responses(
        (status = 200, description = "Every bed, by bed number", body = ListBedsRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
pub async fn list_beds(State(state): State<AppState>) -> ApiResult<ListBedsRes> {
    Ok(Json(state.service.beds()?.into()))
}

#[utoipa::path(
    get,
    path = "/beds/available",
    params(WardQuery),
    responses(
        (status = 200, description = "Available beds", body = ListBedsRes),
        (status = 400, description = "Invalid ward name", body = ErrorRes)
    )
)]
pub async fn available_beds(
    State(state): State<AppState>,
    Query(query): Query<WardQuery>,
) -> ApiResult<ListBedsRes> {
    let ward = query
        .ward
        .as_deref()
        .map(WardName::new)
        .transpose()
        .map_err(AllocationError::from)?;
    Ok(Json(state.service.available_beds(ward.as_ref())?.into()))
}

#[utoipa::path(
    get,
    path = "/beds/{number}",
    params(("number" = String, Path, description = "Bed number, e.g. ICU-002")),
    responses(
        (status = 200, description = "The bed", body = BedRes),
        (status = 404, description = "No such bed", body = ErrorRes)
    )
)]
pub async fn get_bed(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> ApiResult<BedRes> {
    let bed = state.service.bed(&parse_bed(&number)?)?;
    Ok(Json(BedRes::from(&bed)))
}

#[utoipa::path(
    post,
    path = "/beds/recommend",
    request_body = RecommendReq,
    responses(
        (status = 200, description = "Best matching bed, if any", body = RecommendRes),
        (status = 400, description = "Bad request", body = ErrorRes)
    )
)]
/// Recommends a bed without reserving it. `emergency` switches to the ward-priority search;
/// `ward_only` keeps the search inside the requested ward.
pub async fn recommend_bed(
    State(state): State<AppState>,
    Json(req): Json<RecommendReq>,
) -> ApiResult<RecommendRes> {
    let tags = req.equipment_tags()?;
    let bed = if req.emergency {
        state.service.recommend_bed_global(&tags)?
    } else {
        let ward = req.ward_or(state.service.config().overflow_ward())?;
        if req.ward_only {
            state.service.recommend_bed_in_ward(&ward, &tags)?
        } else {
            state.service.recommend_bed(&ward, &tags)?
        }
    };
    Ok(Json(RecommendRes {
        bed: bed.as_ref().map(BedRes::from),
    }))
}

#[utoipa::path(
    post,
    path = "/beds/check-availability",
    request_body = RecommendReq,
    responses(
        (status = 200, description = "Recommendation and candidate beds", body = AvailabilityRes),
        (status = 400, description = "Bad request", body = ErrorRes)
    )
)]
pub async fn check_availability(
    State(state): State<AppState>,
    Json(req): Json<RecommendReq>,
) -> ApiResult<AvailabilityRes> {
    let tags = req.equipment_tags()?;
    let ward = req.ward_or(state.service.config().overflow_ward())?;
    let availability = state
        .service
        .check_availability(&ward, &tags, req.emergency)?;
    Ok(Json(availability.into()))
}

#[utoipa::path(
    patch,
    path = "/beds/{number}",
    params(("number" = String, Path, description = "Bed number")),
    request_body = SetBedStatusReq,
    responses(
        (status = 200, description = "Bed updated", body = BedRes),
        (status = 400, description = "Unknown status or past estimate", body = ErrorRes),
        (status = 404, description = "No such bed", body = ErrorRes),
        (status = 409, description = "Patient still linked, or occupied requested", body = ErrorRes)
    )
)]
pub async fn set_bed_status(
    State(state): State<AppState>,
    Staff(actor): Staff,
    Path(number): Path<String>,
    Json(req): Json<SetBedStatusReq>,
) -> ApiResult<BedRes> {
    let status: BedStatus = req.status.parse().map_err(AllocationError::from)?;
    let bed = state.service.set_bed_status(
        &actor,
        &parse_bed(&number)?,
        status,
        req.estimated_available_at,
    )?;
    Ok(Json(BedRes::from(&bed)))
}

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "Every patient, most recently admitted first", body = ListPatientsRes)
    )
)]
pub async fn list_patients(State(state): State<AppState>) -> ApiResult<ListPatientsRes> {
    let patients = state.service.patients()?;
    Ok(Json(ListPatientsRes {
        patients: patients.iter().map(PatientRes::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "The patient", body = PatientRes),
        (status = 404, description = "No such patient", body = ErrorRes)
    )
)]
pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<PatientRes> {
    let patient = state.service.patient(&parse_id(&id)?)?;
    Ok(Json(PatientRes::from(&patient)))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = AdmitPatientReq,
    responses(
        (status = 201, description = "Patient admitted", body = PatientRes),
        (status = 400, description = "Incomplete demographics", body = ErrorRes),
        (status = 404, description = "No such bed", body = ErrorRes),
        (status = 409, description = "Bed not available", body = ErrorRes)
    )
)]
/// Admits a new patient directly to a bed.
pub async fn admit_patient(
    State(state): State<AppState>,
    Staff(actor): Staff,
    Json(req): Json<AdmitPatientReq>,
) -> Result<(StatusCode, Json<PatientRes>), ApiError> {
    let bed = parse_bed(&req.bed)?;
    let demographics = req.patient.into_demographics()?;
    let patient = state.service.admit_patient(&actor, &demographics, &bed)?;
    Ok((StatusCode::CREATED, Json(PatientRes::from(&patient))))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/discharge",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient discharged", body = PatientRes),
        (status = 404, description = "No such patient", body = ErrorRes),
        (status = 409, description = "Already discharged", body = ErrorRes)
    )
)]
pub async fn discharge_patient(
    State(state): State<AppState>,
    Staff(actor): Staff,
    Path(id): Path<String>,
) -> ApiResult<PatientRes> {
    let patient = state.service.discharge_patient(&actor, &parse_id(&id)?)?;
    Ok(Json(PatientRes::from(&patient)))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/transfer",
    params(("id" = String, Path, description = "Patient id")),
    request_body = TransferReq,
    responses(
        (status = 200, description = "Patient moved", body = PatientRes),
        (status = 404, description = "No such patient or bed", body = ErrorRes),
        (status = 409, description = "Not admitted, or bed not available", body = ErrorRes)
    )
)]
pub async fn transfer_patient(
    State(state): State<AppState>,
    Staff(actor): Staff,
    Path(id): Path<String>,
    Json(req): Json<TransferReq>,
) -> ApiResult<PatientRes> {
    let patient =
        state
            .service
            .transfer_patient(&actor, &parse_id(&id)?, &parse_bed(&req.bed)?)?;
    Ok(Json(PatientRes::from(&patient)))
}

#[utoipa::path(
    get,
    path = "/requests",
    responses(
        (status = 200, description = "Every request, newest first", body = ListRequestsRes)
    )
)]
pub async fn list_requests(State(state): State<AppState>) -> ApiResult<ListRequestsRes> {
    let requests = state.service.requests()?;
    Ok(Json(ListRequestsRes {
        requests: requests.iter().map(RequestRes::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/requests/{id}",
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "The request", body = RequestRes),
        (status = 404, description = "No such request", body = ErrorRes)
    )
)]
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<RequestRes> {
    let request = state.service.request(&parse_id(&id)?)?;
    Ok(Json(RequestRes::from(&request)))
}

#[utoipa::path(
    post,
    path = "/requests",
    request_body = CreateRequestReq,
    responses(
        (status = 201, description = "Request filed with recommended beds", body = RequestRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 403, description = "Emergency intake not permitted for role", body = ErrorRes)
    )
)]
pub async fn create_request(
    State(state): State<AppState>,
    Staff(actor): Staff,
    Json(req): Json<CreateRequestReq>,
) -> Result<(StatusCode, Json<RequestRes>), ApiError> {
    let request = state
        .service
        .create_request(&actor, req.into_new_request()?)?;
    Ok((StatusCode::CREATED, Json(RequestRes::from(&request))))
}

#[utoipa::path(
    patch,
    path = "/requests/{id}/approve",
    params(("id" = String, Path, description = "Request id")),
    request_body = BedChoiceReq,
    responses(
        (status = 200, description = "Request assigned and patient admitted", body = RequestRes),
        (status = 403, description = "Role may not approve", body = ErrorRes),
        (status = 404, description = "No such request or bed", body = ErrorRes),
        (status = 409, description = "Already processed, no bed selected, or bed taken", body = ErrorRes)
    )
)]
pub async fn approve_request(
    State(state): State<AppState>,
    Staff(actor): Staff,
    Path(id): Path<String>,
    body: Option<Json<BedChoiceReq>>,
) -> ApiResult<RequestRes> {
    let choice = body.map(|Json(b)| b).unwrap_or_default();
    let request = state.service.approve_request(
        &actor,
        &parse_id(&id)?,
        choice.bed_number()?.as_ref(),
    )?;
    Ok(Json(RequestRes::from(&request)))
}

#[utoipa::path(
    patch,
    path = "/requests/{id}/reserve",
    params(("id" = String, Path, description = "Request id")),
    request_body = BedChoiceReq,
    responses(
        (status = 200, description = "Bed reserved for the request", body = RequestRes),
        (status = 403, description = "Role may not reserve", body = ErrorRes),
        (status = 409, description = "Already processed or bed taken", body = ErrorRes)
    )
)]
pub async fn reserve_bed(
    State(state): State<AppState>,
    Staff(actor): Staff,
    Path(id): Path<String>,
    body: Option<Json<BedChoiceReq>>,
) -> ApiResult<RequestRes> {
    let choice = body.map(|Json(b)| b).unwrap_or_default();
    let request =
        state
            .service
            .reserve_bed(&actor, &parse_id(&id)?, choice.bed_number()?.as_ref())?;
    Ok(Json(RequestRes::from(&request)))
}

#[utoipa::path(
    patch,
    path = "/requests/{id}/reject",
    params(("id" = String, Path, description = "Request id")),
    request_body = RejectReq,
    responses(
        (status = 200, description = "Request rejected", body = RequestRes),
        (status = 409, description = "Already processed", body = ErrorRes)
    )
)]
pub async fn reject_request(
    State(state): State<AppState>,
    Staff(actor): Staff,
    Path(id): Path<String>,
    body: Option<Json<RejectReq>>,
) -> ApiResult<RequestRes> {
    let reason = body.and_then(|Json(b)| b.reason).unwrap_or_default();
    let request = state
        .service
        .reject_request(&actor, &parse_id(&id)?, &reason)?;
    Ok(Json(RequestRes::from(&request)))
}

#[utoipa::path(
    patch,
    path = "/requests/{id}/cancel",
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request cancelled", body = RequestRes),
        (status = 403, description = "Not the requester and role may not cancel", body = ErrorRes),
        (status = 409, description = "Already processed", body = ErrorRes)
    )
)]
pub async fn cancel_request(
    State(state): State<AppState>,
    Staff(actor): Staff,
    Path(id): Path<String>,
) -> ApiResult<RequestRes> {
    let request = state.service.cancel_request(&actor, &parse_id(&id)?)?;
    Ok(Json(RequestRes::from(&request)))
}

#[utoipa::path(
    patch,
    path = "/requests/{id}/fulfil",
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request fulfilled", body = RequestRes),
        (status = 409, description = "Not approved, or bed not occupied", body = ErrorRes)
    )
)]
pub async fn fulfil_request(
    State(state): State<AppState>,
    Staff(actor): Staff,
    Path(id): Path<String>,
) -> ApiResult<RequestRes> {
    let request = state.service.fulfil_request(&actor, &parse_id(&id)?)?;
    Ok(Json(RequestRes::from(&request)))
}

#[utoipa::path(
    get,
    path = "/wards/{ward}/occupancy",
    params(("ward" = String, Path, description = "Ward name")),
    responses(
        (status = 200, description = "Bed counts for the ward", body = OccupancyRes)
    )
)]
pub async fn ward_occupancy(
    State(state): State<AppState>,
    Path(ward): Path<String>,
) -> ApiResult<OccupancyRes> {
    let ward = WardName::new(&ward).map_err(AllocationError::from)?;
    let occupancy = state.service.ward_occupancy(&ward)?;
    Ok(Json(OccupancyRes::from(&occupancy)))
}
