//! Error responses and the staff header extractor.

use api_shared::{actor_from_headers, AuthError, ErrorRes, ROLE_HEADER, STAFF_ID_HEADER};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
};
use bedflow_core::{Actor, AllocationError};

/// Handler error: a core failure or a caller that could not be identified.
#[derive(Debug)]
pub enum ApiError {
    Allocation(AllocationError),
    Auth(AuthError),
}

impl From<AllocationError> for ApiError {
    fn from(err: AllocationError) -> Self {
        ApiError::Allocation(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl ApiError {
    fn status_and_class(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Allocation(AllocationError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, "validation")
            }
            ApiError::Allocation(AllocationError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            ApiError::Allocation(AllocationError::Conflict(_)) => {
                (StatusCode::CONFLICT, "conflict")
            }
            ApiError::Allocation(AllocationError::Forbidden { .. }) => {
                (StatusCode::FORBIDDEN, "forbidden")
            }
            ApiError::Allocation(AllocationError::Internal(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
            ApiError::Auth(_) => (StatusCode::UNAUTHORIZED, "unauthorised"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, class) = self.status_and_class();
        let message = match &self {
            ApiError::Allocation(AllocationError::Internal(e)) => {
                tracing::error!("store error: {:?}", e);
                "Internal error".to_owned()
            }
            ApiError::Allocation(e) => e.to_string(),
            ApiError::Auth(e) => e.to_string(),
        };
        let body = ErrorRes {
            error: class.into(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// The calling staff member, read from the `x-staff-role` and `x-staff-id` headers.
pub struct Staff(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for Staff
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| parts.headers.get(name).and_then(|v| v.to_str().ok());
        let actor = actor_from_headers(header(ROLE_HEADER), header(STAFF_ID_HEADER))?;
        Ok(Staff(actor))
    }
}
