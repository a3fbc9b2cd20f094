use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use doorstep_core::models::{
    ActorRole, CheckInRequestResponse, CheckInStatus, CreateCheckInRequest, GeoPoint,
    NearbyRequest,
};
use doorstep_core::AppError;

use crate::auth::ActorContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    /// Search radius; defaults to the configured radius and is capped at the
    /// configured maximum.
    pub radius_km: Option<f64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionRequest {
    pub target: CheckInStatus,
    pub reason: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/requests",
    tag = "requests",
    request_body = CreateCheckInRequest,
    responses(
        (status = 201, description = "Request created", body = CheckInRequestResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 403, description = "Caller is not a host", body = ErrorResponse)
    )
)]
pub async fn create_request(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
    ValidatedJson(payload): ValidatedJson<CreateCheckInRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    if actor.role != ActorRole::Host {
        return Err(AppError::AccessDenied("Only hosts can create check-in requests".to_string()).into());
    }

    let request = state.matching.create_request(actor.id, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckInRequestResponse::from(request)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/requests/nearby",
    tag = "requests",
    params(NearbyQuery),
    responses(
        (status = 200, description = "Claimable requests, nearest first", body = Vec<NearbyRequest>),
        (status = 400, description = "Invalid coordinates or radius", body = ErrorResponse)
    )
)]
pub async fn find_nearby(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
    Query(query): Query<NearbyQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    if actor.role != ActorRole::Agent {
        return Err(
            AppError::AccessDenied("Only agents can search for claimable requests".to_string())
                .into(),
        );
    }

    let results = state
        .matching
        .find_nearby_claimable(GeoPoint::new(query.lat, query.lng), query.radius_km)
        .await?;

    Ok(Json(results))
}

#[utoipa::path(
    get,
    path = "/api/v1/requests/{id}",
    tag = "requests",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request found", body = CheckInRequestResponse),
        (status = 403, description = "Caller is not a party", body = ErrorResponse),
        (status = 404, description = "Request not found", body = ErrorResponse)
    )
)]
pub async fn get_request(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let request = state.matching.get_request(id).await?;

    if !request.is_party(actor.id) {
        return Err(
            AppError::AccessDenied("Actor is not a party to this request".to_string()).into(),
        );
    }

    Ok(Json(CheckInRequestResponse::from(request)))
}

#[utoipa::path(
    get,
    path = "/api/v1/requests",
    tag = "requests",
    responses(
        (status = 200, description = "Caller's requests, newest first", body = Vec<CheckInRequestResponse>)
    )
)]
pub async fn list_requests(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let requests = match actor.role {
        ActorRole::Host => state.matching.list_for_host(actor.id).await?,
        ActorRole::Agent => state.matching.list_for_agent(actor.id).await?,
    };

    let responses: Vec<CheckInRequestResponse> = requests
        .into_iter()
        .map(CheckInRequestResponse::from)
        .collect();

    Ok(Json(responses))
}

#[utoipa::path(
    post,
    path = "/api/v1/requests/{id}/claim",
    tag = "requests",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Claim succeeded", body = CheckInRequestResponse),
        (status = 404, description = "Request not found", body = ErrorResponse),
        (status = 409, description = "Already claimed or payment not succeeded", body = ErrorResponse)
    )
)]
pub async fn claim_request(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    if actor.role != ActorRole::Agent {
        return Err(AppError::AccessDenied("Only agents can claim requests".to_string()).into());
    }

    let request = state.matching.claim(id, actor.id).await?;

    Ok(Json(CheckInRequestResponse::from(request)))
}

#[utoipa::path(
    post,
    path = "/api/v1/requests/{id}/transition",
    tag = "requests",
    params(("id" = Uuid, Path, description = "Request ID")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Transition applied", body = CheckInRequestResponse),
        (status = 403, description = "Caller is not a party", body = ErrorResponse),
        (status = 404, description = "Request not found", body = ErrorResponse),
        (status = 409, description = "Transition not permitted", body = ErrorResponse)
    )
)]
pub async fn transition_request(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
    Path(id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<TransitionRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let request = state
        .lifecycle
        .transition(id, actor, body.target, body.reason)
        .await?;

    Ok(Json(CheckInRequestResponse::from(request)))
}

#[utoipa::path(
    post,
    path = "/api/v1/requests/{id}/regeocode",
    tag = "requests",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Location refreshed", body = CheckInRequestResponse),
        (status = 403, description = "Caller is not the host", body = ErrorResponse),
        (status = 503, description = "Geocoding unavailable", body = ErrorResponse)
    )
)]
pub async fn regeocode_request(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let request = state.matching.get_request(id).await?;
    if request.host_id != actor.id {
        return Err(
            AppError::AccessDenied("Only the host may re-geocode a request".to_string()).into(),
        );
    }

    let refreshed = state.matching.regeocode(id).await?;

    Ok(Json(CheckInRequestResponse::from(refreshed)))
}
