use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use doorstep_core::models::{ActorRole, GeoPoint};
use doorstep_core::AppError;

use crate::auth::ActorContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::requests::NearbyQuery;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LocationUpdate {
    pub latitude: f64,
    pub longitude: f64,
}

#[utoipa::path(
    put,
    path = "/api/v1/agents/location",
    tag = "agents",
    request_body = LocationUpdate,
    responses(
        (status = 204, description = "Position recorded"),
        (status = 400, description = "Coordinates out of range", body = ErrorResponse),
        (status = 403, description = "Caller is not an agent", body = ErrorResponse)
    )
)]
pub async fn update_location(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
    ValidatedJson(body): ValidatedJson<LocationUpdate>,
) -> Result<impl IntoResponse, HttpAppError> {
    if actor.role != ActorRole::Agent {
        return Err(
            AppError::AccessDenied("Only agents can report a location".to_string()).into(),
        );
    }

    state
        .matching
        .report_agent_location(actor.id, GeoPoint::new(body.latitude, body.longitude))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/agents/nearby",
    tag = "agents",
    params(NearbyQuery),
    responses(
        (status = 200, description = "Active agents, nearest first"),
        (status = 403, description = "Caller is not a host", body = ErrorResponse)
    )
)]
pub async fn find_nearby_agents(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
    Query(query): Query<NearbyQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    if actor.role != ActorRole::Host {
        return Err(
            AppError::AccessDenied("Only hosts can search for nearby agents".to_string()).into(),
        );
    }

    let agents = state
        .matching
        .find_nearby_agents(GeoPoint::new(query.lat, query.lng), query.radius_km)
        .await?;

    Ok(Json(agents))
}
