//! Matching engine: request creation, proximity discovery, and the atomic
//! claim.
//!
//! The claim is a single conditional write at the store boundary; this
//! service only interprets the affected-row count. A zero-row outcome is
//! diagnosed with one re-read purely for error-message quality — the
//! mutation is never retried.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use doorstep_core::models::{
    CheckInRequest, CreateCheckInRequest, GeoPoint, NearbyRequest, PaymentStatus,
};
use doorstep_core::{validation, AppError};
use doorstep_db::{AgentLocationRepository, GeoIndex, NearbyAgent, RequestRepository};

use crate::geocode::Geocoder;

/// How many rows one nearby query returns at most.
const NEARBY_LIMIT: i64 = 100;

/// How recently an agent must have reported a position to count as active.
const AGENT_ACTIVE_WITHIN_MINUTES: i64 = 60;

#[derive(Clone)]
pub struct MatchingEngine {
    requests: RequestRepository,
    geo: GeoIndex,
    agent_locations: AgentLocationRepository,
    geocoder: Arc<Geocoder>,
    base_fee: Decimal,
    default_radius_km: f64,
    max_radius_km: f64,
}

impl MatchingEngine {
    pub fn new(
        requests: RequestRepository,
        geo: GeoIndex,
        agent_locations: AgentLocationRepository,
        geocoder: Arc<Geocoder>,
        base_fee: Decimal,
        default_radius_km: f64,
        max_radius_km: f64,
    ) -> Self {
        Self {
            requests,
            geo,
            agent_locations,
            geocoder,
            base_fee,
            default_radius_km,
            max_radius_km,
        }
    }

    /// Create a pending request for a host. Geocoding is best-effort: on
    /// failure the request is created without a location and excluded from
    /// proximity results until re-geocoded.
    #[tracing::instrument(skip(self, payload), fields(host_id = %host_id))]
    pub async fn create_request(
        &self,
        host_id: Uuid,
        payload: CreateCheckInRequest,
    ) -> Result<CheckInRequest, AppError> {
        validation::validate_create_request(&payload, Utc::now())?;

        let location = self.geocoder.geocode(&payload.property_address).await;
        if location.is_none() {
            tracing::warn!(
                host_id = %host_id,
                "Request created without a location; geocoding unavailable or failed"
            );
        }

        let request = self
            .requests
            .create(
                host_id,
                &payload.property_address,
                location,
                &payload.guest_name,
                payload.guest_count,
                payload.check_in_time,
                payload.notes.as_deref(),
                self.base_fee,
            )
            .await?;

        tracing::info!(
            request_id = %request.id,
            located = location.is_some(),
            "Check-in request created"
        );

        Ok(request)
    }

    /// Claimable requests within the radius, nearest first. Read path with
    /// no side effects; results may be stale by the time a claim lands.
    pub async fn find_nearby_claimable(
        &self,
        point: GeoPoint,
        radius_km: Option<f64>,
    ) -> Result<Vec<NearbyRequest>, AppError> {
        let radius_km = self.resolve_radius(point, radius_km)?;

        let rows = self
            .geo
            .nearby_claimable_requests(point, radius_km, Utc::now(), NEARBY_LIMIT)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(request, distance_km)| NearbyRequest {
                request: request.into(),
                distance_km,
            })
            .collect())
    }

    /// Recently-active agents within the radius, nearest first.
    pub async fn find_nearby_agents(
        &self,
        point: GeoPoint,
        radius_km: Option<f64>,
    ) -> Result<Vec<NearbyAgent>, AppError> {
        let radius_km = self.resolve_radius(point, radius_km)?;

        self.geo
            .nearby_active_agents(
                point,
                radius_km,
                Duration::minutes(AGENT_ACTIVE_WITHIN_MINUTES),
                NEARBY_LIMIT,
            )
            .await
    }

    /// Record an agent's current position.
    pub async fn report_agent_location(
        &self,
        agent_id: Uuid,
        point: GeoPoint,
    ) -> Result<(), AppError> {
        if !point.is_valid() {
            return Err(AppError::Validation(
                "latitude/longitude out of range".to_string(),
            ));
        }
        self.agent_locations.upsert(agent_id, point).await
    }

    /// The atomic claim. At most one of any number of concurrent claims
    /// succeeds; the rest fail cleanly with a typed reason.
    #[tracing::instrument(skip(self), fields(request_id = %request_id, agent_id = %agent_id))]
    pub async fn claim(
        &self,
        request_id: Uuid,
        agent_id: Uuid,
    ) -> Result<CheckInRequest, AppError> {
        let affected = self.requests.claim(request_id, agent_id).await?;

        if affected == 1 {
            let request = self.requests.get(request_id).await?.ok_or_else(|| {
                AppError::Internal(format!("Claimed request {} vanished", request_id))
            })?;
            tracing::info!(request_id = %request_id, agent_id = %agent_id, "Request claimed");
            return Ok(request);
        }

        // Zero rows mutated: diagnose why, for the error message only.
        match self.requests.get(request_id).await? {
            None => Err(AppError::NotFound(format!(
                "Request {} not found",
                request_id
            ))),
            Some(request) if request.payment_status != PaymentStatus::Succeeded => {
                Err(AppError::PaymentNotSucceeded(request_id))
            }
            Some(request) if request.agent_id.is_some() => {
                Err(AppError::AlreadyClaimed(request_id))
            }
            // Expired or cancelled without ever being claimed.
            Some(_) => Err(AppError::NotFound(format!(
                "Request {} is no longer open",
                request_id
            ))),
        }
    }

    /// Retry geocoding for a request created without a location. Unlike the
    /// best-effort path at creation, an explicit retry surfaces failure.
    pub async fn regeocode(&self, request_id: Uuid) -> Result<CheckInRequest, AppError> {
        let request = self
            .requests
            .get(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Request {} not found", request_id)))?;

        let point = self
            .geocoder
            .geocode(&request.property_address)
            .await
            .ok_or_else(|| {
                AppError::UpstreamUnavailable("Geocoding failed for this address".to_string())
            })?;

        self.requests.set_location(request_id, point).await?;

        self.requests
            .get(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Request {} not found", request_id)))
    }

    pub async fn get_request(&self, request_id: Uuid) -> Result<CheckInRequest, AppError> {
        self.requests
            .get(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Request {} not found", request_id)))
    }

    pub async fn list_for_host(&self, host_id: Uuid) -> Result<Vec<CheckInRequest>, AppError> {
        self.requests.list_by_host(host_id).await
    }

    pub async fn list_for_agent(&self, agent_id: Uuid) -> Result<Vec<CheckInRequest>, AppError> {
        self.requests.list_by_agent(agent_id).await
    }

    fn resolve_radius(&self, point: GeoPoint, radius_km: Option<f64>) -> Result<f64, AppError> {
        if !point.is_valid() {
            return Err(AppError::Validation(
                "latitude/longitude out of range".to_string(),
            ));
        }
        validation::clamp_radius_km(
            radius_km.unwrap_or(self.default_radius_km),
            self.max_radius_km,
        )
    }
}
