use chrono::{DateTime, Duration, Utc};
use doorstep_core::models::{CheckInRequest, GeoPoint};
use doorstep_core::AppError;
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use super::request::{RequestRow, REQUEST_COLUMNS};

/// Geography-aware read layer over requests and agent positions.
///
/// Answers two questions: which open, paid requests lie within radius R of a
/// point, and which recently-active agents do. Pure read path; staleness
/// between a nearby query and a claim attempt is expected and resolved by
/// the claim's conditional write.
#[derive(Clone)]
pub struct GeoIndex {
    pool: PgPool,
}

/// An active agent with its distance from the query point.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NearbyAgent {
    pub agent_id: Uuid,
    pub location: GeoPoint,
    pub distance_km: f64,
    pub updated_at: DateTime<Utc>,
}

impl GeoIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Claimable requests within `radius_km` of the point, nearest first.
    ///
    /// Claimable means: pending, payment succeeded, located, and scheduled in
    /// the future. Distance is geodesic (geography type), returned in
    /// kilometres.
    pub async fn nearby_claimable_requests(
        &self,
        point: GeoPoint,
        radius_km: f64,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<(CheckInRequest, f64)>, AppError> {
        let sql = format!(
            r#"
            SELECT {REQUEST_COLUMNS},
                   ST_Distance(location, ST_SetSRID(ST_MakePoint($2, $1), 4326)::geography) / 1000.0
                       AS distance_km
            FROM check_in_requests
            WHERE status = 'pending'
              AND payment_status = 'succeeded'
              AND location IS NOT NULL
              AND check_in_time > $3
              AND ST_DWithin(
                      location,
                      ST_SetSRID(ST_MakePoint($2, $1), 4326)::geography,
                      $4
                  )
            ORDER BY distance_km ASC
            LIMIT $5
            "#
        );

        let rows = sqlx::query(&sql)
            .bind(point.latitude)
            .bind(point.longitude)
            .bind(now)
            .bind(radius_km * 1000.0)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let distance_km: f64 = row.try_get("distance_km").map_err(AppError::from)?;
            let request = RequestRow::from_row(&row)
                .map_err(AppError::from)?
                .into_request();
            out.push((request, distance_km));
        }

        Ok(out)
    }

    /// Agents whose position was refreshed within `active_within` and lies
    /// inside the radius, nearest first.
    pub async fn nearby_active_agents(
        &self,
        point: GeoPoint,
        radius_km: f64,
        active_within: Duration,
        limit: i64,
    ) -> Result<Vec<NearbyAgent>, AppError> {
        let cutoff = Utc::now() - active_within;

        let rows = sqlx::query(
            r#"
            SELECT agent_id,
                   ST_Y(location::geometry) AS latitude,
                   ST_X(location::geometry) AS longitude,
                   ST_Distance(location, ST_SetSRID(ST_MakePoint($2, $1), 4326)::geography) / 1000.0
                       AS distance_km,
                   updated_at
            FROM agent_locations
            WHERE updated_at > $3
              AND ST_DWithin(
                      location,
                      ST_SetSRID(ST_MakePoint($2, $1), 4326)::geography,
                      $4
                  )
            ORDER BY distance_km ASC
            LIMIT $5
            "#,
        )
        .bind(point.latitude)
        .bind(point.longitude)
        .bind(cutoff)
        .bind(radius_km * 1000.0)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(NearbyAgent {
                agent_id: row.try_get("agent_id").map_err(AppError::from)?,
                location: GeoPoint::new(
                    row.try_get("latitude").map_err(AppError::from)?,
                    row.try_get("longitude").map_err(AppError::from)?,
                ),
                distance_km: row.try_get("distance_km").map_err(AppError::from)?,
                updated_at: row.try_get("updated_at").map_err(AppError::from)?,
            });
        }

        Ok(out)
    }
}
