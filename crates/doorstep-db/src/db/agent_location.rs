use doorstep_core::models::GeoPoint;
use doorstep_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for agent position rows backing the "active agents near point"
/// side of the GeoIndex. One row per agent, refreshed on every report.
#[derive(Clone)]
pub struct AgentLocationRepository {
    pool: PgPool,
}

impl AgentLocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, agent_id: Uuid, location: GeoPoint) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO agent_locations (agent_id, location, updated_at)
            VALUES ($1, ST_SetSRID(ST_MakePoint($3, $2), 4326)::geography, NOW())
            ON CONFLICT (agent_id)
            DO UPDATE SET location = EXCLUDED.location, updated_at = NOW()
            "#,
        )
        .bind(agent_id)
        .bind(location.latitude)
        .bind(location.longitude)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, agent_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM agent_locations WHERE agent_id = $1")
            .bind(agent_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
