use chrono::{DateTime, Utc};
use doorstep_core::models::{CheckInRequest, CheckInStatus, GeoPoint, PaymentStatus};
use doorstep_core::AppError;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Column list shared by every SELECT that hydrates a [`CheckInRequest`].
/// The geography column is unpacked into latitude/longitude here so rows can
/// be decoded without a geometry codec.
pub(crate) const REQUEST_COLUMNS: &str = r#"
    id, host_id, agent_id, property_address,
    ST_Y(location::geometry) AS latitude,
    ST_X(location::geometry) AS longitude,
    guest_name, guest_count, check_in_time, notes,
    fee, platform_fee, agent_payout, payment_intent_id,
    status, payment_status, cancellation_reason,
    created_at, updated_at
"#;

/// Raw row shape; converted into the domain model via [`RequestRow::into_request`].
#[derive(Debug)]
pub(crate) struct RequestRow {
    pub id: Uuid,
    pub host_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub property_address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub guest_name: String,
    pub guest_count: i32,
    pub check_in_time: DateTime<Utc>,
    pub notes: Option<String>,
    pub fee: Decimal,
    pub platform_fee: Option<Decimal>,
    pub agent_payout: Option<Decimal>,
    pub payment_intent_id: Option<String>,
    pub status: CheckInStatus,
    pub payment_status: PaymentStatus,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for RequestRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(RequestRow {
            id: row.try_get("id")?,
            host_id: row.try_get("host_id")?,
            agent_id: row.try_get("agent_id")?,
            property_address: row.try_get("property_address")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            guest_name: row.try_get("guest_name")?,
            guest_count: row.try_get("guest_count")?,
            check_in_time: row.try_get("check_in_time")?,
            notes: row.try_get("notes")?,
            fee: row.try_get("fee")?,
            platform_fee: row.try_get("platform_fee")?,
            agent_payout: row.try_get("agent_payout")?,
            payment_intent_id: row.try_get("payment_intent_id")?,
            status: row.try_get("status")?,
            payment_status: row.try_get("payment_status")?,
            cancellation_reason: row.try_get("cancellation_reason")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl RequestRow {
    pub(crate) fn into_request(self) -> CheckInRequest {
        let location = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        };
        CheckInRequest {
            id: self.id,
            host_id: self.host_id,
            agent_id: self.agent_id,
            property_address: self.property_address,
            location,
            guest_name: self.guest_name,
            guest_count: self.guest_count,
            check_in_time: self.check_in_time,
            notes: self.notes,
            fee: self.fee,
            platform_fee: self.platform_fee,
            agent_payout: self.agent_payout,
            payment_intent_id: self.payment_intent_id,
            status: self.status,
            payment_status: self.payment_status,
            cancellation_reason: self.cancellation_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Repository for check-in request rows.
///
/// Every exclusive mutation is a single conditional UPDATE; callers inspect
/// the affected-row count rather than holding any lock. The read-then-write
/// race window does not exist at this layer.
#[derive(Clone)]
pub struct RequestRepository {
    pool: PgPool,
}

impl RequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new pending request. `location` is None when geocoding failed;
    /// such requests are excluded from proximity queries until re-geocoded.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        host_id: Uuid,
        property_address: &str,
        location: Option<GeoPoint>,
        guest_name: &str,
        guest_count: i32,
        check_in_time: DateTime<Utc>,
        notes: Option<&str>,
        fee: Decimal,
    ) -> Result<CheckInRequest, AppError> {
        let sql = format!(
            r#"
            INSERT INTO check_in_requests (
                id, host_id, property_address, location,
                guest_name, guest_count, check_in_time, notes, fee,
                status, payment_status
            )
            VALUES (
                $1, $2, $3,
                CASE
                    WHEN $4::float8 IS NULL THEN NULL
                    ELSE ST_SetSRID(ST_MakePoint($5, $4), 4326)::geography
                END,
                $6, $7, $8, $9, $10,
                'pending', 'pending'
            )
            RETURNING {REQUEST_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(host_id)
            .bind(property_address)
            .bind(location.map(|p| p.latitude))
            .bind(location.map(|p| p.longitude))
            .bind(guest_name)
            .bind(guest_count)
            .bind(check_in_time)
            .bind(notes)
            .bind(fee)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into_request())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<CheckInRequest>, AppError> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM check_in_requests WHERE id = $1");
        let row = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(RequestRow::into_request))
    }

    pub async fn list_by_host(&self, host_id: Uuid) -> Result<Vec<CheckInRequest>, AppError> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM check_in_requests WHERE host_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(host_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(RequestRow::into_request).collect())
    }

    pub async fn list_by_agent(&self, agent_id: Uuid) -> Result<Vec<CheckInRequest>, AppError> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM check_in_requests WHERE agent_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(agent_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(RequestRow::into_request).collect())
    }

    /// The atomic claim: binds the agent and moves pending -> accepted in one
    /// conditional write. Returns the number of rows actually mutated; under
    /// N concurrent attempts the store lets exactly one through.
    pub async fn claim(&self, id: Uuid, agent_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE check_in_requests
            SET agent_id = $2, status = 'accepted', updated_at = NOW()
            WHERE id = $1
              AND status = 'pending'
              AND payment_status = 'succeeded'
              AND agent_id IS NULL
            "#,
        )
        .bind(id)
        .bind(agent_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Conditional status transition keyed on the observed from-status.
    /// Zero rows affected means the row moved concurrently; the caller
    /// re-reads and reports from the current state.
    pub async fn transition(
        &self,
        id: Uuid,
        from: CheckInStatus,
        target: CheckInStatus,
        cancellation_reason: Option<&str>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE check_in_requests
            SET status = $3,
                cancellation_reason = COALESCE($4, cancellation_reason),
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(target)
        .bind(cancellation_reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Record payment success and the computed split. Keyed on
    /// payment_status = 'pending' so gateway replays cannot double-apply.
    pub async fn apply_payment_succeeded(
        &self,
        id: Uuid,
        platform_fee: Decimal,
        agent_payout: Decimal,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE check_in_requests
            SET payment_status = 'succeeded',
                platform_fee = $2,
                agent_payout = $3,
                updated_at = NOW()
            WHERE id = $1 AND payment_status = 'pending'
            "#,
        )
        .bind(id)
        .bind(platform_fee)
        .bind(agent_payout)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn apply_payment_failed(&self, id: Uuid, reason: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE check_in_requests
            SET payment_status = 'failed',
                cancellation_reason = $2,
                updated_at = NOW()
            WHERE id = $1 AND payment_status = 'pending'
            "#,
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Refunds only flip the payment axis; in-flight work is never
    /// auto-cancelled by a refund.
    pub async fn apply_payment_refunded(&self, id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE check_in_requests
            SET payment_status = 'refunded', updated_at = NOW()
            WHERE id = $1 AND payment_status = 'succeeded'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Store the opaque reference the payment gateway handed back for this
    /// request.
    pub async fn set_payment_intent(&self, id: Uuid, intent_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE check_in_requests
            SET payment_intent_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(intent_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Attach a location produced by (re-)geocoding.
    pub async fn set_location(&self, id: Uuid, location: GeoPoint) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE check_in_requests
            SET location = ST_SetSRID(ST_MakePoint($3, $2), 4326)::geography,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(location.latitude)
        .bind(location.longitude)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Time-driven expiry of overdue pending requests, independent of payment
    /// status. Uses the same conditional idiom as the claim, so a racing
    /// claim and sweep resolve atomically: exactly one wins.
    pub async fn expire_due(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE check_in_requests
            SET status = 'expired', updated_at = NOW()
            WHERE status = 'pending' AND check_in_time < $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
