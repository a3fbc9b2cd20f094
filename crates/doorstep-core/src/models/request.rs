use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::geo::GeoPoint;

/// Lifecycle state of a check-in request. Transitions are governed by the
/// role-scoped table in [`crate::transitions`]; `Accepted` is reachable only
/// through the atomic claim.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "check_in_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CheckInStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    CancelledByHost,
    CancelledByAgent,
    Expired,
}

impl CheckInStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckInStatus::Pending => "pending",
            CheckInStatus::Accepted => "accepted",
            CheckInStatus::InProgress => "in_progress",
            CheckInStatus::Completed => "completed",
            CheckInStatus::CancelledByHost => "cancelled_by_host",
            CheckInStatus::CancelledByAgent => "cancelled_by_agent",
            CheckInStatus::Expired => "expired",
        }
    }
}

impl Display for CheckInStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Payment axis, independent of lifecycle state. A request is claimable only
/// once this reaches `Succeeded`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// One check-in job. `agent_id` stays null until exactly one agent wins the
/// claim; the commercial split fields stay null until the payment gateway
/// reports success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInRequest {
    pub id: Uuid,
    pub host_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub property_address: String,
    pub location: Option<GeoPoint>,
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

impl CheckInRequest {
    /// Whether an actor is a party to this request (the host, or the bound
    /// agent once one exists).
    pub fn is_party(&self, actor_id: Uuid) -> bool {
        self.host_id == actor_id || self.agent_id == Some(actor_id)
    }

    pub fn is_claimable(&self) -> bool {
        self.status == CheckInStatus::Pending
            && self.payment_status == PaymentStatus::Succeeded
            && self.agent_id.is_none()
    }
}

/// Creation payload submitted by a host.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCheckInRequest {
    #[validate(length(min = 1, max = 500))]
    pub property_address: String,
    #[validate(length(min = 1, max = 200))]
    pub guest_name: String,
    #[validate(range(min = 1, max = 50))]
    pub guest_count: i32,
    pub check_in_time: DateTime<Utc>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// API representation of a request.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckInRequestResponse {
    pub id: Uuid,
    pub host_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<Uuid>,
    pub property_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    pub guest_name: String,
    pub guest_count: i32,
    pub check_in_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub fee: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_fee: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_payout: Option<Decimal>,
    pub status: CheckInStatus,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CheckInRequest> for CheckInRequestResponse {
    fn from(req: CheckInRequest) -> Self {
        CheckInRequestResponse {
            id: req.id,
            host_id: req.host_id,
            agent_id: req.agent_id,
            property_address: req.property_address,
            location: req.location,
            guest_name: req.guest_name,
            guest_count: req.guest_count,
            check_in_time: req.check_in_time,
            notes: req.notes,
            fee: req.fee,
            platform_fee: req.platform_fee,
            agent_payout: req.agent_payout,
            status: req.status,
            payment_status: req.payment_status,
            cancellation_reason: req.cancellation_reason,
            created_at: req.created_at,
            updated_at: req.updated_at,
        }
    }
}

/// A claimable request as returned by the proximity query, nearest first.
#[derive(Debug, Serialize, ToSchema)]
pub struct NearbyRequest {
    #[serde(flatten)]
    pub request: CheckInRequestResponse,
    /// Geodesic distance from the query point in kilometres.
    pub distance_km: f64,
}

/// Outcome reported by the payment gateway for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
    Refunded,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn sample_request() -> CheckInRequest {
        let now = Utc::now();
        CheckInRequest {
            id: Uuid::new_v4(),
            host_id: Uuid::new_v4(),
            agent_id: None,
            property_address: "Keizersgracht 123, Amsterdam".to_string(),
            location: Some(GeoPoint::new(52.37, 4.89)),
            guest_name: "A. Visitor".to_string(),
            guest_count: 2,
            check_in_time: now + chrono::Duration::hours(6),
            notes: None,
            fee: dec("20.00"),
            platform_fee: None,
            agent_payout: None,
            payment_intent_id: None,
            status: CheckInStatus::Pending,
            payment_status: PaymentStatus::Pending,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn party_check_covers_host_and_bound_agent() {
        let mut req = sample_request();
        let stranger = Uuid::new_v4();
        assert!(req.is_party(req.host_id));
        assert!(!req.is_party(stranger));

        let agent = Uuid::new_v4();
        req.agent_id = Some(agent);
        assert!(req.is_party(agent));
        assert!(!req.is_party(stranger));
    }

    #[test]
    fn claimable_requires_pending_paid_and_unbound() {
        let mut req = sample_request();
        assert!(!req.is_claimable());

        req.payment_status = PaymentStatus::Succeeded;
        assert!(req.is_claimable());

        req.agent_id = Some(Uuid::new_v4());
        assert!(!req.is_claimable());

        req.agent_id = None;
        req.status = CheckInStatus::Expired;
        assert!(!req.is_claimable());
    }

    #[test]
    fn status_round_trips_through_as_str() {
        for status in [
            CheckInStatus::Pending,
            CheckInStatus::Accepted,
            CheckInStatus::InProgress,
            CheckInStatus::Completed,
            CheckInStatus::CancelledByHost,
            CheckInStatus::CancelledByAgent,
            CheckInStatus::Expired,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn response_from_request_carries_commercial_fields() {
        let mut req = sample_request();
        req.platform_fee = Some(dec("4.00"));
        req.agent_payout = Some(dec("16.00"));
        let resp = CheckInRequestResponse::from(req.clone());
        assert_eq!(resp.id, req.id);
        assert_eq!(resp.fee, dec("20.00"));
        assert_eq!(resp.platform_fee, Some(dec("4.00")));
        assert_eq!(resp.agent_payout, Some(dec("16.00")));
    }
}
