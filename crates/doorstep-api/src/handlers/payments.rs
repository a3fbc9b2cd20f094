use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use doorstep_core::models::{CheckInRequestResponse, PaymentOutcome};

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

/// Payment outcome signal from the gateway. Signature verification happens
/// at the edge; by the time this endpoint is reached the event is trusted.
/// Delivery is at-least-once, so application is idempotent.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentEvent {
    pub request_id: Uuid,
    pub outcome: PaymentOutcome,
    pub reason: Option<String>,
    /// Opaque reference to the gateway-side payment object.
    pub payment_intent_id: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/events",
    tag = "payments",
    request_body = PaymentEvent,
    responses(
        (status = 200, description = "Signal applied (or replay ignored)", body = CheckInRequestResponse),
        (status = 404, description = "Request not found", body = ErrorResponse)
    )
)]
pub async fn payment_event(
    State(state): State<Arc<AppState>>,
    ValidatedJson(event): ValidatedJson<PaymentEvent>,
) -> Result<impl IntoResponse, HttpAppError> {
    if let Some(ref intent_id) = event.payment_intent_id {
        state
            .lifecycle
            .record_payment_intent(event.request_id, intent_id)
            .await?;
    }

    let request = state
        .lifecycle
        .apply_payment_outcome(event.request_id, event.outcome, event.reason.as_deref())
        .await?;

    Ok(Json(CheckInRequestResponse::from(request)))
}
