//! Lifecycle controller: role-scoped transitions and payment signals.
//!
//! Authorization is checked before transition legality, legality comes from
//! the table in doorstep-core, and the mutation itself is one conditional
//! UPDATE keyed on the observed from-status. Concurrent transition attempts
//! on the same request are serialized by the store; the loser observes zero
//! affected rows and reports from the refreshed state.

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use doorstep_core::models::{
    Actor, ActorRole, CheckInRequest, CheckInStatus, PaymentOutcome,
};
use doorstep_core::{transitions, AppError};
use doorstep_db::RequestRepository;

/// Split a fee into (platform_fee, agent_payout) using the configured
/// platform fraction. Both halves are rounded to cents and always sum to the
/// fee: the payout is computed as the remainder, not rounded independently.
pub fn compute_split(fee: Decimal, platform_fraction: Decimal) -> (Decimal, Decimal) {
    let platform_fee = (fee * platform_fraction).round_dp(2);
    let agent_payout = fee - platform_fee;
    (platform_fee, agent_payout)
}

#[derive(Clone)]
pub struct LifecycleController {
    requests: RequestRepository,
    platform_fee_percent: Decimal,
}

impl LifecycleController {
    pub fn new(requests: RequestRepository, platform_fee_percent: Decimal) -> Self {
        Self {
            requests,
            platform_fee_percent,
        }
    }

    /// Role-scoped transition. Fails with AccessDenied for anyone who is not
    /// the bound host or agent of this specific request, then with
    /// IllegalTransition for any (state, role, target) outside the table.
    #[tracing::instrument(skip(self), fields(request_id = %request_id, target = %target))]
    pub async fn transition(
        &self,
        request_id: Uuid,
        actor: Actor,
        target: CheckInStatus,
        reason: Option<String>,
    ) -> Result<CheckInRequest, AppError> {
        let request = self
            .requests
            .get(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Request {} not found", request_id)))?;

        self.authorize(&request, actor)?;

        if !transitions::is_allowed(request.status, actor.role, target) {
            return Err(AppError::IllegalTransition {
                from: request.status,
                attempted: target,
                role: actor.role,
                allowed: transitions::allowed_targets(request.status, actor.role).to_vec(),
            });
        }

        let reason = reason.filter(|_| transitions::is_cancellation(target));
        let affected = self
            .requests
            .transition(request_id, request.status, target, reason.as_deref())
            .await?;

        if affected == 0 {
            // The row moved under us; report from its current state.
            let current = self
                .requests
                .get(request_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Request {} not found", request_id)))?;
            return Err(AppError::IllegalTransition {
                from: current.status,
                attempted: target,
                role: actor.role,
                allowed: transitions::allowed_targets(current.status, actor.role).to_vec(),
            });
        }

        tracing::info!(
            request_id = %request_id,
            from = %request.status,
            to = %target,
            role = %actor.role,
            "Request transitioned"
        );

        self.refetch(request_id).await
    }

    /// Implicit accepted -> in_progress when the bound agent uploads their
    /// first document. Zero affected rows is not an error here: the request
    /// is simply already started (or the uploader was the host).
    pub async fn start_on_first_upload(
        &self,
        request_id: Uuid,
        agent_id: Uuid,
    ) -> Result<(), AppError> {
        let request = match self.requests.get(request_id).await? {
            Some(request) if request.agent_id == Some(agent_id) => request,
            _ => return Ok(()),
        };

        if request.status != CheckInStatus::Accepted {
            return Ok(());
        }

        let affected = self
            .requests
            .transition(
                request_id,
                CheckInStatus::Accepted,
                CheckInStatus::InProgress,
                None,
            )
            .await?;

        if affected == 1 {
            tracing::info!(request_id = %request_id, "Request started on first document upload");
        }

        Ok(())
    }

    /// Apply a payment-gateway outcome. Idempotent: replays of the same
    /// signal observe zero affected rows and return the current row.
    #[tracing::instrument(skip(self), fields(request_id = %request_id, outcome = ?outcome))]
    pub async fn apply_payment_outcome(
        &self,
        request_id: Uuid,
        outcome: PaymentOutcome,
        reason: Option<&str>,
    ) -> Result<CheckInRequest, AppError> {
        let request = self
            .requests
            .get(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Request {} not found", request_id)))?;

        match outcome {
            PaymentOutcome::Succeeded => {
                // The fee is locked at creation; the split policy is read at
                // confirmation time. The fee column is immutable, so reading
                // it outside the conditional write is race-free.
                let (platform_fee, agent_payout) =
                    compute_split(request.fee, self.platform_fee_percent);
                let affected = self
                    .requests
                    .apply_payment_succeeded(request_id, platform_fee, agent_payout)
                    .await?;
                if affected == 0 {
                    tracing::debug!(
                        request_id = %request_id,
                        "Payment success signal replayed, no-op"
                    );
                } else {
                    tracing::info!(
                        request_id = %request_id,
                        platform_fee = %platform_fee,
                        agent_payout = %agent_payout,
                        "Payment succeeded, request is now claimable"
                    );
                }
            }
            PaymentOutcome::Failed => {
                let affected = self
                    .requests
                    .apply_payment_failed(request_id, reason.unwrap_or("Payment failed"))
                    .await?;
                if affected == 0 {
                    tracing::debug!(request_id = %request_id, "Payment failure signal ignored");
                }
            }
            PaymentOutcome::Refunded => {
                // Refunds never auto-cancel accepted or in-progress work;
                // only the payment axis moves.
                let affected = self.requests.apply_payment_refunded(request_id).await?;
                if affected == 0 {
                    tracing::warn!(
                        request_id = %request_id,
                        "Refund signal for a request whose payment never succeeded"
                    );
                }
            }
        }

        self.refetch(request_id).await
    }

    /// Store the gateway-side reference for a request's payment.
    pub async fn record_payment_intent(
        &self,
        request_id: Uuid,
        intent_id: &str,
    ) -> Result<(), AppError> {
        let affected = self
            .requests
            .set_payment_intent(request_id, intent_id)
            .await?;
        if affected == 0 {
            return Err(AppError::NotFound(format!(
                "Request {} not found",
                request_id
            )));
        }
        Ok(())
    }

    /// Expire every overdue pending request. Time-driven, not role-invoked;
    /// uses the same conditional idiom as the claim so the two cannot both
    /// win on one row.
    pub async fn expire_due(&self) -> Result<u64, AppError> {
        let expired = self.requests.expire_due(Utc::now()).await?;
        if expired > 0 {
            tracing::info!(count = expired, "Expired overdue pending requests");
        }
        Ok(expired)
    }

    fn authorize(&self, request: &CheckInRequest, actor: Actor) -> Result<(), AppError> {
        let bound = match actor.role {
            ActorRole::Host => request.host_id == actor.id,
            ActorRole::Agent => request.agent_id == Some(actor.id),
        };

        if bound {
            Ok(())
        } else {
            Err(AppError::AccessDenied(
                "Actor is not a party to this request".to_string(),
            ))
        }
    }

    async fn refetch(&self, request_id: Uuid) -> Result<CheckInRequest, AppError> {
        self.requests
            .get(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Request {} not found", request_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn split_of_twenty_at_twenty_percent() {
        let (platform, payout) = compute_split(dec("20.00"), dec("0.20"));
        assert_eq!(platform, dec("4.00"));
        assert_eq!(payout, dec("16.00"));
    }

    #[test]
    fn split_halves_always_sum_to_the_fee() {
        for (fee, pct) in [
            ("19.99", "0.20"),
            ("0.01", "0.20"),
            ("33.33", "0.15"),
            ("100.00", "0.125"),
        ] {
            let fee = dec(fee);
            let (platform, payout) = compute_split(fee, dec(pct));
            assert_eq!(platform + payout, fee, "fee={} pct={}", fee, pct);
            assert!(platform >= Decimal::ZERO);
            assert!(payout >= Decimal::ZERO);
        }
    }

    #[test]
    fn zero_platform_fraction_pays_out_everything() {
        let (platform, payout) = compute_split(dec("20.00"), Decimal::ZERO);
        assert_eq!(platform, Decimal::ZERO);
        assert_eq!(payout, dec("20.00"));
    }
}
