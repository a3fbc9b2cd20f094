//! Role-scoped state-transition table for check-in requests.
//!
//! Legality is data, not control flow: `allowed_targets` is the single
//! source of truth consulted by the lifecycle controller, and the table is
//! testable as a pure function. Two transitions are deliberately absent:
//! `pending -> accepted` happens only through the atomic claim, and
//! `pending -> expired` is applied only by the time-driven sweep. Neither is
//! reachable through `transition`.

use crate::models::{ActorRole, CheckInStatus};

/// Targets the given role may move a request to from `from`.
pub fn allowed_targets(from: CheckInStatus, role: ActorRole) -> &'static [CheckInStatus] {
    use crate::models::ActorRole::{Agent, Host};
    use crate::models::CheckInStatus::*;

    match (from, role) {
        (Pending, Host) => &[CancelledByHost],
        (Pending, Agent) => &[],
        (Accepted, Host) => &[CancelledByHost],
        (Accepted, Agent) => &[InProgress, CancelledByAgent],
        (InProgress, Host) => &[],
        (InProgress, Agent) => &[Completed, CancelledByAgent],
        // Terminal states have no outgoing transitions for anyone.
        (Completed, _)
        | (CancelledByHost, _)
        | (CancelledByAgent, _)
        | (Expired, _) => &[],
    }
}

/// Whether `role` may move a request from `from` to `target`.
pub fn is_allowed(from: CheckInStatus, role: ActorRole, target: CheckInStatus) -> bool {
    allowed_targets(from, role).contains(&target)
}

/// States with no outgoing transitions.
pub fn is_terminal(status: CheckInStatus) -> bool {
    matches!(
        status,
        CheckInStatus::Completed
            | CheckInStatus::CancelledByHost
            | CheckInStatus::CancelledByAgent
            | CheckInStatus::Expired
    )
}

/// Whether `target` records a cancellation (and therefore carries a reason).
pub fn is_cancellation(target: CheckInStatus) -> bool {
    matches!(
        target,
        CheckInStatus::CancelledByHost | CheckInStatus::CancelledByAgent
    )
}
