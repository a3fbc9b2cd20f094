//! Error types module
//!
//! This module provides the core error types used throughout the Doorstep
//! application. All errors are unified under the `AppError` enum, covering
//! database, storage, validation, and the marketplace-specific failure modes
//! (claim races, payment gating, illegal transitions, document expiry).

use std::io;

use sqlx::Error as SqlxError;
use uuid::Uuid;

use crate::models::{ActorRole, CheckInStatus};

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures and lost claim races
    Debug,
    /// Warning level - for recoverable issues like upstream hiccups
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "ALREADY_CLAIMED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Illegal transition: {from} -> {attempted} is not permitted for {role}; allowed: {}", format_allowed(.allowed))]
    IllegalTransition {
        from: CheckInStatus,
        attempted: CheckInStatus,
        role: ActorRole,
        allowed: Vec<CheckInStatus>,
    },

    #[error("Request {0} has already been claimed")]
    AlreadyClaimed(Uuid),

    #[error("Request {0} is not claimable until its payment succeeds")]
    PaymentNotSucceeded(Uuid),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Expired: {0}")]
    Expired(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

fn format_allowed(allowed: &[CheckInStatus]) -> String {
    if allowed.is_empty() {
        "none".to_string()
    } else {
        allowed
            .iter()
            .map(CheckInStatus::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// Error conversion implementations following Rust best practices
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::Validation(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
/// Reduces duplication in ErrorMetadata impl; client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Validation(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Check authentication credentials"),
            false,
            LogLevel::Debug,
        ),
        AppError::AccessDenied(_) => (
            403,
            "ACCESS_DENIED",
            false,
            Some("Only parties to the request may act on it"),
            false,
            LogLevel::Debug,
        ),
        AppError::IllegalTransition { .. } => (
            409,
            "ILLEGAL_TRANSITION",
            false,
            Some("Refresh the request and check its current state"),
            false,
            LogLevel::Debug,
        ),
        AppError::AlreadyClaimed(_) => (
            409,
            "ALREADY_CLAIMED",
            false,
            Some("Refresh the nearby list and pick another request"),
            false,
            LogLevel::Debug,
        ),
        AppError::PaymentNotSucceeded(_) => (
            409,
            "PAYMENT_NOT_SUCCEEDED",
            true,
            Some("Wait for payment confirmation and retry"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Expired(_) => (
            410,
            "EXPIRED",
            false,
            None,
            false,
            LogLevel::Debug,
        ),
        AppError::UpstreamUnavailable(_) => (
            503,
            "UPSTREAM_UNAVAILABLE",
            true,
            Some("Retry after a short delay"),
            false,
            LogLevel::Warn,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::Validation(_) => "Validation",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::AccessDenied(_) => "AccessDenied",
            AppError::IllegalTransition { .. } => "IllegalTransition",
            AppError::AlreadyClaimed(_) => "AlreadyClaimed",
            AppError::PaymentNotSucceeded(_) => "PaymentNotSucceeded",
            AppError::NotFound(_) => "NotFound",
            AppError::Expired(_) => "Expired",
            AppError::UpstreamUnavailable(_) => "UpstreamUnavailable",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Validation(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::AccessDenied(ref msg) => msg.clone(),
            AppError::IllegalTransition { .. } => self.to_string(),
            AppError::AlreadyClaimed(_) => self.to_string(),
            AppError::PaymentNotSucceeded(_) => self.to_string(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Expired(ref msg) => msg.clone(),
            AppError::UpstreamUnavailable(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_database() {
        let err = AppError::from(sqlx::Error::PoolClosed);
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access database");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_already_claimed() {
        let id = Uuid::new_v4();
        let err = AppError::AlreadyClaimed(id);
        assert_eq!(err.http_status_code(), 409);
        assert_eq!(err.error_code(), "ALREADY_CLAIMED");
        assert!(!err.is_recoverable());
        assert!(err.client_message().contains(&id.to_string()));
        // Lost claim races are expected, not faults.
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_illegal_transition_names_attempted_and_allowed() {
        let err = AppError::IllegalTransition {
            from: CheckInStatus::Pending,
            attempted: CheckInStatus::Completed,
            role: ActorRole::Host,
            allowed: vec![CheckInStatus::CancelledByHost],
        };
        let msg = err.to_string();
        assert!(msg.contains("pending"));
        assert!(msg.contains("completed"));
        assert!(msg.contains("cancelled_by_host"));
        assert_eq!(err.http_status_code(), 409);
        assert_eq!(err.error_code(), "ILLEGAL_TRANSITION");
    }

    #[test]
    fn test_illegal_transition_with_no_allowed_targets() {
        let err = AppError::IllegalTransition {
            from: CheckInStatus::Completed,
            attempted: CheckInStatus::InProgress,
            role: ActorRole::Agent,
            allowed: vec![],
        };
        assert!(err.to_string().contains("allowed: none"));
    }

    #[test]
    fn test_error_metadata_payment_not_succeeded() {
        let err = AppError::PaymentNotSucceeded(Uuid::new_v4());
        assert_eq!(err.http_status_code(), 409);
        assert!(err.is_recoverable());
        assert_eq!(
            err.suggested_action(),
            Some("Wait for payment confirmation and retry")
        );
    }

    #[test]
    fn test_error_metadata_expired() {
        let err = AppError::Expired("Document is past its retention window".to_string());
        assert_eq!(err.http_status_code(), 410);
        assert_eq!(err.error_code(), "EXPIRED");
        assert!(!err.is_recoverable());
        assert!(!err.is_sensitive());
    }

    #[test]
    fn test_error_metadata_access_denied() {
        let err = AppError::AccessDenied("Actor is not a party to this request".to_string());
        assert_eq!(err.http_status_code(), 403);
        assert_eq!(err.error_code(), "ACCESS_DENIED");
        assert_eq!(err.log_level(), LogLevel::Debug);
    }
}
