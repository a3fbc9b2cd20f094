//! Request payload and document validation.
//!
//! Shape constraints (lengths, ranges) live on the DTOs as `validator`
//! derives; the checks here are the ones that need context: wall-clock time,
//! the configured content-type allow-list, and filename hygiene for keys that
//! end up in blob storage paths.

use chrono::{DateTime, Utc};
use validator::Validate;

use crate::error::AppError;
use crate::models::CreateCheckInRequest;

/// Full validation of a creation payload: derive-level shape checks plus the
/// scheduled-time-in-future rule.
pub fn validate_create_request(
    payload: &CreateCheckInRequest,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    payload.validate()?;

    if payload.property_address.trim().is_empty() {
        return Err(AppError::Validation(
            "property_address must not be blank".to_string(),
        ));
    }

    if payload.check_in_time <= now {
        return Err(AppError::Validation(
            "check_in_time must be in the future".to_string(),
        ));
    }

    Ok(())
}

/// Content type must be on the configured allow-list (compared
/// case-insensitively, parameters stripped).
pub fn validate_content_type(content_type: &str, allowed: &[String]) -> Result<(), AppError> {
    let normalized = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    if normalized.is_empty() {
        return Err(AppError::Validation("content_type is required".to_string()));
    }

    if !allowed.iter().any(|a| a == &normalized) {
        return Err(AppError::Validation(format!(
            "Content type '{}' is not allowed; allowed: {}",
            normalized,
            allowed.join(", ")
        )));
    }

    Ok(())
}

/// Filenames become part of blob keys; reject anything that could traverse
/// out of the storage prefix.
pub fn validate_file_name(file_name: &str) -> Result<(), AppError> {
    let trimmed = file_name.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("file_name is required".to_string()));
    }
    if trimmed.len() > 255 {
        return Err(AppError::Validation(
            "file_name must be at most 255 characters".to_string(),
        ));
    }
    if trimmed.contains("..") || trimmed.contains('/') || trimmed.contains('\\') {
        return Err(AppError::Validation(
            "file_name must not contain path separators".to_string(),
        ));
    }
    Ok(())
}

/// Clamp a requested search radius to (0, max]. Non-positive radii are a
/// caller error; oversized radii are quietly capped.
pub fn clamp_radius_km(radius_km: f64, max_radius_km: f64) -> Result<f64, AppError> {
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(AppError::Validation(
            "radius_km must be a positive number".to_string(),
        ));
    }
    Ok(radius_km.min(max_radius_km))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> CreateCheckInRequest {
        CreateCheckInRequest {
            property_address: "Herengracht 5, Amsterdam".to_string(),
            guest_name: "B. Traveller".to_string(),
            guest_count: 2,
            check_in_time: Utc::now() + chrono::Duration::hours(3),
            notes: None,
        }
    }

    #[test]
    fn valid_payload_accepted() {
        assert!(validate_create_request(&payload(), Utc::now()).is_ok());
    }

    #[test]
    fn blank_address_rejected() {
        let mut p = payload();
        p.property_address = "   ".to_string();
        assert!(matches!(
            validate_create_request(&p, Utc::now()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn past_check_in_time_rejected() {
        let mut p = payload();
        p.check_in_time = Utc::now() - chrono::Duration::minutes(1);
        assert!(matches!(
            validate_create_request(&p, Utc::now()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn zero_guests_rejected() {
        let mut p = payload();
        p.guest_count = 0;
        assert!(validate_create_request(&p, Utc::now()).is_err());
    }

    #[test]
    fn content_type_allow_list_enforced() {
        let allowed = vec![
            "image/jpeg".to_string(),
            "image/png".to_string(),
            "application/pdf".to_string(),
        ];
        assert!(validate_content_type("image/jpeg", &allowed).is_ok());
        assert!(validate_content_type("IMAGE/PNG", &allowed).is_ok());
        assert!(validate_content_type("application/pdf; charset=binary", &allowed).is_ok());
        assert!(validate_content_type("video/mp4", &allowed).is_err());
        assert!(validate_content_type("", &allowed).is_err());
    }

    #[test]
    fn traversal_file_names_rejected() {
        assert!(validate_file_name("photo.jpg").is_ok());
        assert!(validate_file_name("../secrets.txt").is_err());
        assert!(validate_file_name("a/b.jpg").is_err());
        assert!(validate_file_name("a\\b.jpg").is_err());
        assert!(validate_file_name("").is_err());
    }

    #[test]
    fn radius_clamped_to_maximum() {
        assert_eq!(clamp_radius_km(5.0, 50.0).unwrap(), 5.0);
        assert_eq!(clamp_radius_km(120.0, 50.0).unwrap(), 50.0);
        assert!(clamp_radius_km(0.0, 50.0).is_err());
        assert!(clamp_radius_km(-3.0, 50.0).is_err());
        assert!(clamp_radius_km(f64::NAN, 50.0).is_err());
    }
}
