//! Application-wide constants.

/// Versioned API prefix for all HTTP routes.
pub const API_PREFIX: &str = "/api/v1";

/// Hours a document remains retrievable after upload.
pub const DEFAULT_DOCUMENT_TTL_HOURS: i64 = 48;

/// Seconds an upload (PUT) grant stays valid.
pub const DEFAULT_UPLOAD_GRANT_TTL_SECS: u64 = 3600;

/// Seconds a download (GET) grant stays valid.
pub const DEFAULT_DOWNLOAD_GRANT_TTL_SECS: u64 = 900;

/// Search radius in kilometres used when the caller omits one.
pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 10.0;

/// Hard upper bound on proximity search radius in kilometres.
pub const DEFAULT_MAX_SEARCH_RADIUS_KM: f64 = 50.0;
