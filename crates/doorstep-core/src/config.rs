//! Configuration module
//!
//! Env-driven configuration for the API and services: database, storage,
//! commercial policy (base fee and split), document retention, sweep
//! cadence, and the geocoding boundary.

use std::env;

use rust_decimal::Decimal;

use crate::constants;
use crate::storage_types::StorageBackend;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PORT: u16 = 4000;
const DEFAULT_BASE_FEE: &str = "20.00";
const DEFAULT_PLATFORM_FEE_PERCENT: &str = "0.20";
const CLEANUP_INTERVAL_SECS: u64 = 3600;
const EXPIRY_SWEEP_INTERVAL_SECS: u64 = 60;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Commercial policy
    pub base_fee: Decimal,
    pub platform_fee_percent: Decimal,
    // Document retention
    pub document_ttl_hours: i64,
    pub upload_grant_ttl_secs: u64,
    pub download_grant_ttl_secs: u64,
    pub document_allowed_content_types: Vec<String>,
    // Background sweeps
    pub cleanup_interval_secs: u64,
    pub expiry_sweep_interval_secs: u64,
    // Geocoding (optional; absent disables it and requests stay unlocated)
    pub geocoder_base_url: Option<String>,
    // Proximity search
    pub default_search_radius_km: f64,
    pub max_search_radius_km: f64,
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let storage_backend = env::var("STORAGE_BACKEND")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(StorageBackend::Local);

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            base_fee: env::var("BASE_FEE")
                .unwrap_or_else(|_| DEFAULT_BASE_FEE.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("BASE_FEE must be a decimal amount"))?,
            platform_fee_percent: env::var("PLATFORM_FEE_PERCENT")
                .unwrap_or_else(|_| DEFAULT_PLATFORM_FEE_PERCENT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PLATFORM_FEE_PERCENT must be a decimal fraction"))?,
            document_ttl_hours: env::var("DOCUMENT_TTL_HOURS")
                .unwrap_or_else(|_| constants::DEFAULT_DOCUMENT_TTL_HOURS.to_string())
                .parse()
                .unwrap_or(constants::DEFAULT_DOCUMENT_TTL_HOURS),
            upload_grant_ttl_secs: env::var("UPLOAD_GRANT_TTL_SECS")
                .unwrap_or_else(|_| constants::DEFAULT_UPLOAD_GRANT_TTL_SECS.to_string())
                .parse()
                .unwrap_or(constants::DEFAULT_UPLOAD_GRANT_TTL_SECS),
            download_grant_ttl_secs: env::var("DOWNLOAD_GRANT_TTL_SECS")
                .unwrap_or_else(|_| constants::DEFAULT_DOWNLOAD_GRANT_TTL_SECS.to_string())
                .parse()
                .unwrap_or(constants::DEFAULT_DOWNLOAD_GRANT_TTL_SECS),
            document_allowed_content_types: env::var("DOCUMENT_ALLOWED_CONTENT_TYPES")
                .unwrap_or_else(|_| "image/jpeg,image/png,application/pdf".to_string())
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .collect(),
            cleanup_interval_secs: env::var("CLEANUP_INTERVAL_SECS")
                .unwrap_or_else(|_| CLEANUP_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(CLEANUP_INTERVAL_SECS),
            expiry_sweep_interval_secs: env::var("EXPIRY_SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| EXPIRY_SWEEP_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(EXPIRY_SWEEP_INTERVAL_SECS),
            geocoder_base_url: env::var("GEOCODER_BASE_URL").ok().filter(|s| !s.is_empty()),
            default_search_radius_km: env::var("DEFAULT_SEARCH_RADIUS_KM")
                .unwrap_or_else(|_| constants::DEFAULT_SEARCH_RADIUS_KM.to_string())
                .parse()
                .unwrap_or(constants::DEFAULT_SEARCH_RADIUS_KM),
            max_search_radius_km: env::var("MAX_SEARCH_RADIUS_KM")
                .unwrap_or_else(|_| constants::DEFAULT_MAX_SEARCH_RADIUS_KM.to_string())
                .parse()
                .unwrap_or(constants::DEFAULT_MAX_SEARCH_RADIUS_KM),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.base_fee <= Decimal::ZERO {
            return Err(anyhow::anyhow!("BASE_FEE must be positive"));
        }

        if self.platform_fee_percent < Decimal::ZERO || self.platform_fee_percent >= Decimal::ONE {
            return Err(anyhow::anyhow!(
                "PLATFORM_FEE_PERCENT must be a fraction in [0, 1)"
            ));
        }

        if self.document_ttl_hours <= 0 {
            return Err(anyhow::anyhow!("DOCUMENT_TTL_HOURS must be positive"));
        }

        if self.max_search_radius_km <= 0.0 {
            return Err(anyhow::anyhow!("MAX_SEARCH_RADIUS_KM must be positive"));
        }

        // Validate storage backend configuration
        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server_port: 4000,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            database_url: "postgresql://localhost/doorstep".to_string(),
            db_max_connections: 20,
            db_timeout_seconds: 30,
            storage_backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: Some("/tmp/doorstep".to_string()),
            local_storage_base_url: Some("http://localhost:4000/files".to_string()),
            base_fee: "20.00".parse().unwrap(),
            platform_fee_percent: "0.20".parse().unwrap(),
            document_ttl_hours: 48,
            upload_grant_ttl_secs: 3600,
            download_grant_ttl_secs: 900,
            document_allowed_content_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "application/pdf".to_string(),
            ],
            cleanup_interval_secs: 3600,
            expiry_sweep_interval_secs: 60,
            geocoder_base_url: None,
            default_search_radius_km: 10.0,
            max_search_radius_km: 50.0,
        }
    }

    #[test]
    fn valid_local_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn s3_backend_requires_bucket_and_region() {
        let mut cfg = base_config();
        cfg.storage_backend = StorageBackend::S3;
        assert!(cfg.validate().is_err());

        cfg.s3_bucket = Some("doorstep-documents".to_string());
        assert!(cfg.validate().is_err());

        cfg.s3_region = Some("eu-west-1".to_string());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn split_fraction_must_be_a_proper_fraction() {
        let mut cfg = base_config();
        cfg.platform_fee_percent = "1.0".parse().unwrap();
        assert!(cfg.validate().is_err());
        cfg.platform_fee_percent = "-0.1".parse().unwrap();
        assert!(cfg.validate().is_err());
        cfg.platform_fee_percent = "0.20".parse().unwrap();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn non_postgres_database_url_rejected() {
        let mut cfg = base_config();
        cfg.database_url = "mysql://localhost/doorstep".to_string();
        assert!(cfg.validate().is_err());
    }
}
