//! Best-effort address geocoding.
//!
//! Geocoding is an external collaborator: any failure (unconfigured, network
//! error, empty result, unparseable payload) logs a warning and yields None.
//! Request creation never fails on a geocoding problem; the request just
//! stays out of proximity results until re-geocoded.

use std::time::Duration;

use doorstep_core::models::GeoPoint;
use serde::Deserialize;

const GEOCODE_TIMEOUT_SECS: u64 = 5;

/// Nominatim-style search result row. Coordinates arrive as strings.
#[derive(Debug, Deserialize)]
struct GeocodeResult {
    lat: String,
    lon: String,
}

pub struct Geocoder {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl Geocoder {
    /// `base_url` of None disables geocoding entirely.
    pub fn new(base_url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(GEOCODE_TIMEOUT_SECS))
            .user_agent(concat!("doorstep/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self { client, base_url }
    }

    /// Resolve an address to a point, or None on any failure.
    pub async fn geocode(&self, address: &str) -> Option<GeoPoint> {
        let base_url = match self.base_url {
            Some(ref url) => url,
            None => {
                tracing::debug!("Geocoder not configured, skipping");
                return None;
            }
        };

        let url = format!("{}/search", base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await;

        let body = match response {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read geocoder response");
                    return None;
                }
            },
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "Geocoder returned an error status");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Geocoder request failed");
                return None;
            }
        };

        let point = parse_geocode_response(&body);
        if point.is_none() {
            tracing::warn!(address = %address, "Geocoder returned no usable result");
        }
        point
    }
}

/// Parse the first result out of a Nominatim-style JSON array.
fn parse_geocode_response(body: &str) -> Option<GeoPoint> {
    let results: Vec<GeocodeResult> = serde_json::from_str(body).ok()?;
    let first = results.into_iter().next()?;
    let latitude: f64 = first.lat.parse().ok()?;
    let longitude: f64 = first.lon.parse().ok()?;

    let point = GeoPoint::new(latitude, longitude);
    point.is_valid().then_some(point)
}
