//! HTTP client for the flights and weather endpoints

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::types::{BoundingBox, LatLon, WeatherReport, WeatherResponse};
use super::wire::{parse_snapshot, Snapshot};
use crate::error::FeedError;

const FLIGHTS_PATH: &str = "api/flights/";
const WEATHER_PATH: &str = "api/weather/";

/// Client for the dashboard backend. Cheap to clone.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: Client,
    flights_url: Url,
    weather_url: Url,
}

impl FeedClient {
    /// Create a client rooted at `base_url` (e.g. `http://localhost:8000`)
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, FeedError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            flights_url: base.join(FLIGHTS_PATH)?,
            weather_url: base.join(WEATHER_PATH)?,
        })
    }

    /// Fetch the current flights snapshot, optionally restricted to a viewport
    pub async fn fetch_snapshot(&self, bbox: Option<BoundingBox>) -> Result<Snapshot, FeedError> {
        let mut request = self.http.get(self.flights_url.clone());
        if let Some(bbox) = bbox {
            request = request.query(&bbox.query_pairs());
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            // the backend explains failures as `{ "error": .. }` where it can
            let reason = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string));
            return Err(match reason {
                Some(msg) => FeedError::Upstream(format!("{} ({})", msg, status)),
                None => FeedError::Status(status),
            });
        }

        let snapshot = parse_snapshot(serde_json::from_slice(&bytes)?)?;
        debug!(
            "Flights snapshot: {} entries, {} valid",
            snapshot.records.len(),
            snapshot.valid_count()
        );
        Ok(snapshot)
    }

    /// Look up current weather at a position
    pub async fn fetch_weather(&self, at: LatLon) -> Result<WeatherReport, FeedError> {
        let response = self
            .http
            .get(self.weather_url.clone())
            .query(&[("lat", at.lat), ("lon", at.lon)])
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        match serde_json::from_slice::<WeatherResponse>(&bytes) {
            Ok(WeatherResponse::Failed { error }) => Err(FeedError::Upstream(error)),
            Ok(WeatherResponse::Report(report)) if status.is_success() => Ok(report),
            Ok(WeatherResponse::Report(_)) => Err(FeedError::Status(status)),
            Err(_) if !status.is_success() => Err(FeedError::Status(status)),
            Err(e) => Err(e.into()),
        }
    }

    pub fn flights_url(&self) -> &Url {
        &self.flights_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let client = FeedClient::new("http://localhost:8000", None).unwrap();
        assert_eq!(client.flights_url.as_str(), "http://localhost:8000/api/flights/");
        assert_eq!(client.weather_url.as_str(), "http://localhost:8000/api/weather/");

        let nested = FeedClient::new("http://example.com/dashboard", None).unwrap();
        assert_eq!(nested.flights_url.as_str(), "http://example.com/dashboard/api/flights/");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(FeedClient::new("not a url", None), Err(FeedError::Url(_))));
    }
}
