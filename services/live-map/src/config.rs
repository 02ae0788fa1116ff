//! Configuration: built-in defaults overridden by `LIVE_MAP_*` environment variables

use ::config::{Config as Layered, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::feed::LatLon;
use crate::rings::{default_rings, RingStyle};
use crate::vessel::VesselRecord;

/// Shortest poll interval we accept
const MIN_POLL_INTERVAL_MS: u64 = 100;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the dashboard backend serving /api/flights/ and /api/weather/
    pub api_base_url: String,

    /// Flight poll interval in milliseconds
    pub poll_interval_ms: u64,

    /// Per-request timeout in milliseconds (0 = none)
    pub request_timeout_ms: u64,

    /// Port for the scene REST/WebSocket server
    pub listen_port: u16,

    /// Initial map center
    pub center_lat: f64,
    pub center_lon: f64,

    /// Keep per-flight path history
    pub track_paths: bool,

    /// Restrict flight polls to the reported viewport
    pub viewport_filter: bool,

    /// Minimum spacing of applied map rotation updates in milliseconds
    pub rotate_throttle_ms: u64,

    /// The fixed vessel
    pub vessel: VesselRecord,

    /// Distance rings around the map center
    pub range_rings: Vec<RingStyle>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            poll_interval_ms: 5000,
            request_timeout_ms: 0,
            listen_port: 8888,
            center_lat: 1.3521,
            center_lon: 103.8198,
            track_paths: true,
            viewport_filter: false,
            rotate_throttle_ms: 16, // ~60 Hz
            vessel: VesselRecord::default(),
            range_rings: default_rings(),
        }
    }
}

impl Config {
    /// Load configuration from defaults and the environment
    pub fn load() -> Result<Self, ConfigError> {
        // LIVE_MAP_POLL_INTERVAL_MS, LIVE_MAP_VESSEL__NAME, ...
        let env = Environment::with_prefix("LIVE_MAP")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true);
        Self::from_layers(Layered::builder().add_source(env))
    }

    /// Resolve a builder on top of the defaults and validate the result
    fn from_layers(
        overrides: ::config::ConfigBuilder<::config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let defaults = Layered::try_from(&Config::default())?;
        let config: Config = Layered::builder()
            .add_source(defaults)
            .add_source(overrides.build()?)
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(ConfigError::Message(format!(
                "poll_interval_ms must be at least {} (got {})",
                MIN_POLL_INTERVAL_MS, self.poll_interval_ms
            )));
        }
        Url::parse(&self.api_base_url).map_err(|e| {
            ConfigError::Message(format!("invalid api_base_url {:?}: {}", self.api_base_url, e))
        })?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    pub fn rotate_throttle(&self) -> Duration {
        Duration::from_millis(self.rotate_throttle_ms)
    }

    pub fn center(&self) -> LatLon {
        LatLon::new(self.center_lat, self.center_lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_layers(Layered::builder()).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.rotate_throttle(), Duration::from_millis(16));
        assert!(config.track_paths);
        assert!(!config.viewport_filter);
        assert_eq!(config.vessel, VesselRecord::default());
        assert_eq!(config.range_rings, default_rings());
    }

    #[test]
    fn test_overrides() {
        let overrides = Layered::builder()
            .set_override("poll_interval_ms", 30_000)
            .unwrap()
            .set_override("request_timeout_ms", 2_500)
            .unwrap()
            .set_override("vessel.name", "MV Test")
            .unwrap();
        let config = Config::from_layers(overrides).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.vessel.name, "MV Test");
        assert_eq!(config.vessel.callsign, VesselRecord::default().callsign);
    }

    #[test]
    fn test_rings_can_be_disabled() {
        let overrides = Layered::builder()
            .set_override("range_rings", Vec::<String>::new())
            .unwrap();
        let config = Config::from_layers(overrides).unwrap();
        assert!(config.range_rings.is_empty());
    }

    #[test]
    fn test_validation() {
        let too_fast = Layered::builder().set_override("poll_interval_ms", 10).unwrap();
        assert!(Config::from_layers(too_fast).is_err());

        let bad_url = Layered::builder().set_override("api_base_url", "localhost 8000").unwrap();
        assert!(Config::from_layers(bad_url).is_err());
    }
}
