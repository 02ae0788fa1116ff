//! Normalized feed data types

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Country shown when the feed carries none
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Geographic position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// One reported aircraft position update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackRecord {
    /// Flight callsign (trimmed, never empty)
    pub callsign: String,
    /// Country of registration
    pub origin_country: String,
    /// Altitude in meters
    pub altitude_m: f64,
    /// Velocity in meters per second
    pub velocity_ms: f64,
    /// True track in degrees
    pub heading_deg: f64,
    /// Current position
    pub position: LatLon,
}

impl TrackRecord {
    /// Velocity converted for display
    pub fn velocity_kmh(&self) -> f64 {
        self.velocity_ms * 3.6
    }
}

/// Current weather conditions at a point, as display strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    #[serde(deserialize_with = "display_string")]
    pub temperature: String,
    #[serde(deserialize_with = "display_string")]
    pub feels_like: String,
    #[serde(deserialize_with = "display_string")]
    pub condition: String,
    #[serde(deserialize_with = "display_string")]
    pub wind_speed: String,
    #[serde(deserialize_with = "display_string")]
    pub humidity: String,
    #[serde(deserialize_with = "display_string")]
    pub pressure: String,
}

/// Weather endpoint response: a report or an upstream error message
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WeatherResponse {
    Failed { error: String },
    Report(WeatherReport),
}

/// Map viewport bounds in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    pub fn is_valid(&self) -> bool {
        [self.north, self.south, self.east, self.west]
            .iter()
            .all(|v| v.is_finite())
            && self.north >= self.south
    }

    /// Query parameters for the flights endpoint
    pub fn query_pairs(&self) -> [(&'static str, f64); 4] {
        [
            ("north", self.north),
            ("south", self.south),
            ("east", self.east),
            ("west", self.west),
        ]
    }
}

/// Accept strings as-is and render numbers/bools the way the backend would
fn display_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        other => Ok(other.to_string()),
    }
}
