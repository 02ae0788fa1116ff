//! Flights payload adapter
//!
//! The flights endpoint reports aircraft as OpenSky-style positional state
//! arrays, either wrapped in `{ "time": .., "states": [..] }` or as a bare
//! top-level array. Everything past this module works on [`TrackRecord`].

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::types::{LatLon, TrackRecord, UNKNOWN_COUNTRY};
use crate::error::{FeedError, RecordError};

/// State vector field positions
const IDX_CALLSIGN: usize = 1;
const IDX_ORIGIN_COUNTRY: usize = 2;
const IDX_LONGITUDE: usize = 5;
const IDX_LATITUDE: usize = 6;
const IDX_ALTITUDE: usize = 7;
const IDX_VELOCITY: usize = 9;
const IDX_HEADING: usize = 10;

/// One decoded flights response
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Report time, when the payload carries one
    pub time: Option<DateTime<Utc>>,
    /// Candidate records in payload order
    pub records: Vec<Result<TrackRecord, RecordError>>,
}

impl Snapshot {
    pub fn valid_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_ok()).count()
    }
}

/// Decode a flights payload.
///
/// Top-level problems fail the whole snapshot; problems with single entries
/// are kept as per-record errors.
pub fn parse_snapshot(payload: Value) -> Result<Snapshot, FeedError> {
    let (time, states) = match payload {
        Value::Array(states) => (None, states),
        Value::Object(mut obj) => {
            if let Some(err) = obj.get("error") {
                let msg = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
                return Err(FeedError::Upstream(msg));
            }
            let time = obj
                .get("time")
                .and_then(Value::as_i64)
                .filter(|t| *t > 0)
                .and_then(|t| DateTime::from_timestamp(t, 0));
            match obj.remove("states") {
                Some(Value::Array(states)) => (time, states),
                // OpenSky reports an empty sky as null
                Some(Value::Null) => (time, Vec::new()),
                Some(_) => return Err(FeedError::Payload("\"states\" is not an array".into())),
                None => return Err(FeedError::Payload("missing \"states\"".into())),
            }
        }
        other => {
            return Err(FeedError::Payload(format!(
                "expected array or object, got {}",
                json_kind(&other)
            )))
        }
    };

    let records = states
        .iter()
        .enumerate()
        .map(|(index, state)| parse_state(index, state))
        .collect();

    Ok(Snapshot { time, records })
}

/// Decode one positional state array
pub fn parse_state(index: usize, state: &Value) -> Result<TrackRecord, RecordError> {
    let fields = state
        .as_array()
        .ok_or(RecordError::NotPositional { index })?;

    let callsign = fields
        .get(IDX_CALLSIGN)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|cs| !cs.is_empty())
        .ok_or(RecordError::MissingCallsign { index })?
        .to_string();

    let lat = coordinate(fields.get(IDX_LATITUDE));
    let lon = coordinate(fields.get(IDX_LONGITUDE));
    let (lat, lon) = match (lat, lon) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => return Err(RecordError::MissingPosition { index, callsign }),
    };

    let origin_country = fields
        .get(IDX_ORIGIN_COUNTRY)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(UNKNOWN_COUNTRY)
        .to_string();

    Ok(TrackRecord {
        callsign,
        origin_country,
        altitude_m: number(fields.get(IDX_ALTITUDE)).unwrap_or(0.0),
        velocity_ms: number(fields.get(IDX_VELOCITY)).unwrap_or(0.0),
        heading_deg: number(fields.get(IDX_HEADING)).unwrap_or(0.0),
        position: LatLon::new(lat, lon),
    })
}

/// Numeric field; numeric strings are accepted as the backend may stringify
fn number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Coordinates of exactly zero count as absent
fn coordinate(value: Option<&Value>) -> Option<f64> {
    number(value).filter(|v| *v != 0.0)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
