//! The fixed vessel shown alongside live traffic

use serde::{Deserialize, Serialize};

use crate::feed::LatLon;
use crate::map::{MapSurface, MarkerId, MarkerKind, MarkerSpec};

/// Static vessel description; never updated by the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselRecord {
    pub name: String,
    pub vessel_type: String,
    pub callsign: String,
    pub heading_deg: f64,
    pub speed_knots: f64,
    pub lat: f64,
    pub lon: f64,
}

impl VesselRecord {
    pub fn position(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }

    /// Place the vessel marker; called once per dashboard
    pub fn render<S: MapSurface>(&self, surface: &mut S) -> MarkerId {
        surface.add_marker(MarkerSpec {
            kind: MarkerKind::Vessel,
            label: self.name.clone(),
            position: self.position(),
            heading_deg: self.heading_deg,
        })
    }
}

impl Default for VesselRecord {
    fn default() -> Self {
        Self {
            name: "MV Straits Pioneer".to_string(),
            vessel_type: "Container Ship".to_string(),
            callsign: "9V7312".to_string(),
            heading_deg: 75.0,
            speed_knots: 12.5,
            lat: 1.2644,
            lon: 103.8222,
        }
    }
}
