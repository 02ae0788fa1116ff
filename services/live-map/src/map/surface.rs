//! Rendering surface abstraction

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::feed::LatLon;

/// Handle of a marker owned by a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(pub u64);

/// Handle of a polyline owned by a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathId(pub u64);

/// Handle of a range ring owned by a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RingId(pub u64);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "marker#{}", self.0)
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "path#{}", self.0)
    }
}

impl fmt::Display for RingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ring#{}", self.0)
    }
}

/// Icon family of a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Aircraft,
    Vessel,
}

/// Everything needed to place a new marker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerSpec {
    pub kind: MarkerKind,
    pub label: String,
    pub position: LatLon,
    pub heading_deg: f64,
}

/// Unfilled distance circle around a fixed point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeRing {
    pub center: LatLon,
    pub radius_m: f64,
    pub color: String,
}

/// The map widget as seen by the reconciler.
///
/// Implementations own the rendered objects; ids stay valid until removed.
/// Click events are reported back by the surface's host with the clicked
/// [`MarkerId`].
pub trait MapSurface {
    fn add_marker(&mut self, spec: MarkerSpec) -> MarkerId;
    fn move_marker(&mut self, id: MarkerId, position: LatLon);
    fn rotate_marker(&mut self, id: MarkerId, heading_deg: f64);
    fn remove_marker(&mut self, id: MarkerId);

    fn add_path(&mut self, points: &[LatLon]) -> PathId;
    fn extend_path(&mut self, id: PathId, point: LatLon);
    fn remove_path(&mut self, id: PathId);

    fn add_ring(&mut self, ring: RangeRing) -> RingId;
    fn remove_ring(&mut self, id: RingId);

    /// Replace the detail panel content
    fn show_detail(&mut self, html: String);
    /// Replace the weather panel content and reveal the panel
    fn show_weather(&mut self, html: String);
    /// Rotate the whole map view
    fn set_bearing(&mut self, bearing_deg: f64);
}
