//! Retained scene surface
//!
//! Keeps the full map state in memory so late joiners can be sent a
//! snapshot, and publishes every mutation as a JSON op to WebSocket clients.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::broadcast;
use tracing::debug;

use super::surface::{MapSurface, MarkerId, MarkerKind, MarkerSpec, PathId, RangeRing, RingId};
use crate::feed::LatLon;

/// A marker as currently rendered
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerLayer {
    pub id: MarkerId,
    pub kind: MarkerKind,
    pub label: String,
    pub position: LatLon,
    pub heading_deg: f64,
}

/// Complete retained map state
#[derive(Debug, Clone, Serialize)]
pub struct Scene {
    pub markers: BTreeMap<MarkerId, MarkerLayer>,
    pub paths: BTreeMap<PathId, Vec<LatLon>>,
    pub rings: BTreeMap<RingId, RangeRing>,
    pub detail_html: Option<String>,
    pub weather_html: Option<String>,
    pub bearing_deg: f64,
    pub updated_at: DateTime<Utc>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            markers: BTreeMap::new(),
            paths: BTreeMap::new(),
            rings: BTreeMap::new(),
            detail_html: None,
            weather_html: None,
            bearing_deg: 0.0,
            updated_at: Utc::now(),
        }
    }
}

/// Incremental scene change, as sent to clients
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SceneOp<'a> {
    MarkerAdded { marker: &'a MarkerLayer },
    MarkerMoved { id: MarkerId, position: LatLon },
    MarkerRotated { id: MarkerId, heading_deg: f64 },
    MarkerRemoved { id: MarkerId },
    PathAdded { id: PathId, points: &'a [LatLon] },
    PathExtended { id: PathId, point: LatLon },
    PathRemoved { id: PathId },
    RingAdded { id: RingId, ring: &'a RangeRing },
    RingRemoved { id: RingId },
    Detail { html: &'a str },
    Weather { html: &'a str },
    Bearing { bearing_deg: f64 },
}

/// [`MapSurface`] backed by a [`Scene`] and a broadcast channel
pub struct SceneSurface {
    scene: Scene,
    next_id: u64,
    broadcast_tx: broadcast::Sender<String>,
}

impl SceneSurface {
    pub fn new(broadcast_tx: broadcast::Sender<String>) -> Self {
        Self {
            scene: Scene::default(),
            next_id: 1,
            broadcast_tx,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.broadcast_tx.subscribe()
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Publish a scene op to all connected clients
    fn broadcast(&mut self, op: SceneOp<'_>) {
        self.scene.updated_at = Utc::now();
        if self.broadcast_tx.receiver_count() > 0 {
            if let Ok(json) = serde_json::to_string(&op) {
                let _ = self.broadcast_tx.send(json);
            }
        }
    }
}

impl MapSurface for SceneSurface {
    fn add_marker(&mut self, spec: MarkerSpec) -> MarkerId {
        let id = MarkerId(self.allocate_id());
        let layer = MarkerLayer {
            id,
            kind: spec.kind,
            label: spec.label,
            position: spec.position,
            heading_deg: spec.heading_deg,
        };
        self.scene.markers.insert(id, layer.clone());
        self.broadcast(SceneOp::MarkerAdded { marker: &layer });
        id
    }

    fn move_marker(&mut self, id: MarkerId, position: LatLon) {
        match self.scene.markers.get_mut(&id) {
            Some(layer) => layer.position = position,
            None => {
                debug!("Ignoring move of unknown {}", id);
                return;
            }
        }
        self.broadcast(SceneOp::MarkerMoved { id, position });
    }

    fn rotate_marker(&mut self, id: MarkerId, heading_deg: f64) {
        match self.scene.markers.get_mut(&id) {
            Some(layer) => layer.heading_deg = heading_deg,
            None => {
                debug!("Ignoring rotation of unknown {}", id);
                return;
            }
        }
        self.broadcast(SceneOp::MarkerRotated { id, heading_deg });
    }

    fn remove_marker(&mut self, id: MarkerId) {
        if self.scene.markers.remove(&id).is_some() {
            self.broadcast(SceneOp::MarkerRemoved { id });
        }
    }

    fn add_path(&mut self, points: &[LatLon]) -> PathId {
        let id = PathId(self.allocate_id());
        self.scene.paths.insert(id, points.to_vec());
        self.broadcast(SceneOp::PathAdded { id, points });
        id
    }

    fn extend_path(&mut self, id: PathId, point: LatLon) {
        match self.scene.paths.get_mut(&id) {
            Some(points) => points.push(point),
            None => {
                debug!("Ignoring extension of unknown {}", id);
                return;
            }
        }
        self.broadcast(SceneOp::PathExtended { id, point });
    }

    fn remove_path(&mut self, id: PathId) {
        if self.scene.paths.remove(&id).is_some() {
            self.broadcast(SceneOp::PathRemoved { id });
        }
    }

    fn add_ring(&mut self, ring: RangeRing) -> RingId {
        let id = RingId(self.allocate_id());
        self.broadcast(SceneOp::RingAdded { id, ring: &ring });
        self.scene.rings.insert(id, ring);
        id
    }

    fn remove_ring(&mut self, id: RingId) {
        if self.scene.rings.remove(&id).is_some() {
            self.broadcast(SceneOp::RingRemoved { id });
        }
    }

    fn show_detail(&mut self, html: String) {
        self.broadcast(SceneOp::Detail { html: &html });
        self.scene.detail_html = Some(html);
    }

    fn show_weather(&mut self, html: String) {
        self.broadcast(SceneOp::Weather { html: &html });
        self.scene.weather_html = Some(html);
    }

    fn set_bearing(&mut self, bearing_deg: f64) {
        self.scene.bearing_deg = bearing_deg;
        self.broadcast(SceneOp::Bearing { bearing_deg });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn spec(label: &str) -> MarkerSpec {
        MarkerSpec {
            kind: MarkerKind::Aircraft,
            label: label.to_string(),
            position: LatLon::new(1.35, 103.8),
            heading_deg: 90.0,
        }
    }

    #[test]
    fn test_marker_lifecycle_is_broadcast() {
        let (tx, _) = broadcast::channel(16);
        let mut surface = SceneSurface::new(tx);
        let mut rx = surface.subscribe();

        let id = surface.add_marker(spec("SIA1"));
        surface.move_marker(id, LatLon::new(1.4, 103.9));
        surface.remove_marker(id);
        surface.remove_marker(id);

        let ops: Vec<Value> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|s| serde_json::from_str(&s).unwrap())
            .collect();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0]["type"], "marker_added");
        assert_eq!(ops[0]["marker"]["label"], "SIA1");
        assert_eq!(ops[0]["marker"]["kind"], "aircraft");
        assert_eq!(ops[1]["type"], "marker_moved");
        assert_eq!(ops[1]["position"]["lat"], 1.4);
        assert_eq!(ops[2]["type"], "marker_removed");
        assert!(surface.scene().markers.is_empty());
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let (tx, _) = broadcast::channel(16);
        let mut surface = SceneSurface::new(tx);
        surface.move_marker(MarkerId(42), LatLon::new(1.0, 1.0));
        surface.rotate_marker(MarkerId(42), 10.0);
        surface.extend_path(PathId(7), LatLon::new(1.0, 1.0));
        assert!(surface.scene().markers.is_empty());
        assert!(surface.scene().paths.is_empty());
    }

    #[test]
    fn test_paths_and_panels() {
        let (tx, _) = broadcast::channel(16);
        let mut surface = SceneSurface::new(tx);

        let path = surface.add_path(&[LatLon::new(1.0, 103.0)]);
        surface.extend_path(path, LatLon::new(1.1, 103.1));
        assert_eq!(surface.scene().paths[&path].len(), 2);

        surface.show_detail("<div>detail</div>".into());
        surface.show_weather("<div>weather</div>".into());
        surface.set_bearing(45.0);
        assert_eq!(surface.scene().detail_html.as_deref(), Some("<div>detail</div>"));
        assert_eq!(surface.scene().weather_html.as_deref(), Some("<div>weather</div>"));
        assert_eq!(surface.scene().bearing_deg, 45.0);

        let json = serde_json::to_value(surface.scene()).unwrap();
        assert_eq!(json["paths"][path.0.to_string()].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_rings_added_and_removed() {
        let (tx, _) = broadcast::channel(16);
        let mut surface = SceneSurface::new(tx);
        let mut rx = surface.subscribe();

        let ring = surface.add_ring(RangeRing {
            center: LatLon::new(1.3521, 103.8198),
            radius_m: 15_000.0,
            color: "#ff4444".into(),
        });
        assert_eq!(surface.scene().rings[&ring].radius_m, 15_000.0);

        surface.remove_ring(ring);
        surface.remove_ring(ring);
        assert!(surface.scene().rings.is_empty());

        let ops: Vec<Value> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|s| serde_json::from_str(&s).unwrap())
            .collect();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0]["type"], "ring_added");
        assert_eq!(ops[0]["ring"]["color"], "#ff4444");
        assert_eq!(ops[1]["type"], "ring_removed");
    }
}
