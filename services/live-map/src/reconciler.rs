//! Live marker reconciliation
//!
//! Keeps exactly one map marker per callsign seen in the latest snapshot.
//! Each tick creates markers for new callsigns, moves/rotates existing ones
//! and removes markers whose callsign is no longer reported.

use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::error::RecordError;
use crate::feed::TrackRecord;
use crate::map::{MapSurface, MarkerId, MarkerKind, MarkerSpec};

/// A tracked callsign and the marker it owns
#[derive(Debug, Clone)]
pub struct MarkerEntry {
    pub marker: MarkerId,
    /// Latest record seen for this callsign
    pub record: TrackRecord,
}

/// Marker set keyed by callsign
#[derive(Debug, Default)]
pub struct Reconciler {
    markers: HashMap<String, MarkerEntry>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one snapshot to the marker set and the surface
    pub fn reconcile<S: MapSurface>(
        &mut self,
        surface: &mut S,
        records: &[Result<TrackRecord, RecordError>],
    ) -> ReconcileStats {
        let mut stats = ReconcileStats::default();
        let mut observed: HashSet<&str> = HashSet::with_capacity(records.len());

        for candidate in records {
            let record = match candidate {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping flight entry: {}", e);
                    stats.skipped += 1;
                    continue;
                }
            };
            observed.insert(record.callsign.as_str());

            match self.markers.get_mut(&record.callsign) {
                Some(entry) => {
                    surface.move_marker(entry.marker, record.position);
                    if entry.record.heading_deg != record.heading_deg {
                        surface.rotate_marker(entry.marker, record.heading_deg);
                    }
                    entry.record = record.clone();
                    stats.updated += 1;
                }
                None => {
                    let marker = surface.add_marker(MarkerSpec {
                        kind: MarkerKind::Aircraft,
                        label: record.callsign.clone(),
                        position: record.position,
                        heading_deg: record.heading_deg,
                    });
                    debug!(
                        "New flight tracked: {} at ({:.4}, {:.4}) as {}",
                        record.callsign, record.position.lat, record.position.lon, marker
                    );
                    self.markers.insert(
                        record.callsign.clone(),
                        MarkerEntry { marker, record: record.clone() },
                    );
                    stats.created += 1;
                }
            }
        }

        self.markers.retain(|callsign, entry| {
            if observed.contains(callsign.as_str()) {
                true
            } else {
                debug!("Flight {} left the snapshot, removing {}", callsign, entry.marker);
                surface.remove_marker(entry.marker);
                stats.removed += 1;
                false
            }
        });

        stats
    }

    /// Drop every marker, e.g. on teardown
    pub fn clear<S: MapSurface>(&mut self, surface: &mut S) {
        for (_, entry) in self.markers.drain() {
            surface.remove_marker(entry.marker);
        }
    }

    /// Resolve a clicked marker back to its flight
    pub fn find_by_marker(&self, marker: MarkerId) -> Option<&MarkerEntry> {
        self.markers.values().find(|entry| entry.marker == marker)
    }

    pub fn count(&self) -> usize {
        self.markers.len()
    }
}

/// Outcome of one reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    pub skipped: usize,
}

impl std::fmt::Display for ReconcileStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} new, {} updated, {} removed, {} skipped",
            self.created, self.updated, self.removed, self.skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{wire::parse_snapshot, LatLon};
    use crate::map::SceneSurface;
    use serde_json::{json, Value};
    use tokio::sync::broadcast;

    fn surface() -> SceneSurface {
        let (tx, _) = broadcast::channel(256);
        SceneSurface::new(tx)
    }

    fn records(payload: Value) -> Vec<Result<TrackRecord, RecordError>> {
        parse_snapshot(payload).unwrap().records
    }

    fn state(callsign: &str, lat: f64, lon: f64, heading: f64) -> Value {
        json!(["", callsign, "Singapore", 0, 0, lon, lat, 1000.0, false, 200.0, heading])
    }

    fn sorted_callsigns(reconciler: &Reconciler) -> Vec<&str> {
        let mut v: Vec<&str> = reconciler.markers.keys().map(String::as_str).collect();
        v.sort_unstable();
        v
    }

    #[test]
    fn test_marker_set_matches_snapshot() {
        let mut surface = surface();
        let mut reconciler = Reconciler::new();

        let stats = reconciler.reconcile(
            &mut surface,
            &records(json!([
                state("SIA1", 1.3, 103.8, 10.0),
                state("SIA2", 1.4, 103.9, 20.0),
                ["", "", "x", 0, 0, 103.0, 1.0],
                ["", "NOPOS", "x", 0, 0, null, null]
            ])),
        );

        assert_eq!(stats, ReconcileStats { created: 2, updated: 0, removed: 0, skipped: 2 });
        assert_eq!(sorted_callsigns(&reconciler), vec!["SIA1", "SIA2"]);
        assert_eq!(surface.scene().markers.len(), 2);
    }

    #[test]
    fn test_absent_callsign_removed_on_first_absent_tick() {
        let mut surface = surface();
        let mut reconciler = Reconciler::new();

        reconciler.reconcile(
            &mut surface,
            &records(json!([state("SIA1", 1.3, 103.8, 0.0), state("SIA2", 1.4, 103.9, 0.0)])),
        );
        let gone = reconciler.markers.get("SIA2").unwrap().marker;

        let stats = reconciler.reconcile(&mut surface, &records(json!([state("SIA1", 1.31, 103.81, 0.0)])));
        assert_eq!(stats.removed, 1);
        assert_eq!(sorted_callsigns(&reconciler), vec!["SIA1"]);
        assert!(!surface.scene().markers.contains_key(&gone));

        let stats = reconciler.reconcile(&mut surface, &records(json!([state("SIA1", 1.32, 103.82, 0.0)])));
        assert_eq!(stats.removed, 0);
        assert_eq!(reconciler.count(), 1);
    }

    #[test]
    fn test_invalid_record_does_not_touch_existing_marker() {
        let mut surface = surface();
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&mut surface, &records(json!([state("SIA1", 1.3, 103.8, 0.0)])));
        let marker = reconciler.markers.get("SIA1").unwrap().marker;

        // a positionless report counts as absent rather than as an update
        let stats = reconciler.reconcile(
            &mut surface,
            &records(json!([["", "SIA1", "Singapore", 0, 0, null, null, 0, false, 0, 0]])),
        );
        assert_eq!(stats.updated, 0);
        assert_eq!(stats.skipped, 1);
        assert!(reconciler.markers.get("SIA1").is_none());
        assert!(!surface.scene().markers.contains_key(&marker));
    }

    #[test]
    fn test_update_moves_and_rotates_only_on_heading_change() {
        let mut surface = surface();
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&mut surface, &records(json!([state("SIA1", 1.3, 103.8, 90.0)])));
        let marker = reconciler.markers.get("SIA1").unwrap().marker;

        let mut rx = surface.subscribe();
        reconciler.reconcile(&mut surface, &records(json!([state("SIA1", 1.35, 103.85, 90.0)])));
        let ops: Vec<Value> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|s| serde_json::from_str(&s).unwrap())
            .collect();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0]["type"], "marker_moved");

        reconciler.reconcile(&mut surface, &records(json!([state("SIA1", 1.36, 103.86, 135.0)])));
        let ops: Vec<Value> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|s| serde_json::from_str(&s).unwrap())
            .collect();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[1]["type"], "marker_rotated");

        let layer = &surface.scene().markers[&marker];
        assert_eq!(layer.position, LatLon::new(1.36, 103.86));
        assert_eq!(layer.heading_deg, 135.0);
        assert_eq!(reconciler.markers.get("SIA1").unwrap().record.heading_deg, 135.0);
    }

    #[test]
    fn test_identical_snapshot_is_idempotent() {
        let mut surface = surface();
        let mut reconciler = Reconciler::new();
        let snapshot = records(json!([state("SIA1", 1.3, 103.8, 10.0), state("SIA2", 1.4, 103.9, 20.0)]));

        reconciler.reconcile(&mut surface, &snapshot);
        let before = surface.scene().markers.clone();

        let stats = reconciler.reconcile(&mut surface, &snapshot);
        assert_eq!(stats, ReconcileStats { created: 0, updated: 2, removed: 0, skipped: 0 });
        assert_eq!(surface.scene().markers, before);
        assert_eq!(reconciler.count(), 2);
    }

    #[test]
    fn test_duplicate_callsign_in_snapshot_keeps_one_marker() {
        let mut surface = surface();
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(
            &mut surface,
            &records(json!([state("SIA1", 1.3, 103.8, 0.0), state("SIA1", 1.31, 103.81, 0.0)])),
        );
        assert_eq!(reconciler.count(), 1);
        assert_eq!(surface.scene().markers.len(), 1);
        assert_eq!(reconciler.markers.get("SIA1").unwrap().record.position, LatLon::new(1.31, 103.81));
    }

    #[test]
    fn test_scenario_single_flight() {
        let mut surface = surface();
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(
            &mut surface,
            &records(json!([["", "ABC123", "USA", 0, 0, 120, 103.9, 5000, 0, 257, 45]])),
        );

        let entry = reconciler.markers.get("ABC123").unwrap();
        assert_eq!(surface.scene().markers[&entry.marker].position, LatLon::new(103.9, 120.0));
        assert_eq!(reconciler.find_by_marker(entry.marker).unwrap().record.callsign, "ABC123");

        reconciler.reconcile(&mut surface, &records(json!([])));
        assert_eq!(reconciler.count(), 0);
        assert!(surface.scene().markers.is_empty());
    }

    #[test]
    fn test_clear_releases_markers() {
        let mut surface = surface();
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&mut surface, &records(json!([state("SIA1", 1.3, 103.8, 0.0)])));
        reconciler.clear(&mut surface);
        assert_eq!(reconciler.count(), 0);
        assert!(surface.scene().markers.is_empty());
    }
}
