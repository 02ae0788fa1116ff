//! Flight path history
//!
//! Paths outlive their markers: a flight that leaves the snapshot keeps its
//! polyline until the user clears all paths.

use std::collections::HashMap;
use tracing::{debug, info};

use crate::feed::{LatLon, TrackRecord};
use crate::map::{MapSurface, PathId};

/// Rendered history of one callsign
#[derive(Debug, Clone)]
pub struct TrackPath {
    pub path: PathId,
    pub points: Vec<LatLon>,
}

#[derive(Debug, Default)]
pub struct PathTracker {
    paths: HashMap<String, TrackPath>,
    initial_positions: HashMap<String, LatLon>,
}

impl PathTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one sighting of a valid track
    pub fn record<S: MapSurface>(&mut self, surface: &mut S, record: &TrackRecord) {
        let initial = *self
            .initial_positions
            .entry(record.callsign.clone())
            .or_insert(record.position);

        match self.paths.get_mut(&record.callsign) {
            Some(track) => {
                track.points.push(record.position);
                surface.extend_path(track.path, record.position);
            }
            None => {
                let points = vec![initial];
                let path = surface.add_path(&points);
                debug!("Started path for {} as {}", record.callsign, path);
                self.paths
                    .insert(record.callsign.clone(), TrackPath { path, points });
            }
        }
    }

    /// Record every sighting of a snapshot, in order
    pub fn record_all<'a, S, I>(&mut self, surface: &mut S, records: I)
    where
        S: MapSurface,
        I: IntoIterator<Item = &'a TrackRecord>,
    {
        for record in records {
            self.record(surface, record);
        }
    }

    /// Remove every path and forget first-seen positions
    pub fn clear_all<S: MapSurface>(&mut self, surface: &mut S) {
        let removed = self.paths.len();
        for (_, track) in self.paths.drain() {
            surface.remove_path(track.path);
        }
        self.initial_positions.clear();
        info!("Cleared {} flight paths", removed);
    }

    pub fn count(&self) -> usize {
        self.paths.len()
    }

    pub fn total_points(&self) -> usize {
        self.paths.values().map(|t| t.points.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::SceneSurface;
    use tokio::sync::broadcast;

    fn surface() -> SceneSurface {
        let (tx, _) = broadcast::channel(64);
        SceneSurface::new(tx)
    }

    fn record(callsign: &str, lat: f64, lon: f64) -> TrackRecord {
        TrackRecord {
            callsign: callsign.to_string(),
            origin_country: "Singapore".to_string(),
            altitude_m: 1000.0,
            velocity_ms: 200.0,
            heading_deg: 0.0,
            position: LatLon::new(lat, lon),
        }
    }

    #[test]
    fn test_first_sighting_seeds_path() {
        let mut surface = surface();
        let mut tracker = PathTracker::new();
        tracker.record(&mut surface, &record("SIA1", 1.3, 103.8));

        let track = tracker.paths.get("SIA1").unwrap();
        assert_eq!(track.points, vec![LatLon::new(1.3, 103.8)]);
        assert_eq!(tracker.initial_positions.get("SIA1").copied(), Some(LatLon::new(1.3, 103.8)));
        assert_eq!(surface.scene().paths[&track.path], track.points);
    }

    #[test]
    fn test_path_grows_monotonically_without_dedup() {
        let mut surface = surface();
        let mut tracker = PathTracker::new();
        let mut last_len = 0;

        for (lat, lon) in [(1.3, 103.8), (1.31, 103.81), (1.31, 103.81), (1.32, 103.83)] {
            tracker.record(&mut surface, &record("SIA1", lat, lon));
            let len = tracker.paths.get("SIA1").unwrap().points.len();
            assert!(len > last_len);
            last_len = len;
        }

        let track = tracker.paths.get("SIA1").unwrap();
        assert_eq!(track.points.len(), 4);
        assert_eq!(track.points[1], track.points[2]);
        assert_eq!(tracker.initial_positions.get("SIA1").copied(), Some(LatLon::new(1.3, 103.8)));
        assert_eq!(surface.scene().paths[&track.path].len(), 4);
    }

    #[test]
    fn test_clear_all_empties_everything() {
        let mut surface = surface();
        let mut tracker = PathTracker::new();
        tracker.record_all(
            &mut surface,
            &[record("SIA1", 1.3, 103.8), record("SIA2", 1.4, 103.9)],
        );
        assert_eq!(tracker.count(), 2);

        tracker.clear_all(&mut surface);
        assert_eq!(tracker.count(), 0);
        assert_eq!(tracker.total_points(), 0);
        assert!(tracker.initial_positions.get("SIA1").copied().is_none());
        assert!(surface.scene().paths.is_empty());

        // a fresh sighting after a clear starts over at the new position
        tracker.record(&mut surface, &record("SIA1", 1.5, 104.0));
        assert_eq!(tracker.paths.get("SIA1").unwrap().points, vec![LatLon::new(1.5, 104.0)]);
        assert_eq!(tracker.initial_positions.get("SIA1").copied(), Some(LatLon::new(1.5, 104.0)));
    }
}
