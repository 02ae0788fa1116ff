//! Dashboard controller
//!
//! Owns everything a dashboard session needs: the feed client, the marker
//! and path sets, the fixed vessel and the rendering surface. One instance is
//! created per session and shared between the poll task and the surface
//! server.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::FeedError;
use crate::feed::{BoundingBox, FeedClient, LatLon};
use crate::map::{MapSurface, MarkerId, RingId};
use crate::panel;
use crate::paths::PathTracker;
use crate::reconciler::{ReconcileStats, Reconciler};
use crate::rings::{render_rings, RingStyle};
use crate::throttle::{normalize_bearing, Throttle};
use crate::vessel::VesselRecord;

/// How often the poll task logs a session summary
const SUMMARY_INTERVAL: Duration = Duration::from_secs(60);

/// Session behavior switches
#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub track_paths: bool,
    pub viewport_filter: bool,
    pub rotate_throttle: Duration,
    pub vessel: VesselRecord,
    pub center: LatLon,
    pub range_rings: Vec<RingStyle>,
}

impl From<&Config> for DashboardOptions {
    fn from(config: &Config) -> Self {
        Self {
            track_paths: config.track_paths,
            viewport_filter: config.viewport_filter,
            rotate_throttle: config.rotate_throttle(),
            vessel: config.vessel.clone(),
            center: config.center(),
            range_rings: config.range_rings.clone(),
        }
    }
}

/// Mutable session state, guarded as one unit
struct DashboardState<S> {
    surface: S,
    reconciler: Reconciler,
    paths: Option<PathTracker>,
    vessel: VesselRecord,
    vessel_marker: Option<MarkerId>,
    rings: Vec<RingId>,
    /// Bumped on every selection; weather for an older one is dropped
    selection: u64,
    viewport: Option<BoundingBox>,
    rotation: Throttle,
}

/// Poll outcome counters
#[derive(Debug, Default)]
struct TickCounters {
    completed: AtomicU64,
    failed: AtomicU64,
}

pub struct Dashboard<S> {
    client: FeedClient,
    viewport_filter: bool,
    state: Mutex<DashboardState<S>>,
    ticks: TickCounters,
}

impl<S: MapSurface> Dashboard<S> {
    /// Create a session and render its static content
    pub fn new(client: FeedClient, mut surface: S, options: DashboardOptions) -> Self {
        let rings = render_rings(&mut surface, options.center, &options.range_rings);
        let vessel_marker = options.vessel.render(&mut surface);
        info!(
            "Vessel {} ({}) placed at ({:.4}, {:.4})",
            options.vessel.name, options.vessel.callsign, options.vessel.lat, options.vessel.lon
        );

        Self {
            client,
            viewport_filter: options.viewport_filter,
            state: Mutex::new(DashboardState {
                surface,
                reconciler: Reconciler::new(),
                paths: options.track_paths.then(PathTracker::new),
                vessel: options.vessel,
                vessel_marker: Some(vessel_marker),
                rings,
                selection: 0,
                viewport: None,
                rotation: Throttle::new(options.rotate_throttle),
            }),
            ticks: TickCounters::default(),
        }
    }

    /// One poll cycle: fetch the snapshot, then reconcile it.
    ///
    /// A failed fetch returns before any state is touched.
    pub async fn tick(&self) -> Result<ReconcileStats, FeedError> {
        let bbox = if self.viewport_filter {
            self.state.lock().await.viewport
        } else {
            None
        };

        let snapshot = match self.client.fetch_snapshot(bbox).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.ticks.failed.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let stats = state.reconciler.reconcile(&mut state.surface, &snapshot.records);
        if let Some(paths) = state.paths.as_mut() {
            paths.record_all(
                &mut state.surface,
                snapshot.records.iter().filter_map(|r| r.as_ref().ok()),
            );
        }
        self.ticks.completed.fetch_add(1, Ordering::Relaxed);

        if let Some(time) = snapshot.time {
            debug!("Snapshot of {} applied: {}", time.format("%H:%M:%S"), stats);
        }
        Ok(stats)
    }

    /// Handle a click on a marker. Returns false for unknown markers.
    pub async fn select_marker(&self, marker: MarkerId) -> bool {
        let (weather_at, generation) = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            if let Some(entry) = state.reconciler.find_by_marker(marker) {
                debug!("Selected flight {}", entry.record.callsign);
                state.selection += 1;
                state.surface.show_detail(panel::flight_info_html(&entry.record));
                (entry.record.position, state.selection)
            } else if state.vessel_marker == Some(marker) {
                state.selection += 1;
                state.surface.show_detail(panel::vessel_info_html(&state.vessel));
                return true;
            } else {
                debug!("Selection of unknown {}", marker);
                return false;
            }
        };

        self.refresh_weather(weather_at, generation).await;
        true
    }

    /// Fetch weather for a position and show it, unless another marker has
    /// been selected meanwhile. Failures keep the old panel.
    async fn refresh_weather(&self, at: LatLon, generation: u64) {
        match self.client.fetch_weather(at).await {
            Ok(report) => {
                let mut state = self.state.lock().await;
                if state.selection != generation {
                    debug!("Dropping weather for superseded selection {}", generation);
                    return;
                }
                state.surface.show_weather(panel::weather_html(&report));
            }
            Err(e) => {
                error!("Weather update failed: {}", e);
            }
        }
    }

    /// Remove all flight paths; markers are unaffected
    pub async fn clear_paths(&self) {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        match state.paths.as_mut() {
            Some(paths) => paths.clear_all(&mut state.surface),
            None => debug!("Path tracking disabled, nothing to clear"),
        }
    }

    /// Record the current map viewport. Returns false if the box is rejected.
    pub async fn set_viewport(&self, bbox: BoundingBox) -> bool {
        if !bbox.is_valid() {
            warn!("Ignoring invalid viewport {:?}", bbox);
            return false;
        }
        self.state.lock().await.viewport = Some(bbox);
        true
    }

    /// Apply a drag rotation, rate limited. Returns false if throttled.
    pub async fn rotate(&self, bearing_deg: f64) -> bool {
        if !bearing_deg.is_finite() {
            return false;
        }
        let mut state = self.state.lock().await;
        if !state.rotation.ready(Instant::now()) {
            return false;
        }
        state.surface.set_bearing(normalize_bearing(bearing_deg));
        true
    }

    /// Read access to the surface
    pub async fn with_surface<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.state.lock().await.surface)
    }

    pub async fn summary(&self) -> DashboardStats {
        let state = self.state.lock().await;
        DashboardStats {
            markers: state.reconciler.count(),
            paths: state.paths.as_ref().map_or(0, PathTracker::count),
            path_points: state.paths.as_ref().map_or(0, PathTracker::total_points),
            ticks: self.ticks.completed.load(Ordering::Relaxed),
            failed_ticks: self.ticks.failed.load(Ordering::Relaxed),
        }
    }

    /// Release everything rendered by this session
    pub async fn teardown(&self) {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.reconciler.clear(&mut state.surface);
        if let Some(paths) = state.paths.as_mut() {
            paths.clear_all(&mut state.surface);
        }
        if let Some(marker) = state.vessel_marker.take() {
            state.surface.remove_marker(marker);
        }
        for ring in state.rings.drain(..) {
            state.surface.remove_ring(ring);
        }
    }
}

/// Session summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardStats {
    pub markers: usize,
    pub paths: usize,
    pub path_points: usize,
    pub ticks: u64,
    pub failed_ticks: u64,
}

impl std::fmt::Display for DashboardStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Flights: {} on map, {} paths ({} points) | ticks: {} ok, {} failed",
            self.markers, self.paths, self.path_points, self.ticks, self.failed_ticks
        )
    }
}

/// Fixed-interval poller driving [`Dashboard::tick`].
///
/// The first tick runs immediately. Ticks never overlap: a slow round trip
/// delays the next tick instead of racing it. Dropping the task aborts it;
/// [`PollTask::shutdown`] also waits for an in-flight tick to unwind.
pub struct PollTask {
    handle: JoinHandle<()>,
}

impl PollTask {
    pub fn spawn<S>(dashboard: Arc<Dashboard<S>>, period: Duration) -> Self
    where
        S: MapSurface + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last_summary = Instant::now();

            loop {
                ticker.tick().await;

                match dashboard.tick().await {
                    Ok(stats) => debug!("[Tick] {}", stats),
                    Err(e) => error!("Flight update failed: {}", e),
                }

                if last_summary.elapsed() >= SUMMARY_INTERVAL {
                    info!("[Dashboard] {}", dashboard.summary().await);
                    last_summary = Instant::now();
                }
            }
        });
        Self { handle }
    }

    /// Abort the task and wait until it has stopped
    pub async fn shutdown(mut self) {
        self.handle.abort();
        if let Err(e) = (&mut self.handle).await {
            if !e.is_cancelled() {
                error!("Poll task failed: {}", e);
            }
        }
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
