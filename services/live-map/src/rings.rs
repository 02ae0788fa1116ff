//! Distance rings drawn around the map center

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::feed::LatLon;
use crate::map::{MapSurface, RangeRing, RingId};

/// One configured ring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingStyle {
    pub radius_km: f64,
    pub color: String,
}

impl RingStyle {
    fn new(radius_km: f64, color: &str) -> Self {
        Self {
            radius_km,
            color: color.to_string(),
        }
    }
}

/// 15/30/45/60 km rings
pub fn default_rings() -> Vec<RingStyle> {
    vec![
        RingStyle::new(15.0, "#ff4444"),
        RingStyle::new(30.0, "#ff8800"),
        RingStyle::new(45.0, "#00C851"),
        RingStyle::new(60.0, "#33b5e5"),
    ]
}

/// Place every ring around `center`; unusable radii are skipped
pub fn render_rings<S: MapSurface>(surface: &mut S, center: LatLon, rings: &[RingStyle]) -> Vec<RingId> {
    rings
        .iter()
        .filter(|style| {
            let usable = style.radius_km.is_finite() && style.radius_km > 0.0;
            if !usable {
                warn!("Skipping range ring with radius {} km", style.radius_km);
            }
            usable
        })
        .map(|style| {
            surface.add_ring(RangeRing {
                center,
                radius_m: style.radius_km * 1000.0,
                color: style.color.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::SceneSurface;
    use tokio::sync::broadcast;

    #[test]
    fn test_default_rings_rendered_in_meters() {
        let (tx, _) = broadcast::channel(16);
        let mut surface = SceneSurface::new(tx);
        let center = LatLon::new(1.3521, 103.8198);

        let ids = render_rings(&mut surface, center, &default_rings());
        assert_eq!(ids.len(), 4);

        let radii: Vec<f64> = ids.iter().map(|id| surface.scene().rings[id].radius_m).collect();
        assert_eq!(radii, vec![15_000.0, 30_000.0, 45_000.0, 60_000.0]);
        assert!(surface.scene().rings.values().all(|r| r.center == center));
    }

    #[test]
    fn test_bad_radius_skipped() {
        let (tx, _) = broadcast::channel(16);
        let mut surface = SceneSurface::new(tx);
        let rings = [
            RingStyle::new(0.0, "#000"),
            RingStyle::new(f64::NAN, "#000"),
            RingStyle::new(10.0, "#123456"),
        ];

        let ids = render_rings(&mut surface, LatLon::new(1.0, 103.0), &rings);
        assert_eq!(ids.len(), 1);
        assert_eq!(surface.scene().rings[&ids[0]].color, "#123456");
    }
}
