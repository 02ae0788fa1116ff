//! Map rendering surface

mod scene;
mod surface;

pub use scene::SceneSurface;
pub use surface::{MapSurface, MarkerId, MarkerKind, MarkerSpec, PathId, RangeRing, RingId};
