//! Backend feed: flights/weather endpoints and payload normalization

mod client;
mod types;
pub mod wire;

pub use client::FeedClient;
pub use types::{BoundingBox, LatLon, TrackRecord, WeatherReport};
