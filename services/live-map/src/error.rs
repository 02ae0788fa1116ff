//! Feed error types

use reqwest::StatusCode;
use thiserror::Error;

/// Failures that abort a whole poll tick or weather lookup
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("endpoint returned status {0}")]
    Status(StatusCode),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("malformed payload: {0}")]
    Payload(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Why a single state entry was skipped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("entry {index} is not a positional state array")]
    NotPositional { index: usize },

    #[error("entry {index} has no callsign")]
    MissingCallsign { index: usize },

    #[error("entry {index} ({callsign}) has no position")]
    MissingPosition { index: usize, callsign: String },
}
