//! Recording mactop metrics into the daily CSV store
//!
//! The recorder polls mactop's Prometheus endpoint, maps the exposition text
//! onto the raw sample columns and appends batches to the store. mactop itself
//! can be launched as a companion process when nothing is listening yet.

pub mod client;
pub mod companion;
pub mod prometheus;
pub mod session;

pub use client::MetricsClient;
pub use companion::Companion;
pub use prometheus::parse_metrics;
pub use session::{sample_from_metrics, RecordingSession, SessionStats};

use std::fmt;

use crate::store::StoreError;

/// Recorder errors
#[derive(Debug)]
pub enum RecorderError {
    /// Request to the metrics endpoint failed
    Http(String),
    /// Endpoint answered with a non-success status
    Status(u16),
    /// mactop could not be started or stopped
    Companion(String),
    /// Samples could not be written
    Store(StoreError),
}

impl fmt::Display for RecorderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecorderError::Http(e) => write!(f, "metrics request failed: {}", e),
            RecorderError::Status(code) => write!(f, "metrics endpoint returned HTTP {}", code),
            RecorderError::Companion(e) => write!(f, "mactop companion: {}", e),
            RecorderError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RecorderError {}

impl From<StoreError> for RecorderError {
    fn from(e: StoreError) -> Self {
        RecorderError::Store(e)
    }
}

impl From<reqwest::Error> for RecorderError {
    fn from(e: reqwest::Error) -> Self {
        RecorderError::Http(e.to_string())
    }
}
