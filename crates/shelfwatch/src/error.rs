//! Error taxonomy for the monitoring engine.
//!
//! None of these are fatal to the scheduler loop: fetch errors become
//! `status=error` results, persistence errors are logged and retried on the
//! next tick, malformed records are skipped and alert failures are dropped.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure to observe a single target
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Could not extract product fields: {0}")]
    Schema(String),

    #[error("Confirmation declined for {0}")]
    Declined(String),
}

/// I/O failure on the durable result log
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Result log I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode monitoring result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// A log line that could not be decoded into a monitoring result
#[derive(Debug, Error)]
#[error("Malformed record on line {line}: {source}")]
pub struct MalformedRecordError {
    pub line: usize,
    #[source]
    pub source: serde_json::Error,
}

/// Best-effort alert delivery failure
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Alert delivery via {sink} failed: {message}")]
    Delivery { sink: String, message: String },

    #[error("Alert rejected by {sink} with status {status}")]
    Rejected { sink: String, status: u16 },
}
