//! Shelfwatch - change detection for tracked product pages
//!
//! This library samples external state for a set of targets, diffs every
//! sample against the last recorded observation, raises alerts on significant
//! change and keeps an append-only history for reporting.

pub mod alert;
pub mod config;
pub mod error;
pub mod monitoring;
pub mod report;
pub mod scheduler;
pub mod snapshot;
pub mod store;
pub mod window;

#[cfg(test)]
mod testing;

// Re-export main types
pub use alert::{AlertDispatcher, AlertSink};
pub use config::{SchedulerConfig, SchedulerConfigBuilder};
pub use error::{AlertError, FetchError, MalformedRecordError, PersistenceError};
pub use monitoring::{ChangeDescriptor, MonitoringResult, ObservationSource, ResultStatus};
pub use report::{Report, ReportGenerator};
pub use scheduler::{MonitoringScheduler, RunSummary, SchedulerState};
pub use snapshot::{FieldMap, FieldValue, Snapshot};
pub use store::SnapshotStore;
pub use window::PreviousStateWindow;

/// Number of recent log entries used to seed diff baselines
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Ticks between periodic reports
pub const DEFAULT_REPORT_EVERY: u32 = 6;

/// Default number of targets checked concurrently within a tick
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Upper bound on per-tick concurrency
pub const MAX_CONCURRENCY: usize = 5;
