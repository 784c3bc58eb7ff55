//! Summary reports over the result log.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::PersistenceError;
use crate::monitoring::{MonitoringResult, ResultStatus};
use crate::store::SnapshotStore;

/// How many recent changed results a report lists
pub const RECENT_CHANGES: usize = 5;

/// How many change descriptions are shown per listed result
pub const CHANGES_PER_RESULT: usize = 3;

/// A recent result carrying real field changes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentChange {
    pub timestamp: DateTime<Utc>,
    pub target_id: String,
    pub descriptions: Vec<String>,
}

/// Aggregate view of the whole log
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub total_checks: usize,
    pub distinct_targets: usize,
    pub successes: usize,
    pub changed: usize,
    pub errors: usize,
    pub recent_changes: Vec<RecentChange>,
}

impl Report {
    /// Build a report from results in log order
    pub fn from_results(results: impl IntoIterator<Item = MonitoringResult>) -> Self {
        let mut report = Report::default();
        let mut targets = HashSet::new();
        let mut recent = VecDeque::with_capacity(RECENT_CHANGES);

        for result in results {
            report.total_checks += 1;
            match result.status {
                ResultStatus::Success => report.successes += 1,
                ResultStatus::Changed => report.changed += 1,
                ResultStatus::Error => report.errors += 1,
            }

            if result.has_field_changes() {
                if recent.len() == RECENT_CHANGES {
                    recent.pop_front();
                }
                recent.push_back(RecentChange {
                    timestamp: result.timestamp,
                    target_id: result.target_id.clone(),
                    descriptions: result
                        .change_list()
                        .iter()
                        .take(CHANGES_PER_RESULT)
                        .map(|c| c.description().to_string())
                        .collect(),
                });
            }

            targets.insert(result.target_id);
        }

        report.distinct_targets = targets.len();
        report.recent_changes = recent.into();
        report
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total_checks == 0 {
            return write!(f, "No monitoring data available");
        }

        let rule = "=".repeat(60);

        writeln!(f, "{rule}")?;
        writeln!(f, "MONITORING REPORT")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Total checks: {}", self.total_checks)?;
        writeln!(f, "Products monitored: {}", self.distinct_targets)?;
        writeln!(f)?;
        writeln!(f, "Status breakdown:")?;
        writeln!(f, "  Successful checks: {}", self.successes)?;
        writeln!(f, "  Changes detected: {}", self.changed)?;
        writeln!(f, "  Errors: {}", self.errors)?;

        if !self.recent_changes.is_empty() {
            writeln!(f)?;
            writeln!(f, "Recent changes ({}):", self.recent_changes.len())?;
            for change in &self.recent_changes {
                writeln!(f)?;
                writeln!(f, "  {}", change.timestamp.to_rfc3339())?;
                writeln!(f, "  URL: {}", change.target_id)?;
                for description in &change.descriptions {
                    writeln!(f, "    • {description}")?;
                }
            }
        }

        writeln!(f)?;
        write!(f, "{rule}")
    }
}

/// Reads the log and summarises it; never writes
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    store: Arc<SnapshotStore>,
}

impl ReportGenerator {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self { store }
    }

    /// Generate a report over the full log
    pub fn generate(&self) -> Result<Report, PersistenceError> {
        Ok(Report::from_results(self.store.load_all()?))
    }
}
