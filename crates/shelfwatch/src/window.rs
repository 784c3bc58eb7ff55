//! Bounded window of recent results used as diff baselines.
//!
//! The window holds the last `capacity` persisted results overall, in log
//! order. The baseline for a target is its latest result inside that window,
//! so a quiet target can fall out of the window while its history stays in
//! the log. The log is the source of truth; this is rebuilt from its tail at
//! startup.

use std::collections::{HashMap, VecDeque};

use crate::DEFAULT_WINDOW_SIZE;
use crate::monitoring::MonitoringResult;

#[derive(Debug, Clone)]
pub struct PreviousStateWindow {
    capacity: usize,
    entries: VecDeque<MonitoringResult>,
}

impl PreviousStateWindow {
    /// Entries are allocated as results arrive, not up front
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: VecDeque::with_capacity(capacity.min(DEFAULT_WINDOW_SIZE)) }
    }

    /// Build a window from results in log order, keeping only the tail
    pub fn from_log(capacity: usize, results: impl IntoIterator<Item = MonitoringResult>) -> Self {
        let mut window = Self::new(capacity);
        for result in results {
            window.record(result);
        }
        window
    }

    /// Record a freshly persisted result, evicting the oldest entry overall
    /// once the window is full
    pub fn record(&mut self, result: MonitoringResult) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(result);
    }

    /// Latest result for a target still inside the window
    pub fn latest(&self, target_id: &str) -> Option<&MonitoringResult> {
        self.entries.iter().rev().find(|result| result.target_id == target_id)
    }

    /// Latest result per target
    pub fn by_target(&self) -> HashMap<String, MonitoringResult> {
        let mut latest = HashMap::new();
        for result in &self.entries {
            latest.insert(result.target_id.clone(), result.clone());
        }
        latest
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of raw entries held, not distinct targets
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
