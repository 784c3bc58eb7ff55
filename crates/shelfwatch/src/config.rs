//! Scheduler configuration.

use std::time::Duration;

use crate::{DEFAULT_CONCURRENCY, DEFAULT_REPORT_EVERY, DEFAULT_WINDOW_SIZE, MAX_CONCURRENCY};

/// Configuration options for a monitoring scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Targets in check order, without duplicates
    pub targets: Vec<String>,

    /// Pause between ticks
    pub interval: Duration,

    /// Number of ticks to run; 0 means a single run
    pub max_ticks: u32,

    /// Emit a report after every this many ticks; 0 disables periodic reports
    pub report_every: u32,

    /// Targets checked at the same time within a tick
    pub concurrency: usize,

    /// Size of the baseline window rebuilt from the log
    pub window_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            interval: Duration::from_secs(60 * 60),
            max_ticks: 0,
            report_every: DEFAULT_REPORT_EVERY,
            concurrency: DEFAULT_CONCURRENCY,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl SchedulerConfig {
    /// Create a new configuration builder
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::default()
    }

    /// Ticks the scheduler will run before completing
    pub fn total_ticks(&self) -> u32 {
        self.max_ticks.max(1)
    }
}

/// Builder for SchedulerConfig
#[derive(Default)]
pub struct SchedulerConfigBuilder {
    config: SchedulerConfig,
}

impl SchedulerConfigBuilder {
    /// Build the configuration
    pub fn build(self) -> SchedulerConfig {
        self.config
    }

    /// Add a target; repeats are ignored
    pub fn target(mut self, target: impl Into<String>) -> Self {
        let target = target.into();
        if !self.config.targets.contains(&target) {
            self.config.targets.push(target);
        }
        self
    }

    /// Add several targets in order
    pub fn targets<I, T>(self, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        targets.into_iter().fold(self, |builder, target| builder.target(target))
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn max_ticks(mut self, max_ticks: u32) -> Self {
        self.config.max_ticks = max_ticks;
        self
    }

    pub fn report_every(mut self, report_every: u32) -> Self {
        self.config.report_every = report_every;
        self
    }

    /// Set per-tick concurrency, clamped to `1..=MAX_CONCURRENCY`
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    pub fn window_size(mut self, window_size: usize) -> Self {
        self.config.window_size = window_size;
        self
    }
}
