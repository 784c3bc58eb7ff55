//! Tick-driven monitoring loop.
//!
//! Each tick checks every target once on a bounded pool of tasks. A target's
//! baseline is taken from the window as it stood when the tick started, and
//! the window is only advanced after the whole tick has been persisted, in
//! log order. Failures stay with the target that caused them. Between ticks
//! the scheduler sleeps, and a cancellation preempts that sleep; checks that
//! are already running are allowed to finish.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::alert::AlertDispatcher;
use crate::config::SchedulerConfig;
use crate::monitoring::{MonitoringExecutor, MonitoringResult, ObservationSource, ResultStatus};
use crate::report::{Report, ReportGenerator};
use crate::store::SnapshotStore;
use crate::window::PreviousStateWindow;

/// Lifecycle of a scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    /// Ended early by cancellation
    Stopped,
    /// Ran every configured tick
    Completed,
}

/// Outcome of a scheduler run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub state: SchedulerState,
    pub ticks: u32,
    /// Every report emitted during the run, the final one last
    pub reports: Vec<Report>,
}

/// Per-tick counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickStats {
    pub success: usize,
    pub changed: usize,
    pub errors: usize,
    /// Results that could not be appended to the log
    pub unpersisted: usize,
}

/// Monitoring scheduler - drives ticks across all targets
pub struct MonitoringScheduler {
    config: SchedulerConfig,
    executor: Arc<MonitoringExecutor>,
    store: Arc<SnapshotStore>,
    dispatcher: Arc<AlertDispatcher>,
    reports: ReportGenerator,
    window: PreviousStateWindow,
    window_loaded: bool,
    state: SchedulerState,
    report_tx: Option<mpsc::Sender<Report>>,
}

impl MonitoringScheduler {
    /// Create a scheduler.
    ///
    /// The baseline window is rebuilt from the tail of the log on the
    /// blocking pool when the first tick starts.
    pub fn new(
        config: SchedulerConfig,
        source: Arc<dyn ObservationSource>,
        store: Arc<SnapshotStore>,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            executor: Arc::new(MonitoringExecutor::new(source)),
            reports: ReportGenerator::new(Arc::clone(&store)),
            dispatcher: Arc::new(dispatcher),
            window: PreviousStateWindow::new(config.window_size),
            window_loaded: false,
            store,
            config,
            state: SchedulerState::Idle,
            report_tx: None,
        }
    }

    /// Also forward every report over a channel as it is produced
    pub fn with_report_channel(mut self, report_tx: mpsc::Sender<Report>) -> Self {
        self.report_tx = Some(report_tx);
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn window(&self) -> &PreviousStateWindow {
        &self.window
    }

    /// Run ticks until the configured count is reached or `cancel` fires
    pub async fn run(&mut self, cancel: CancellationToken) -> RunSummary {
        if self.state != SchedulerState::Idle {
            warn!("Scheduler already ran, ignoring run request");
            return RunSummary { state: self.state, ticks: 0, reports: Vec::new() };
        }

        let total = self.config.total_ticks();
        let mut ticks = 0;
        let mut reports = Vec::new();

        self.state = SchedulerState::Running;
        info!(
            "Starting scheduled monitoring: {} target(s), {} run(s), interval {:?}",
            self.config.targets.len(),
            total,
            self.config.interval
        );

        while ticks < total {
            if cancel.is_cancelled() {
                self.state = SchedulerState::Stopped;
                break;
            }

            ticks += 1;
            info!("Monitoring run {}/{}", ticks, total);
            let stats = self.run_tick().await;
            info!(
                success = stats.success,
                changed = stats.changed,
                errors = stats.errors,
                unpersisted = stats.unpersisted,
                "Monitoring run {}/{} finished",
                ticks,
                total
            );

            if self.config.report_every > 0 && ticks % self.config.report_every == 0 {
                reports.extend(self.emit_report().await);
            }

            if ticks < total {
                info!("Waiting {:?} until next check", self.config.interval);
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Stop requested, ending monitoring loop");
                        self.state = SchedulerState::Stopped;
                        break;
                    }
                    _ = tokio::time::sleep(self.config.interval) => {}
                }
            }
        }

        if self.state == SchedulerState::Running {
            self.state = SchedulerState::Completed;
        }

        reports.extend(self.emit_report().await);

        info!("Monitoring loop ended after {} run(s): {:?}", ticks, self.state);
        RunSummary { state: self.state, ticks, reports }
    }

    /// Check every target once
    pub async fn run_tick(&mut self) -> TickStats {
        self.load_window().await;

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for target in &self.config.targets {
            let baseline = self.window.latest(target).cloned();
            let target = target.clone();
            let executor = Arc::clone(&self.executor);
            let store = Arc::clone(&self.store);
            let dispatcher = Arc::clone(&self.dispatcher);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return None;
                };
                Some(check_target(&executor, &store, &dispatcher, target, baseline).await)
            });
        }

        let mut stats = TickStats::default();
        let mut persisted = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            let (seq, result) = match joined {
                Ok(Some(outcome)) => outcome,
                Ok(None) => continue,
                Err(e) => {
                    error!("Target check task failed: {}", e);
                    stats.errors += 1;
                    continue;
                }
            };

            match result.status {
                ResultStatus::Success => stats.success += 1,
                ResultStatus::Changed => stats.changed += 1,
                ResultStatus::Error => stats.errors += 1,
            }

            match seq {
                Some(seq) => persisted.push((seq, result)),
                None => stats.unpersisted += 1,
            }
        }

        // Replay in append order so the window mirrors the log
        persisted.sort_by_key(|(seq, _)| *seq);
        for (_, result) in persisted {
            self.window.record(result);
        }

        stats
    }

    async fn load_window(&mut self) {
        if self.window_loaded {
            return;
        }
        self.window_loaded = true;

        let store = Arc::clone(&self.store);
        let window_size = self.config.window_size;
        match tokio::task::spawn_blocking(move || store.load_window(window_size)).await {
            Ok(Ok(window)) => {
                debug!(entries = window.len(), "Rebuilt baseline window from result log");
                self.window = window;
            }
            Ok(Err(e)) => warn!("Could not load result history, starting without baselines: {}", e),
            Err(e) => error!("Result history task failed: {}", e),
        }
    }

    async fn emit_report(&self) -> Option<Report> {
        let reports = self.reports.clone();
        let generated = match tokio::task::spawn_blocking(move || reports.generate()).await {
            Ok(generated) => generated,
            Err(e) => {
                error!("Report generation task failed: {}", e);
                return None;
            }
        };

        let report = match generated {
            Ok(report) => report,
            Err(e) => {
                warn!("Failed to generate report: {}", e);
                return None;
            }
        };

        info!("\n{}", report);

        if let Some(report_tx) = &self.report_tx {
            if let Err(e) = report_tx.send(report.clone()).await {
                debug!("Report receiver dropped: {}", e);
            }
        }

        Some(report)
    }
}

/// fetch -> diff -> classify -> persist -> alert for one target.
///
/// Returns the result with its log sequence number, or `None` for the
/// sequence when the append failed.
async fn check_target(
    executor: &MonitoringExecutor,
    store: &SnapshotStore,
    dispatcher: &AlertDispatcher,
    target: String,
    baseline: Option<MonitoringResult>,
) -> (Option<u64>, MonitoringResult) {
    let result = executor.execute_check(&target, baseline.as_ref()).await;

    let seq = match store.append(&result).await {
        Ok(seq) => Some(seq),
        Err(e) => {
            error!(target_id = %target, "Failed to persist monitoring result: {}", e);
            None
        }
    };

    if result.status == ResultStatus::Changed {
        if let Some(snapshot) = &result.snapshot {
            if let Err(e) = dispatcher.dispatch(result.change_list(), snapshot, &target).await {
                warn!(target_id = %target, "Alert delivery failed: {}", e);
            }
        }
    }

    (seq, result)
}
