//! Integration tests for Shelfwatch
//!
//! These tests drive the scheduler end to end against scripted sources and a
//! real log file.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FailingSink, InFlightSource, RecordingSink, ScriptedSource, product};
use shelfwatch::{
    AlertDispatcher, FetchError, MonitoringScheduler, ReportGenerator, ResultStatus,
    SchedulerConfig, SchedulerState, SnapshotStore,
};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_two_target_scenario() {
    let _ = tracing_subscriber::fmt::try_init();

    let dir = tempdir().unwrap();
    let store = Arc::new(SnapshotStore::new(dir.path().join("monitoring_results.jsonl")));

    // Tick 1: A observed, B fails
    let source = ScriptedSource::new()
        .then("A", Ok(product(10.0, true, "X")))
        .then("B", Err(FetchError::Timeout(Duration::from_secs(30))));
    let sink = Arc::new(RecordingSink::default());
    let mut scheduler = MonitoringScheduler::new(
        SchedulerConfig::builder().targets(["A", "B"]).build(),
        Arc::new(source),
        Arc::clone(&store),
        AlertDispatcher::new().with_sink(sink.clone()),
    );
    scheduler.run(CancellationToken::new()).await;

    let log: Vec<_> = store.load_all().unwrap().collect();
    assert_eq!(log.len(), 2);
    let a = log.iter().find(|r| r.target_id == "A").unwrap();
    let b = log.iter().find(|r| r.target_id == "B").unwrap();
    assert_eq!(a.status, ResultStatus::Success);
    assert_eq!(a.change_list().len(), 1);
    assert!(a.change_list()[0].is_sentinel());
    assert_eq!(b.status, ResultStatus::Error);
    assert!(b.snapshot.is_none());
    assert!(b.error_message.as_deref().unwrap().contains("Timed out"));
    assert!(sink.alerts.lock().unwrap().is_empty());

    // Tick 2: a fresh scheduler rebuilds its baseline from the log
    let source = ScriptedSource::new().then("A", Ok(product(8.0, true, "X")));
    let mut scheduler = MonitoringScheduler::new(
        SchedulerConfig::builder().target("A").build(),
        Arc::new(source),
        Arc::clone(&store),
        AlertDispatcher::new().with_sink(sink.clone()),
    );
    let summary = scheduler.run(CancellationToken::new()).await;

    let log: Vec<_> = store.load_all().unwrap().collect();
    assert_eq!(log.len(), 3);
    let latest = &log[2];
    assert_eq!(latest.target_id, "A");
    assert_eq!(latest.status, ResultStatus::Changed);
    assert_eq!(latest.change_list().len(), 1);
    assert_eq!(latest.change_list()[0].field(), "price");
    assert_eq!(
        latest.change_list()[0].description(),
        "Price decreased from $10.00 to $8.00 ($2.00)"
    );

    let alerts = sink.alerts.lock().unwrap().clone();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].0, "A");

    let report = summary.reports.last().unwrap();
    assert_eq!(report.total_checks, 3);
    assert_eq!(report.distinct_targets, 2);
    assert_eq!(report.successes, 1);
    assert_eq!(report.changed, 1);
    assert_eq!(report.errors, 1);
}

#[tokio::test]
async fn test_window_advances_between_ticks() {
    let dir = tempdir().unwrap();
    let store = Arc::new(SnapshotStore::new(dir.path().join("results.jsonl")));
    let source = ScriptedSource::new()
        .then("A", Ok(product(10.0, true, "X")))
        .then("A", Ok(product(10.0, true, "X")))
        .then("A", Ok(product(10.0, false, "X")));

    let config = SchedulerConfig::builder()
        .target("A")
        .max_ticks(3)
        .interval(Duration::from_millis(5))
        .build();
    let mut scheduler = MonitoringScheduler::new(
        config,
        Arc::new(source),
        Arc::clone(&store),
        AlertDispatcher::new(),
    );
    let summary = scheduler.run(CancellationToken::new()).await;

    assert_eq!(summary.state, SchedulerState::Completed);
    let statuses: Vec<ResultStatus> = store.load_all().unwrap().map(|r| r.status).collect();
    assert_eq!(statuses, vec![ResultStatus::Success, ResultStatus::Success, ResultStatus::Changed]);

    let last = store.load_all().unwrap().last().unwrap();
    assert_eq!(last.change_list()[0].description(), "Stock status changed to: OUT OF STOCK");
}

#[tokio::test]
async fn test_alert_failure_keeps_result() {
    let dir = tempdir().unwrap();
    let store = Arc::new(SnapshotStore::new(dir.path().join("results.jsonl")));
    let source = ScriptedSource::new()
        .then("A", Ok(product(10.0, true, "X")))
        .then("A", Ok(product(12.0, true, "Y")));

    let config = SchedulerConfig::builder()
        .target("A")
        .max_ticks(2)
        .interval(Duration::from_millis(5))
        .build();
    let mut scheduler = MonitoringScheduler::new(
        config,
        Arc::new(source),
        Arc::clone(&store),
        AlertDispatcher::new().with_sink(Arc::new(FailingSink)),
    );
    let summary = scheduler.run(CancellationToken::new()).await;

    assert_eq!(summary.state, SchedulerState::Completed);
    let last = store.load_all().unwrap().last().unwrap();
    assert_eq!(last.status, ResultStatus::Changed);
    assert_eq!(last.change_list().len(), 2);
}

#[tokio::test]
async fn test_persistence_failure_does_not_stop_loop() {
    let dir = tempdir().unwrap();
    // A directory where the log file should be makes every append fail
    let log_path = dir.path().join("results.jsonl");
    std::fs::create_dir(&log_path).unwrap();

    let source = Arc::new(
        ScriptedSource::new()
            .then("A", Ok(product(1.0, true, "X")))
            .then("A", Ok(product(2.0, true, "X"))),
    );
    let config = SchedulerConfig::builder()
        .target("A")
        .max_ticks(2)
        .interval(Duration::from_millis(5))
        .build();
    let mut scheduler = MonitoringScheduler::new(
        config,
        source.clone(),
        Arc::new(SnapshotStore::new(&log_path)),
        AlertDispatcher::new(),
    );
    let summary = scheduler.run(CancellationToken::new()).await;

    assert_eq!(summary.state, SchedulerState::Completed);
    assert_eq!(summary.ticks, 2);
    assert_eq!(source.fetches(), 2);
    assert!(scheduler.window().is_empty());
}

#[tokio::test]
async fn test_cancel_preempts_sleep() {
    let dir = tempdir().unwrap();
    let store = Arc::new(SnapshotStore::new(dir.path().join("results.jsonl")));
    let source = ScriptedSource::new().then("A", Ok(product(1.0, true, "X")));

    let config = SchedulerConfig::builder()
        .target("A")
        .max_ticks(24)
        .interval(Duration::from_secs(3600))
        .build();
    let mut scheduler = MonitoringScheduler::new(
        config,
        Arc::new(source),
        Arc::clone(&store),
        AlertDispatcher::new(),
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let summary = tokio::time::timeout(Duration::from_secs(10), scheduler.run(cancel))
        .await
        .expect("scheduler did not observe cancellation");

    assert_eq!(summary.state, SchedulerState::Stopped);
    assert_eq!(summary.ticks, 1);
    assert_eq!(summary.reports.last().unwrap().total_checks, 1);
}

#[tokio::test]
async fn test_report_is_idempotent_and_read_only() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("results.jsonl");
    let store = Arc::new(SnapshotStore::new(&path));
    let source = ScriptedSource::new()
        .then("A", Ok(product(10.0, true, "X")))
        .then("B", Ok(product(3.0, false, "Y")));

    let mut scheduler = MonitoringScheduler::new(
        SchedulerConfig::builder().targets(["A", "B"]).build(),
        Arc::new(source),
        Arc::clone(&store),
        AlertDispatcher::new(),
    );
    scheduler.run(CancellationToken::new()).await;

    let before = std::fs::read(&path).unwrap();
    let generator = ReportGenerator::new(Arc::clone(&store));
    let first = generator.generate().unwrap();
    let second = generator.generate().unwrap();

    assert_eq!(first, second);
    assert_eq!(first.successes, 2);
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[tokio::test]
async fn test_concurrency_bounded_pool_checks_every_target() {
    let dir = tempdir().unwrap();
    let store = Arc::new(SnapshotStore::new(dir.path().join("results.jsonl")));
    let targets: Vec<String> = (0..12).map(|i| format!("T{i}")).collect();
    let source = targets.iter().fold(ScriptedSource::new(), |source, target| {
        source.then(target, Ok(product(1.0, true, target)))
    });

    let mut scheduler = MonitoringScheduler::new(
        SchedulerConfig::builder().targets(targets.clone()).concurrency(3).build(),
        Arc::new(source),
        Arc::clone(&store),
        AlertDispatcher::new(),
    );
    let summary = scheduler.run(CancellationToken::new()).await;

    let report = summary.reports.last().unwrap();
    assert_eq!(report.total_checks, 12);
    assert_eq!(report.distinct_targets, 12);
    assert_eq!(scheduler.window().len(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tick_never_exceeds_configured_concurrency() {
    let dir = tempdir().unwrap();
    let store = Arc::new(SnapshotStore::new(dir.path().join("results.jsonl")));
    let source = Arc::new(InFlightSource::new(Duration::from_millis(30)));
    let targets: Vec<String> = (0..12).map(|i| format!("T{i}")).collect();

    let mut scheduler = MonitoringScheduler::new(
        SchedulerConfig::builder().targets(targets).concurrency(3).build(),
        source.clone(),
        Arc::clone(&store),
        AlertDispatcher::new(),
    );
    let summary = scheduler.run(CancellationToken::new()).await;

    assert_eq!(summary.reports.last().unwrap().total_checks, 12);
    assert_eq!(source.fetches(), 12);
    assert!(source.peak() <= 3, "peak in flight was {}", source.peak());
    assert!(source.peak() > 1, "fetches never overlapped");
}
