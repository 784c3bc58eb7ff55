//! Shared fakes for integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use shelfwatch::monitoring::ChangeDescriptor;
use shelfwatch::{
    AlertError, AlertSink, FetchError, FieldMap, FieldValue, ObservationSource, Snapshot,
};

pub fn product(price: f64, in_stock: bool, name: &str) -> FieldMap {
    FieldMap::from([
        ("price".to_string(), FieldValue::Number(price)),
        ("in_stock".to_string(), FieldValue::Bool(in_stock)),
        ("name".to_string(), FieldValue::Text(name.to_string())),
    ])
}

/// Replays queued observations per target, one per fetch
#[derive(Default)]
pub struct ScriptedSource {
    script: Mutex<HashMap<String, VecDeque<Result<FieldMap, FetchError>>>>,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, target: &str, observation: Result<FieldMap, FetchError>) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry(target.to_string())
            .or_default()
            .push_back(observation);
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObservationSource for ScriptedSource {
    async fn fetch(&self, target_id: &str) -> Result<FieldMap, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .get_mut(target_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(FetchError::Navigation(format!("no scripted page for {target_id}")))
            })
    }
}

/// Serves the same product for every target after a delay, tracking how many
/// fetches overlap
pub struct InFlightSource {
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    fetches: AtomicUsize,
}

impl InFlightSource {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObservationSource for InFlightSource {
    async fn fetch(&self, _target_id: &str) -> Result<FieldMap, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(product(1.0, true, "Widget"))
    }
}

/// Records every alert it receives
#[derive(Default)]
pub struct RecordingSink {
    pub alerts: Mutex<Vec<(String, Vec<String>)>>,
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn notify(
        &self,
        target_id: &str,
        changes: &[ChangeDescriptor],
        _snapshot: &Snapshot,
    ) -> Result<(), AlertError> {
        let descriptions = changes.iter().map(|c| c.description().to_string()).collect();
        self.alerts.lock().unwrap().push((target_id.to_string(), descriptions));
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Always fails delivery
pub struct FailingSink;

#[async_trait]
impl AlertSink for FailingSink {
    async fn notify(
        &self,
        _target_id: &str,
        _changes: &[ChangeDescriptor],
        _snapshot: &Snapshot,
    ) -> Result<(), AlertError> {
        Err(AlertError::Delivery {
            sink: "failing".to_string(),
            message: "webhook offline".to_string(),
        })
    }

    fn name(&self) -> &str {
        "failing"
    }
}
