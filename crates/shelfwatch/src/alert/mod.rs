//! Alerting on significant changes.
//!
//! Delivery is best effort: failures are logged and never retried, and they
//! never touch the result that was already persisted.

mod sinks;

pub use sinks::{LogSink, WebhookSink, render_alert};

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::error::AlertError;
use crate::monitoring::ChangeDescriptor;
use crate::snapshot::Snapshot;

/// Notification channel for detected changes
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver one alert
    async fn notify(
        &self,
        target_id: &str,
        changes: &[ChangeDescriptor],
        snapshot: &Snapshot,
    ) -> Result<(), AlertError>;

    /// Sink name used in logs
    fn name(&self) -> &str;
}

/// Forwards changed results to every registered sink
#[derive(Default)]
pub struct AlertDispatcher {
    sinks: Vec<Arc<dyn AlertSink>>,
}

impl AlertDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink
    pub fn with_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        info!("Registered alert sink: {}", sink.name());
        self.sinks.push(sink);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Send an alert to all sinks.
    ///
    /// Every sink is tried even if an earlier one fails; the first failure is
    /// returned after all attempts.
    pub async fn dispatch(
        &self,
        changes: &[ChangeDescriptor],
        snapshot: &Snapshot,
        target_id: &str,
    ) -> Result<(), AlertError> {
        let mut first_error = None;

        for sink in &self.sinks {
            match sink.notify(target_id, changes, snapshot).await {
                Ok(()) => info!(target_id = %target_id, "Alert sent via {}", sink.name()),
                Err(e) => {
                    error!(target_id = %target_id, "Alert error via {}: {}", sink.name(), e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
