use std::sync::Arc;

use tracing::{info, warn};

use super::diff::compare;
use super::source::{ObservationSource, target_label};
use super::types::{MonitoringResult, ResultStatus};
use crate::snapshot::Snapshot;

/// Monitoring executor - checks a single target against its baseline
pub struct MonitoringExecutor {
    source: Arc<dyn ObservationSource>,
}

impl MonitoringExecutor {
    /// Create a new monitoring executor
    pub fn new(source: Arc<dyn ObservationSource>) -> Self {
        Self { source }
    }

    /// Fetch, validate and diff one target.
    ///
    /// Never fails: fetch and contract errors come back as `status=error`
    /// results.
    pub async fn execute_check(
        &self,
        target_id: &str,
        previous: Option<&MonitoringResult>,
    ) -> MonitoringResult {
        let observed = self
            .source
            .fetch(target_id)
            .await
            .and_then(|fields| Snapshot::from_fields(target_id, fields));

        let snapshot = match observed {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(target_id = %target_id, "Error checking product: {}", e);
                return MonitoringResult::failed(target_id, e);
            }
        };

        let changes = compare(&snapshot, previous);
        let result = MonitoringResult::observed(snapshot, changes);

        if result.status == ResultStatus::Success {
            info!(target_id = %target_id, "No changes detected");
        }
        if let Some(snapshot) = &result.snapshot {
            let product =
                snapshot.name().map(str::to_string).unwrap_or_else(|| target_label(target_id));
            info!(
                target_id = %target_id,
                product = %product,
                price = ?snapshot.price(),
                in_stock = ?snapshot.in_stock(),
                status = %result.status,
                "Checked product"
            );
        }

        result
    }
}
