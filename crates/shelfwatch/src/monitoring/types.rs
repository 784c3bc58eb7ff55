use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::{FieldValue, Snapshot};

use super::classify::classify;

/// Field name carried by the first-observation sentinel
pub const SENTINEL_FIELD: &str = "_meta";

/// Description carried by the first-observation sentinel
pub const SENTINEL_DESCRIPTION: &str = "First time monitoring this product";

/// Outcome of checking one target on one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Changed,
    Error,
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultStatus::Success => write!(f, "success"),
            ResultStatus::Changed => write!(f, "changed"),
            ResultStatus::Error => write!(f, "error"),
        }
    }
}

/// One detected difference between two snapshots
///
/// Only the diff engine builds these; everything else reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeDescriptor {
    field: String,
    previous_value: Option<FieldValue>,
    new_value: FieldValue,
    description: String,
}

impl ChangeDescriptor {
    pub(crate) fn new(
        field: &str,
        previous_value: Option<FieldValue>,
        new_value: FieldValue,
        description: String,
    ) -> Self {
        Self { field: field.to_string(), previous_value, new_value, description }
    }

    pub(crate) fn first_observation() -> Self {
        Self {
            field: SENTINEL_FIELD.to_string(),
            previous_value: None,
            new_value: FieldValue::Text("first_observation".to_string()),
            description: SENTINEL_DESCRIPTION.to_string(),
        }
    }

    /// Whether this is the synthetic first-observation entry rather than a
    /// real field change
    pub fn is_sentinel(&self) -> bool {
        self.field == SENTINEL_FIELD
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn previous_value(&self) -> Option<&FieldValue> {
        self.previous_value.as_ref()
    }

    pub fn new_value(&self) -> &FieldValue {
        &self.new_value
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Persisted record of one check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringResult {
    /// When the check was performed
    pub timestamp: DateTime<Utc>,

    /// Target that was checked
    #[serde(alias = "url")]
    pub target_id: String,

    /// success / changed / error
    pub status: ResultStatus,

    /// Observed state, absent on error
    #[serde(default)]
    pub snapshot: Option<Snapshot>,

    /// Detected changes, absent when there were none
    #[serde(default)]
    pub changes: Option<Vec<ChangeDescriptor>>,

    /// Error message (if the check failed)
    #[serde(default)]
    pub error_message: Option<String>,
}

impl MonitoringResult {
    /// Result for a successful observation; status is classified from the
    /// change list
    pub fn observed(snapshot: Snapshot, changes: Vec<ChangeDescriptor>) -> Self {
        let status = classify(&changes);

        Self {
            timestamp: snapshot.timestamp(),
            target_id: snapshot.target_id().to_string(),
            status,
            snapshot: Some(snapshot),
            changes: (!changes.is_empty()).then_some(changes),
            error_message: None,
        }
    }

    /// Result for a failed observation
    pub fn failed(target_id: impl Into<String>, error: impl ToString) -> Self {
        Self {
            timestamp: Utc::now(),
            target_id: target_id.into(),
            status: ResultStatus::Error,
            snapshot: None,
            changes: None,
            error_message: Some(error.to_string()),
        }
    }

    /// Changes as a slice, empty when none were recorded
    pub fn change_list(&self) -> &[ChangeDescriptor] {
        self.changes.as_deref().unwrap_or_default()
    }

    /// True when at least one recorded change is a real field change
    pub fn has_field_changes(&self) -> bool {
        self.change_list().iter().any(|c| !c.is_sentinel())
    }
}
