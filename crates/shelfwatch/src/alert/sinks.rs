use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::AlertSink;
use crate::error::AlertError;
use crate::monitoring::ChangeDescriptor;
use crate::monitoring::source::target_label;
use crate::snapshot::Snapshot;

const RULE: &str = "============================================================";

/// Render an alert as a plain text block
pub fn render_alert(target_id: &str, changes: &[ChangeDescriptor], snapshot: &Snapshot) -> String {
    let product = snapshot.name().map(str::to_string).unwrap_or_else(|| target_label(target_id));

    let mut lines = vec![
        RULE.to_string(),
        "ALERT: Changes Detected!".to_string(),
        RULE.to_string(),
        format!("Product: {product}"),
        format!("URL: {target_id}"),
        format!("Time: {}", snapshot.timestamp().to_rfc3339()),
        String::new(),
        "Changes:".to_string(),
    ];
    lines.extend(changes.iter().map(|c| format!("  • {}", c.description())));
    lines.push(RULE.to_string());

    lines.join("\n")
}

/// Writes alerts to the log
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    async fn notify(
        &self,
        target_id: &str,
        changes: &[ChangeDescriptor],
        snapshot: &Snapshot,
    ) -> Result<(), AlertError> {
        warn!(target_id = %target_id, "\n{}", render_alert(target_id, changes, snapshot));
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Posts alerts to a chat webhook as `{"text": ...}`
pub struct WebhookSink {
    url: String,
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, timeout_seconds: u64) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self { url: url.into(), client })
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    async fn notify(
        &self,
        target_id: &str,
        changes: &[ChangeDescriptor],
        snapshot: &Snapshot,
    ) -> Result<(), AlertError> {
        let body = serde_json::json!({
            "text": render_alert(target_id, changes, snapshot),
            "target": target_id,
            "changes": changes.iter().map(ChangeDescriptor::description).collect::<Vec<_>>(),
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AlertError::Delivery {
                sink: self.name().to_string(),
                message: e.to_string(),
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AlertError::Rejected {
                sink: self.name().to_string(),
                status: response.status().as_u16(),
            })
        }
    }

    fn name(&self) -> &str {
        "webhook"
    }
}
