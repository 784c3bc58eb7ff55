use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::FetchError;
use crate::snapshot::{FieldMap, FieldValue};

/// Source of structured field values for a target
///
/// Implementations extract raw fields; contract validation happens when the
/// fields are turned into a [`crate::Snapshot`].
#[async_trait]
pub trait ObservationSource: Send + Sync {
    /// Fetch the current field values of a target
    async fn fetch(&self, target_id: &str) -> Result<FieldMap, FetchError>;
}

/// Reads product fields from a JSON document served at the target URL
pub struct JsonEndpointSource {
    client: reqwest::Client,
    timeout: Duration,
}

impl JsonEndpointSource {
    pub fn new(timeout_seconds: u64) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(timeout_seconds);
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { client, timeout })
    }

    fn map_error(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if error.is_decode() {
            FetchError::Schema(error.to_string())
        } else {
            FetchError::Navigation(error.to_string())
        }
    }
}

#[async_trait]
impl ObservationSource for JsonEndpointSource {
    async fn fetch(&self, target_id: &str) -> Result<FieldMap, FetchError> {
        let response = self
            .client
            .get(target_id)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Navigation(format!("page returned status {status}")));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| self.map_error(e))?;
        fields_from_json(body)
    }
}

/// Flatten a JSON object into scalar product fields.
///
/// Nested values and nulls carry nothing the diff engine can use and are
/// dropped.
pub fn fields_from_json(body: serde_json::Value) -> Result<FieldMap, FetchError> {
    let serde_json::Value::Object(object) = body else {
        return Err(FetchError::Schema("expected a JSON object".to_string()));
    };

    let fields = object
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                serde_json::Value::Bool(b) => FieldValue::Bool(b),
                serde_json::Value::Number(n) => FieldValue::Number(n.as_f64()?),
                serde_json::Value::String(s) => FieldValue::Text(s),
                _ => return None,
            };
            Some((key, value))
        })
        .collect();

    Ok(fields)
}

/// Blocking human-in-the-loop step such as a manual login or captcha
pub trait HumanGate: Send + Sync {
    /// Ask the operator to confirm; `false` declines
    fn confirm(&self, target_id: &str, prompt: &str) -> bool;
}

/// Prompts on stdout and waits for a line on stdin
pub struct StdinGate;

impl HumanGate for StdinGate {
    fn confirm(&self, target_id: &str, prompt: &str) -> bool {
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "{prompt} [{target_id}] (y/N): ");
        let _ = stdout.flush();

        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }

        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

/// Asks a [`HumanGate`] once per target before its first fetch
pub struct GatedSource<S> {
    inner: S,
    gate: Arc<dyn HumanGate>,
    prompt: String,
    confirmed: Mutex<HashSet<String>>,
}

impl<S: ObservationSource> GatedSource<S> {
    pub fn new(inner: S, gate: Arc<dyn HumanGate>, prompt: impl Into<String>) -> Self {
        Self { inner, gate, prompt: prompt.into(), confirmed: Mutex::new(HashSet::new()) }
    }
}

#[async_trait]
impl<S: ObservationSource> ObservationSource for GatedSource<S> {
    async fn fetch(&self, target_id: &str) -> Result<FieldMap, FetchError> {
        // Held across the prompt so concurrent targets don't interleave on the terminal
        let mut confirmed = self.confirmed.lock().await;

        if !confirmed.contains(target_id) {
            let gate = Arc::clone(&self.gate);
            let target = target_id.to_string();
            let prompt = self.prompt.clone();

            let accepted = tokio::task::spawn_blocking(move || gate.confirm(&target, &prompt))
                .await
                .unwrap_or(false);

            if !accepted {
                info!(target_id = %target_id, "Operator declined confirmation");
                return Err(FetchError::Declined(target_id.to_string()));
            }

            debug!(target_id = %target_id, "Operator confirmed target");
            confirmed.insert(target_id.to_string());
        }
        drop(confirmed);

        self.inner.fetch(target_id).await
    }
}

/// Human readable label for a target URL: the last path segment with dashes
/// turned into spaces and each word capitalised
pub fn target_label(target_id: &str) -> String {
    let segment = url::Url::parse(target_id)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(str::to_string))
        })
        .unwrap_or_else(|| {
            target_id.rsplit('/').find(|s| !s.is_empty()).unwrap_or(target_id).to_string()
        });

    segment
        .split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
