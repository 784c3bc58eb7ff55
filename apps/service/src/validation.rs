use anyhow::{Result, anyhow};
use url::Url;

use crate::config::Config;

const MAX_WINDOW_SIZE: usize = 10_000;
const MAX_REPORT_EVERY: u32 = 10_000;

/// Validation results with specific error messages
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { is_valid: true, error: None }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self { is_valid: false, error: Some(msg.into()) }
    }

    pub fn to_result(&self) -> Result<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(anyhow!(self.error.clone().unwrap_or_else(|| "Validation failed".to_string())))
        }
    }
}

/// Validate HTTP/HTTPS URL endpoint
pub fn validate_http_endpoint(target: &str) -> ValidationResult {
    if target.trim().is_empty() {
        return ValidationResult::err("Target cannot be empty");
    }

    match Url::parse(target) {
        Ok(url) => {
            let scheme = url.scheme();
            if scheme != "http" && scheme != "https" {
                return ValidationResult::err(format!(
                    "Invalid scheme '{scheme}'. Must be http or https"
                ));
            }

            if url.host_str().is_none() {
                return ValidationResult::err("URL must have a valid host");
            }

            ValidationResult::ok()
        }
        Err(e) => {
            if !target.contains("://") {
                ValidationResult::err("URL must include scheme (http:// or https://)")
            } else {
                ValidationResult::err(format!("Invalid URL: {e}"))
            }
        }
    }
}

/// Validate the pause between monitoring runs
pub fn validate_interval(interval: u64) -> ValidationResult {
    if interval == 0 {
        return ValidationResult::err("Interval must be at least 1 second");
    }

    if interval > 7 * 86400 {
        return ValidationResult::err("Interval too long (max 7 days)");
    }

    ValidationResult::ok()
}

/// Validate the per-fetch timeout
pub fn validate_timeout(timeout: u64, interval: u64) -> ValidationResult {
    if timeout == 0 {
        return ValidationResult::err("Timeout must be at least 1 second");
    }

    if timeout >= interval {
        return ValidationResult::err("Timeout must be less than interval");
    }

    ValidationResult::ok()
}

/// Validate the number of recent results kept as diff baselines
pub fn validate_window_size(window_size: usize) -> ValidationResult {
    if window_size == 0 {
        return ValidationResult::err("Window size must be at least 1");
    }

    if window_size > MAX_WINDOW_SIZE {
        return ValidationResult::err(format!("Window size too large (max {MAX_WINDOW_SIZE})"));
    }

    ValidationResult::ok()
}

/// Validate the number of targets checked at once
pub fn validate_concurrency(concurrency: usize) -> ValidationResult {
    if concurrency == 0 || concurrency > shelfwatch::MAX_CONCURRENCY {
        return ValidationResult::err(format!(
            "Concurrency must be between 1 and {}",
            shelfwatch::MAX_CONCURRENCY
        ));
    }

    ValidationResult::ok()
}

/// Validate the report cadence; 0 turns periodic reports off
pub fn validate_report_every(report_every: u32) -> ValidationResult {
    if report_every > MAX_REPORT_EVERY {
        return ValidationResult::err(format!(
            "Report interval too large (max {MAX_REPORT_EVERY} runs)"
        ));
    }

    ValidationResult::ok()
}

/// Check a loaded configuration before any monitoring starts
pub fn validate_config(config: &Config) -> Result<()> {
    if config.monitor.targets.is_empty() {
        return Err(anyhow!("No targets configured, add some under [monitor] targets"));
    }

    for target in &config.monitor.targets {
        validate_http_endpoint(target)
            .to_result()
            .map_err(|e| anyhow!("Invalid target '{target}': {e}"))?;
    }

    validate_interval(config.monitor.interval_seconds).to_result()?;
    validate_window_size(config.monitor.window_size).to_result()?;
    validate_concurrency(config.monitor.concurrency).to_result()?;
    validate_report_every(config.monitor.report_every).to_result()?;
    validate_timeout(config.monitor.fetch_timeout_seconds, config.monitor.interval_seconds)
        .to_result()?;

    if let Some(webhook) = &config.alerts.webhook_url {
        validate_http_endpoint(webhook)
            .to_result()
            .map_err(|e| anyhow!("Invalid webhook URL: {e}"))?;
    }

    Ok(())
}
