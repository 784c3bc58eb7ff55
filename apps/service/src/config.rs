use std::{env, fmt, fs, path, time::Duration};

use serde::{Deserialize, Serialize};
use shelfwatch::SchedulerConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read config {path}: {source}")]
    ReadFailed {
        path: path::PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write config {path}: {source}")]
    WriteFailed {
        path: path::PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("No config directory available (set XDG_CONFIG_HOME or HOME)")]
    ConfigPathUnavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub monitor: Monitor,
    #[serde(default)]
    pub alerts: Alerts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Monitor {
    pub targets: Vec<String>,
    pub interval_seconds: u64,
    pub max_runs: u32,
    pub report_every: u32,
    pub concurrency: usize,
    pub window_size: usize,
    pub results_file: path::PathBuf,
    pub fetch_timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Alerts {
    pub log_alerts: bool,
    pub webhook_url: Option<String>,
    pub webhook_timeout_seconds: u64,
}

impl Default for Monitor {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            interval_seconds: 60 * 60,
            max_runs: 24,
            report_every: shelfwatch::DEFAULT_REPORT_EVERY,
            concurrency: shelfwatch::DEFAULT_CONCURRENCY,
            window_size: shelfwatch::DEFAULT_WINDOW_SIZE,
            results_file: "monitoring_results.jsonl".into(),
            fetch_timeout_seconds: 30,
        }
    }
}

impl Default for Alerts {
    fn default() -> Self {
        Self { log_alerts: true, webhook_url: None, webhook_timeout_seconds: 10 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { monitor: Monitor::default(), alerts: Alerts::default() }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/shelfwatch/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("shelfwatch/config.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);
        let write_2 = write_indented(2);

        writeln!(f, "Current Monitoring Configuration:")?;
        write_title_1(f, "Monitor")?;
        write_1(f, "Targets", &self.monitor.targets.len())?;
        for target in &self.monitor.targets {
            write_2(f, "-", target)?;
        }
        write_1(f, "Interval (s)", &self.monitor.interval_seconds)?;
        write_1(f, "Max runs", &self.monitor.max_runs)?;
        write_1(f, "Report every", &self.monitor.report_every)?;
        write_1(f, "Concurrency", &self.monitor.concurrency)?;
        write_1(f, "Window size", &self.monitor.window_size)?;
        write_1(f, "Results file", &self.monitor.results_file.display())?;
        write_1(f, "Fetch timeout (s)", &self.monitor.fetch_timeout_seconds)?;
        write_title_1(f, "Alerts")?;
        write_1(f, "Log alerts", &self.alerts.log_alerts)?;
        write_1(f, "Webhook", &self.alerts.webhook_url.as_deref().unwrap_or("(none)"))?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/shelfwatch/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| Error::ReadFailed { path: config_path.clone(), source })?;
            Ok(toml::from_str(raw_string.as_str())?)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| Error::WriteFailed { path: parent.to_path_buf(), source })?;
        }

        fs::write(path, config_str)
            .map_err(|source| Error::WriteFailed { path: path.to_path_buf(), source })
    }

    /// Scheduler settings for a run of `max_ticks` ticks
    pub fn scheduler_config(&self, max_ticks: u32) -> SchedulerConfig {
        SchedulerConfig::builder()
            .targets(self.monitor.targets.iter().cloned())
            .interval(Duration::from_secs(self.monitor.interval_seconds))
            .max_ticks(max_ticks)
            .report_every(self.monitor.report_every)
            .concurrency(self.monitor.concurrency)
            .window_size(self.monitor.window_size)
            .build()
    }
}
