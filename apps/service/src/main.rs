mod config;
mod validation;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shelfwatch::alert::{LogSink, WebhookSink};
use shelfwatch::monitoring::{GatedSource, JsonEndpointSource, StdinGate};
use shelfwatch::{
    AlertDispatcher, MonitoringScheduler, ObservationSource, Report, ReportGenerator,
    SnapshotStore,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;

const CONFIRM_PROMPT: &str = "Finish any login or captcha for this page, then confirm";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Watch product pages for price, stock and name changes",
    long_about = None
)]
struct Args {
    /// Config file path (defaults to $XDG_CONFIG_HOME/shelfwatch/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Ask for confirmation on stdin before the first fetch of each target
    #[arg(long, global = true)]
    confirm: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    show_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check every target once and print a report
    Check,
    /// Check targets on a fixed interval
    Watch {
        /// Seconds between runs, overrides the config file
        #[arg(long)]
        interval: Option<u64>,
        /// Number of runs, overrides the config file
        #[arg(long)]
        max_runs: Option<u32>,
    },
    /// Print a report from the result log without fetching
    Report {
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_tracing(logger::level_for_verbosity(args.verbose));

    let mut config =
        Config::from_config(args.config.as_ref()).context("Failed to load configuration")?;

    if let Some(Command::Watch { interval, max_runs }) = &args.command {
        if let Some(interval) = interval {
            config.monitor.interval_seconds = *interval;
        }
        if let Some(max_runs) = max_runs {
            config.monitor.max_runs = *max_runs;
        }
    }

    if args.show_config {
        print!("{config}");
        return Ok(());
    }

    let store = Arc::new(SnapshotStore::new(&config.monitor.results_file));

    match args.command.unwrap_or(Command::Check) {
        Command::Report { json } => {
            let generator = ReportGenerator::new(store);
            let report = tokio::task::spawn_blocking(move || generator.generate()).await??;
            print_report(&report, json)?;
        }
        Command::Check => run_monitoring(&config, store, 0, args.confirm).await?,
        Command::Watch { .. } => {
            let max_runs = config.monitor.max_runs.max(1);
            run_monitoring(&config, store, max_runs, args.confirm).await?;
        }
    }

    Ok(())
}

async fn run_monitoring(
    config: &Config,
    store: Arc<SnapshotStore>,
    max_ticks: u32,
    confirm: bool,
) -> Result<()> {
    validation::validate_config(config)?;

    let source = build_source(config, confirm)?;
    let dispatcher = build_dispatcher(config)?;
    if dispatcher.is_empty() {
        warn!("No alert sinks configured, changes will only be recorded");
    }

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let scheduler_config = config.scheduler_config(max_ticks);
    let mut scheduler = MonitoringScheduler::new(scheduler_config, source, store, dispatcher);
    let summary = scheduler.run(shutdown).await;

    info!("Monitoring finished after {} run(s) ({:?})", summary.ticks, summary.state);
    if let Some(report) = summary.reports.last() {
        print_report(report, false)?;
    }

    Ok(())
}

fn build_source(config: &Config, confirm: bool) -> Result<Arc<dyn ObservationSource>> {
    let source = JsonEndpointSource::new(config.monitor.fetch_timeout_seconds)
        .context("Failed to build HTTP client")?;

    if confirm {
        Ok(Arc::new(GatedSource::new(source, Arc::new(StdinGate), CONFIRM_PROMPT)))
    } else {
        Ok(Arc::new(source))
    }
}

fn build_dispatcher(config: &Config) -> Result<AlertDispatcher> {
    let mut dispatcher = AlertDispatcher::new();

    if config.alerts.log_alerts {
        dispatcher = dispatcher.with_sink(Arc::new(LogSink));
    }

    if let Some(url) = &config.alerts.webhook_url {
        let webhook = WebhookSink::new(url.clone(), config.alerts.webhook_timeout_seconds)
            .context("Failed to build webhook client")?;
        dispatcher = dispatcher.with_sink(Arc::new(webhook));
    }

    Ok(dispatcher)
}

fn print_report(report: &Report, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

/// Cancel `shutdown` on SIGINT or SIGTERM
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = sigterm.recv() => info!("Received SIGTERM"),
                        _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
                    }
                }
                Err(e) => {
                    warn!("SIGTERM handler unavailable: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                    info!("Received SIGINT");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received interrupt signal");
        }

        info!("Shutting down after in-flight checks finish");
        shutdown.cancel();
    });
}
