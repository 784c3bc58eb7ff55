use std::env::var;

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing for a long running service.
///
/// `RUST_LOG` overrides `default_level`; `RUST_LOG_FORMAT=json` switches to
/// JSON lines. Everything goes to stderr so stdout stays free for reports.
pub fn init_tracing(default_level: LevelFilter) {
    let env_filter =
        EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy();

    let log_format = var("RUST_LOG_FORMAT").ok().unwrap_or_default();

    let log_layer = match log_format.as_str() {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
    };

    if let Err(error) = tracing_subscriber::registry().with(log_layer).try_init() {
        warn!("Tracing was already initialised: {error}");
    }
}

/// Default level from a verbosity count: 0 = info, 1 = debug, 2+ = trace
pub fn level_for_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}
