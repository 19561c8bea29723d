//! Tripwire one-shot monitor
//!
//! Runs a single pass over the configured subjects and exits. The exit code
//! is non-zero when any subject could not be fetched, which lets cron or CI
//! flag the run.

use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info};
use tripwire::config::{MonitorConfig, Settings};
use tripwire::core::runtime::MonitorRuntime;
use tripwire::logging;
use tripwire::metrics::Metrics;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    logging::init_logging();

    let settings = Settings::from_env()?;
    info!(environment = %settings.environment, config = %settings.config_path, "Starting Tripwire monitor");

    let config = MonitorConfig::load(&settings.config_path)?;
    let metrics = Arc::new(Metrics::new()?);
    let runtime = MonitorRuntime::build(&config, &settings, Some(metrics))?;

    let summary = runtime.run_once().await;
    runtime.shutdown().await;
    let summary = match summary {
        Some(summary) => summary,
        None => {
            error!("Pass did not run");
            std::process::exit(1);
        }
    };

    if let Some(ref reason) = summary.skipped {
        info!(reason = %reason, "Market closed: {}", reason);
    }
    info!(
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        alerted = summary.alerted,
        "Done"
    );

    std::process::exit(summary.exit_code());
}
