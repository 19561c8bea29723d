//! Tripwire Worker
//!
//! Runs monitoring passes on a cron schedule and serves `/health`,
//! `/metrics` and `/status` over HTTP.

use dotenvy::dotenv;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tripwire::config::{MonitorConfig, Settings};
use tripwire::core::http::{start_server, AppState};
use tripwire::core::runtime::{MonitorRuntime, RuntimeConfig};
use tripwire::core::scheduler::PassScheduler;
use tripwire::logging;
use tripwire::metrics::Metrics;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    logging::init_logging();

    let settings = Settings::from_env()?;
    let runtime_config = RuntimeConfig::from(&settings);
    info!("Starting Tripwire Worker");
    info!(environment = %settings.environment, "Environment");

    let config = MonitorConfig::load(&settings.config_path)?;
    info!(
        stocks = config.stocks.len(),
        products = config.products.len(),
        "Loaded {} subjects from {}",
        config.stocks.len() + config.products.len(),
        settings.config_path
    );

    let metrics = Arc::new(Metrics::new()?);
    let runtime = Arc::new(MonitorRuntime::build(&config, &settings, Some(metrics.clone()))?);

    let scheduler = PassScheduler::new(runtime.clone(), runtime_config.check_interval_seconds)?;
    scheduler.start().await;

    let state = AppState::new(metrics, runtime.last_pass());
    let server = tokio::spawn(async move {
        if let Err(e) = start_server(runtime_config.port, state).await {
            error!(error = %e, "HTTP server stopped");
        }
    });

    info!("Worker started, waiting for shutdown signal...");
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down worker...");
        }
    }
    scheduler.stop().await;
    runtime.shutdown().await;
    server.abort();
    info!("Worker stopped");

    Ok(())
}
