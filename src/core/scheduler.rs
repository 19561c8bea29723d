//! Cron-driven pass scheduler for the long-running worker

use crate::core::runtime::MonitorRuntime;
use crate::error::ConfigError;
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Cron expression (with seconds field) firing every `interval_seconds`.
///
/// Cron steps restart at each minute, hour or day, so only intervals that
/// divide the enclosing unit evenly are accepted.
pub fn cron_expression(interval_seconds: u64) -> Result<String, ConfigError> {
    let uneven = |unit: &str| {
        ConfigError::Invalid(format!(
            "check interval {}s does not divide {} evenly",
            interval_seconds, unit
        ))
    };

    match interval_seconds {
        0 => Err(ConfigError::Invalid("check interval must be greater than zero".to_string())),
        s if s < 60 => {
            if 60 % s != 0 {
                return Err(uneven("a minute"));
            }
            Ok(format!("*/{} * * * * *", s))
        }
        s if s < 3600 => {
            if s % 60 != 0 || 60 % (s / 60) != 0 {
                return Err(uneven("an hour"));
            }
            Ok(format!("0 */{} * * * *", s / 60))
        }
        s => {
            if s % 3600 != 0 || 24 % (s / 3600) != 0 {
                return Err(uneven("a day"));
            }
            Ok(format!("0 0 */{} * * *", s / 3600))
        }
    }
}

/// Runs a monitoring pass on every cron tick
pub struct PassScheduler {
    runtime: Arc<MonitorRuntime>,
    schedule: Schedule,
    run_on_start: bool,
    handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
}

impl PassScheduler {
    pub fn new(runtime: Arc<MonitorRuntime>, interval_seconds: u64) -> Result<Self, ConfigError> {
        let cron_expr = cron_expression(interval_seconds)?;
        let schedule = Schedule::from_str(&cron_expr).map_err(|e| {
            ConfigError::Invalid(format!("invalid cron expression '{}': {}", cron_expr, e))
        })?;

        info!(
            interval = interval_seconds,
            cron = %cron_expr,
            "PassScheduler: created with interval {}s (cron: {})",
            interval_seconds,
            cron_expr
        );

        Ok(Self {
            runtime,
            schedule,
            run_on_start: true,
            handle: Arc::new(RwLock::new(None)),
        })
    }

    /// Whether to run one pass immediately instead of waiting for the first tick
    pub fn with_run_on_start(mut self, run_on_start: bool) -> Self {
        self.run_on_start = run_on_start;
        self
    }

    pub async fn start(&self) {
        let runtime = self.runtime.clone();
        let schedule = self.schedule.clone();
        let run_on_start = self.run_on_start;

        let handle = tokio::spawn(async move {
            if run_on_start {
                runtime.run_once().await;
            }

            loop {
                match schedule.upcoming(chrono::Utc).next() {
                    Some(next_tick) => {
                        let now = chrono::Utc::now();
                        if next_tick > now {
                            let duration = (next_tick - now).to_std().unwrap_or_default();
                            tokio::time::sleep(duration).await;
                        }
                    }
                    None => {
                        warn!("PassScheduler: schedule has no upcoming tick");
                        tokio::time::sleep(tokio::time::Duration::from_secs(60)).await;
                        continue;
                    }
                }

                info!("PassScheduler: cron tick");
                runtime.run_once().await;
            }
        });

        let mut h = self.handle.write().await;
        if let Some(previous) = h.replace(handle) {
            previous.abort();
        }
        info!("PassScheduler: started");
    }

    pub async fn stop(&self) {
        let mut handle = self.handle.write().await;
        if let Some(h) = handle.take() {
            h.abort();
            info!("PassScheduler: stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.handle.read().await.is_some()
    }
}
