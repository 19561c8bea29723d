//! Wiring of the monitoring engine from settings and the subjects file

use crate::config::{MonitorConfig, Settings, DEFAULT_CHECK_INTERVAL_SECS};
use crate::engine::dedup::NotificationDeduper;
use crate::engine::fanout::NotificationFanout;
use crate::engine::gate::MarketGate;
use crate::engine::orchestrator::CheckOrchestrator;
use crate::error::ConfigError;
use crate::metrics::Metrics;
use crate::models::outcome::PassSummary;
use crate::models::subject::Subject;
use crate::services::calendar::HolidayCnCalendar;
use crate::services::market_data::TencentQuoteSource;
use crate::services::notify::{MessageChannel, TelegramChannel, WebhookChannel};
use crate::services::page::RenderServiceExtractor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Settings of the long-running worker
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub check_interval_seconds: u64,
    pub port: u16,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: DEFAULT_CHECK_INTERVAL_SECS,
            port: 8080,
        }
    }
}

impl From<&Settings> for RuntimeConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            check_interval_seconds: settings.check_interval_seconds,
            port: settings.port,
        }
    }
}

/// Every channel the environment configures. At least one is required.
pub fn build_channels(settings: &Settings) -> Result<Vec<Arc<dyn MessageChannel>>, ConfigError> {
    let mut channels: Vec<Arc<dyn MessageChannel>> = Vec::new();

    if let Some(ref telegram) = settings.telegram {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("http client: {}", e)))?;
        channels.push(Arc::new(TelegramChannel::with_client(
            &telegram.api_url,
            client,
            &telegram.bot_token,
            &telegram.chat_id,
        )));
    }
    if let Some(ref url) = settings.webhook_url {
        channels.push(Arc::new(WebhookChannel::new(url)));
    }

    if channels.is_empty() {
        return Err(ConfigError::NoChannels);
    }
    Ok(channels)
}

/// Owns the orchestrator, the subjects and the last pass summary.
///
/// One instance lives for the whole process, so the cooldown cache carries
/// over from pass to pass.
pub struct MonitorRuntime {
    orchestrator: CheckOrchestrator,
    subjects: Vec<Subject>,
    last_pass: Arc<RwLock<Option<PassSummary>>>,
    pass_lock: Mutex<()>,
    prune_after: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl MonitorRuntime {
    pub fn new(orchestrator: CheckOrchestrator, subjects: Vec<Subject>) -> Self {
        Self {
            orchestrator,
            subjects,
            last_pass: Arc::new(RwLock::new(None)),
            pass_lock: Mutex::new(()),
            prune_after: Duration::from_secs(2 * crate::config::DEFAULT_COOLDOWN_SECS),
            metrics: None,
        }
    }

    /// Build the production engine: Tencent quotes, holiday-cn calendar, the
    /// render service when configured, and every configured channel.
    pub fn build(
        config: &MonitorConfig,
        settings: &Settings,
        metrics: Option<Arc<Metrics>>,
    ) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("http client: {}", e)))?;

        let mut fanout = NotificationFanout::new(build_channels(settings)?);
        let mut gate = MarketGate::new(Arc::new(HolidayCnCalendar::with_client(
            &settings.calendar_url,
            http.clone(),
        )))
        .with_retry(config.retry.fetcher());
        if let Some(ref metrics) = metrics {
            fanout = fanout.with_metrics(metrics.clone());
            gate = gate.with_metrics(metrics.clone());
        }
        info!(channels = ?fanout.channel_names(), "Notification channels configured");

        let mut orchestrator = CheckOrchestrator::new(
            Arc::new(TencentQuoteSource::with_client(&settings.quote_api_url, http)),
            Arc::new(fanout),
            Arc::new(NotificationDeduper::new()),
        )
        .with_gate(gate)
        .with_retry(config.retry.fetcher())
        .with_default_cooldown(config.default_cooldown());

        if config.has_listings() {
            match settings.render_service_url {
                Some(ref url) => {
                    orchestrator = orchestrator
                        .with_pages(Arc::new(RenderServiceExtractor::new(url)), config.sites.clone());
                }
                None => return Err(ConfigError::MissingEnv("RENDER_SERVICE_URL")),
            }
        }
        if let Some(ref metrics) = metrics {
            orchestrator = orchestrator.with_metrics(metrics.clone());
        }

        let mut runtime = Self::new(orchestrator, config.subjects())
            .with_prune_after(config.max_cooldown() * 2);
        runtime.metrics = metrics;
        Ok(runtime)
    }

    /// Age after which cooldown entries are dropped between passes
    pub fn with_prune_after(mut self, prune_after: Duration) -> Self {
        self.prune_after = prune_after;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn last_pass(&self) -> Arc<RwLock<Option<PassSummary>>> {
        self.last_pass.clone()
    }

    /// Run one pass and remember its summary. A tick arriving while a pass is
    /// still running is dropped.
    pub async fn run_once(&self) -> Option<PassSummary> {
        let _guard = match self.pass_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("Previous pass still running, skipping this tick");
                return None;
            }
        };

        let summary = self.orchestrator.run_pass(&self.subjects).await;

        let deduper = self.orchestrator.deduper();
        let pruned = deduper.prune(self.prune_after);
        if pruned > 0 {
            debug!(pruned = pruned, "Pruned stale cooldown entries");
        }
        if let Some(ref metrics) = self.metrics {
            metrics.cooldown_entries.set(deduper.len() as i64);
        }

        *self.last_pass.write().await = Some(summary.clone());
        Some(summary)
    }

    /// Wait for alert deliveries still in flight from earlier passes.
    pub async fn shutdown(&self) {
        self.orchestrator.fanout().drain().await;
    }
}
