//! One monitoring pass over a set of subjects

use crate::config::{SiteRules, DEFAULT_COOLDOWN_SECS};
use crate::engine::dedup::NotificationDeduper;
use crate::engine::evaluator::ConditionEvaluator;
use crate::engine::fanout::NotificationFanout;
use crate::engine::gate::{MarketGate, MarketStatus};
use crate::engine::message::compose_alert;
use crate::engine::retry::RetryingFetcher;
use crate::error::{ConfigError, FetchError, SubjectError};
use crate::metrics::Metrics;
use crate::models::outcome::{FailureKind, OutcomeStatus, PassOutcome, PassSummary};
use crate::models::sample::Sample;
use crate::models::subject::{Subject, SubjectSource};
use crate::services::market_data::QuoteSource;
use crate::services::page::PageExtractor;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Runs fetch, evaluate, dedup and notify for every subject of a pass.
///
/// Subjects are processed concurrently and never affect each other: a
/// failing subject is recorded in the summary and the rest carry on.
pub struct CheckOrchestrator {
    quotes: Arc<dyn QuoteSource>,
    pages: Option<Arc<dyn PageExtractor>>,
    sites: SiteRules,
    fanout: Arc<NotificationFanout>,
    deduper: Arc<NotificationDeduper>,
    gate: Option<MarketGate>,
    retry: RetryingFetcher,
    default_cooldown: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl CheckOrchestrator {
    pub fn new(
        quotes: Arc<dyn QuoteSource>,
        fanout: Arc<NotificationFanout>,
        deduper: Arc<NotificationDeduper>,
    ) -> Self {
        Self {
            quotes,
            pages: None,
            sites: SiteRules::new(),
            fanout,
            deduper,
            gate: None,
            retry: RetryingFetcher::default(),
            default_cooldown: Duration::from_secs(DEFAULT_COOLDOWN_SECS),
            metrics: None,
        }
    }

    pub fn with_pages(mut self, pages: Arc<dyn PageExtractor>, sites: SiteRules) -> Self {
        self.pages = Some(pages);
        self.sites = sites;
        self
    }

    pub fn with_gate(mut self, gate: MarketGate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_retry(mut self, retry: RetryingFetcher) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_default_cooldown(mut self, cooldown: Duration) -> Self {
        self.default_cooldown = cooldown;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn deduper(&self) -> &Arc<NotificationDeduper> {
        &self.deduper
    }

    pub fn fanout(&self) -> &Arc<NotificationFanout> {
        &self.fanout
    }

    /// Run one pass. Never fails as a whole; per-subject problems end up in
    /// the returned summary.
    pub async fn run_pass(&self, subjects: &[Subject]) -> PassSummary {
        let started = Instant::now();
        info!(subjects = subjects.len(), "Starting monitoring pass");

        let (subjects, skip_reason) = self.apply_gate(subjects).await;
        if subjects.is_empty() {
            if let Some(reason) = skip_reason {
                info!(reason = %reason, "Market closed, pass skipped");
                self.record_pass("skipped", started);
                return PassSummary::skipped(reason);
            }
        }

        let outcomes = join_all(subjects.iter().map(|subject| self.check_subject(subject))).await;
        let summary = PassSummary::from_outcomes(outcomes).with_skip_reason(skip_reason);

        self.record_pass("completed", started);
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            alerted = summary.alerted,
            duration_ms = started.elapsed().as_millis() as u64,
            "Monitoring pass finished: {} ok, {} failed, {} alerted",
            summary.succeeded,
            summary.failed,
            summary.alerted
        );
        summary
    }

    /// Drop gated subjects while the market is closed. The gate is only
    /// consulted when at least one subject needs it.
    async fn apply_gate<'a>(&self, subjects: &'a [Subject]) -> (Vec<&'a Subject>, Option<String>) {
        let gate = match self.gate {
            Some(ref gate) if subjects.iter().any(Subject::requires_market_gate) => gate,
            _ => return (subjects.iter().collect(), None),
        };

        match gate.check().await {
            MarketStatus::Open => (subjects.iter().collect(), None),
            MarketStatus::Closed(reason) => {
                let remaining: Vec<&Subject> = subjects
                    .iter()
                    .filter(|s| !s.requires_market_gate())
                    .collect();
                debug!(
                    reason = %reason,
                    dropped = subjects.len() - remaining.len(),
                    "Market closed, skipping gated subjects"
                );
                (remaining, Some(reason.to_string()))
            }
        }
    }

    async fn check_subject(&self, subject: &Subject) -> PassOutcome {
        if let Some(ref metrics) = self.metrics {
            metrics.subjects_checked_total.inc();
        }

        let sample = match self.fetch_sample(subject).await {
            Ok(sample) => sample,
            Err(e) => {
                error!(subject = %subject.id, error = %e, "Check failed for {}", subject.name);
                let outcome = PassOutcome::failed(&subject.id, &subject.name, &e);
                if let (Some(metrics), OutcomeStatus::Failed { kind, .. }) = (&self.metrics, &outcome.status) {
                    let label = match kind {
                        FailureKind::Fetch => "fetch",
                        FailureKind::Configuration => "configuration",
                    };
                    metrics.subject_failures_total.with_label_values(&[label]).inc();
                }
                return outcome;
            }
        };

        let triggered = ConditionEvaluator::evaluate(&sample, &subject.conditions);
        if triggered.is_empty() {
            debug!(subject = %subject.id, value = sample.value, "No condition triggered");
            return PassOutcome::new(&subject.id, &subject.name, OutcomeStatus::Quiet).with_sample(sample);
        }

        let signature = triggered.signature();
        let cooldown = subject.cooldown.unwrap_or(self.default_cooldown);
        if !self.deduper.should_notify(&subject.id, &signature, cooldown) {
            info!(
                subject = %subject.id,
                signature = %signature,
                "Already notified within cooldown, skipping"
            );
            if let Some(ref metrics) = self.metrics {
                metrics.alerts_suppressed_total.inc();
            }
            return PassOutcome::new(&subject.id, &subject.name, OutcomeStatus::CoolingDown)
                .with_signature(signature)
                .with_sample(sample);
        }

        let message = compose_alert(subject, &sample, &triggered);
        let delivered = self.fanout.send(&message).await;
        if delivered {
            info!(subject = %subject.id, signature = %signature, "Alert sent for {}", subject.name);
            if let Some(ref metrics) = self.metrics {
                metrics.alerts_sent_total.inc();
            }
        } else {
            warn!(subject = %subject.id, signature = %signature, "Alert for {} was not delivered", subject.name);
        }

        PassOutcome::new(&subject.id, &subject.name, OutcomeStatus::Alerted { delivered })
            .with_signature(signature)
            .with_sample(sample)
    }

    async fn fetch_sample(&self, subject: &Subject) -> Result<Sample, SubjectError> {
        match &subject.source {
            SubjectSource::Quote { code } => {
                let quotes = self.quotes.clone();
                let quote = self
                    .retry
                    .fetch(&subject.id, || {
                        let quotes = quotes.clone();
                        let code = code.clone();
                        async move { quotes.quote(&code).await }
                    })
                    .await?;
                Ok(quote.into_sample(&subject.id))
            }
            SubjectSource::Listing { url, .. } => self.fetch_listing(subject, url).await,
        }
    }

    async fn fetch_listing(&self, subject: &Subject, url: &str) -> Result<Sample, SubjectError> {
        let pages = self
            .pages
            .clone()
            .ok_or_else(|| ConfigError::Invalid("no page extractor configured".to_string()))?;
        let site = subject
            .listing_site()?
            .ok_or_else(|| ConfigError::Invalid(format!("{} is not a listing", subject.id)))?;
        let rule = self.sites.resolve(&site)?.clone();

        let page = self
            .retry
            .fetch(&subject.id, || {
                let pages = pages.clone();
                let url = url.to_string();
                let selector = rule.selector.clone();
                let wait = rule.wait();
                async move {
                    let page = pages.extract(&url, &selector, wait).await?;
                    if page.text.is_none() {
                        return Err(FetchError::ElementNotFound(selector));
                    }
                    Ok(page)
                }
            })
            .await?;

        let text = page.text.unwrap_or_default();
        let in_stock = !text.contains(&rule.out_of_stock_text);
        debug!(subject = %subject.id, site = %site, in_stock = in_stock, "Listing checked");
        Ok(Sample::availability(&subject.id, in_stock, page.final_url).with_name(&subject.name))
    }

    fn record_pass(&self, result: &str, started: Instant) {
        if let Some(ref metrics) = self.metrics {
            metrics.passes_total.with_label_values(&[result]).inc();
            metrics
                .pass_duration_seconds
                .observe(started.elapsed().as_secs_f64());
        }
    }
}
