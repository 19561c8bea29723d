//! Prometheus metrics for monitoring passes and the HTTP surface

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

pub struct Metrics {
    registry: Registry,
    /// Passes by result: `completed` or `skipped`
    pub passes_total: IntCounterVec,
    pub pass_duration_seconds: Histogram,
    pub subjects_checked_total: IntCounter,
    /// Failed subjects by kind: `fetch` or `configuration`
    pub subject_failures_total: IntCounterVec,
    pub alerts_sent_total: IntCounter,
    pub alerts_suppressed_total: IntCounter,
    pub notification_failures_total: IntCounter,
    pub calendar_fallbacks_total: IntCounter,
    pub cooldown_entries: IntGauge,
    pub http_requests_total: IntCounter,
    pub http_requests_in_flight: IntGauge,
    pub http_request_duration_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let passes_total = IntCounterVec::new(
            Opts::new("monitor_passes_total", "Monitoring passes by result"),
            &["result"],
        )?;
        let pass_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("monitor_pass_duration_seconds", "Wall time of one monitoring pass")
                .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;
        let subjects_checked_total =
            IntCounter::new("monitor_subjects_checked_total", "Subjects checked across all passes")?;
        let subject_failures_total = IntCounterVec::new(
            Opts::new("monitor_subject_failures_total", "Subjects that failed a check, by kind"),
            &["kind"],
        )?;
        let alerts_sent_total =
            IntCounter::new("monitor_alerts_sent_total", "Alerts delivered to at least one channel")?;
        let alerts_suppressed_total = IntCounter::new(
            "monitor_alerts_suppressed_total",
            "Triggered alerts suppressed by the cooldown",
        )?;
        let notification_failures_total = IntCounter::new(
            "monitor_notification_failures_total",
            "Failed deliveries on individual channels",
        )?;
        let calendar_fallbacks_total = IntCounter::new(
            "monitor_calendar_fallbacks_total",
            "Gate checks made without a holiday calendar",
        )?;
        let cooldown_entries =
            IntGauge::new("monitor_cooldown_entries", "Entries held by the notification cooldown cache")?;
        let http_requests_total = IntCounter::new("http_requests_total", "Total HTTP requests")?;
        let http_requests_in_flight =
            IntGauge::new("http_requests_in_flight", "HTTP requests currently being served")?;
        let http_request_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency",
        ))?;

        registry.register(Box::new(passes_total.clone()))?;
        registry.register(Box::new(pass_duration_seconds.clone()))?;
        registry.register(Box::new(subjects_checked_total.clone()))?;
        registry.register(Box::new(subject_failures_total.clone()))?;
        registry.register(Box::new(alerts_sent_total.clone()))?;
        registry.register(Box::new(alerts_suppressed_total.clone()))?;
        registry.register(Box::new(notification_failures_total.clone()))?;
        registry.register(Box::new(calendar_fallbacks_total.clone()))?;
        registry.register(Box::new(cooldown_entries.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            passes_total,
            pass_duration_seconds,
            subjects_checked_total,
            subject_failures_total,
            alerts_sent_total,
            alerts_suppressed_total,
            notification_failures_total,
            calendar_fallbacks_total,
            cooldown_entries,
            http_requests_total,
            http_requests_in_flight,
            http_request_duration_seconds,
        })
    }

    /// Render every registered metric in the Prometheus text format
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
