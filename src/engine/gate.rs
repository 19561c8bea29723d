//! Market-hours gate for calendar-bound subjects

use crate::core::clock::{shanghai, Clock, SystemClock};
use crate::engine::retry::RetryingFetcher;
use crate::error::FetchError;
use crate::metrics::Metrics;
use crate::services::calendar::{CalendarSource, HolidayCalendar};
use chrono::{DateTime, Datelike, FixedOffset, Timelike, Weekday};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Trading windows as `hour * 100 + minute`, inclusive on both ends
pub const MORNING_SESSION: (u32, u32) = (930, 1130);
pub const AFTERNOON_SESSION: (u32, u32) = (1300, 1500);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum ClosureReason {
    Weekend,
    Holiday(String),
    OutsideTradingHours,
}

impl fmt::Display for ClosureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClosureReason::Weekend => f.write_str("weekend"),
            ClosureReason::Holiday(name) => f.write_str(name),
            ClosureReason::OutsideTradingHours => f.write_str("outside trading hours"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketStatus {
    Open,
    Closed(ClosureReason),
}

impl MarketStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, MarketStatus::Open)
    }
}

/// True when `hhmm` falls inside either trading session.
pub fn is_trading_time(hhmm: u32) -> bool {
    let within = |(start, end): (u32, u32)| (start..=end).contains(&hhmm);
    within(MORNING_SESSION) || within(AFTERNOON_SESSION)
}

/// Classify a Shanghai-local instant given the holiday calendar, if any.
pub fn status_at(now: DateTime<FixedOffset>, calendar: Option<&HolidayCalendar>) -> MarketStatus {
    if matches!(now.weekday(), Weekday::Sat | Weekday::Sun) {
        return MarketStatus::Closed(ClosureReason::Weekend);
    }

    if let Some(name) = calendar.and_then(|c| c.off_day(now.date_naive())) {
        return MarketStatus::Closed(ClosureReason::Holiday(name.to_string()));
    }

    let hhmm = now.hour() * 100 + now.minute();
    if !is_trading_time(hhmm) {
        return MarketStatus::Closed(ClosureReason::OutsideTradingHours);
    }

    MarketStatus::Open
}

/// Combines weekend, holiday-calendar and intraday window rules.
///
/// An unreachable calendar skips only the holiday rule: the gate fails open
/// rather than stopping every check during a calendar outage.
pub struct MarketGate {
    calendar: Arc<dyn CalendarSource>,
    clock: Arc<dyn Clock>,
    cache: RwLock<Option<(i32, Arc<HolidayCalendar>)>>,
    retry: RetryingFetcher,
    metrics: Option<Arc<Metrics>>,
}

impl MarketGate {
    pub fn new(calendar: Arc<dyn CalendarSource>) -> Self {
        Self {
            calendar,
            clock: Arc::new(SystemClock),
            cache: RwLock::new(None),
            retry: RetryingFetcher::new(1, Duration::ZERO),
            metrics: None,
        }
    }

    /// Retry policy for calendar downloads. A single attempt by default.
    pub fn with_retry(mut self, retry: RetryingFetcher) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn check(&self) -> MarketStatus {
        let now = self.clock.now().with_timezone(&shanghai());
        self.check_at(now).await
    }

    pub async fn check_at(&self, now: DateTime<FixedOffset>) -> MarketStatus {
        let calendar = self.calendar_for(now.year()).await;
        let status = status_at(now, calendar.as_deref());
        debug!(at = %now, status = ?status, "MarketGate: evaluated");
        status
    }

    async fn calendar_for(&self, year: i32) -> Option<Arc<HolidayCalendar>> {
        {
            let cache = self.cache.read().await;
            if let Some((cached_year, calendar)) = cache.as_ref() {
                if *cached_year == year {
                    return Some(calendar.clone());
                }
            }
        }

        let fetched = self
            .retry
            .fetch("holiday calendar", || {
                let calendar = self.calendar.clone();
                async move {
                    calendar
                        .holidays(year)
                        .await
                        .map_err(|e| FetchError::Transport(e.to_string()))
                }
            })
            .await;

        match fetched {
            Ok(calendar) => {
                let calendar = Arc::new(calendar);
                let mut cache = self.cache.write().await;
                *cache = Some((year, calendar.clone()));
                Some(calendar)
            }
            Err(e) => {
                warn!(year = year, error = %e, "MarketGate: calendar unavailable, skipping holiday check");
                if let Some(ref metrics) = self.metrics {
                    metrics.calendar_fallbacks_total.inc();
                }
                None
            }
        }
    }
}
