//! Hand-written doubles for the engine's collaborators
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tripwire::core::clock::shanghai;
use tripwire::error::{CalendarError, FetchError, NotificationError};
use tripwire::services::calendar::{CalendarSource, HolidayCalendar};
use tripwire::services::market_data::{Quote, QuoteSource};
use tripwire::services::notify::MessageChannel;
use tripwire::services::page::{PageExtractor, PageText};

/// UTC instant for a Shanghai wall-clock time
pub fn shanghai_time(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    shanghai()
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid shanghai time")
        .with_timezone(&Utc)
}

pub fn quote(code: &str, price: f64, change_pct: f64) -> Quote {
    Quote {
        code: code.to_string(),
        name: format!("Name of {}", code),
        price,
        change_pct,
        previous_close: price,
        open: price,
        high: price,
        low: price,
    }
}

/// Quotes served from a map. Unknown codes fail with a transport error.
#[derive(Default)]
pub struct MockQuotes {
    quotes: Mutex<HashMap<String, Quote>>,
    calls: AtomicUsize,
}

impl MockQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(self, quote: Quote) -> Self {
        self.quotes.lock().unwrap().insert(quote.code.clone(), quote);
        self
    }

    pub fn set_price(&self, code: &str, price: f64) {
        if let Some(q) = self.quotes.lock().unwrap().get_mut(code) {
            q.price = price;
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteSource for MockQuotes {
    async fn quote(&self, code: &str) -> Result<Quote, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.quotes
            .lock()
            .unwrap()
            .get(code)
            .cloned()
            .ok_or_else(|| FetchError::Transport(format!("connection refused for {}", code)))
    }
}

/// Page text served from a map keyed by URL
#[derive(Default)]
pub struct MockPages {
    pages: Mutex<HashMap<String, Option<String>>>,
    calls: AtomicUsize,
}

impl MockPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, text: Option<&str>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), text.map(str::to_string));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageExtractor for MockPages {
    async fn extract(&self, url: &str, _selector: &str, _wait: Duration) -> Result<PageText, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.lock().unwrap().get(url) {
            Some(text) => Ok(PageText {
                text: text.clone(),
                final_url: url.to_string(),
            }),
            None => Err(FetchError::Transport(format!("render failed for {}", url))),
        }
    }
}

/// Channel that records every message it accepts
pub struct RecordingChannel {
    name: String,
    fail: bool,
    delay: Duration,
    sent: Mutex<Vec<String>>,
    attempts: AtomicUsize,
}

impl RecordingChannel {
    pub fn ok(name: &str) -> Arc<Self> {
        Arc::new(Self::build(name, false, Duration::ZERO))
    }

    pub fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self::build(name, true, Duration::ZERO))
    }

    pub fn slow(name: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self::build(name, false, delay))
    }

    fn build(name: &str, fail: bool, delay: Duration) -> Self {
        Self {
            name: name.to_string(),
            fail,
            delay,
            sent: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageChannel for RecordingChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, message: &str) -> Result<(), NotificationError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(NotificationError::Transport {
                channel: self.name.clone(),
                message: "connection reset".to_string(),
            });
        }
        self.sent.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// Calendar that always answers with the same holidays
pub struct FixedCalendar {
    calendar: HolidayCalendar,
    calls: AtomicUsize,
}

impl FixedCalendar {
    pub fn new(calendar: HolidayCalendar) -> Arc<Self> {
        Arc::new(Self {
            calendar,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::new(HolidayCalendar::new())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CalendarSource for FixedCalendar {
    async fn holidays(&self, _year: i32) -> Result<HolidayCalendar, CalendarError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.calendar.clone())
    }
}

pub struct UnreachableCalendar;

#[async_trait]
impl CalendarSource for UnreachableCalendar {
    async fn holidays(&self, year: i32) -> Result<HolidayCalendar, CalendarError> {
        Err(CalendarError::Unavailable {
            year,
            reason: "connection refused".to_string(),
        })
    }
}

/// Calendar that fails a fixed number of times before answering
pub struct FlakyCalendar {
    calendar: HolidayCalendar,
    failures: usize,
    calls: AtomicUsize,
}

impl FlakyCalendar {
    pub fn new(calendar: HolidayCalendar, failures: usize) -> Arc<Self> {
        Arc::new(Self {
            calendar,
            failures,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CalendarSource for FlakyCalendar {
    async fn holidays(&self, year: i32) -> Result<HolidayCalendar, CalendarError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(CalendarError::Unavailable {
                year,
                reason: "503 from calendar host".to_string(),
            });
        }
        Ok(self.calendar.clone())
    }
}
