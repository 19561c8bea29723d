//! Trading calendar source (non-trading days by year)

use crate::error::CalendarError;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_CALENDAR_URL: &str = "https://raw.githubusercontent.com/NateScarlet/holiday-cn/master";

/// Non-trading dates for one year, with display names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HolidayCalendar {
    off_days: HashMap<NaiveDate, String>,
}

impl HolidayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_off_day(mut self, date: NaiveDate, name: impl Into<String>) -> Self {
        self.off_days.insert(date, name.into());
        self
    }

    /// Holiday name when `date` is a non-trading day
    pub fn off_day(&self, date: NaiveDate) -> Option<&str> {
        self.off_days.get(&date).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.off_days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.off_days.is_empty()
    }
}

#[async_trait]
pub trait CalendarSource: Send + Sync {
    async fn holidays(&self, year: i32) -> Result<HolidayCalendar, CalendarError>;
}

#[derive(Debug, Deserialize)]
struct HolidayYear {
    #[serde(default)]
    days: Vec<HolidayDay>,
}

#[derive(Debug, Deserialize)]
struct HolidayDay {
    name: String,
    date: NaiveDate,
    #[serde(rename = "isOffDay")]
    is_off_day: bool,
}

/// Reads the yearly `holiday-cn` JSON files.
///
/// Days flagged `isOffDay: false` are make-up working days and are ignored;
/// the weekend rule already closes the exchange on those.
pub struct HolidayCnCalendar {
    client: reqwest::Client,
    base_url: String,
}

impl HolidayCnCalendar {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(DEFAULT_CALENDAR_URL, client)
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for HolidayCnCalendar {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CalendarSource for HolidayCnCalendar {
    async fn holidays(&self, year: i32) -> Result<HolidayCalendar, CalendarError> {
        let unavailable = |reason: String| CalendarError::Unavailable { year, reason };
        let url = format!("{}/{}.json", self.base_url, year);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(unavailable(format!("HTTP {}", response.status().as_u16())));
        }

        let body: HolidayYear = response
            .json()
            .await
            .map_err(|e| unavailable(format!("invalid calendar payload: {}", e)))?;

        let calendar = body
            .days
            .into_iter()
            .filter(|day| day.is_off_day)
            .fold(HolidayCalendar::new(), |calendar, day| {
                calendar.with_off_day(day.date, day.name)
            });
        Ok(calendar)
    }
}
