use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Auxiliary quote fields shown in price alerts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteFields {
    pub previous_close: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
}

/// One fetched snapshot of a subject's observable state.
///
/// `change_pct` is in percentage points (`5.0` means +5%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub subject_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub value: f64,
    pub change_pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<QuoteFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl Sample {
    pub fn new(subject_id: impl Into<String>, value: f64, change_pct: f64) -> Self {
        Self {
            subject_id: subject_id.into(),
            name: None,
            value,
            change_pct,
            quote: None,
            in_stock: None,
            page_url: None,
            observed_at: Utc::now(),
        }
    }

    /// Listing availability encoded as a sample: 1.0 in stock, 0.0 out of stock.
    pub fn availability(subject_id: impl Into<String>, in_stock: bool, page_url: impl Into<String>) -> Self {
        let mut sample = Self::new(subject_id, if in_stock { 1.0 } else { 0.0 }, 0.0);
        sample.in_stock = Some(in_stock);
        sample.page_url = Some(page_url.into());
        sample
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_quote(mut self, quote: QuoteFields) -> Self {
        self.quote = Some(quote);
        self
    }

    pub fn with_observed_at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }

    /// Percent change at display precision (two decimals)
    pub fn rounded_change_pct(&self) -> f64 {
        round_2dp(self.change_pct)
    }
}

pub fn round_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
