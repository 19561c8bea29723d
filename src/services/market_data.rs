//! Quote source interface and the Tencent quote feed implementation

use crate::error::FetchError;
use crate::models::sample::{QuoteFields, Sample};
use async_trait::async_trait;
use std::time::Duration;

pub const DEFAULT_QUOTE_URL: &str = "https://qt.gtimg.cn";

/// Latest quote for an instrument. `change_pct` is in percentage points.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub code: String,
    pub name: String,
    pub price: f64,
    pub change_pct: f64,
    pub previous_close: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
}

impl Quote {
    pub fn into_sample(self, subject_id: &str) -> Sample {
        Sample::new(subject_id, self.price, self.change_pct)
            .with_name(self.name)
            .with_quote(QuoteFields {
                previous_close: self.previous_close,
                open: self.open,
                high: self.high,
                low: self.low,
            })
    }
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn quote(&self, code: &str) -> Result<Quote, FetchError>;
}

/// Polls `qt.gtimg.cn`, which answers with `v_<code>="f0~f1~...";` records.
pub struct TencentQuoteSource {
    client: reqwest::Client,
    base_url: String,
}

impl TencentQuoteSource {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(DEFAULT_QUOTE_URL, client)
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for TencentQuoteSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteSource for TencentQuoteSource {
    async fn quote(&self, code: &str) -> Result<Quote, FetchError> {
        let url = format!("{}/q={}", self.base_url, code.to_lowercase());
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        // The feed is GBK encoded; only numeric fields are relied upon.
        let bytes = response.bytes().await?;
        parse_quote(code, &String::from_utf8_lossy(&bytes))
    }
}

// Field positions in the tilde-separated record
const FIELD_NAME: usize = 1;
const FIELD_PRICE: usize = 3;
const FIELD_PREVIOUS_CLOSE: usize = 4;
const FIELD_OPEN: usize = 5;
const FIELD_CHANGE_PCT: usize = 32;
const FIELD_HIGH: usize = 33;
const FIELD_LOW: usize = 34;

/// Parse one Tencent quote record.
pub fn parse_quote(code: &str, body: &str) -> Result<Quote, FetchError> {
    if body.contains("pv_none_match") {
        return Err(FetchError::Payload(format!("unknown instrument {}", code)));
    }

    let record = body
        .split('"')
        .nth(1)
        .ok_or_else(|| FetchError::Payload("quote record not found".to_string()))?;
    let fields: Vec<&str> = record.split('~').collect();
    if fields.len() <= FIELD_LOW {
        return Err(FetchError::Payload(format!(
            "quote record for {} has {} fields",
            code,
            fields.len()
        )));
    }

    let number = |index: usize| -> Result<f64, FetchError> {
        fields[index].trim().parse::<f64>().map_err(|e| {
            FetchError::Payload(format!("field {} of {} is not numeric: {}", index, code, e))
        })
    };

    Ok(Quote {
        code: code.to_string(),
        name: fields[FIELD_NAME].to_string(),
        price: number(FIELD_PRICE)?,
        change_pct: number(FIELD_CHANGE_PCT)?,
        previous_close: number(FIELD_PREVIOUS_CLOSE)?,
        open: number(FIELD_OPEN)?,
        high: number(FIELD_HIGH)?,
        low: number(FIELD_LOW)?,
    })
}
