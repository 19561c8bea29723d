//! Browser-state extractor interface
//!
//! Rendering product pages needs a real browser, which runs as a separate
//! render service. This crate only talks to it over HTTP.

use crate::error::FetchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Text extracted from a rendered page
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    /// `None` when the selector matched nothing
    pub text: Option<String>,
    /// URL after redirects
    pub final_url: String,
}

#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract(&self, url: &str, selector: &str, wait: Duration) -> Result<PageText, FetchError>;
}

#[derive(Debug, Serialize)]
struct RenderRequest<'a> {
    url: &'a str,
    selector: &'a str,
    wait_ms: u64,
}

#[derive(Debug, Deserialize)]
struct RenderResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    final_url: Option<String>,
}

/// Posts `{url, selector, wait_ms}` to `<base>/extract` and reads
/// `{text, final_url}` back.
pub struct RenderServiceExtractor {
    client: reqwest::Client,
    base_url: String,
}

impl RenderServiceExtractor {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(45))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(base_url, client)
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PageExtractor for RenderServiceExtractor {
    async fn extract(&self, url: &str, selector: &str, wait: Duration) -> Result<PageText, FetchError> {
        let request = RenderRequest {
            url,
            selector,
            wait_ms: wait.as_millis() as u64,
        };
        let response = self
            .client
            .post(format!("{}/extract", self.base_url))
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body: RenderResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Payload(e.to_string()))?;
        Ok(PageText {
            text: body.text.filter(|t| !t.is_empty()),
            final_url: body.final_url.unwrap_or_else(|| url.to_string()),
        })
    }
}
