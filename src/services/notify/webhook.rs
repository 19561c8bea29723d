//! Generic JSON webhook channel (`{"text": "..."}`)

use super::MessageChannel;
use crate::error::NotificationError;
use async_trait::async_trait;
use serde_json::json;

pub struct WebhookChannel {
    client: reqwest::Client,
    url: String,
}

impl WebhookChannel {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl MessageChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, message: &str) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "text": message }))
            .send()
            .await
            .map_err(|e| NotificationError::Transport {
                channel: self.name().to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let description = response.text().await.unwrap_or_default();
            Err(NotificationError::Rejected {
                channel: self.name().to_string(),
                status: status.as_u16(),
                description,
            })
        }
    }
}
