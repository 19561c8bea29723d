//! Telegram Bot API channel

use super::MessageChannel;
use crate::error::NotificationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TELEGRAM_URL: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramChannel {
    client: reqwest::Client,
    base_url: String,
    bot_token: String,
    chat_id: String,
    parse_mode: String,
    disable_web_page_preview: bool,
}

impl TelegramChannel {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(DEFAULT_TELEGRAM_URL, client, bot_token, chat_id)
    }

    pub fn with_client(
        base_url: impl Into<String>,
        client: reqwest::Client,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            parse_mode: "HTML".to_string(),
            disable_web_page_preview: false,
        }
    }

    pub fn with_link_previews(mut self, enabled: bool) -> Self {
        self.disable_web_page_preview = !enabled;
        self
    }

    fn transport(&self, err: impl ToString) -> NotificationError {
        NotificationError::Transport {
            channel: self.name().to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl MessageChannel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, message: &str) -> Result<(), NotificationError> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: message,
            parse_mode: &self.parse_mode,
            disable_web_page_preview: self.disable_web_page_preview,
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport(e))?;
        let status = response.status();
        let body: Option<ApiResponse> = response.json().await.ok();

        match body {
            Some(ApiResponse { ok: true, .. }) if status.is_success() => Ok(()),
            other => Err(NotificationError::Rejected {
                channel: self.name().to_string(),
                status: status.as_u16(),
                description: other
                    .and_then(|b| b.description)
                    .unwrap_or_else(|| "no description".to_string()),
            }),
        }
    }
}
