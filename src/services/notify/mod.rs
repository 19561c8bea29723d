//! Message channels

pub mod telegram;
pub mod webhook;

use crate::error::NotificationError;
use async_trait::async_trait;

pub use telegram::TelegramChannel;
pub use webhook::WebhookChannel;

/// Delivers formatted message text to one destination.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, message: &str) -> Result<(), NotificationError>;
}
