//! Bounded retry wrapper for outbound data requests

use crate::error::FetchError;
use backon::{ConstantBuilder, Retryable};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(2000);
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs a request up to `max_attempts` times with a fixed delay between
/// attempts. Every attempt is bounded by its own timeout.
#[derive(Debug, Clone)]
pub struct RetryingFetcher {
    max_attempts: usize,
    delay: Duration,
    attempt_timeout: Duration,
}

impl RetryingFetcher {
    /// `max_attempts` below 1 is treated as 1.
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Perform `request`, retrying on failure. The last error is returned
    /// once all attempts fail.
    pub async fn fetch<T, F, Fut>(&self, label: &str, mut request: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let attempt_timeout = self.attempt_timeout;
        let backoff = ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times(self.max_attempts - 1);

        let attempt = || {
            let pending = request();
            async move {
                match tokio::time::timeout(attempt_timeout, pending).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(attempt_timeout)),
                }
            }
        };

        attempt
            .retry(backoff)
            .sleep(tokio::time::sleep)
            .notify(|err: &FetchError, delay: Duration| {
                warn!(
                    target_label = %label,
                    error = %err,
                    retry_in_ms = delay.as_millis() as u64,
                    "Request for {} failed, retrying in {:?}",
                    label,
                    delay
                );
            })
            .await
    }
}

impl Default for RetryingFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}
