//! Concurrent delivery of one message to every configured channel

use crate::metrics::Metrics;
use crate::services::notify::MessageChannel;
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub struct NotificationFanout {
    channels: Vec<Arc<dyn MessageChannel>>,
    metrics: Option<Arc<Metrics>>,
    /// Deliveries still running after `send` returned early
    pending: Mutex<Vec<JoinHandle<bool>>>,
}

impl NotificationFanout {
    pub fn new(channels: Vec<Arc<dyn MessageChannel>>) -> Self {
        Self {
            channels,
            metrics: None,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Send `message` on every channel at once.
    ///
    /// Returns true as soon as one channel accepts it. Each channel runs in
    /// its own task, so returning early neither cancels nor delays the
    /// others; their handles are kept until [`drain`](Self::drain). Channel
    /// errors are logged and never propagated.
    pub async fn send(&self, message: &str) -> bool {
        if self.channels.is_empty() {
            warn!("NotificationFanout: no channels configured, message dropped");
            return false;
        }

        let message: Arc<str> = Arc::from(message);
        let mut deliveries: FuturesUnordered<_> = self
            .channels
            .iter()
            .map(|channel| {
                let channel = channel.clone();
                let message = message.clone();
                let metrics = self.metrics.clone();
                tokio::spawn(async move {
                    match channel.send(&message).await {
                        Ok(()) => {
                            debug!(channel = channel.name(), "NotificationFanout: delivered");
                            true
                        }
                        Err(e) => {
                            warn!(
                                channel = channel.name(),
                                error = %e,
                                "NotificationFanout: delivery failed on {}",
                                channel.name()
                            );
                            if let Some(metrics) = metrics {
                                metrics.notification_failures_total.inc();
                            }
                            false
                        }
                    }
                })
            })
            .collect();

        while let Some(joined) = deliveries.next().await {
            match joined {
                Ok(true) => {
                    self.keep_pending(deliveries.into_iter());
                    return true;
                }
                Ok(false) => {}
                Err(e) => error!(error = %e, "NotificationFanout: channel task aborted"),
            }
        }
        false
    }

    /// Number of deliveries that were still running when `send` returned
    /// and have not been drained yet.
    pub fn pending(&self) -> usize {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|handle| !handle.is_finished());
        pending.len()
    }

    /// Wait for every outstanding delivery. Call before the process exits.
    pub async fn drain(&self) {
        let handles = std::mem::take(&mut *self.pending.lock().unwrap_or_else(|e| e.into_inner()));
        if handles.is_empty() {
            return;
        }

        info!(deliveries = handles.len(), "NotificationFanout: waiting for outstanding deliveries");
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "NotificationFanout: channel task aborted");
            }
        }
    }

    fn keep_pending(&self, handles: impl Iterator<Item = JoinHandle<bool>>) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|handle| !handle.is_finished());
        pending.extend(handles);
    }
}
