//! Cooldown cache deciding whether a triggered set is announced again

use crate::core::clock::{Clock, SystemClock};
use crate::models::condition::ConditionSignature;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type CooldownKey = (String, ConditionSignature);

/// Keyed cooldown cache, one entry per subject and exact rule combination.
///
/// Created once per process and shared by every pass. Entries only live in
/// memory, so a process restart starts with an empty cache.
pub struct NotificationDeduper {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<CooldownKey, DateTime<Utc>>>,
}

impl NotificationDeduper {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true when the key has never alerted or its cooldown has
    /// elapsed, and records now as the last notification time. The lookup and
    /// the update happen under one lock.
    pub fn should_notify(&self, subject_id: &str, signature: &ConditionSignature, cooldown: Duration) -> bool {
        let now = self.clock.now();
        let cooldown = chrono::Duration::from_std(cooldown).unwrap_or(chrono::Duration::MAX);
        let key = (subject_id.to_string(), signature.clone());

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let allowed = match entries.get(&key) {
            None => true,
            Some(last) => now.signed_duration_since(*last) > cooldown,
        };
        if allowed {
            entries.insert(key, now);
        }
        allowed
    }

    /// Last notification time recorded for a key
    pub fn last_notified(&self, subject_id: &str, signature: &ConditionSignature) -> Option<DateTime<Utc>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(&(subject_id.to_string(), signature.clone()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries at least `max_age` old. Returns how many were removed.
    pub fn prune(&self, max_age: Duration) -> usize {
        let now = self.clock.now();
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, last| now.signed_duration_since(*last) < max_age);
        before - entries.len()
    }
}

impl Default for NotificationDeduper {
    fn default() -> Self {
        Self::new()
    }
}
