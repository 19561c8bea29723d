//! Per-subject outcomes and the pass summary built from them

use crate::error::SubjectError;
use crate::models::condition::ConditionSignature;
use crate::models::sample::Sample;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Fetch,
    Configuration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Fetched and evaluated, nothing triggered
    Quiet,
    /// Triggered, but the same signature alerted within the cooldown
    CoolingDown,
    /// Triggered and handed to the channels
    Alerted { delivered: bool },
    Failed { kind: FailureKind, error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct PassOutcome {
    pub subject_id: String,
    pub name: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<ConditionSignature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<Sample>,
}

impl PassOutcome {
    pub fn new(subject_id: impl Into<String>, name: impl Into<String>, status: OutcomeStatus) -> Self {
        Self {
            subject_id: subject_id.into(),
            name: name.into(),
            status,
            signature: None,
            sample: None,
        }
    }

    pub fn failed(subject_id: impl Into<String>, name: impl Into<String>, error: &SubjectError) -> Self {
        let kind = match error {
            SubjectError::Fetch(_) => FailureKind::Fetch,
            SubjectError::Config(_) => FailureKind::Configuration,
        };
        Self::new(
            subject_id,
            name,
            OutcomeStatus::Failed {
                kind,
                error: error.to_string(),
            },
        )
    }

    pub fn with_sample(mut self, sample: Sample) -> Self {
        self.sample = Some(sample);
        self
    }

    pub fn with_signature(mut self, signature: ConditionSignature) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.status, OutcomeStatus::Failed { .. })
    }

    /// A notification was delivered to at least one channel
    pub fn alerted(&self) -> bool {
        matches!(self.status, OutcomeStatus::Alerted { delivered: true })
    }
}

/// Aggregated result of one pass, keyed by subject id so output order never
/// depends on completion order.
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub alerted: usize,
    pub undelivered: usize,
    /// Market closure reason when gated subjects were not checked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    pub outcomes: BTreeMap<String, PassOutcome>,
    pub finished_at: DateTime<Utc>,
}

impl PassSummary {
    /// Whole pass short-circuited by the market gate
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            total: 0,
            succeeded: 0,
            failed: 0,
            alerted: 0,
            undelivered: 0,
            skipped: Some(reason.into()),
            outcomes: BTreeMap::new(),
            finished_at: Utc::now(),
        }
    }

    pub fn from_outcomes(outcomes: impl IntoIterator<Item = PassOutcome>) -> Self {
        let outcomes: BTreeMap<String, PassOutcome> = outcomes
            .into_iter()
            .map(|o| (o.subject_id.clone(), o))
            .collect();
        let succeeded = outcomes.values().filter(|o| o.is_success()).count();
        let alerted = outcomes.values().filter(|o| o.alerted()).count();
        let undelivered = outcomes
            .values()
            .filter(|o| matches!(o.status, OutcomeStatus::Alerted { delivered: false }))
            .count();
        Self {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            alerted,
            undelivered,
            skipped: None,
            outcomes,
            finished_at: Utc::now(),
        }
    }

    pub fn with_skip_reason(mut self, reason: Option<String>) -> Self {
        self.skipped = reason;
        self
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some() && self.total == 0
    }

    pub fn fetch_failures(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| {
                matches!(
                    o.status,
                    OutcomeStatus::Failed {
                        kind: FailureKind::Fetch,
                        ..
                    }
                )
            })
            .count()
    }

    /// Process exit code: non-zero when any subject ended in a fetch
    /// failure, zero otherwise. Configuration failures and a market-closed
    /// skip exit cleanly.
    pub fn exit_code(&self) -> i32 {
        if self.fetch_failures() > 0 {
            1
        } else {
            0
        }
    }

    pub fn outcome(&self, subject_id: &str) -> Option<&PassOutcome> {
        self.outcomes.get(subject_id)
    }
}
