//! Condition evaluation against a fetched sample

use crate::models::condition::{Condition, TriggeredSet};
use crate::models::sample::Sample;

pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Return the conditions that match `sample`, in input order.
    ///
    /// Percent-change rules compare against the change rounded to two
    /// decimals, the same precision the alert displays.
    pub fn evaluate(sample: &Sample, conditions: &[Condition]) -> TriggeredSet {
        let change_pct = sample.rounded_change_pct();
        let mut triggered: Vec<Condition> = Vec::new();

        for condition in conditions {
            if Self::matches(condition, sample.value, change_pct) && !triggered.contains(condition) {
                triggered.push(condition.clone());
            }
        }

        TriggeredSet::new(triggered)
    }

    fn matches(condition: &Condition, value: f64, change_pct: f64) -> bool {
        match *condition {
            Condition::Below { value: threshold, .. } => value < threshold,
            Condition::Above { value: threshold, .. } => value > threshold,
            Condition::ChangeUp { value: threshold, .. } => change_pct >= threshold,
            Condition::ChangeDown { value: threshold, .. } => change_pct <= -threshold,
            Condition::Range { min, max, .. } => min <= value && value <= max,
        }
    }
}
