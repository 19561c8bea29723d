//! Trigger rules and the sets they produce

use serde::{Deserialize, Serialize};
use std::fmt;

/// A configured trigger rule.
///
/// Each variant carries exactly the thresholds its kind needs, so a rule
/// with a missing field never makes it past deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    Below {
        value: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Above {
        value: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    ChangeUp {
        value: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    ChangeDown {
        value: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Range {
        min: f64,
        max: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    Below,
    Above,
    ChangeUp,
    ChangeDown,
    Range,
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConditionKind::Below => "below",
            ConditionKind::Above => "above",
            ConditionKind::ChangeUp => "change_up",
            ConditionKind::ChangeDown => "change_down",
            ConditionKind::Range => "range",
        };
        f.write_str(name)
    }
}

impl Condition {
    pub fn kind(&self) -> ConditionKind {
        match self {
            Condition::Below { .. } => ConditionKind::Below,
            Condition::Above { .. } => ConditionKind::Above,
            Condition::ChangeUp { .. } => ConditionKind::ChangeUp,
            Condition::ChangeDown { .. } => ConditionKind::ChangeDown,
            Condition::Range { .. } => ConditionKind::Range,
        }
    }

    /// Configured message, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            Condition::Below { message, .. }
            | Condition::Above { message, .. }
            | Condition::ChangeUp { message, .. }
            | Condition::ChangeDown { message, .. }
            | Condition::Range { message, .. } => message.as_deref(),
        }
    }

    /// Text shown in an alert: the configured message or a kind-specific default.
    pub fn display_message(&self) -> String {
        if let Some(message) = self.message() {
            return message.to_string();
        }
        match self {
            Condition::Below { value, .. } => format!("Price below ¥{}", value),
            Condition::Above { value, .. } => format!("Price above ¥{}", value),
            Condition::ChangeUp { value, .. } => format!("Up more than {}%", value),
            Condition::ChangeDown { value, .. } => format!("Down more than {}%", value),
            Condition::Range { min, max, .. } => format!("Price within ¥{} - ¥{}", min, max),
        }
    }

    /// `kind:threshold` fragment used to build a [`ConditionSignature`].
    pub fn signature_fragment(&self) -> String {
        match self {
            Condition::Below { value, .. }
            | Condition::Above { value, .. }
            | Condition::ChangeUp { value, .. }
            | Condition::ChangeDown { value, .. } => format!("{}:{}", self.kind(), value),
            Condition::Range { min, max, .. } => format!("{}:{}-{}", self.kind(), min, max),
        }
    }

    /// Check the thresholds for values serde cannot rule out.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Condition::Below { value, .. } | Condition::Above { value, .. } => {
                if !value.is_finite() {
                    return Err(format!("{} threshold must be finite", self.kind()));
                }
            }
            Condition::ChangeUp { value, .. } | Condition::ChangeDown { value, .. } => {
                if !value.is_finite() || *value < 0.0 {
                    return Err(format!(
                        "{} threshold must be a non-negative percentage, got {}",
                        self.kind(),
                        value
                    ));
                }
            }
            Condition::Range { min, max, .. } => {
                if !min.is_finite() || !max.is_finite() {
                    return Err("range bounds must be finite".to_string());
                }
                if min > max {
                    return Err(format!("range min {} exceeds max {}", min, max));
                }
            }
        }
        Ok(())
    }
}

/// Dedup key component derived from a triggered set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionSignature(String);

impl ConditionSignature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConditionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Conditions that matched a sample, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggeredSet {
    conditions: Vec<Condition>,
}

impl TriggeredSet {
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn signature(&self) -> ConditionSignature {
        let fragments: Vec<String> = self
            .conditions
            .iter()
            .map(Condition::signature_fragment)
            .collect();
        ConditionSignature(fragments.join(","))
    }
}
