//! Shared data models spanning the engine layers.

pub mod condition;
pub mod outcome;
pub mod sample;
pub mod subject;

pub use condition::{Condition, ConditionKind, ConditionSignature, TriggeredSet};
pub use outcome::{FailureKind, OutcomeStatus, PassOutcome, PassSummary};
pub use sample::{QuoteFields, Sample};
pub use subject::{Subject, SubjectSource};
