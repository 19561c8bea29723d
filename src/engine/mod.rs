//! Monitoring engine: evaluation, cooldowns, gating, delivery and the pass driver

pub mod dedup;
pub mod evaluator;
pub mod fanout;
pub mod gate;
pub mod message;
pub mod orchestrator;
pub mod retry;

pub use dedup::NotificationDeduper;
pub use evaluator::ConditionEvaluator;
pub use fanout::NotificationFanout;
pub use gate::{ClosureReason, MarketGate, MarketStatus};
pub use orchestrator::CheckOrchestrator;
pub use retry::RetryingFetcher;
