//! Process-level plumbing: clock, HTTP surface, runtime wiring and scheduling

pub mod clock;
pub mod http;
pub mod runtime;
pub mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use http::{create_router, start_server, AppState};
pub use runtime::{build_channels, MonitorRuntime, RuntimeConfig};
pub use scheduler::PassScheduler;
