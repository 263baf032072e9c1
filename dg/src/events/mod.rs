//! Workflow event stream
//!
//! ```text
//!   Workflow ──emit──► EventBus (tokio broadcast) ──► EventLogger (.jsonl)
//!                                                └──► other subscribers
//! ```
//!
//! The same events are also returned from every workflow phase, so a driver
//! can react without subscribing.

mod bus;
mod logger;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventEmitter};
pub use logger::{EventLogger, read_run_events, spawn_event_logger};
pub use types::{EventLogEntry, RunState, WorkflowEvent};
