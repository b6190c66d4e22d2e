//! Scan progress events
//!
//! The orchestrator publishes a `ScanEvent` at each step of a run so a UI
//! can render progress without polling.

pub mod bus;
pub mod errors;
pub mod streaming;
pub mod types;

pub use bus::{EventBusMetrics, ScanEventBus};
pub use errors::EventBusError;
pub use streaming::FilteredReceiver;
pub use types::{ScanEvent, ScanTrigger};
