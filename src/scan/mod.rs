//! Job scan orchestration
//!
//! Walks every source through the shared browser session, hands extracted
//! postings to the merge engine and records how each source ended.

pub mod gate;
pub(crate) mod navigation;
pub mod orchestrator;
pub mod outcome;
pub mod run_state;

pub use gate::{ScanGate, ScanPermit};
pub use orchestrator::JobScanOrchestrator;
pub use outcome::{MergeTotals, ScanOutcome, SkipReason};
pub use run_state::{RunState, RunSummary, SourceRecord};
