//! Event type definitions for scan progress

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::SourceId;
use crate::scan::ScanOutcome;

/// What started a scan run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanTrigger {
    Scheduled,
    OnDemand,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    ScanStarted {
        trigger: ScanTrigger,
        sources: usize,
        timestamp: DateTime<Utc>,
    },
    SourceStarted {
        source_id: SourceId,
        url: String,
        timestamp: DateTime<Utc>,
    },
    PageProcessed {
        source_id: SourceId,
        page: usize,
        url: String,
        created: usize,
        updated: usize,
        unchanged: usize,
        timestamp: DateTime<Utc>,
    },
    SourceFinished {
        source_id: SourceId,
        outcome: ScanOutcome,
        timestamp: DateTime<Utc>,
    },
    ScanFinished {
        sources: usize,
        aborted: bool,
        duration: std::time::Duration,
        timestamp: DateTime<Utc>,
    },
    /// The person driving the browser session finished their step
    InteractiveFinished { timestamp: DateTime<Utc> },
}

impl ScanEvent {
    #[must_use]
    pub fn scan_started(trigger: ScanTrigger, sources: usize) -> Self {
        Self::ScanStarted {
            trigger,
            sources,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn source_started(source_id: SourceId, url: impl Into<String>) -> Self {
        Self::SourceStarted {
            source_id,
            url: url.into(),
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn source_finished(source_id: SourceId, outcome: ScanOutcome) -> Self {
        Self::SourceFinished {
            source_id,
            outcome,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn scan_finished(sources: usize, aborted: bool, duration: std::time::Duration) -> Self {
        Self::ScanFinished {
            sources,
            aborted,
            duration,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn interactive_finished() -> Self {
        Self::InteractiveFinished {
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn source_id(&self) -> Option<SourceId> {
        match self {
            Self::SourceStarted { source_id, .. }
            | Self::PageProcessed { source_id, .. }
            | Self::SourceFinished { source_id, .. } => Some(*source_id),
            _ => None,
        }
    }
}
