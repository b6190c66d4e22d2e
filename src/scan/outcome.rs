//! Per-source scan outcomes

use serde::Serialize;

use crate::merge::MergeResult;

/// Running tally for one source across its result pages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeTotals {
    pub pages: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub duplicates: usize,
    pub failed: usize,
}

impl MergeTotals {
    pub fn add(&mut self, result: &MergeResult) {
        self.created += result.created;
        self.updated += result.updated;
        self.unchanged += result.unchanged;
        self.duplicates += result.duplicates;
        self.failed += result.failed.len();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Disabled,
    /// The browser session stayed held interactively past the wait bound
    SessionBusy,
    /// A newer request replaced this one in the scan queue
    Superseded,
    /// The run was stopped before this source was reached
    Cancelled,
}

/// How scanning one source ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    Success { totals: MergeTotals },
    /// An anti-bot page replaced the results; pages before it were merged
    Blocked { totals: MergeTotals },
    Skipped { reason: SkipReason },
    Error { message: String, totals: MergeTotals },
    Aborted { totals: MergeTotals },
}

impl ScanOutcome {
    #[must_use]
    pub fn skipped(reason: SkipReason) -> Self {
        Self::Skipped { reason }
    }

    #[must_use]
    pub fn error(message: impl Into<String>, totals: MergeTotals) -> Self {
        Self::Error {
            message: message.into(),
            totals,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Only outcomes that reached the board count as a visit
    #[must_use]
    pub fn updates_last_scanned(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Blocked { .. })
    }

    #[must_use]
    pub fn totals(&self) -> MergeTotals {
        match self {
            Self::Success { totals }
            | Self::Blocked { totals }
            | Self::Error { totals, .. }
            | Self::Aborted { totals } => *totals,
            Self::Skipped { .. } => MergeTotals::default(),
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Blocked { .. } => "blocked",
            Self::Skipped { .. } => "skipped",
            Self::Error { .. } => "error",
            Self::Aborted { .. } => "aborted",
        }
    }
}
