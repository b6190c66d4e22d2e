//! Scan run state: which sources are being scanned and how each one last ended

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use serde::Serialize;

use crate::catalog::SourceId;
use crate::events::ScanTrigger;

use super::outcome::ScanOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRecord {
    pub outcome: ScanOutcome,
    pub finished_at: DateTime<Utc>,
}

/// Summary of the most recent completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub trigger: ScanTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: usize,
    pub aborted: bool,
}

#[derive(Debug, Default)]
pub struct RunState {
    in_progress: DashSet<SourceId>,
    outcomes: DashMap<SourceId, SourceRecord>,
    last_run: Mutex<Option<RunSummary>>,
}

impl RunState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a source as being scanned until the guard drops
    #[must_use]
    pub fn begin(&self, source_id: SourceId) -> InProgressGuard<'_> {
        self.in_progress.insert(source_id);
        InProgressGuard {
            state: self,
            source_id,
        }
    }

    pub fn record(&self, source_id: SourceId, outcome: ScanOutcome) {
        self.outcomes.insert(
            source_id,
            SourceRecord {
                outcome,
                finished_at: Utc::now(),
            },
        );
    }

    pub fn finish_run(&self, summary: RunSummary) {
        *self.last_run.lock() = Some(summary);
    }

    #[must_use]
    pub fn in_progress(&self) -> Vec<SourceId> {
        let mut ids: Vec<SourceId> = self.in_progress.iter().map(|id| *id).collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn last_outcomes(&self) -> BTreeMap<SourceId, SourceRecord> {
        self.outcomes
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    #[must_use]
    pub fn last_run(&self) -> Option<RunSummary> {
        self.last_run.lock().clone()
    }
}

pub struct InProgressGuard<'a> {
    state: &'a RunState,
    source_id: SourceId,
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.state.in_progress.remove(&self.source_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::SkipReason;

    #[test]
    fn test_guard_clears_in_progress() {
        let state = RunState::new();
        {
            let _a = state.begin(3);
            let _b = state.begin(1);
            assert_eq!(state.in_progress(), vec![1, 3]);
        }
        assert!(state.in_progress().is_empty());
    }

    #[test]
    fn test_record_replaces_previous_outcome() {
        let state = RunState::new();
        state.record(1, ScanOutcome::skipped(SkipReason::Disabled));
        state.record(1, ScanOutcome::skipped(SkipReason::SessionBusy));
        let outcomes = state.last_outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(
            outcomes[&1].outcome,
            ScanOutcome::skipped(SkipReason::SessionBusy)
        );
    }
}
