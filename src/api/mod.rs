//! Presentation-layer API
//!
//! Every call returns an [`ApiResponse`]: `{"data": ...}` on success or
//! `{"error": "..."}` on failure. Failures are logged here before being
//! flattened to a message, so callers never see a raw error.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::browser_session::{Holder, SessionState};
use crate::catalog::{Job, ScanSettings, SourceId};
use crate::events::ScanEvent;
use crate::scan::{JobScanOrchestrator, ScanOutcome, SourceRecord};
use crate::scheduler::ScanScheduler;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiResponse<T> {
    Data(T),
    Error(String),
}

impl<T> ApiResponse<T> {
    fn from_result<E: Display>(call: &str, result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::Data(data),
            Err(e) => {
                error!("{call} failed: {e}");
                Self::Error(e.to_string())
            }
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The payload, if the call succeeded
    #[must_use]
    pub fn data(self) -> Option<T> {
        match self {
            Self::Data(data) => Some(data),
            Self::Error(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AppState {
    pub is_scanning: bool,
}

/// What the UI needs to draw the browser overlay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub state: SessionState,
    pub holder: Holder,
    pub can_go_back: bool,
    pub can_go_forward: bool,
}

#[derive(Clone)]
pub struct ScannerApi {
    orchestrator: Arc<JobScanOrchestrator>,
    scheduler: Arc<ScanScheduler>,
}

impl ScannerApi {
    #[must_use]
    pub fn new(orchestrator: Arc<JobScanOrchestrator>, scheduler: Arc<ScanScheduler>) -> Self {
        Self {
            orchestrator,
            scheduler,
        }
    }

    pub async fn scan_link(&self, source_id: SourceId) -> ApiResponse<ScanOutcome> {
        ApiResponse::Data(self.orchestrator.scan_link(source_id).await)
    }

    pub async fn scan_all(&self) -> ApiResponse<BTreeMap<SourceId, ScanOutcome>> {
        ApiResponse::from_result("scan_all", self.orchestrator.scan_all().await)
    }

    pub async fn scan_jobs(&self, jobs: Vec<Job>) -> ApiResponse<Vec<Job>> {
        ApiResponse::Data(self.orchestrator.scan_jobs(jobs).await)
    }

    /// Refresh one job from its detail page
    pub async fn scan_job_description(&self, job: Job) -> ApiResponse<Job> {
        let id = job.id;
        let result = self
            .orchestrator
            .scan_jobs(vec![job])
            .await
            .into_iter()
            .next()
            .ok_or_else(|| format!("job {id} was not returned by the scan"));
        ApiResponse::from_result("scan_job_description", result)
    }

    /// Refresh freshly created jobs in the background
    ///
    /// Returns immediately; the handle is only useful to wait for the
    /// refresh in tests or on shutdown.
    pub fn ingest_new_jobs(&self, jobs: Vec<Job>) -> JoinHandle<Vec<Job>> {
        let orchestrator = Arc::clone(&self.orchestrator);
        info!("Queued detail scan of {} new jobs", jobs.len());
        tokio::spawn(async move { orchestrator.scan_jobs(jobs).await })
    }

    #[must_use]
    pub fn is_scanning(&self) -> ApiResponse<bool> {
        ApiResponse::Data(self.scheduler.is_scanning())
    }

    #[must_use]
    pub fn stop_scan(&self) -> ApiResponse<bool> {
        ApiResponse::Data(self.orchestrator.stop_scan())
    }

    #[must_use]
    pub fn get_app_state(&self) -> ApiResponse<AppState> {
        ApiResponse::Data(AppState {
            is_scanning: self.scheduler.is_scanning(),
        })
    }

    #[must_use]
    pub fn get_settings(&self) -> ApiResponse<ScanSettings> {
        ApiResponse::Data(self.scheduler.get_settings())
    }

    pub async fn update_settings(&self, settings: ScanSettings) -> ApiResponse<ScanSettings> {
        ApiResponse::from_result(
            "update_settings",
            self.scheduler.update_settings(settings).await,
        )
    }

    #[must_use]
    pub fn last_outcomes(&self) -> ApiResponse<BTreeMap<SourceId, SourceRecord>> {
        ApiResponse::Data(self.orchestrator.last_outcomes())
    }

    #[must_use]
    pub fn in_progress(&self) -> ApiResponse<Vec<SourceId>> {
        ApiResponse::Data(self.orchestrator.in_progress())
    }

    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ScanEvent> {
        self.orchestrator.events().subscribe()
    }

    #[must_use]
    pub fn session_view(&self) -> ApiResponse<SessionView> {
        ApiResponse::Data(self.view())
    }

    pub async fn open_session(&self, url: &str) -> ApiResponse<SessionView> {
        let result = self.orchestrator.session().open(url).await.map(|_| self.view());
        ApiResponse::from_result("open_session", result)
    }

    pub async fn navigate_session(&self, url: &str) -> ApiResponse<SessionView> {
        let result = self
            .orchestrator
            .session()
            .navigate(url)
            .await
            .map(|_| self.view());
        ApiResponse::from_result("navigate_session", result)
    }

    pub async fn session_go_back(&self) -> ApiResponse<bool> {
        ApiResponse::from_result("session_go_back", self.orchestrator.session().go_back().await)
    }

    pub async fn session_go_forward(&self) -> ApiResponse<bool> {
        ApiResponse::from_result(
            "session_go_forward",
            self.orchestrator.session().go_forward().await,
        )
    }

    #[must_use]
    pub fn session_can_go_back(&self) -> ApiResponse<bool> {
        ApiResponse::Data(self.orchestrator.session().can_go_back())
    }

    #[must_use]
    pub fn session_can_go_forward(&self) -> ApiResponse<bool> {
        ApiResponse::Data(self.orchestrator.session().can_go_forward())
    }

    #[must_use]
    pub fn close_session(&self) -> ApiResponse<SessionView> {
        self.orchestrator.session().close();
        ApiResponse::Data(self.view())
    }

    /// Finish the interactive step and tell subscribers about it
    #[must_use]
    pub fn finish_session(&self) -> ApiResponse<bool> {
        let finished = self.orchestrator.session().finish();
        if finished {
            self.orchestrator
                .events()
                .publish(ScanEvent::interactive_finished());
        }
        ApiResponse::Data(finished)
    }

    fn view(&self) -> SessionView {
        let session = self.orchestrator.session();
        SessionView {
            state: session.state(),
            holder: session.holder(),
            can_go_back: session.can_go_back(),
            can_go_forward: session.can_go_forward(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;

    #[test]
    fn test_envelope_wire_format() {
        let ok: ApiResponse<u32> = ApiResponse::Data(3);
        assert_eq!(serde_json::to_value(&ok).unwrap(), serde_json::json!({"data": 3}));

        let err: ApiResponse<u32> =
            ApiResponse::from_result("test", Err(ScanError::ConfigInvalid("bad".into())));
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            serde_json::json!({"error": "invalid configuration: bad"})
        );
        assert!(err.is_error());
    }
}
