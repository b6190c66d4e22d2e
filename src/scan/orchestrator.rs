use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::Utc;
use log::{debug, error, info, warn};
use parking_lot::RwLock;

use super::gate::ScanGate;
use super::navigation::{Fetched, fetch_page};
use super::outcome::{MergeTotals, ScanOutcome, SkipReason};
use super::run_state::{RunState, RunSummary, SourceRecord};
use crate::browser_session::{BrowserSession, ScanLease};
use crate::catalog::{CatalogStore, Job, SiteId, Source, SourceId};
use crate::config::ScannerConfig;
use crate::error::{ScanError, SessionError};
use crate::events::{ScanEvent, ScanEventBus, ScanTrigger};
use crate::extraction::{AdapterRegistry, ExtractionAdapter};
use crate::merge::{LinkContext, MergeEngine};

/// Top-level scan coordinator
///
/// Scans are serialized through a [`ScanGate`]; `is_scanning` is true exactly
/// while a permit is held, on every exit path. Sources are scanned one after
/// another and a failing source never stops the batch.
pub struct JobScanOrchestrator {
    config: ScannerConfig,
    store: Arc<dyn CatalogStore>,
    session: BrowserSession,
    merge: MergeEngine,
    gate: Arc<ScanGate>,
    run_state: RunState,
    events: Arc<ScanEventBus>,
    /// Adapters registered in code; they win over the site bindings
    overrides: RwLock<AdapterRegistry>,
    cancel: AtomicBool,
}

impl JobScanOrchestrator {
    #[must_use]
    pub fn new(config: ScannerConfig, store: Arc<dyn CatalogStore>, session: BrowserSession) -> Self {
        let events = Arc::new(ScanEventBus::new(config.event_capacity()));
        Self {
            merge: MergeEngine::new(Arc::clone(&store)),
            config,
            store,
            session,
            gate: ScanGate::new(),
            run_state: RunState::new(),
            events,
            overrides: RwLock::new(AdapterRegistry::new()),
            cancel: AtomicBool::new(false),
        }
    }

    /// Use `adapter` for every source of `site_id`
    pub fn register_adapter(&self, site_id: SiteId, adapter: Arc<dyn ExtractionAdapter>) {
        self.overrides.write().register(site_id, adapter);
    }

    #[must_use]
    pub fn session(&self) -> &BrowserSession {
        &self.session
    }

    #[must_use]
    pub fn events(&self) -> &Arc<ScanEventBus> {
        &self.events
    }

    #[must_use]
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.gate.is_active()
    }

    /// Ask the running scan to stop after its current page. Returns whether
    /// a scan was running.
    pub fn stop_scan(&self) -> bool {
        if !self.gate.is_active() {
            return false;
        }
        info!("Stop requested for the running scan");
        self.cancel.store(true, Ordering::SeqCst);
        true
    }

    /// Resolve once no scan is running or queued
    pub async fn wait_idle(&self) {
        self.gate.wait_idle().await;
    }

    #[must_use]
    pub fn last_outcomes(&self) -> BTreeMap<SourceId, SourceRecord> {
        self.run_state.last_outcomes()
    }

    #[must_use]
    pub fn in_progress(&self) -> Vec<SourceId> {
        self.run_state.in_progress()
    }

    #[must_use]
    pub fn last_run(&self) -> Option<RunSummary> {
        self.run_state.last_run()
    }

    /// Scan every source on demand
    ///
    /// # Errors
    ///
    /// `Superseded` when a newer request replaced this one while it waited,
    /// `StoreUnavailable` when sources or sites could not be listed.
    /// Per-source failures are outcomes, not errors.
    pub async fn scan_all(&self) -> Result<BTreeMap<SourceId, ScanOutcome>, ScanError> {
        self.run_all(ScanTrigger::OnDemand).await
    }

    /// Scan every source for a scheduler tick
    ///
    /// # Errors
    ///
    /// As [`JobScanOrchestrator::scan_all`].
    pub async fn scheduled_scan(&self) -> Result<BTreeMap<SourceId, ScanOutcome>, ScanError> {
        self.run_all(ScanTrigger::Scheduled).await
    }

    /// Scan a single source on demand
    pub async fn scan_link(&self, source_id: SourceId) -> ScanOutcome {
        let Ok(_permit) = self.gate.acquire().await else {
            info!("Scan of source {source_id} superseded by a newer request");
            return ScanOutcome::skipped(SkipReason::Superseded);
        };
        self.cancel.store(false, Ordering::SeqCst);
        let started_at = Utc::now();
        let clock = Instant::now();
        self.events
            .publish(ScanEvent::scan_started(ScanTrigger::OnDemand, 1));

        let prepared = async {
            let source = self
                .store
                .list_sources()
                .await?
                .into_iter()
                .find(|s| s.id == source_id)
                .ok_or(ScanError::SourceNotFound(source_id))?;
            let adapters = self.load_adapters().await?;
            Ok::<_, ScanError>((source, adapters))
        };
        let outcome = match prepared.await {
            Ok((source, adapters)) => self.scan_source(&source, &adapters).await,
            Err(e) => {
                warn!("Cannot scan source {source_id}: {e}");
                let outcome = ScanOutcome::error(e.to_string(), MergeTotals::default());
                self.run_state.record(source_id, outcome.clone());
                outcome
            }
        };
        let aborted = matches!(outcome, ScanOutcome::Aborted { .. });
        self.finish_run(ScanTrigger::OnDemand, started_at, clock, 1, aborted);
        outcome
    }

    /// Refresh jobs from their detail pages. Never creates jobs.
    ///
    /// Runs under the scan gate with one session lease for the whole batch.
    /// A job whose page is unreachable, blocked, missing or unrecognized
    /// comes back unchanged. So does every job when the request is
    /// superseded or the session stays busy, and every job not yet visited
    /// when the scan is stopped.
    pub async fn scan_jobs(&self, jobs: Vec<Job>) -> Vec<Job> {
        if jobs.is_empty() {
            return jobs;
        }
        let Ok(_permit) = self.gate.acquire().await else {
            info!("Detail scan of {} jobs superseded by a newer request", jobs.len());
            return jobs;
        };
        self.cancel.store(false, Ordering::SeqCst);

        let adapters = match self.load_adapters().await {
            Ok(adapters) => adapters,
            Err(e) => {
                warn!("Skipping detail scan of {} jobs: {e}", jobs.len());
                return jobs;
            }
        };
        let lease = match self
            .session
            .acquire_for_scan(self.config.session_wait_timeout())
            .await
        {
            Ok(lease) => lease,
            Err(e) => {
                info!("Detail scan of {} jobs skipped: {e}", jobs.len());
                return jobs;
            }
        };

        let mut refreshed = Vec::with_capacity(jobs.len());
        let mut pending = jobs.into_iter();
        for job in pending.by_ref() {
            if self.is_cancelled() || lease.is_revoked() {
                info!("Detail scan stopped before job {}", job.id);
                refreshed.push(job);
                break;
            }
            let updated = match adapters.get(job.site_id) {
                Some(adapter) => self.scan_job(&lease, &job, adapter.as_ref()).await,
                None => {
                    debug!("No adapter for site {}; job {} left as is", job.site_id, job.id);
                    None
                }
            };
            refreshed.push(updated.unwrap_or(job));
        }
        refreshed.extend(pending);
        refreshed
    }

    /// Close the browser session and stop any running scan
    pub async fn shutdown(&self) {
        self.stop_scan();
        self.session.shutdown().await;
    }

    async fn scan_job(
        &self,
        lease: &ScanLease,
        job: &Job,
        adapter: &dyn ExtractionAdapter,
    ) -> Option<Job> {
        let page = match fetch_page(
            lease,
            adapter,
            &job.external_url,
            self.config.navigation_retry_backoff(),
        )
        .await
        {
            Ok(Fetched::Page(page)) => page,
            Ok(Fetched::Blocked(_)) => {
                warn!("Detail page of job {} is blocked", job.id);
                return None;
            }
            Err(e) => {
                info!("Detail page of job {} unreachable: {e}", job.id);
                return None;
            }
        };

        let detail = adapter.extract_detail(&page)?;
        match self.merge.refresh(job, &detail).await {
            Ok(updated) => Some(updated),
            Err(e) => {
                warn!("Failed to refresh job {}: {e}", job.id);
                None
            }
        }
    }

    async fn run_all(
        &self,
        trigger: ScanTrigger,
    ) -> Result<BTreeMap<SourceId, ScanOutcome>, ScanError> {
        let _permit = self.gate.acquire().await?;
        self.cancel.store(false, Ordering::SeqCst);
        let started_at = Utc::now();
        let clock = Instant::now();

        let sources = self.store.list_sources().await?;
        let adapters = self.load_adapters().await?;

        info!("Starting {trigger:?} scan of {} sources", sources.len());
        self.events
            .publish(ScanEvent::scan_started(trigger, sources.len()));

        let mut outcomes = BTreeMap::new();
        let mut aborted = false;
        for source in &sources {
            if aborted || self.is_cancelled() {
                aborted = true;
                let outcome = ScanOutcome::skipped(SkipReason::Cancelled);
                self.run_state.record(source.id, outcome.clone());
                outcomes.insert(source.id, outcome);
                continue;
            }
            let outcome = self.scan_source(source, &adapters).await;
            if matches!(outcome, ScanOutcome::Aborted { .. }) {
                aborted = true;
            }
            outcomes.insert(source.id, outcome);
        }

        self.finish_run(trigger, started_at, clock, sources.len(), aborted);
        Ok(outcomes)
    }

    fn finish_run(
        &self,
        trigger: ScanTrigger,
        started_at: chrono::DateTime<Utc>,
        clock: Instant,
        sources: usize,
        aborted: bool,
    ) {
        let duration = clock.elapsed();
        if aborted {
            warn!("Scan aborted after {duration:?}");
        } else {
            info!("Scan of {sources} sources finished in {duration:?}");
        }
        self.run_state.finish_run(RunSummary {
            trigger,
            started_at,
            finished_at: Utc::now(),
            sources,
            aborted,
        });
        self.events
            .publish(ScanEvent::scan_finished(sources, aborted, duration));
    }

    async fn load_adapters(&self) -> Result<AdapterRegistry, ScanError> {
        let sites = self.store.list_sites().await?;
        let mut registry = AdapterRegistry::from_sites(&sites);
        registry.extend_from(&self.overrides.read());
        Ok(registry)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Scan one source and record its outcome
    async fn scan_source(&self, source: &Source, adapters: &AdapterRegistry) -> ScanOutcome {
        if !source.enabled {
            debug!("Source {} is disabled", source.id);
            let outcome = ScanOutcome::skipped(SkipReason::Disabled);
            self.run_state.record(source.id, outcome.clone());
            return outcome;
        }

        let _in_progress = self.run_state.begin(source.id);
        self.events
            .publish(ScanEvent::source_started(source.id, source.url.clone()));
        info!("Scanning source {} ({})", source.id, source.url);

        let mut outcome = match adapters.get(source.site_id) {
            Some(adapter) => self.scan_pages(source, adapter.as_ref()).await,
            None => ScanOutcome::error(
                format!("no extraction adapter for site {}", source.site_id),
                MergeTotals::default(),
            ),
        };

        if outcome.updates_last_scanned()
            && let Err(e) = self
                .store
                .update_source_last_scanned(source.id, Utc::now())
                .await
        {
            error!("Failed to record scan time of source {}: {e}", source.id);
            outcome = ScanOutcome::error(
                ScanError::from(e).to_string(),
                outcome.totals(),
            );
        }

        match &outcome {
            ScanOutcome::Error { message, .. } => {
                warn!("Source {} failed: {message}", source.id);
            }
            other => {
                let totals = other.totals();
                info!(
                    "Source {} {}: {} pages, {} created, {} updated, {} unchanged",
                    source.id,
                    other.label(),
                    totals.pages,
                    totals.created,
                    totals.updated,
                    totals.unchanged
                );
            }
        }

        self.run_state.record(source.id, outcome.clone());
        self.events
            .publish(ScanEvent::source_finished(source.id, outcome.clone()));
        outcome
    }

    async fn scan_pages(&self, source: &Source, adapter: &dyn ExtractionAdapter) -> ScanOutcome {
        let lease = match self
            .session
            .acquire_for_scan(self.config.session_wait_timeout())
            .await
        {
            Ok(lease) => lease,
            Err(SessionError::Busy(holder)) => {
                warn!(
                    "Browser session still held by {holder}; skipping source {}",
                    source.id
                );
                return ScanOutcome::skipped(SkipReason::SessionBusy);
            }
            Err(e) => return ScanOutcome::error(e.to_string(), MergeTotals::default()),
        };
        self.paginate(source, adapter, &lease).await
    }

    async fn paginate(
        &self,
        source: &Source,
        adapter: &dyn ExtractionAdapter,
        lease: &ScanLease,
    ) -> ScanOutcome {
        let ctx = LinkContext {
            link_id: source.id,
            site_id: source.site_id,
        };
        let max_pages = self.config.max_pages_per_source();
        let backoff = self.config.navigation_retry_backoff();
        let mut totals = MergeTotals::default();
        let mut visited = HashSet::new();
        let mut next = Some(source.url.clone());

        while let Some(url) = next.take() {
            if self.is_cancelled() || lease.is_revoked() {
                return ScanOutcome::Aborted { totals };
            }
            if totals.pages >= max_pages {
                info!("Source {} reached the {max_pages} page limit", source.id);
                break;
            }
            if !visited.insert(url.clone()) {
                debug!("Pagination of source {} looped back to {url}", source.id);
                break;
            }

            let page = match fetch_page(lease, adapter, &url, backoff).await {
                Ok(Fetched::Page(page)) => page,
                Ok(Fetched::Blocked(page)) => {
                    let err = ScanError::SourceBlocked(source.id);
                    warn!("{err} at {}", page.url);
                    return ScanOutcome::Blocked { totals };
                }
                Err(ScanError::Aborted) => return ScanOutcome::Aborted { totals },
                Err(e) => return ScanOutcome::error(e.to_string(), totals),
            };

            // the parsed document is not Send; finish with it before awaiting
            let (candidates, anomaly, next_url) = {
                let mut postings = adapter.extract(&page);
                let candidates: Vec<_> = postings.by_ref().collect();
                if postings.skipped() > 0 {
                    debug!(
                        "Skipped {} incomplete postings on {}",
                        postings.skipped(),
                        page.url
                    );
                }
                let anomaly = postings.anomaly().map(str::to_string);
                (candidates, anomaly, adapter.next_page_url(&page))
            };
            if let Some(detail) = anomaly {
                let err = ScanError::ExtractionAnomaly {
                    url: page.url.clone(),
                    detail,
                };
                warn!("{err}");
            }

            totals.pages += 1;
            match self.merge.merge(candidates, &ctx).await {
                Ok(result) => {
                    totals.add(&result);
                    self.events.publish(ScanEvent::PageProcessed {
                        source_id: source.id,
                        page: totals.pages,
                        url: page.url.clone(),
                        created: result.created,
                        updated: result.updated,
                        unchanged: result.unchanged,
                        timestamp: Utc::now(),
                    });
                    if let Some(err) = result.store_unavailable() {
                        let err = ScanError::from(err.clone());
                        return ScanOutcome::error(err.to_string(), totals);
                    }
                }
                Err(e) => {
                    return ScanOutcome::error(ScanError::from(e).to_string(), totals);
                }
            }

            next = next_url;
        }

        if self.is_cancelled() || lease.is_revoked() {
            return ScanOutcome::Aborted { totals };
        }
        ScanOutcome::Success { totals }
    }
}

impl std::fmt::Debug for JobScanOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobScanOrchestrator")
            .field("scanning", &self.is_scanning())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
