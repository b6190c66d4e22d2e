//! Shared fixtures for the jobprobe integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobprobe::catalog::{CatalogStore, InMemoryCatalog, Job, JobKey, Site, SiteId, Source, SourceId};
use jobprobe::{
    AdapterKind, BrowserSession, JobScanOrchestrator, NavigationError, PageContent, PageDriver,
    ScannerConfig, SiteSelectors, StoreError,
};
use parking_lot::Mutex;

pub const SITE: SiteId = 1;

/// One scripted response for a URL
#[derive(Debug, Clone)]
pub enum Step {
    Page(PageContent),
    Timeout,
    Network,
}

/// Page driver serving scripted pages
///
/// A URL with queued steps answers from the queue first, then from the
/// fixed page table; unknown URLs answer with a 404 page.
#[derive(Default)]
pub struct FakeDriver {
    pages: Mutex<HashMap<String, PageContent>>,
    steps: Mutex<HashMap<String, VecDeque<Step>>>,
    visits: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
    shut_down: AtomicBool,
}

impl FakeDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn page(&self, url: &str, html: impl Into<String>) {
        self.pages
            .lock()
            .insert(url.to_string(), PageContent::new(url, html));
    }

    pub fn status_page(&self, url: &str, status: u16, html: impl Into<String>) {
        self.pages
            .lock()
            .insert(url.to_string(), PageContent::new(url, html).with_status(status));
    }

    pub fn push_step(&self, url: &str, step: Step) {
        self.steps
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(step);
    }

    /// Every navigation takes this long
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().clone()
    }

    pub fn visit_count(&self, url: &str) -> usize {
        self.visits.lock().iter().filter(|v| *v == url).count()
    }

    pub fn total_visits(&self) -> usize {
        self.visits.lock().len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn answer(&self, url: &str) -> Result<PageContent, NavigationError> {
        let step = self.steps.lock().get_mut(url).and_then(VecDeque::pop_front);
        match step {
            Some(Step::Page(page)) => Ok(page),
            Some(Step::Timeout) => Err(NavigationError::Timeout {
                url: url.to_string(),
                secs: 30,
            }),
            Some(Step::Network) => Err(NavigationError::Network {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_RESET".into(),
            }),
            None => Ok(self.pages.lock().get(url).cloned().unwrap_or_else(|| {
                PageContent::new(url, "<html><head><title>Not Found</title></head></html>")
                    .with_status(404)
            })),
        }
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn navigate(&self, url: &str) -> Result<PageContent, NavigationError> {
        self.visits.lock().push(url.to_string());
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.answer(url)
    }

    async fn content(&self) -> Result<PageContent, NavigationError> {
        let last = self.visits.lock().last().cloned();
        match last {
            Some(url) => self.answer(&url),
            None => Ok(PageContent::new("about:blank", "")),
        }
    }

    async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }
}

/// Selectors matching the markup produced by [`results_page`]
pub fn board_selectors() -> SiteSelectors {
    SiteSelectors {
        results: Some("ul#results".into()),
        posting: "ul#results > li.job".into(),
        title: "a.title".into(),
        link: "a.title".into(),
        external_id_attr: Some("data-id".into()),
        company: Some("span.company".into()),
        location: Some("span.location".into()),
        salary: Some("span.salary".into()),
        listed_at: Some("time".into()),
        next_page: Some("a.next".into()),
        blocked: vec!["#challenge-form".into()],
        blocked_title_markers: vec!["just a moment".into()],
        detail_title: Some("h1.job-title".into()),
        detail_location: Some("span.job-location".into()),
        detail_description: Some("div.description".into()),
        ..SiteSelectors::default()
    }
}

pub fn board_site() -> Site {
    Site {
        id: SITE,
        name: "Test Board".into(),
        logo_url: None,
        adapter: AdapterKind::Custom {
            selectors: board_selectors(),
        },
    }
}

#[derive(Debug, Clone)]
pub struct Posting {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
}

pub fn posting(id: &str, title: &str) -> Posting {
    Posting {
        id: id.into(),
        title: title.into(),
        company: "Acme".into(),
        location: "Remote".into(),
    }
}

pub fn results_page(postings: &[Posting], next: Option<&str>) -> String {
    let items: String = postings
        .iter()
        .map(|p| {
            format!(
                r#"<li class="job" data-id="{id}">
                     <a class="title" href="/jobs/{id}">{title}</a>
                     <span class="company">{company}</span>
                     <span class="location">{location}</span>
                     <time datetime="2024-05-01">2 days ago</time>
                   </li>"#,
                id = p.id,
                title = p.title,
                company = p.company,
                location = p.location,
            )
        })
        .collect();
    let next = next
        .map(|href| format!(r#"<a class="next" href="{href}">Next</a>"#))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html><html><head><title>Jobs</title></head>
           <body><ul id="results">{items}</ul>{next}</body></html>"#
    )
}

pub fn blocked_page() -> String {
    r#"<html><head><title>Just a moment...</title></head>
       <body><form id="challenge-form"></form></body></html>"#
        .to_string()
}

pub fn detail_page(title: &str, location: &str, description: &str) -> String {
    format!(
        r#"<html><head><title>{title}</title></head><body>
             <h1 class="job-title">{title}</h1>
             <span class="job-location">{location}</span>
             <div class="description">{description}</div>
           </body></html>"#
    )
}

pub fn source(id: SourceId, url: &str) -> Source {
    Source {
        id,
        user_id: "user-1".into(),
        site_id: SITE,
        title: format!("Search {id}"),
        url: url.into(),
        enabled: true,
        last_scanned_at: None,
    }
}

/// Fast timings: no settle delay, no pacing, short waits
pub fn test_config() -> ScannerConfig {
    ScannerConfig::builder()
        .page_settle_ms(0)
        .min_page_interval_ms(0)
        .navigation_retry_backoff_ms(100)
        .session_wait_timeout_secs(2)
        .max_pages_per_source(5)
        .build()
        .unwrap()
}

pub struct Harness {
    pub catalog: Arc<InMemoryCatalog>,
    pub driver: Arc<FakeDriver>,
    pub orchestrator: Arc<JobScanOrchestrator>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ScannerConfig) -> Self {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.insert_site(board_site());
        Self::with_store(config, catalog.clone(), catalog)
    }

    pub fn with_store(
        config: ScannerConfig,
        catalog: Arc<InMemoryCatalog>,
        store: Arc<dyn CatalogStore>,
    ) -> Self {
        let driver = FakeDriver::new();
        let session = BrowserSession::new(driver.clone(), config.min_page_interval());
        let orchestrator = Arc::new(JobScanOrchestrator::new(config, store, session));
        Self {
            catalog,
            driver,
            orchestrator,
        }
    }

    pub fn add_source(&self, id: SourceId, url: &str) -> Source {
        let source = source(id, url);
        self.catalog.insert_source(source.clone());
        source
    }

    pub fn job(&self, external_id: &str) -> Option<Job> {
        self.catalog.job(&JobKey::new(SITE, external_id))
    }
}

/// Store wrapper whose writes can be switched to fail
pub struct FlakyStore {
    pub inner: Arc<InMemoryCatalog>,
    pub fail_writes: AtomicBool,
    pub fail_after_creates: Mutex<Option<usize>>,
    pub creates: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<InMemoryCatalog>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_writes: AtomicBool::new(false),
            fail_after_creates: Mutex::new(None),
            creates: AtomicUsize::new(0),
        })
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("database offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for FlakyStore {
    async fn lookup_jobs_by_keys(&self, keys: &[JobKey]) -> Result<Vec<Job>, StoreError> {
        self.inner.lookup_jobs_by_keys(keys).await
    }

    async fn create_job(&self, job: Job) -> Result<Job, StoreError> {
        self.check_write()?;
        let done = self.creates.fetch_add(1, Ordering::SeqCst);
        if self.fail_after_creates.lock().is_some_and(|limit| done >= limit) {
            return Err(StoreError::Unavailable("database offline".into()));
        }
        self.inner.create_job(job).await
    }

    async fn update_job(&self, job: Job) -> Result<Job, StoreError> {
        self.check_write()?;
        self.inner.update_job(job).await
    }

    async fn list_sources(&self) -> Result<Vec<Source>, StoreError> {
        self.inner.list_sources().await
    }

    async fn list_sites(&self) -> Result<Vec<Site>, StoreError> {
        self.inner.list_sites().await
    }

    async fn update_source_last_scanned(
        &self,
        source_id: SourceId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.update_source_last_scanned(source_id, at).await
    }
}

/// Initialize logging once for tests that want output with `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
