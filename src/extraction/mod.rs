//! Site-agnostic extraction of job postings from rendered pages
//!
//! An adapter is a pure function of page content: it never navigates and
//! never touches the catalog. The orchestrator checks `is_blocked` first,
//! then drains `extract`, then asks for `next_page_url`.

pub mod selector;
pub mod sites;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::NavigationError;

pub use selector::{Postings, SelectorAdapter, SiteSelectors};
pub use sites::{AdapterKind, AdapterRegistry};

/// A rendered page as handed over by the browser session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    /// Final URL after redirects
    pub url: String,
    pub html: String,
    /// Main document HTTP status, when the browser reported one
    pub status: Option<u16>,
}

impl PageContent {
    #[must_use]
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            status: Some(200),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// The navigation error this page represents, if its status is an error
    #[must_use]
    pub fn http_error(&self) -> Option<NavigationError> {
        match self.status {
            Some(status) if status >= 400 => Some(NavigationError::Http {
                url: self.url.clone(),
                status,
            }),
            _ => None,
        }
    }
}

/// A posting as seen on a results page, before dedup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePosting {
    /// Site-scoped identifier, the dedup key together with the site id
    pub external_id: String,
    pub title: String,
    pub company_name: Option<String>,
    pub company_logo: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub job_type: Option<String>,
    pub external_url: String,
    pub listed_at: Option<DateTime<Utc>>,
    pub source_updated_at: Option<DateTime<Utc>>,
    /// Results pages rarely carry the description; detail scans fill it in
    pub description: Option<String>,
}

/// Fields read from a single job's detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDetail {
    pub title: Option<String>,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub job_type: Option<String>,
    pub description: Option<String>,
}

impl JobDetail {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Per-site extraction capability
pub trait ExtractionAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the page is an anti-bot interstitial instead of results
    fn is_blocked(&self, page: &PageContent) -> bool;

    /// Lazily yield the postings on a results page. Unexpected structure
    /// produces an empty sequence carrying an anomaly description.
    fn extract(&self, page: &PageContent) -> Postings;

    /// Absolute URL of the next results page, if any
    fn next_page_url(&self, page: &PageContent) -> Option<String>;

    /// Read a job's detail page. `None` when nothing recognizable was found.
    fn extract_detail(&self, page: &PageContent) -> Option<JobDetail>;
}
