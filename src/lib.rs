pub mod api;
pub mod browser_session;
pub mod browser_setup;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod extraction;
pub mod merge;
pub mod scan;
pub mod scheduler;
pub mod utils;

pub use api::{ApiResponse, AppState, ScannerApi, SessionView};
pub use browser_session::{BrowserSession, ChromiumDriver, Holder, PageDriver, ScanLease, SessionState};
pub use browser_setup::{download_managed_browser, find_browser_executable, launch_browser};
pub use catalog::{
    CatalogStore, InMemoryCatalog, Job, JobKey, JobStatus, JsonFileStore, ScanSettings,
    SettingsStore, Site, SiteId, Source, SourceId,
};
pub use config::{ScannerConfig, ScannerConfigBuilder};
pub use error::{ConfigError, NavigationError, ScanError, SessionError, StoreError};
pub use events::{ScanEvent, ScanEventBus, ScanTrigger};
pub use extraction::{
    AdapterKind, AdapterRegistry, CandidatePosting, ExtractionAdapter, JobDetail, PageContent,
    Postings, SelectorAdapter, SiteSelectors,
};
pub use merge::{LinkContext, MergeEngine, MergeResult};
pub use scan::{JobScanOrchestrator, MergeTotals, ScanOutcome, SkipReason, SourceRecord};
pub use scheduler::ScanScheduler;
