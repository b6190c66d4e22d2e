//! Collaborator contracts for persistence
//!
//! The scanner never owns storage. It talks to the catalog and the settings
//! blob through these traits so the host application can plug in whatever
//! database it uses.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;

use super::model::{Job, JobKey, ScanSettings, Site, Source, SourceId};

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Fetch every stored job whose key is in `keys`. Missing keys are simply
    /// absent from the result.
    async fn lookup_jobs_by_keys(&self, keys: &[JobKey]) -> Result<Vec<Job>, StoreError>;

    /// Insert a new job. Fails with `StoreError::Conflict` when the key exists.
    async fn create_job(&self, job: Job) -> Result<Job, StoreError>;

    /// Replace the stored job with the same key.
    async fn update_job(&self, job: Job) -> Result<Job, StoreError>;

    async fn list_sources(&self) -> Result<Vec<Source>, StoreError>;

    async fn list_sites(&self) -> Result<Vec<Site>, StoreError>;

    async fn update_source_last_scanned(
        &self,
        source_id: SourceId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// `Ok(None)` when settings were never saved
    async fn load_scan_settings(&self) -> Result<Option<ScanSettings>, StoreError>;

    async fn save_scan_settings(&self, settings: &ScanSettings) -> Result<(), StoreError>;
}
