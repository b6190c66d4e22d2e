//! In-process catalog
//!
//! `CatalogData` holds the plain data and the synchronous mutations shared by
//! both store implementations. `InMemoryCatalog` puts it behind a lock.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

use super::model::{Job, JobKey, ScanSettings, Site, SiteId, Source, SourceId};
use super::store::{CatalogStore, SettingsStore};

/// Catalog contents with a key index over the job list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub(crate) sources: BTreeMap<SourceId, Source>,
    #[serde(default)]
    pub(crate) sites: BTreeMap<SiteId, Site>,
    #[serde(default)]
    pub(crate) jobs: Vec<Job>,
    #[serde(skip)]
    index: HashMap<JobKey, usize>,
}

impl CatalogData {
    /// Rebuild the key index after deserializing
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupt` if two stored jobs share a key.
    pub fn reindex(&mut self) -> Result<(), StoreError> {
        self.index.clear();
        for (pos, job) in self.jobs.iter().enumerate() {
            if self.index.insert(job.key(), pos).is_some() {
                return Err(StoreError::Corrupt(format!(
                    "duplicate job key {}",
                    job.key()
                )));
            }
        }
        Ok(())
    }

    pub fn insert_source(&mut self, source: Source) {
        self.sources.insert(source.id, source);
    }

    pub fn insert_site(&mut self, site: Site) {
        self.sites.insert(site.id, site);
    }

    #[must_use]
    pub fn job(&self, key: &JobKey) -> Option<&Job> {
        self.index.get(key).map(|&pos| &self.jobs[pos])
    }

    #[must_use]
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    #[must_use]
    pub fn lookup(&self, keys: &[JobKey]) -> Vec<Job> {
        let mut found = Vec::new();
        for key in keys {
            if let Some(job) = self.job(key) {
                // keys may repeat within a batch
                if !found.iter().any(|j: &Job| j.id == job.id) {
                    found.push(job.clone());
                }
            }
        }
        found
    }

    /// # Errors
    ///
    /// `StoreError::Conflict` when a job with the same key already exists.
    pub fn create(&mut self, job: Job) -> Result<Job, StoreError> {
        let key = job.key();
        if self.index.contains_key(&key) {
            return Err(StoreError::Conflict(key));
        }
        self.index.insert(key, self.jobs.len());
        self.jobs.push(job.clone());
        Ok(job)
    }

    /// # Errors
    ///
    /// `StoreError::NotFound` when no job with that key exists.
    pub fn update(&mut self, job: Job) -> Result<Job, StoreError> {
        let key = job.key();
        let pos = *self
            .index
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(format!("job {key}")))?;
        self.jobs[pos] = job.clone();
        Ok(job)
    }

    /// # Errors
    ///
    /// `StoreError::NotFound` when the source does not exist.
    pub fn set_last_scanned(
        &mut self,
        source_id: SourceId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let source = self
            .sources
            .get_mut(&source_id)
            .ok_or_else(|| StoreError::NotFound(format!("source {source_id}")))?;
        source.last_scanned_at = Some(at);
        Ok(())
    }

    #[must_use]
    pub fn sources(&self) -> Vec<Source> {
        self.sources.values().cloned().collect()
    }

    #[must_use]
    pub fn sites(&self) -> Vec<Site> {
        self.sites.values().cloned().collect()
    }
}

/// Catalog and settings store kept entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    data: RwLock<CatalogData>,
    settings: RwLock<Option<ScanSettings>>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_data(data: CatalogData) -> Self {
        Self {
            data: RwLock::new(data),
            settings: RwLock::new(None),
        }
    }

    pub fn insert_source(&self, source: Source) {
        self.data.write().insert_source(source);
    }

    pub fn insert_site(&self, site: Site) {
        self.data.write().insert_site(site);
    }

    /// Snapshot of every stored job
    #[must_use]
    pub fn jobs(&self) -> Vec<Job> {
        self.data.read().jobs().to_vec()
    }

    #[must_use]
    pub fn job(&self, key: &JobKey) -> Option<Job> {
        self.data.read().job(key).cloned()
    }

    #[must_use]
    pub fn source(&self, id: SourceId) -> Option<Source> {
        self.data.read().sources.get(&id).cloned()
    }

    /// Apply a user edit to a stored job (status, labels). Used by hosts and
    /// tests to simulate the UI side of the catalog.
    pub fn edit_job(&self, key: &JobKey, edit: impl FnOnce(&mut Job)) -> Option<Job> {
        let mut data = self.data.write();
        let mut job = data.job(key)?.clone();
        edit(&mut job);
        data.update(job).ok()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn lookup_jobs_by_keys(&self, keys: &[JobKey]) -> Result<Vec<Job>, StoreError> {
        Ok(self.data.read().lookup(keys))
    }

    async fn create_job(&self, job: Job) -> Result<Job, StoreError> {
        self.data.write().create(job)
    }

    async fn update_job(&self, job: Job) -> Result<Job, StoreError> {
        self.data.write().update(job)
    }

    async fn list_sources(&self) -> Result<Vec<Source>, StoreError> {
        Ok(self.data.read().sources())
    }

    async fn list_sites(&self) -> Result<Vec<Site>, StoreError> {
        Ok(self.data.read().sites())
    }

    async fn update_source_last_scanned(
        &self,
        source_id: SourceId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.data.write().set_last_scanned(source_id, at)
    }
}

#[async_trait]
impl SettingsStore for InMemoryCatalog {
    async fn load_scan_settings(&self) -> Result<Option<ScanSettings>, StoreError> {
        Ok(*self.settings.read())
    }

    async fn save_scan_settings(&self, settings: &ScanSettings) -> Result<(), StoreError> {
        *self.settings.write() = Some(*settings);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::JobStatus;
    use uuid::Uuid;

    fn job(site_id: SiteId, external_id: &str) -> Job {
        let now = Utc::now();
        Job {
            id: Uuid::new_v4(),
            link_id: 1,
            site_id,
            external_id: external_id.to_string(),
            external_url: format!("https://jobs.example.com/{external_id}"),
            title: "Rust Engineer".into(),
            company_name: None,
            company_logo: None,
            location: None,
            salary: None,
            job_type: None,
            status: JobStatus::New,
            labels: Vec::new(),
            listed_at: None,
            source_updated_at: None,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_create_rejects_duplicate_key() {
        let mut data = CatalogData::default();
        data.create(job(1, "a")).unwrap();
        let err = data.create(job(1, "a")).unwrap_err();
        assert_eq!(err, StoreError::Conflict(JobKey::new(1, "a")));
        // same id on another site is a different job
        data.create(job(2, "a")).unwrap();
        assert_eq!(data.jobs().len(), 2);
    }

    #[test]
    fn test_lookup_ignores_missing_and_repeated_keys() {
        let mut data = CatalogData::default();
        data.create(job(1, "a")).unwrap();
        let keys = [JobKey::new(1, "a"), JobKey::new(1, "a"), JobKey::new(1, "b")];
        assert_eq!(data.lookup(&keys).len(), 1);
    }

    #[test]
    fn test_reindex_detects_duplicates() {
        let mut data = CatalogData::default();
        data.jobs.push(job(1, "a"));
        data.jobs.push(job(1, "a"));
        assert!(matches!(data.reindex(), Err(StoreError::Corrupt(_))));
    }
}
