//! Dedup/merge engine
//!
//! Turns candidate postings into catalog writes exactly once per
//! `(site_id, external_id)`. All merges go through one write lock, so two
//! scans observing the same new posting cannot both create it.

mod diff;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::catalog::{CatalogStore, Job, JobKey, SiteId, SourceId};
use crate::error::StoreError;
use crate::extraction::{CandidatePosting, JobDetail};

/// Which link and site a batch of candidates came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkContext {
    pub link_id: SourceId,
    pub site_id: SiteId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedCandidate {
    pub key: JobKey,
    pub error: StoreError,
}

/// Per-batch tally. Every candidate lands in exactly one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeResult {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Repeats of a posting already earlier in the same batch
    pub duplicates: usize,
    pub failed: Vec<FailedCandidate>,
}

impl MergeResult {
    #[must_use]
    pub fn total(&self) -> usize {
        self.created + self.updated + self.unchanged + self.duplicates + self.failed.len()
    }

    /// The first failure caused by the store being unreachable
    #[must_use]
    pub fn store_unavailable(&self) -> Option<&StoreError> {
        self.failed
            .iter()
            .map(|f| &f.error)
            .find(|e| e.is_unavailable())
    }
}

pub struct MergeEngine {
    store: Arc<dyn CatalogStore>,
    write_lock: Mutex<()>,
}

impl MergeEngine {
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Merge one page worth of candidates
    ///
    /// Unseen keys are created with status `new`; seen keys are updated only
    /// when a mutable field differs. A failed write is recorded per
    /// candidate and leaves that job as it was. Once the store reports itself
    /// unavailable the rest of the batch is marked failed without writes.
    ///
    /// # Errors
    ///
    /// The bulk lookup failing; nothing has been written in that case.
    pub async fn merge(
        &self,
        candidates: Vec<CandidatePosting>,
        ctx: &LinkContext,
    ) -> Result<MergeResult, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut result = MergeResult::default();

        // the same posting can appear twice on a page (promoted + organic)
        let mut position: HashMap<JobKey, usize> = HashMap::new();
        let mut unique: Vec<(JobKey, CandidatePosting)> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let key = JobKey::new(ctx.site_id, candidate.external_id.clone());
            match position.get(&key) {
                Some(&at) => {
                    diff::absorb_duplicate(&mut unique[at].1, &candidate);
                    result.duplicates += 1;
                }
                None => {
                    position.insert(key.clone(), unique.len());
                    unique.push((key, candidate));
                }
            }
        }
        if unique.is_empty() {
            return Ok(result);
        }

        let keys: Vec<JobKey> = unique.iter().map(|(k, _)| k.clone()).collect();
        let mut existing: HashMap<JobKey, Job> = self
            .store
            .lookup_jobs_by_keys(&keys)
            .await?
            .into_iter()
            .map(|job| (job.key(), job))
            .collect();

        let mut unavailable: Option<StoreError> = None;
        for (key, candidate) in unique {
            if let Some(err) = &unavailable {
                result.failed.push(FailedCandidate {
                    key,
                    error: err.clone(),
                });
                continue;
            }

            let outcome = match existing.remove(&key) {
                Some(job) => self.update_existing(&job, &candidate).await,
                None => self.create_new(&key, &candidate, ctx).await,
            };

            match outcome {
                Ok(Written::Created) => result.created += 1,
                Ok(Written::Updated) => result.updated += 1,
                Ok(Written::Unchanged) => result.unchanged += 1,
                Err(error) => {
                    warn!("Failed to merge job {key}: {error}");
                    if error.is_unavailable() {
                        unavailable = Some(error.clone());
                    }
                    result.failed.push(FailedCandidate { key, error });
                }
            }
        }

        debug!(
            link_id = ctx.link_id,
            created = result.created,
            updated = result.updated,
            unchanged = result.unchanged,
            duplicates = result.duplicates,
            failed = result.failed.len(),
            "Merged batch"
        );
        Ok(result)
    }

    /// Apply a detail page to a stored job. Never creates a job.
    ///
    /// Returns the stored job, updated if the detail changed anything.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when the job is not in the catalog, or the
    /// store failure.
    pub async fn refresh(&self, job: &Job, detail: &JobDetail) -> Result<Job, StoreError> {
        let _guard = self.write_lock.lock().await;
        let key = job.key();
        let stored = self
            .store
            .lookup_jobs_by_keys(std::slice::from_ref(&key))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("job {key}")))?;

        match diff::apply_detail(&stored, detail, Utc::now()) {
            Some(next) => self.store.update_job(next).await,
            None => Ok(stored),
        }
    }

    async fn update_existing(
        &self,
        job: &Job,
        candidate: &CandidatePosting,
    ) -> Result<Written, StoreError> {
        match diff::apply_candidate(job, candidate, Utc::now()) {
            Some(next) => {
                self.store.update_job(next).await?;
                Ok(Written::Updated)
            }
            None => Ok(Written::Unchanged),
        }
    }

    async fn create_new(
        &self,
        key: &JobKey,
        candidate: &CandidatePosting,
        ctx: &LinkContext,
    ) -> Result<Written, StoreError> {
        let job = diff::new_job(candidate, ctx, Utc::now());
        match self.store.create_job(job).await {
            Ok(_) => Ok(Written::Created),
            Err(StoreError::Conflict(_)) => {
                // created by someone outside this engine since the lookup
                debug!("Job {key} appeared concurrently, merging as update");
                let current = self
                    .store
                    .lookup_jobs_by_keys(std::slice::from_ref(key))
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| StoreError::NotFound(format!("job {key}")))?;
                self.update_existing(&current, candidate).await
            }
            Err(e) => Err(e),
        }
    }
}

enum Written {
    Created,
    Updated,
    Unchanged,
}
