//! Durable catalog backed by JSON files
//!
//! The catalog lives in `catalog.json`, scan settings in `settings.json`,
//! both inside the configured data directory. Every mutation is applied to a
//! copy, written to a temp file and renamed into place before the in-memory
//! state is replaced, so a failed write leaves both disk and memory at the
//! prior state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::error::StoreError;

use super::memory::CatalogData;
use super::model::{Job, JobKey, ScanSettings, Site, Source, SourceId};
use super::store::{CatalogStore, SettingsStore};

const CATALOG_FILE: &str = "catalog.json";
const SETTINGS_FILE: &str = "settings.json";

/// Serialization of a large catalog runs on the blocking pool
const BLOCKING_SERIALIZATION_TIMEOUT: Duration = Duration::from_secs(10);

pub struct JsonFileStore {
    dir: PathBuf,
    data: Mutex<CatalogData>,
    settings: Mutex<Option<ScanSettings>>,
}

impl JsonFileStore {
    /// Open (or create) a store in `dir`
    ///
    /// # Errors
    ///
    /// `StoreError::Unavailable` when the directory cannot be created or a
    /// file cannot be read, `StoreError::Corrupt` when a file does not parse.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        let mut data: CatalogData = read_json(&dir.join(CATALOG_FILE))
            .await?
            .unwrap_or_default();
        data.reindex()?;

        let settings: Option<ScanSettings> = read_json(&dir.join(SETTINGS_FILE)).await?;

        log::debug!(
            "Opened catalog at {} ({} sources, {} jobs)",
            dir.display(),
            data.sources.len(),
            data.jobs().len()
        );

        Ok(Self {
            dir,
            data: Mutex::new(data),
            settings: Mutex::new(settings),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Register a source (links are created by the host UI)
    ///
    /// # Errors
    ///
    /// `StoreError::Unavailable` if the catalog cannot be written.
    pub async fn put_source(&self, source: Source) -> Result<(), StoreError> {
        self.mutate(|data| {
            data.insert_source(source);
            Ok(())
        })
        .await
    }

    /// # Errors
    ///
    /// `StoreError::Unavailable` if the catalog cannot be written.
    pub async fn put_site(&self, site: Site) -> Result<(), StoreError> {
        self.mutate(|data| {
            data.insert_site(site);
            Ok(())
        })
        .await
    }

    pub async fn jobs(&self) -> Vec<Job> {
        self.data.lock().await.jobs().to_vec()
    }

    async fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut CatalogData) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.data.lock().await;
        let mut next = guard.clone();
        let value = apply(&mut next)?;

        let snapshot = next.clone();
        let json = serialize_blocking(move || serde_json::to_vec_pretty(&snapshot)).await?;
        write_atomic(&self.dir.join(CATALOG_FILE), &json).await?;

        *guard = next;
        Ok(value)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn serialize_blocking<F>(f: F) -> Result<Vec<u8>, StoreError>
where
    F: FnOnce() -> serde_json::Result<Vec<u8>> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(f);
    match timeout(BLOCKING_SERIALIZATION_TIMEOUT, task).await {
        Ok(Ok(result)) => Ok(result?),
        Ok(Err(e)) => Err(StoreError::Unavailable(format!(
            "serialization task panicked: {e}"
        ))),
        Err(_) => {
            log::warn!(
                "Catalog serialization timeout (timeout: {:?})",
                BLOCKING_SERIALIZATION_TIMEOUT
            );
            Err(StoreError::Unavailable(format!(
                "serialization timed out after {BLOCKING_SERIALIZATION_TIMEOUT:?}"
            )))
        }
    }
}

/// Write to `<path>.tmp` then rename over `path`
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl CatalogStore for JsonFileStore {
    async fn lookup_jobs_by_keys(&self, keys: &[JobKey]) -> Result<Vec<Job>, StoreError> {
        Ok(self.data.lock().await.lookup(keys))
    }

    async fn create_job(&self, job: Job) -> Result<Job, StoreError> {
        self.mutate(|data| data.create(job)).await
    }

    async fn update_job(&self, job: Job) -> Result<Job, StoreError> {
        self.mutate(|data| data.update(job)).await
    }

    async fn list_sources(&self) -> Result<Vec<Source>, StoreError> {
        Ok(self.data.lock().await.sources())
    }

    async fn list_sites(&self) -> Result<Vec<Site>, StoreError> {
        Ok(self.data.lock().await.sites())
    }

    async fn update_source_last_scanned(
        &self,
        source_id: SourceId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.mutate(|data| data.set_last_scanned(source_id, at))
            .await
    }
}

#[async_trait]
impl SettingsStore for JsonFileStore {
    async fn load_scan_settings(&self) -> Result<Option<ScanSettings>, StoreError> {
        Ok(*self.settings.lock().await)
    }

    async fn save_scan_settings(&self, settings: &ScanSettings) -> Result<(), StoreError> {
        let mut guard = self.settings.lock().await;
        let json = serde_json::to_vec_pretty(settings)?;
        write_atomic(&self.dir.join(SETTINGS_FILE), &json).await?;
        *guard = Some(*settings);
        Ok(())
    }
}
