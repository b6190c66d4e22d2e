//! Durable JSON catalog

mod common;

use std::sync::Arc;

use jobprobe::catalog::{CatalogStore, JobKey, ScanSettings, SettingsStore};
use jobprobe::{CandidatePosting, JsonFileStore, LinkContext, MergeEngine, StoreError};
use tempfile::TempDir;

fn candidate(id: &str) -> CandidatePosting {
    CandidatePosting {
        external_id: id.into(),
        title: format!("Job {id}"),
        company_name: Some("Acme".into()),
        company_logo: None,
        location: None,
        salary: None,
        job_type: None,
        external_url: format!("https://board.example/jobs/{id}"),
        listed_at: None,
        source_updated_at: None,
        description: None,
    }
}

#[tokio::test]
async fn test_catalog_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = Arc::new(JsonFileStore::open(dir.path()).await.unwrap());
        store.put_site(common::board_site()).await.unwrap();
        store
            .put_source(common::source(1, "https://board.example/search"))
            .await
            .unwrap();
        let engine = MergeEngine::new(store.clone());
        let ctx = LinkContext {
            link_id: 1,
            site_id: common::SITE,
        };
        let result = engine
            .merge(vec![candidate("a"), candidate("b")], &ctx)
            .await
            .unwrap();
        assert_eq!(result.created, 2);
        store
            .update_source_last_scanned(1, chrono::Utc::now())
            .await
            .unwrap();
    }

    let reopened = JsonFileStore::open(dir.path()).await.unwrap();
    assert_eq!(reopened.jobs().await.len(), 2);
    let found = reopened
        .lookup_jobs_by_keys(&[JobKey::new(common::SITE, "b")])
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "Job b");

    let sources = reopened.list_sources().await.unwrap();
    assert_eq!(sources.len(), 1);
    assert!(sources[0].last_scanned_at.is_some());
    assert_eq!(reopened.list_sites().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_enforces_unique_key() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::open(dir.path()).await.unwrap());
    let engine = MergeEngine::new(store.clone());
    let ctx = LinkContext {
        link_id: 1,
        site_id: common::SITE,
    };
    engine.merge(vec![candidate("a")], &ctx).await.unwrap();
    let job = store.jobs().await.remove(0);

    let mut copy = job.clone();
    copy.id = uuid::Uuid::new_v4();
    let err = store.create_job(copy).await.unwrap_err();
    assert_eq!(err, StoreError::Conflict(job.key()));
    assert_eq!(store.jobs().await.len(), 1);
}

#[tokio::test]
async fn test_settings_persist() {
    let dir = TempDir::new().unwrap();
    let settings = ScanSettings {
        enabled: false,
        interval_secs: 900,
    };
    {
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        assert_eq!(store.load_scan_settings().await.unwrap(), None);
        store.save_scan_settings(&settings).await.unwrap();
    }
    let reopened = JsonFileStore::open(dir.path()).await.unwrap();
    assert_eq!(reopened.load_scan_settings().await.unwrap(), Some(settings));
}

#[tokio::test]
async fn test_corrupt_catalog_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("catalog.json"), b"{ not json").unwrap();
    let err = JsonFileStore::open(dir.path()).await.err().unwrap();
    assert!(matches!(err, StoreError::Corrupt(_)), "{err:?}");
}

#[tokio::test]
async fn test_update_of_missing_job_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::open(dir.path()).await.unwrap());
    let engine = MergeEngine::new(store.clone());
    let ctx = LinkContext {
        link_id: 1,
        site_id: common::SITE,
    };
    engine.merge(vec![candidate("a")], &ctx).await.unwrap();
    let mut ghost = store.jobs().await.remove(0);
    ghost.external_id = "ghost".into();

    let err = store.update_job(ghost).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}
