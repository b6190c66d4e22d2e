//! Merge engine properties: idempotence and key uniqueness

mod common;

use std::sync::Arc;

use jobprobe::catalog::{CatalogStore, InMemoryCatalog};
use jobprobe::{CandidatePosting, LinkContext, MergeEngine};
use proptest::prelude::*;

fn candidate(id: &str, title: &str, location: Option<&str>) -> CandidatePosting {
    CandidatePosting {
        external_id: id.into(),
        title: title.into(),
        company_name: Some("Acme".into()),
        company_logo: None,
        location: location.map(str::to_string),
        salary: None,
        job_type: None,
        external_url: format!("https://board.example/jobs/{id}"),
        listed_at: None,
        source_updated_at: None,
        description: None,
    }
}

fn ctx() -> LinkContext {
    LinkContext {
        link_id: 1,
        site_id: common::SITE,
    }
}

fn arb_candidates() -> impl Strategy<Value = Vec<CandidatePosting>> {
    prop::collection::vec(
        (
            "[a-f]",
            "[A-Z][a-z]{1,8}",
            prop::option::of("(Remote|Berlin|Lisbon)"),
        ),
        0..12,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(id, title, location)| candidate(&id, &title, location.as_deref()))
            .collect()
    })
}

proptest! {
    #[test]
    fn merge_twice_changes_nothing_the_second_time(batch in arb_candidates()) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let catalog = Arc::new(InMemoryCatalog::new());
            let engine = MergeEngine::new(catalog.clone());

            let first = engine.merge(batch.clone(), &ctx()).await.unwrap();
            prop_assert_eq!(first.total(), batch.len());
            let snapshot = catalog.jobs();

            let second = engine.merge(batch.clone(), &ctx()).await.unwrap();
            prop_assert_eq!(second.created, 0);
            prop_assert_eq!(second.updated, 0);
            prop_assert_eq!(second.duplicates, first.duplicates);
            prop_assert_eq!(second.unchanged + second.duplicates, batch.len());
            prop_assert_eq!(catalog.jobs(), snapshot);
            Ok(())
        })?;
    }
}

#[tokio::test]
async fn test_duplicates_within_a_batch_create_one_job() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let engine = MergeEngine::new(catalog.clone());
    let batch = vec![
        candidate("a", "Rust Engineer", None),
        candidate("a", "Rust Engineer", None),
    ];

    let result = engine.merge(batch, &ctx()).await.unwrap();
    assert_eq!(result.created, 1);
    assert_eq!(result.duplicates, 1);
    assert_eq!(result.unchanged, 0);
    assert_eq!(catalog.jobs().len(), 1);
}

#[tokio::test]
async fn test_later_duplicate_fields_are_kept() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let engine = MergeEngine::new(catalog.clone());
    let mut organic = candidate("a", "Rust Engineer", Some("Berlin"));
    organic.salary = Some("EUR 90k".into());
    let batch = vec![candidate("a", "Rust Engineer", None), organic];

    let result = engine.merge(batch, &ctx()).await.unwrap();
    assert_eq!(result.created, 1);
    assert_eq!(result.duplicates, 1);
    assert_eq!(result.total(), 2);

    let job = catalog.jobs().into_iter().next().unwrap();
    assert_eq!(job.location.as_deref(), Some("Berlin"));
    assert_eq!(job.salary.as_deref(), Some("EUR 90k"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interleaved_merges_keep_keys_unique() {
    let catalog = Arc::new(InMemoryCatalog::new());
    // separate engines do not share a write lock; the store decides
    let engines: Vec<Arc<MergeEngine>> = (0..4)
        .map(|_| Arc::new(MergeEngine::new(catalog.clone() as Arc<dyn CatalogStore>)))
        .collect();

    let mut tasks = Vec::new();
    for (n, engine) in engines.iter().enumerate() {
        let engine = Arc::clone(engine);
        tasks.push(tokio::spawn(async move {
            let batch: Vec<_> = ["a", "b", "c", "d", "e"]
                .iter()
                .map(|id| candidate(id, &format!("Engineer {n}"), None))
                .collect();
            engine.merge(batch, &ctx()).await.unwrap()
        }));
    }

    let mut created = 0;
    for task in tasks {
        let result = task.await.unwrap();
        assert!(result.failed.is_empty());
        created += result.created;
    }
    assert_eq!(created, 5);

    let jobs = catalog.jobs();
    assert_eq!(jobs.len(), 5);
    let mut keys: Vec<_> = jobs.iter().map(|j| j.key()).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 5);
}

#[tokio::test]
async fn test_refresh_updates_but_never_creates() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let engine = MergeEngine::new(catalog.clone());
    engine
        .merge(vec![candidate("a", "Rust Engineer", None)], &ctx())
        .await
        .unwrap();
    let job = catalog.jobs().remove(0);

    let detail = jobprobe::JobDetail {
        description: Some("Own the crawler.".into()),
        ..Default::default()
    };
    let refreshed = engine.refresh(&job, &detail).await.unwrap();
    assert_eq!(refreshed.description.as_deref(), Some("Own the crawler."));
    assert_eq!(refreshed.status, job.status);

    let mut ghost = job.clone();
    ghost.external_id = "ghost".into();
    assert!(engine.refresh(&ghost, &detail).await.is_err());
    assert_eq!(catalog.jobs().len(), 1);
}
