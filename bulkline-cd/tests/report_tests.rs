//! Report persistence tests
//!
//! Report generation is best-effort: a failing artifact store must not
//! disturb the dispatch summary, and a healthy one must leave a report
//! record behind.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

use bulkline_cd::db::init::init_schema;
use bulkline_cd::db::reports;
use bulkline_cd::dispatch::outcome::{DispatchOutcome, DispatchSummary, OutcomeStatus};
use bulkline_cd::error::{Error, Result};
use bulkline_cd::report;
use bulkline_cd::storage::{ArtifactStore, LocalArtifactStore};

struct FailingStore;

#[async_trait]
impl ArtifactStore for FailingStore {
    async fn upload(&self, _path: &Path, _folder: &str, _resource_type: &str) -> Result<String> {
        Err(Error::Internal("storage offline".to_string()))
    }
}

async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();
    pool
}

fn outcomes() -> Vec<DispatchOutcome> {
    vec![
        DispatchOutcome::new("919876543210", OutcomeStatus::Sent).with_attempts(1),
        DispatchOutcome::new("919123456780", OutcomeStatus::Error)
            .with_attempts(3)
            .with_error("no outgoing-message marker"),
    ]
}

#[tokio::test]
async fn persist_failure_is_swallowed_and_leaves_no_record() {
    let pool = test_pool().await;
    let dir = tempfile::tempdir().unwrap();
    let campaign_id = Uuid::new_v4();
    let outcomes = outcomes();
    let summary = DispatchSummary::tally(&outcomes, false);

    let report_url = report::persist_report(
        &FailingStore,
        &pool,
        dir.path(),
        campaign_id,
        "owner-1",
        "hello",
        &summary,
        &outcomes,
    )
    .await;

    // The summary the caller holds is untouched; only the artifact ref
    // is missing
    assert!(report_url.is_none());
    assert_eq!(summary.total, 2);
    assert_eq!(summary.sent, 1);
    assert!(reports::get_report_for_campaign(&pool, campaign_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn persist_success_stores_artifact_and_record() {
    let pool = test_pool().await;
    let artifact_dir = tempfile::tempdir().unwrap();
    let store_dir = tempfile::tempdir().unwrap();
    let store = LocalArtifactStore::new(store_dir.path().to_path_buf());
    let campaign_id = Uuid::new_v4();
    let outcomes = outcomes();
    let summary = DispatchSummary::tally(&outcomes, false);

    let report_url = report::persist_report(
        &store,
        &pool,
        artifact_dir.path(),
        campaign_id,
        "owner-1",
        "hello",
        &summary,
        &outcomes,
    )
    .await
    .expect("report should persist");

    assert!(report_url.starts_with("file://"));
    let record = reports::get_report_for_campaign(&pool, campaign_id)
        .await
        .unwrap()
        .expect("report record exists");
    assert_eq!(record.artifact_ref, report_url);

    let stored = store_dir
        .path()
        .join("reports")
        .join(format!("report-{}.html", campaign_id));
    let html = std::fs::read_to_string(stored).unwrap();
    assert!(html.contains("919876543210"));
}
