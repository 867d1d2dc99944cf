//! Tests for `teardown_service`.

#![allow(clippy::expect_used)]

use threetier_cli::application::services::deploy_service::deploy;
use threetier_cli::application::services::teardown_service::{destroy, recorded};
use threetier_cli::domain::config::StackConfig;
use threetier_cli::domain::error::DeploymentError;

use crate::mocks::{CountingEngine, MemoryStateStore, RecordingReporter};

async fn deployed(cfg: &StackConfig) -> (CountingEngine, MemoryStateStore) {
    let engine = CountingEngine::new();
    let store = MemoryStateStore::default();
    deploy(&engine, &store, cfg, &RecordingReporter::default())
        .await
        .expect("deploy");
    (engine, store)
}

#[tokio::test]
async fn nothing_recorded_is_not_deployed() {
    let store = MemoryStateStore::default();
    let err = recorded(&store).await.expect_err("empty store");
    assert!(matches!(
        err.downcast_ref::<DeploymentError>(),
        Some(DeploymentError::NotDeployed)
    ));
    let err = destroy(&CountingEngine::new(), &store, &RecordingReporter::default())
        .await
        .expect_err("empty store");
    assert!(err.downcast_ref::<DeploymentError>().is_some());
}

#[tokio::test]
async fn unprotected_database_is_removed() {
    let (engine, store) = deployed(&StackConfig::default()).await;
    let resources = store.current().expect("record").resources.len();

    let outcome = destroy(&engine, &store, &RecordingReporter::default())
        .await
        .expect("destroy");
    assert!(outcome.deleted.contains(&"Database".to_string()));
    assert_eq!(outcome.deleted.len(), resources);
    assert_eq!(outcome.snapshots, vec!["Database".to_string()]);
    assert!(store.current().is_none());
}

#[tokio::test]
async fn teardown_runs_in_reverse_order() {
    let (engine, store) = deployed(&StackConfig::default()).await;
    let mut provisioned = engine.last_order.borrow().clone();
    destroy(&engine, &store, &RecordingReporter::default())
        .await
        .expect("destroy");
    provisioned.reverse();
    assert_eq!(*engine.last_order.borrow(), provisioned);
}

#[tokio::test]
async fn protected_database_blocks_teardown_until_disabled() {
    let mut cfg = StackConfig::default();
    cfg.set("database.deletion_protection", "true").expect("set");
    let (engine, store) = deployed(&cfg).await;

    let err = destroy(&engine, &store, &RecordingReporter::default())
        .await
        .expect_err("protected");
    let Some(DeploymentError::DeletionProtected { logical_id, physical_id }) =
        err.downcast_ref::<DeploymentError>()
    else {
        panic!("expected DeletionProtected, got {err:#}");
    };
    assert_eq!(logical_id, "Database");
    assert_eq!(physical_id, "three-tier-db");
    assert_eq!(engine.destroys.get(), 0);
    assert!(store.current().is_some(), "record must be kept");

    cfg.set("database.deletion_protection", "false").expect("set");
    deploy(&engine, &store, &cfg, &RecordingReporter::default())
        .await
        .expect("redeploy without protection");
    let outcome = destroy(&engine, &store, &RecordingReporter::default())
        .await
        .expect("destroy after disabling");
    assert!(outcome.deleted.contains(&"Database".to_string()));
    assert!(store.current().is_none());
}

#[tokio::test]
async fn snapshot_policy_is_reported() {
    let mut cfg = StackConfig::default();
    cfg.set("database.deletion_protection", "true").expect("set");
    let (engine, store) = deployed(&cfg).await;
    // Protection lifted on the record only; the Snapshot policy stays.
    let mut record = store.current().expect("record");
    for r in &mut record.resources {
        r.deletion_protected = false;
    }
    let store = MemoryStateStore::with(record);
    let reporter = RecordingReporter::default();

    let outcome = destroy(&engine, &store, &reporter).await.expect("destroy");
    assert_eq!(outcome.snapshots, vec!["Database".to_string()]);
    assert!(reporter.warnings().iter().any(|w| w.contains("Database")));
}
