//! Tests for `deploy_service::deploy`.

#![allow(clippy::expect_used)]

use threetier_cli::application::services::deploy_service::{DeployOutcome, deploy};
use threetier_cli::application::services::plan_service;
use threetier_cli::domain::config::{Stage, StackConfig};
use threetier_cli::domain::error::DeploymentError;
use threetier_cli::infra::engine::LocalEngine;
use threetier_common::env_vars;

use crate::mocks::{
    BlankEnvironmentEngine, CountingEngine, FailingEngine, MemoryStateStore, RecordingReporter,
};

#[tokio::test]
async fn first_deploy_creates_and_records() {
    let engine = CountingEngine::new();
    let store = MemoryStateStore::default();
    let reporter = RecordingReporter::default();

    let outcome = deploy(&engine, &store, &StackConfig::default(), &reporter)
        .await
        .expect("deploy");

    assert!(matches!(outcome, DeployOutcome::Created { .. }));
    assert_eq!(engine.applies.get(), 1);
    let saved = store.current().expect("record saved");
    assert_eq!(&saved, outcome.record());
    for var in env_vars::REQUIRED {
        assert!(!saved.environment[*var].is_empty(), "{var} empty");
    }
}

#[tokio::test]
async fn engine_receives_topological_order() {
    let engine = CountingEngine::new();
    let store = MemoryStateStore::default();
    let outcome = deploy(&engine, &store, &StackConfig::default(), &RecordingReporter::default())
        .await
        .expect("deploy");

    let expected = plan_service::plan(&outcome.record().template)
        .expect("plan")
        .order();
    let order = engine.last_order.borrow().clone();
    assert_eq!(order, expected);
    let pos = |id: &str| order.iter().position(|x| x == id).expect(id);
    assert!(pos("ThreeTierAppVpc") < pos("Database"));
    assert!(pos("PostgreSQLCreds") < pos("Database"));
    assert!(pos("Database") < pos("ThreeTierAppEnvironment"));
    assert!(pos("EBRoleDefaultPolicy") < pos("ThreeTierAppEnvironment"));
}

#[tokio::test]
async fn redeploy_without_changes_skips_engine() {
    let engine = CountingEngine::new();
    let store = MemoryStateStore::default();
    let cfg = StackConfig::default();
    deploy(&engine, &store, &cfg, &RecordingReporter::default())
        .await
        .expect("first deploy");

    let outcome = deploy(&engine, &store, &cfg, &RecordingReporter::default())
        .await
        .expect("second deploy");
    assert!(matches!(outcome, DeployOutcome::Unchanged { .. }));
    assert_eq!(engine.applies.get(), 1);
}

#[tokio::test]
async fn changed_declaration_reports_changes() {
    let engine = CountingEngine::new();
    let store = MemoryStateStore::default();
    let mut cfg = StackConfig::default();
    deploy(&engine, &store, &cfg, &RecordingReporter::default())
        .await
        .expect("first deploy");

    cfg.set("database.engine_version", "13").expect("set");
    let outcome = deploy(&engine, &store, &cfg, &RecordingReporter::default())
        .await
        .expect("update");
    let DeployOutcome::Updated { changes, .. } = outcome else {
        panic!("expected update");
    };
    let db = changes
        .changes
        .iter()
        .find(|c| c.logical_id == "Database")
        .expect("database changed");
    assert_eq!(db.changed_properties, vec!["EngineVersion".to_string()]);
    assert!(!db.replacement);
}

#[tokio::test]
async fn failing_checks_stop_before_engine() {
    let engine = CountingEngine::new();
    let store = MemoryStateStore::default();
    let mut cfg = StackConfig::default();
    cfg.stage = Stage::Production;

    let err = deploy(&engine, &store, &cfg, &RecordingReporter::default())
        .await
        .expect_err("production without deletion protection");
    assert!(matches!(
        err.downcast_ref::<DeploymentError>(),
        Some(DeploymentError::ChecksFailed(1))
    ));
    assert_eq!(engine.applies.get(), 0);
    assert!(store.current().is_none());
}

#[tokio::test]
async fn development_stack_warns_about_deletion_protection() {
    let reporter = RecordingReporter::default();
    deploy(
        &CountingEngine::new(),
        &MemoryStateStore::default(),
        &StackConfig::default(),
        &reporter,
    )
    .await
    .expect("deploy");
    assert!(
        reporter
            .warnings()
            .iter()
            .any(|w| w.starts_with("deletion-protection")),
        "warnings: {:?}",
        reporter.warnings()
    );
}

#[tokio::test]
async fn empty_environment_variable_fails_and_is_not_recorded() {
    let engine = BlankEnvironmentEngine(LocalEngine::with_seed([1u8; 32]));
    let store = MemoryStateStore::default();
    let err = deploy(&engine, &store, &StackConfig::default(), &RecordingReporter::default())
        .await
        .expect_err("blank environment");
    assert!(matches!(
        err.downcast_ref::<DeploymentError>(),
        Some(DeploymentError::MissingEnvironmentVariable(_))
    ));
    assert!(store.current().is_none());
}

#[tokio::test]
async fn engine_failure_is_contextualised() {
    let store = MemoryStateStore::default();
    let err = deploy(&FailingEngine, &store, &StackConfig::default(), &RecordingReporter::default())
        .await
        .expect_err("engine down");
    let msg = format!("{err:#}");
    assert!(msg.contains("provisioning failed"), "{msg}");
    assert!(msg.contains("engine unavailable"), "{msg}");
    assert!(store.current().is_none());
}
