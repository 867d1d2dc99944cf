//! End-to-end rehearsals of the reference stack through the services and
//! the local engine.

#![allow(clippy::expect_used)]

use serde_json::json;
use threetier_cli::application::services::{deploy_service, synth_service, teardown_service};
use threetier_cli::domain::config::StackConfig;
use threetier_cli::domain::resources::secret::GenerationPolicy;
use threetier_common::resource_types as rt;

use crate::mocks::{CountingEngine, MemoryStateStore, RecordingReporter};

#[test]
fn default_network_covers_private_range_with_two_azs() {
    let synthesis = synth_service::synthesize_stack(&StackConfig::default()).expect("synth");
    let (_, vpc) = synthesis
        .template
        .single_of_type(rt::VPC)
        .expect("one vpc");
    assert_eq!(vpc.property("CidrBlock"), Some(&json!("10.0.0.0/16")));
    assert!(synthesis.template.count_of_type(rt::SUBNET) <= 4);
}

#[test]
fn secret_policy_matches_reference_fixture() {
    let synthesis = synth_service::synthesize_stack(&StackConfig::default()).expect("synth");
    let secret = synthesis.template.resource("PostgreSQLCreds").expect("secret");
    assert_eq!(
        secret.property("GenerateSecretString.ExcludePunctuation"),
        Some(&json!(true))
    );
    assert_eq!(
        secret.property("GenerateSecretString.GenerateStringKey"),
        Some(&json!("password"))
    );
    assert_eq!(
        secret.property("GenerateSecretString.IncludeSpace"),
        Some(&json!(false))
    );
}

#[test]
fn database_description_matches_inputs() {
    let synthesis = synth_service::synthesize_stack(&StackConfig::default()).expect("synth");
    let db = synthesis.template.resource("Database").expect("database");
    assert_eq!(db.property("Engine"), Some(&json!("postgres")));
    assert_eq!(db.property("EngineVersion"), Some(&json!("12")));
    assert_eq!(db.property("DBInstanceClass"), Some(&json!("db.t3.micro")));
    assert_eq!(db.property("AllocatedStorage"), Some(&json!("20")));
    assert_eq!(db.property("DBInstanceIdentifier"), Some(&json!("three-tier-db")));
    assert_eq!(db.property("DeletionProtection"), Some(&json!(false)));
}

#[tokio::test]
async fn rehearsed_credential_is_alphanumeric() {
    let engine = CountingEngine::new();
    let store = MemoryStateStore::default();
    let outcome = deploy_service::deploy(
        &engine,
        &store,
        &StackConfig::default(),
        &RecordingReporter::default(),
    )
    .await
    .expect("deploy");

    let locator = &outcome.record().environment["DB_CREDS_SECRET"];
    let password = engine
        .inner
        .secret_field(locator, "password")
        .expect("generated");
    assert!(GenerationPolicy::default().admits(&password));
    assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));

    let state = serde_json::to_string(&store.current().expect("record")).expect("json");
    assert!(!state.contains(&password), "credential leaked into state");
}

#[tokio::test]
async fn full_lifecycle_leaves_nothing_behind() {
    let engine = CountingEngine::new();
    let store = MemoryStateStore::default();
    let reporter = RecordingReporter::default();
    deploy_service::deploy(&engine, &store, &StackConfig::default(), &reporter)
        .await
        .expect("deploy");
    teardown_service::destroy(&engine, &store, &reporter)
        .await
        .expect("destroy");
    assert!(store.current().is_none());
    assert!(teardown_service::recorded(&store).await.is_err());
}
