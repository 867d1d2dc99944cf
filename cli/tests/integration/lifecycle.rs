//! plan / check / diff / deploy / destroy against a scratch directory.

#![allow(clippy::expect_used)]

use predicates::prelude::*;

use crate::support::{stdout_json, threetier, workdir};

const STATE: &str = ".threetier/state.json";

#[test]
fn test_plan_orders_database_before_environment() {
    let dir = workdir();
    let output = threetier(dir.path())
        .args(["plan", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let plan = stdout_json(&output);
    let order: Vec<&str> = plan["provisioning"]
        .as_array()
        .expect("steps")
        .iter()
        .filter_map(|s| s["logical_id"].as_str())
        .collect();
    let pos = |id: &str| order.iter().position(|x| *x == id).expect(id);
    assert!(pos("ThreeTierAppVpc") < pos("DatabaseSubnetGroup"));
    assert!(pos("Database") < pos("ThreeTierAppEnvironment"));
    assert!(pos("CustomInstanceProfile") < pos("ThreeTierAppEnvironment"));
    let teardown: Vec<&str> = plan["teardown"]
        .as_array()
        .expect("teardown")
        .iter()
        .filter_map(|s| s.as_str())
        .collect();
    assert_eq!(teardown.first(), order.last());
}

#[test]
fn test_plan_human_output() {
    let dir = workdir();
    threetier(dir.path())
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("Provisioning order"))
        .stdout(predicate::str::contains("Teardown order"));
}

#[test]
fn test_check_passes_reference_stack() {
    let dir = workdir();
    let output = threetier(dir.path())
        .args(["check", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let report = stdout_json(&output);
    assert_eq!(report["passed"], true);
    assert_eq!(report["failures"], 0);
}

#[test]
fn test_check_fails_unprotected_production_database() {
    let dir = workdir();
    threetier(dir.path())
        .args(["config", "set", "stage", "production"])
        .assert()
        .success();
    threetier(dir.path())
        .arg("check")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("deletion-protection"));
}

#[test]
fn test_diff_identical_reports_no_changes() {
    let dir = workdir();
    threetier(dir.path()).arg("synth").assert().success();
    threetier(dir.path())
        .args(["diff", "--against", "cdk.out/ThreeTierAppStack.template.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no changes"));
}

#[test]
fn test_diff_shows_changed_property() {
    let dir = workdir();
    threetier(dir.path()).arg("synth").assert().success();
    threetier(dir.path())
        .args(["config", "set", "database.engine_version", "13"])
        .assert()
        .success();
    let output = threetier(dir.path())
        .args(["diff", "--json", "--against", "cdk.out/ThreeTierAppStack.template.json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let diff = stdout_json(&output);
    assert_eq!(diff["changed"], true);
    let changes = diff["changes"].as_array().expect("changes");
    let db = changes
        .iter()
        .find(|c| c["logical_id"] == "Database")
        .expect("database changed");
    assert_eq!(db["kind"], "modified");
    assert_eq!(db["changed_properties"][0], "EngineVersion");
}

#[test]
fn test_deploy_then_destroy() {
    let dir = workdir();
    let output = threetier(dir.path())
        .args(["deploy", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let deployed = stdout_json(&output);
    assert_eq!(deployed["status"], "created");
    assert_eq!(deployed["environment"]["DB_PORT"], "5432");
    assert!(
        deployed["environment"]["DB_CREDS_SECRET"]
            .as_str()
            .is_some_and(|s| s.starts_with("arn:aws:secretsmanager:"))
    );
    assert!(dir.path().join(STATE).exists());

    let output = threetier(dir.path())
        .args(["deploy", "--json"])
        .output()
        .expect("run");
    assert_eq!(stdout_json(&output)["status"], "unchanged");

    threetier(dir.path())
        .args(["destroy", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Destroyed ThreeTierAppStack"));
    assert!(!dir.path().join(STATE).exists());
}

#[test]
fn test_state_never_holds_credentials() {
    let dir = workdir();
    threetier(dir.path()).arg("deploy").assert().success();
    let state = std::fs::read_to_string(dir.path().join(STATE)).expect("state");
    assert!(state.contains("{{resolve:secretsmanager:"));
    assert!(!state.contains("MasterUserPassword\": \""));
}

#[test]
fn test_destroy_without_deployment_fails() {
    let dir = workdir();
    let output = threetier(dir.path())
        .args(["destroy", "--yes", "--json"])
        .output()
        .expect("run");
    assert!(!output.status.success());
    let err = stdout_json(&output);
    assert_eq!(err["error"], true);
    assert_eq!(err["code"], "NOT_DEPLOYED");
}

#[test]
fn test_protected_database_blocks_destroy() {
    let dir = workdir();
    threetier(dir.path())
        .args(["config", "set", "database.deletion_protection", "true"])
        .assert()
        .success();
    threetier(dir.path()).arg("deploy").assert().success();

    threetier(dir.path())
        .args(["destroy", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("deletion protection enabled"));
    assert!(dir.path().join(STATE).exists());

    threetier(dir.path())
        .args(["config", "set", "database.deletion_protection", "false"])
        .assert()
        .success();
    threetier(dir.path()).arg("deploy").assert().success();
    threetier(dir.path())
        .args(["destroy", "--yes"])
        .assert()
        .success();
    assert!(!dir.path().join(STATE).exists());
}

#[test]
fn test_destroy_in_ci_skips_prompt() {
    let dir = workdir();
    threetier(dir.path()).arg("deploy").assert().success();
    threetier(dir.path())
        .arg("destroy")
        .env("CI", "true")
        .assert()
        .success();
    assert!(!dir.path().join(STATE).exists());
}
