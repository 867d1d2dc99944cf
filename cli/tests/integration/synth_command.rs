//! `threetier synth` writes the reference template.

#![allow(clippy::expect_used)]

use predicates::prelude::*;
use serde_json::{Value, json};

use crate::support::{stdout_json, threetier, workdir};

fn synthesized(dir: &std::path::Path) -> Value {
    threetier(dir).arg("synth").assert().success();
    let path = dir.join("cdk.out").join("ThreeTierAppStack.template.json");
    let content = std::fs::read_to_string(path).expect("template written");
    serde_json::from_str(&content).expect("template is JSON")
}

fn resource<'a>(template: &'a Value, id: &str) -> &'a Value {
    &template["Resources"][id]
}

#[test]
fn test_synth_reports_written_path() {
    let dir = workdir();
    threetier(dir.path())
        .arg("synth")
        .assert()
        .success()
        .stdout(predicate::str::contains("ThreeTierAppStack.template.json"));
}

#[test]
fn test_vpc_covers_private_range() {
    let dir = workdir();
    let template = synthesized(dir.path());
    let vpc = resource(&template, "ThreeTierAppVpc");
    assert_eq!(vpc["Type"], "AWS::EC2::VPC");
    assert_eq!(vpc["Properties"]["CidrBlock"], "10.0.0.0/16");
}

#[test]
fn test_secret_generation_policy() {
    let dir = workdir();
    let template = synthesized(dir.path());
    let generate = &resource(&template, "PostgreSQLCreds")["Properties"]["GenerateSecretString"];
    assert_eq!(generate["ExcludePunctuation"], true);
    assert_eq!(generate["GenerateStringKey"], "password");
    assert_eq!(generate["IncludeSpace"], false);
}

#[test]
fn test_database_properties() {
    let dir = workdir();
    let template = synthesized(dir.path());
    let db = &resource(&template, "Database")["Properties"];
    assert_eq!(db["DBInstanceClass"], "db.t3.micro");
    assert_eq!(db["DBInstanceIdentifier"], "three-tier-db");
    assert_eq!(db["DeletionProtection"], false);
    assert_eq!(db["Engine"], "postgres");
    assert_eq!(db["EngineVersion"], "12");
}

#[test]
fn test_environment_properties() {
    let dir = workdir();
    let template = synthesized(dir.path());
    let env = &resource(&template, "ThreeTierAppEnvironment")["Properties"];
    assert_eq!(env["ApplicationName"], json!({"Ref": "ThreeTierApp"}));
    assert_eq!(env["Tier"], json!({"Name": "WebServer", "Type": "Standard"}));
}

#[test]
fn test_synth_stdout_matches_file() {
    let dir = workdir();
    let file = synthesized(dir.path());
    let output = threetier(dir.path())
        .args(["synth", "--stdout"])
        .output()
        .expect("run");
    assert!(output.status.success());
    assert_eq!(stdout_json(&output), file);
}

#[test]
fn test_synth_custom_out_dir() {
    let dir = workdir();
    threetier(dir.path())
        .args(["synth", "--out", "build"])
        .assert()
        .success();
    assert!(dir.path().join("build/ThreeTierAppStack.template.json").exists());
}

#[test]
fn test_synth_json_summary() {
    let dir = workdir();
    let output = threetier(dir.path())
        .args(["synth", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let summary = stdout_json(&output);
    assert_eq!(summary["digest"].as_str().map(str::len), Some(64));
    assert_eq!(summary["checks"]["checks"].as_array().map(Vec::is_empty), Some(false));
}

#[test]
fn test_synth_refuses_failing_production_stack() {
    let dir = workdir();
    threetier(dir.path())
        .args(["config", "set", "stage", "production"])
        .assert()
        .success();
    threetier(dir.path())
        .arg("synth")
        .assert()
        .failure()
        .stdout(predicate::str::contains("deletion-protection"));
    assert!(!dir.path().join("cdk.out").exists());
}

#[test]
fn test_synth_json_failure_uses_error_shape() {
    let dir = workdir();
    threetier(dir.path())
        .args(["config", "set", "stage", "production"])
        .assert()
        .success();
    let output = threetier(dir.path())
        .args(["synth", "--json"])
        .output()
        .expect("run");
    assert!(!output.status.success());
    let body = stdout_json(&output);
    assert_eq!(body["error"], json!(true));
    assert_eq!(body["code"], "CHECKS_FAILED");
    assert!(body["message"].as_str().is_some_and(|m| m.contains("failed")));
    let checks = body["checks"].as_array().expect("checks listed");
    assert!(checks.iter().any(|c| c["name"] == "deletion-protection" && c["status"] == "fail"));
    assert!(!dir.path().join("cdk.out").exists());
}
