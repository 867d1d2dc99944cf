//! `threetier config` show / set / init.

#![allow(clippy::expect_used)]

use predicates::prelude::*;

use crate::support::{stdout_json, threetier, workdir};

#[test]
fn test_config_show_defaults_without_file() {
    let dir = workdir();
    threetier(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ThreeTierAppStack"))
        .stdout(predicate::str::contains("database.engine_version:"));
}

#[test]
fn test_config_init_writes_file_once() {
    let dir = workdir();
    threetier(dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote default configuration"));
    assert!(dir.path().join("threetier.yaml").exists());
    threetier(dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_config_set_persists() {
    let dir = workdir();
    threetier(dir.path())
        .args(["config", "set", "network.max_azs", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set network.max_azs = 3"));
    let output = threetier(dir.path())
        .args(["config", "show", "--json"])
        .output()
        .expect("run");
    assert_eq!(stdout_json(&output)["config"]["network"]["max_azs"], 3);
}

#[test]
fn test_config_set_unknown_key_fails() {
    let dir = workdir();
    threetier(dir.path())
        .args(["config", "set", "database.password", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown setting"));
    assert!(!dir.path().join("threetier.yaml").exists());
}

#[test]
fn test_config_set_invalid_value_json_error() {
    let dir = workdir();
    let output = threetier(dir.path())
        .args(["config", "set", "stage", "staging", "--json"])
        .output()
        .expect("run");
    assert!(!output.status.success());
    assert_eq!(stdout_json(&output)["code"], "INVALID_CONFIG");
}

#[test]
fn test_explicit_config_path() {
    let dir = workdir();
    threetier(dir.path())
        .args(["--config", "conf/stack.yaml", "config", "set", "stage", "production"])
        .assert()
        .success();
    assert!(dir.path().join("conf/stack.yaml").exists());
    threetier(dir.path())
        .arg("check")
        .env("THREETIER_CONFIG", "conf/stack.yaml")
        .assert()
        .code(1);
}
