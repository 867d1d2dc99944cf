//! Argument parsing, help and version.

#![allow(clippy::expect_used)]

use predicates::prelude::*;

use crate::support::{stdout_json, threetier, workdir};

#[test]
fn test_cli_no_args_shows_help() {
    let dir = workdir();
    // arg_required_else_help prints help on stderr and exits 2
    threetier(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("three-tier AWS stack"));
}

#[test]
fn test_help_lists_commands() {
    let dir = workdir();
    let output = threetier(dir.path()).arg("--help").output().expect("run");
    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    for command in ["synth", "plan", "check", "diff", "deploy", "destroy", "config", "version"] {
        assert!(help.contains(command), "help lacks {command}:\n{help}");
    }
}

#[test]
fn test_version_flag() {
    let dir = workdir();
    threetier(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("threetier"));
}

#[test]
fn test_version_command() {
    let dir = workdir();
    threetier(dir.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("threetier 0.1.0"));
}

#[test]
fn test_version_json() {
    let dir = workdir();
    let output = threetier(dir.path())
        .args(["version", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["version"], "0.1.0");
}

#[test]
fn test_unknown_command_fails() {
    let dir = workdir();
    threetier(dir.path())
        .arg("bootstrap")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_diff_requires_against() {
    let dir = workdir();
    threetier(dir.path())
        .arg("diff")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--against"));
}
