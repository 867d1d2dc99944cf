//! Shared helpers for binary tests.

#![allow(clippy::expect_used)]

use std::path::Path;

use assert_cmd::Command;
use tempfile::TempDir;

/// `threetier` running in `dir` with a clean environment.
pub fn threetier(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("threetier"));
    cmd.current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("THREETIER_CONFIG")
        .env_remove("THREETIER_STATE")
        .env_remove("RUST_LOG")
        .env_remove("CI");
    cmd
}

pub fn workdir() -> TempDir {
    tempfile::tempdir().expect("tempdir")
}

pub fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is one JSON document")
}
