//! Tests for `config_service`.

#![allow(clippy::expect_used)]

use threetier_cli::application::services::config_service::{init_config, load_config, set_value};
use threetier_cli::domain::config::{Stage, StackConfig};
use threetier_cli::domain::error::ConfigError;

use crate::mocks::MemoryConfigStore;

#[test]
fn init_writes_defaults_once() {
    let store = MemoryConfigStore::default();
    assert!(init_config(&store).expect("init"));
    assert_eq!(store.saved(), Some(StackConfig::default()));
    assert!(!init_config(&store).expect("second init"));
}

#[test]
fn set_value_persists_valid_change() {
    let store = MemoryConfigStore::default();
    let cfg = set_value(&store, "stage", "production").expect("set stage");
    assert_eq!(cfg.stage, Stage::Production);
    assert_eq!(load_config(&store).expect("load").stage, Stage::Production);
}

#[test]
fn unknown_key_is_rejected_without_saving() {
    let store = MemoryConfigStore::default();
    let err = set_value(&store, "database.password", "hunter2").expect_err("unknown key");
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::UnknownKey { .. })
    ));
    assert!(store.saved().is_none());
}

#[test]
fn out_of_range_value_is_rejected_without_saving() {
    let store = MemoryConfigStore::default();
    assert!(set_value(&store, "network.max_azs", "9").is_err());
    assert!(set_value(&store, "database.allocated_storage_gb", "5").is_err());
    assert!(store.saved().is_none());
}
