//! Application service: configuration use-cases.

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::domain::config::StackConfig;

/// Load configuration.
pub fn load_config(store: &impl ConfigStore) -> Result<StackConfig> {
    store.load()
}

/// Save configuration.
pub fn save_config(store: &impl ConfigStore, config: &StackConfig) -> Result<()> {
    store.save(config)
}

/// Apply one `key = value` change and persist it.
///
/// The file is only rewritten when the resulting config still validates.
///
/// # Errors
///
/// Returns an error if the key or value is rejected, or the store fails.
pub fn set_value(store: &impl ConfigStore, key: &str, value: &str) -> Result<StackConfig> {
    let mut config = store.load()?;
    config.set(key, value)?;
    config
        .validate()
        .with_context(|| format!("setting {key} = {value} would leave the stack invalid"))?;
    store.save(&config)?;
    tracing::info!(key, value, "configuration updated");
    Ok(config)
}

/// Write a default configuration file unless one already exists.
///
/// Returns `true` when a file was created.
///
/// # Errors
///
/// Returns an error if the store fails.
pub fn init_config(store: &impl ConfigStore) -> Result<bool> {
    if store.exists() {
        return Ok(false);
    }
    store.save(&StackConfig::default())?;
    Ok(true)
}
