//! Infrastructure implementation of the `DeploymentStateStore` port.
//!
//! `StateManager` provides async load/save using `tokio::task::spawn_blocking`
//! with atomic write (temp file + rename) to prevent state corruption.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::DeploymentStateStore;
use crate::domain::deployment::DeploymentRecord;

/// Default state file, relative to the working directory.
pub const DEFAULT_STATE_FILE: &str = ".threetier/state.json";

/// State file manager: implements `DeploymentStateStore` for the infra layer.
#[derive(Debug, Clone)]
pub struct StateManager {
    path: PathBuf,
}

impl StateManager {
    /// Create a state manager at `THREETIER_STATE`, or the default path.
    #[must_use]
    pub fn new() -> Self {
        let path = std::env::var("THREETIER_STATE")
            .map_or_else(|_| PathBuf::from(DEFAULT_STATE_FILE), PathBuf::from);
        Self::with_path(path)
    }

    /// Create a state manager with an explicit path (used in tests).
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Synchronous load: used internally by `load_async` via `spawn_blocking`.
    fn load_sync(&self) -> Result<Option<DeploymentRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading state file {}", self.path.display()))?;
        let record: DeploymentRecord = serde_json::from_str(&content)
            .with_context(|| format!("parsing state file {}", self.path.display()))?;
        Ok(Some(record))
    }

    /// Synchronous save: used internally by `save_async` via `spawn_blocking`.
    fn save_sync(&self, record: &DeploymentRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(record).context("serializing state")?;

        // Atomic write via temp file then rename
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("setting permissions on {}", temp_path.display()))?;
        }

        std::fs::rename(&temp_path, &self.path)
            .with_context(|| format!("finalizing state file {}", self.path.display()))?;

        Ok(())
    }

    fn clear_sync(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("removing state file {}", self.path.display()))?;
        }
        Ok(())
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DeploymentStateStore for StateManager {
    async fn load_async(&self) -> Result<Option<DeploymentRecord>> {
        let mgr = self.clone();
        tokio::task::spawn_blocking(move || mgr.load_sync())
            .await
            .context("state load task panicked")?
    }

    async fn save_async(&self, record: &DeploymentRecord) -> Result<()> {
        let mgr = self.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || mgr.save_sync(&record))
            .await
            .context("state save task panicked")?
    }

    async fn clear_async(&self) -> Result<()> {
        let mgr = self.clone();
        tokio::task::spawn_blocking(move || mgr.clear_sync())
            .await
            .context("state clear task panicked")?
    }
}
