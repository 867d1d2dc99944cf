//! Shared port doubles for unit tests.
//!
//! Hand-written implementations of the application ports so service tests
//! run without touching the filesystem.

#![allow(clippy::expect_used, dead_code)]

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use threetier_cli::application::ports::{
    ConfigStore, DeploymentStateStore, ProgressReporter, ProvisioningEngine,
};
use threetier_cli::domain::config::StackConfig;
use threetier_cli::domain::deployment::{DeploymentRecord, TeardownOutcome};
use threetier_cli::infra::engine::LocalEngine;
use threetier_common::Template;

// ── State store ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStateStore {
    record: Mutex<Option<DeploymentRecord>>,
}

impl MemoryStateStore {
    pub fn with(record: DeploymentRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }

    pub fn current(&self) -> Option<DeploymentRecord> {
        self.record.lock().expect("lock").clone()
    }
}

impl DeploymentStateStore for MemoryStateStore {
    async fn load_async(&self) -> Result<Option<DeploymentRecord>> {
        Ok(self.current())
    }

    async fn save_async(&self, record: &DeploymentRecord) -> Result<()> {
        *self.record.lock().expect("lock") = Some(record.clone());
        Ok(())
    }

    async fn clear_async(&self) -> Result<()> {
        *self.record.lock().expect("lock") = None;
        Ok(())
    }
}

// ── Config store ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryConfigStore {
    config: RefCell<Option<StackConfig>>,
}

impl MemoryConfigStore {
    pub fn saved(&self) -> Option<StackConfig> {
        self.config.borrow().clone()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Result<StackConfig> {
        Ok(self.config.borrow().clone().unwrap_or_default())
    }

    fn save(&self, config: &StackConfig) -> Result<()> {
        *self.config.borrow_mut() = Some(config.clone());
        Ok(())
    }

    fn path(&self) -> Result<PathBuf> {
        Ok(PathBuf::from("memory://threetier.yaml"))
    }

    fn exists(&self) -> bool {
        self.config.borrow().is_some()
    }
}

// ── Engines ───────────────────────────────────────────────────────────────────

/// Delegates to a seeded `LocalEngine` and counts calls.
pub struct CountingEngine {
    pub inner: LocalEngine,
    pub applies: Cell<usize>,
    pub destroys: Cell<usize>,
    pub last_order: RefCell<Vec<String>>,
}

impl CountingEngine {
    pub fn new() -> Self {
        Self {
            inner: LocalEngine::with_seed([42u8; 32]),
            applies: Cell::new(0),
            destroys: Cell::new(0),
            last_order: RefCell::new(Vec::new()),
        }
    }
}

impl ProvisioningEngine for CountingEngine {
    async fn apply(
        &self,
        stack_name: &str,
        template: &Template,
        order: &[String],
    ) -> Result<DeploymentRecord> {
        self.applies.set(self.applies.get() + 1);
        *self.last_order.borrow_mut() = order.to_vec();
        self.inner.apply(stack_name, template, order).await
    }

    async fn destroy(&self, record: &DeploymentRecord, order: &[String]) -> Result<TeardownOutcome> {
        self.destroys.set(self.destroys.get() + 1);
        *self.last_order.borrow_mut() = order.to_vec();
        self.inner.destroy(record, order).await
    }
}

/// Provisions successfully but resolves no application environment.
pub struct BlankEnvironmentEngine(pub LocalEngine);

impl ProvisioningEngine for BlankEnvironmentEngine {
    async fn apply(
        &self,
        stack_name: &str,
        template: &Template,
        order: &[String],
    ) -> Result<DeploymentRecord> {
        let mut record = self.0.apply(stack_name, template, order).await?;
        for value in record.environment.values_mut() {
            value.clear();
        }
        Ok(record)
    }

    async fn destroy(&self, record: &DeploymentRecord, order: &[String]) -> Result<TeardownOutcome> {
        self.0.destroy(record, order).await
    }
}

pub struct FailingEngine;

impl ProvisioningEngine for FailingEngine {
    async fn apply(&self, _: &str, _: &Template, _: &[String]) -> Result<DeploymentRecord> {
        anyhow::bail!("engine unavailable")
    }

    async fn destroy(&self, _: &DeploymentRecord, _: &[String]) -> Result<TeardownOutcome> {
        anyhow::bail!("engine unavailable")
    }
}

// ── Reporter ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingReporter {
    pub events: RefCell<Vec<String>>,
}

impl RecordingReporter {
    pub fn warnings(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| e.strip_prefix("warn: ").map(String::from))
            .collect()
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.events.borrow_mut().push(format!("step: {message}"));
    }

    fn success(&self, message: &str) {
        self.events.borrow_mut().push(format!("success: {message}"));
    }

    fn warn(&self, message: &str) {
        self.events.borrow_mut().push(format!("warn: {message}"));
    }
}
