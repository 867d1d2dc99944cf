//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and the shared template
//! types, never from `crate::infra`, `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use threetier_common::Template;

use crate::domain::config::StackConfig;
use crate::domain::deployment::{DeploymentRecord, TeardownOutcome};

// ── Configuration Port ────────────────────────────────────────────────────────

/// Abstracts loading and saving the stack configuration file.
pub trait ConfigStore {
    /// Load the configuration, returning defaults when no file exists.
    fn load(&self) -> Result<StackConfig>;
    /// Persist the configuration.
    fn save(&self, config: &StackConfig) -> Result<()>;
    /// Location of the configuration file.
    fn path(&self) -> Result<PathBuf>;
    /// Whether a configuration file is present.
    fn exists(&self) -> bool;
}

// ── Template Port ─────────────────────────────────────────────────────────────

/// Abstracts persistence of synthesized templates.
pub trait TemplateStore {
    /// Write `template` for `stack_name` and return the file path.
    fn write_template(&self, stack_name: &str, template: &Template) -> Result<PathBuf>;
    /// Read a previously synthesized template.
    fn read_template(&self, path: &Path) -> Result<Template>;
}

// ── Provisioning Engine Port ──────────────────────────────────────────────────

/// The external collaborator that turns a template into provisioned
/// resources. Callers hand it the order; the engine never reorders.
#[allow(async_fn_in_trait)]
pub trait ProvisioningEngine {
    /// Create or update every resource of `template`, visiting them in
    /// `order`, and return the resolved deployment record.
    async fn apply(
        &self,
        stack_name: &str,
        template: &Template,
        order: &[String],
    ) -> Result<DeploymentRecord>;

    /// Delete the resources of `record`, visiting them in `order`.
    ///
    /// Must fail before deleting anything when a resource in `record` is
    /// deletion-protected.
    async fn destroy(&self, record: &DeploymentRecord, order: &[String]) -> Result<TeardownOutcome>;
}

// ── Deployment State Port ─────────────────────────────────────────────────────

/// Abstracts persistence of the last deployment record.
#[allow(async_fn_in_trait)]
pub trait DeploymentStateStore {
    /// Load the record, returning `None` if nothing is deployed.
    async fn load_async(&self) -> Result<Option<DeploymentRecord>>;
    /// Persist the record.
    async fn save_async(&self, record: &DeploymentRecord) -> Result<()>;
    /// Remove the record after a successful teardown.
    async fn clear_async(&self) -> Result<()>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait; no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
