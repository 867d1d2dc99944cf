//! JSON output.
//!
//! Every `--json` code path prints exactly one pretty-printed document on
//! stdout. Failures use the error object produced by [`format_error`].

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;

use crate::application::services::deploy_service::DeployOutcome;
use crate::application::services::plan_service::Plan;
use crate::application::services::synth_service::Synthesis;
use crate::domain::checks::CheckReport;
use crate::domain::config::StackConfig;
use crate::domain::deployment::TeardownOutcome;
use crate::domain::diff::ChangeSet;
use crate::domain::error::{ConfigError, DeclarationError, DeploymentError, TopologyError};

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Stable machine-readable code for an error chain.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<DeploymentError>() {
            return match e {
                DeploymentError::NotDeployed => "NOT_DEPLOYED",
                DeploymentError::DeletionProtected { .. } => "DELETION_PROTECTED",
                DeploymentError::Unresolved { .. } => "UNRESOLVED_REFERENCE",
                DeploymentError::MissingEnvironmentVariable(_) => "MISSING_ENVIRONMENT_VARIABLE",
                DeploymentError::ChecksFailed(_) => "CHECKS_FAILED",
            };
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return "INVALID_CONFIG";
        }
        if cause.downcast_ref::<DeclarationError>().is_some() {
            return "INVALID_DECLARATION";
        }
        if cause.downcast_ref::<TopologyError>().is_some() {
            return "INVALID_TOPOLOGY";
        }
    }
    "ERROR"
}

/// Renders domain types as JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    fn print(value: &impl Serialize) -> Result<()> {
        let out = serde_json::to_string_pretty(value).context("JSON serialization failed")?;
        println!("{out}");
        Ok(())
    }

    /// Render the CLI version.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_version(&self, version: &str) -> Result<()> {
        Self::print(&json!({ "version": version }))
    }

    /// Render the active configuration and where it was loaded from.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_config(&self, config: &StackConfig, path: &Path) -> Result<()> {
        Self::print(&json!({
            "path": path.display().to_string(),
            "config": config,
        }))
    }

    /// Render the synthesis summary.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_synth(&self, synthesis: &Synthesis, path: &Path) -> Result<()> {
        Self::print(&json!({
            "path": path.display().to_string(),
            "digest": synthesis.digest,
            "resources": synthesis.template.resources.len(),
            "outputs": synthesis.template.outputs.keys().collect::<Vec<_>>(),
            "checks": synthesis.report,
        }))
    }

    /// Render a provisioning plan.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_plan(&self, plan: &Plan) -> Result<()> {
        Self::print(plan)
    }

    /// Render a check report.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_checks(&self, report: &CheckReport) -> Result<()> {
        Self::print(&json!({
            "passed": !report.has_failures(),
            "failures": report.failures().len(),
            "warnings": report.warnings().len(),
            "checks": report.checks,
        }))
    }

    /// Render failing checks as an error object carrying the full report.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_check_failure(&self, report: &CheckReport) -> Result<()> {
        let err = DeploymentError::ChecksFailed(report.failures().len());
        Self::print(&json!({
            "error": true,
            "message": err.to_string(),
            "code": "CHECKS_FAILED",
            "checks": report.checks,
        }))
    }

    /// Render a template diff.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_diff(&self, changes: &ChangeSet) -> Result<()> {
        Self::print(&json!({
            "changed": !changes.is_empty(),
            "changes": changes.changes,
            "outputs": changes.outputs,
        }))
    }

    /// Render the outcome of a deploy.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_deploy(&self, outcome: &DeployOutcome) -> Result<()> {
        let record = outcome.record();
        let (status, changes) = match outcome {
            DeployOutcome::Created { .. } => ("created", None),
            DeployOutcome::Updated { changes, .. } => ("updated", Some(changes)),
            DeployOutcome::Unchanged { .. } => ("unchanged", None),
        };
        let resources: Vec<_> = record
            .resources
            .iter()
            .map(|r| {
                json!({
                    "logical_id": r.logical_id,
                    "type": r.resource_type,
                    "physical_id": r.physical_id,
                })
            })
            .collect();
        Self::print(&json!({
            "status": status,
            "stack": record.stack_name,
            "digest": record.template_digest,
            "deployed_at": record.deployed_at,
            "resources": resources,
            "environment": record.environment,
            "outputs": record.outputs,
            "changes": changes,
        }))
    }

    /// Render the outcome of a teardown.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_teardown(&self, stack_name: &str, outcome: &TeardownOutcome) -> Result<()> {
        Self::print(&json!({
            "stack": stack_name,
            "deleted": outcome.deleted,
            "snapshots": outcome.snapshots,
            "retained": outcome.retained,
        }))
    }
}
