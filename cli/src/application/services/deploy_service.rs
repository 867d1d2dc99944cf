//! Application service: deploy use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.

use anyhow::{Context, Result};

use crate::application::ports::{DeploymentStateStore, ProgressReporter, ProvisioningEngine};
use crate::application::services::{plan_service, synth_service};
use crate::domain::config::StackConfig;
use crate::domain::deployment::DeploymentRecord;
use crate::domain::diff::{ChangeSet, diff};
use crate::domain::error::DeploymentError;

/// Outcome of the `deploy` use-case.
#[derive(Debug)]
pub enum DeployOutcome {
    /// Nothing recorded before; every resource was created.
    Created {
        record: DeploymentRecord,
    },
    /// An earlier deployment was updated to the new template.
    Updated {
        record: DeploymentRecord,
        changes: ChangeSet,
    },
    /// The recorded deployment already matches the declaration.
    Unchanged {
        record: DeploymentRecord,
    },
}

impl DeployOutcome {
    #[must_use]
    pub fn record(&self) -> &DeploymentRecord {
        match self {
            Self::Created { record } | Self::Updated { record, .. } | Self::Unchanged { record } => {
                record
            }
        }
    }
}

/// Synthesize, check, plan and apply the stack, then record the result.
///
/// # Errors
///
/// Returns an error if a check fails, the engine fails, or a required
/// environment variable is empty after resolution.
pub async fn deploy(
    engine: &impl ProvisioningEngine,
    store: &impl DeploymentStateStore,
    config: &StackConfig,
    reporter: &impl ProgressReporter,
) -> Result<DeployOutcome> {
    reporter.step("synthesizing stack...");
    let synthesis = synth_service::synthesize_stack(config)?;
    synthesis.ensure_valid()?;
    for warning in synthesis.report.warnings() {
        reporter.warn(&format!("{}: {}", warning.name, warning.detail));
    }
    reporter.success("stack synthesized");

    let previous = store.load_async().await?;
    if let Some(prev) = &previous {
        if prev.template_digest == synthesis.digest {
            tracing::info!(stack = %config.stack_name, "deployment already up to date");
            reporter.success("no changes");
            return Ok(DeployOutcome::Unchanged {
                record: prev.clone(),
            });
        }
    }

    let plan = plan_service::plan(&synthesis.template)?;
    reporter.step(&format!("provisioning {} resources...", plan.provisioning.len()));
    tracing::info!(
        stack = %config.stack_name,
        resources = plan.provisioning.len(),
        "applying template"
    );
    let record = engine
        .apply(&config.stack_name.0, &synthesis.template, &plan.order())
        .await
        .context("provisioning failed")?;

    let missing = record.missing_environment_variables();
    if let Some(var) = missing.first() {
        return Err(DeploymentError::MissingEnvironmentVariable((*var).to_string()).into());
    }
    store.save_async(&record).await?;
    reporter.success("stack deployed");

    Ok(match previous {
        None => DeployOutcome::Created { record },
        Some(prev) => DeployOutcome::Updated {
            changes: diff(&prev.template, &synthesis.template),
            record,
        },
    })
}
