//! Application service: teardown use-case.

use anyhow::Result;

use crate::application::ports::{DeploymentStateStore, ProgressReporter, ProvisioningEngine};
use crate::application::services::plan_service;
use crate::domain::deployment::{DeploymentRecord, TeardownOutcome};
use crate::domain::error::DeploymentError;

/// Load the recorded deployment for display before confirming teardown.
///
/// # Errors
///
/// Returns `DeploymentError::NotDeployed` if nothing is recorded.
pub async fn recorded(store: &impl DeploymentStateStore) -> Result<DeploymentRecord> {
    store
        .load_async()
        .await?
        .ok_or_else(|| DeploymentError::NotDeployed.into())
}

/// Tear the recorded deployment down in reverse dependency order.
///
/// Fails without deleting anything while a deletion-protected resource
/// remains; the record is kept so the stack can be redeployed with
/// protection disabled.
///
/// # Errors
///
/// Returns an error if nothing is deployed, a resource is protected, or the
/// engine fails.
pub async fn destroy(
    engine: &impl ProvisioningEngine,
    store: &impl DeploymentStateStore,
    reporter: &impl ProgressReporter,
) -> Result<TeardownOutcome> {
    let record = recorded(store).await?;

    if let Some(protected) = record.protected_resources().first() {
        tracing::warn!(
            resource = %protected.logical_id,
            "teardown blocked by deletion protection"
        );
        return Err(DeploymentError::DeletionProtected {
            logical_id: protected.logical_id.clone(),
            physical_id: protected.physical_id.clone(),
        }
        .into());
    }

    let plan = plan_service::plan(&record.template)?;
    reporter.step(&format!("deleting {} resources...", plan.teardown.len()));
    let outcome = engine.destroy(&record, &plan.teardown).await?;
    store.clear_async().await?;

    for id in &outcome.snapshots {
        reporter.warn(&format!("final snapshot of {id} retained"));
    }
    reporter.success("stack destroyed");
    tracing::info!(stack = %record.stack_name, deleted = outcome.deleted.len(), "teardown complete");
    Ok(outcome)
}
