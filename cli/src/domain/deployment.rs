//! Shape of the deployment record the engine hands back after `apply`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use threetier_common::{Template, env_vars};

/// One provisioned resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedResource {
    pub logical_id: String,
    pub resource_type: String,
    /// Primary locator (`Ref` value).
    pub physical_id: String,
    /// Resolved `Fn::GetAtt` attributes, e.g. `Endpoint.Address`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub deletion_protected: bool,
}

/// Persisted result of the last successful deployment.
///
/// Never contains generated secret values; only locators and resolved
/// non-secret attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub stack_name: String,
    pub template_digest: String,
    pub deployed_at: DateTime<Utc>,
    pub template: Template,
    /// In provisioning order.
    pub resources: Vec<DeployedResource>,
    /// Resolved application environment variables of the hosting tier.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Resolved stack outputs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, String>,
}

/// Result of tearing a deployment down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownOutcome {
    /// Logical ids, in the order they were deleted.
    pub deleted: Vec<String>,
    /// Logical ids whose final snapshot was kept (`DeletionPolicy: Snapshot`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snapshots: Vec<String>,
    /// Logical ids left in place (`DeletionPolicy: Retain`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retained: Vec<String>,
}

impl DeploymentRecord {
    #[must_use]
    pub fn resource(&self, logical_id: &str) -> Option<&DeployedResource> {
        self.resources.iter().find(|r| r.logical_id == logical_id)
    }

    /// The `DB_*` variables delivered to the hosting tier.
    #[must_use]
    pub fn environment_variables(&self) -> BTreeMap<&str, &str> {
        env_vars::REQUIRED
            .iter()
            .filter_map(|k| self.environment.get(*k).map(|v| (*k, v.as_str())))
            .collect()
    }

    /// Required variables that are absent or empty.
    #[must_use]
    pub fn missing_environment_variables(&self) -> Vec<&'static str> {
        env_vars::REQUIRED
            .iter()
            .filter(|k| self.environment.get(**k).is_none_or(|v| v.trim().is_empty()))
            .copied()
            .collect()
    }

    #[must_use]
    pub fn protected_resources(&self) -> Vec<&DeployedResource> {
        self.resources.iter().filter(|r| r.deletion_protected).collect()
    }
}
