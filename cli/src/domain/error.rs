//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to stack configuration keys and values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\nValid values: {valid}")]
    InvalidValue {
        key: String,
        value: String,
        valid: String,
    },

    #[error("Stack configuration is invalid:\n{0}")]
    ValidationFailed(String),
}

// ── Declaration errors ────────────────────────────────────────────────────────

/// Errors raised while building resource declarations.
#[derive(Debug, Error)]
pub enum DeclarationError {
    #[error("Logical id '{0}' is declared twice")]
    DuplicateLogicalId(String),

    #[error("Policy statement grants {actions} on a wildcard resource; scope it to a concrete locator")]
    WildcardScope { actions: String },

    #[error("Policy statement grants {actions} on no resources")]
    EmptyScope { actions: String },

    #[error("Invalid CIDR block '{0}'")]
    InvalidCidr(String),

    #[error("CIDR block {cidr} cannot hold {needed} subnets")]
    CidrExhausted { cidr: String, needed: u32 },

    #[error("Network '{0}' must span at least one availability zone")]
    NoAvailabilityZones(String),

    #[error("'{logical_id}' has a Tags property that is not a list of Key/Value pairs")]
    MalformedTags { logical_id: String },
}

// ── Topology errors ───────────────────────────────────────────────────────────

/// Errors found in the reference graph of a synthesized template.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("'{from}' references undeclared resource '{to}'")]
    Dangling { from: String, to: String },

    #[error("Reference cycle between: {}", .0.join(", "))]
    Cycle(Vec<String>),

    #[error("Resource '{0}' is not declared in this stack")]
    UnknownResource(String),
}

// ── Deployment errors ─────────────────────────────────────────────────────────

/// Errors surfaced while rehearsing deployment or teardown.
#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("No deployment recorded. Run 'threetier deploy' first.")]
    NotDeployed,

    #[error(
        "Resource '{logical_id}' ({physical_id}) has deletion protection enabled. \
Disable it (threetier config set database.deletion_protection false), redeploy, then destroy."
    )]
    DeletionProtected {
        logical_id: String,
        physical_id: String,
    },

    #[error("Cannot resolve value for '{logical_id}': {reason}")]
    Unresolved { logical_id: String, reason: String },

    #[error("Environment variable {0} is missing or empty after resolution")]
    MissingEnvironmentVariable(String),

    #[error("{0} topology check(s) failed. Run 'threetier check' for details.")]
    ChecksFailed(usize),
}
