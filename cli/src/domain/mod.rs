//! Domain layer: stack declaration, reference graph, checks and diffs.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`.
//! All functions are synchronous and take data in, returning data out.

pub mod checks;
pub mod config;
pub mod deployment;
pub mod diff;
pub mod error;
pub mod graph;
pub mod resources;
pub mod stack;
pub mod synth;
pub mod tags;
pub mod topology;

pub use checks::{Check, CheckReport, CheckStatus, run_checks};
pub use config::{StackConfig, Stage, validate_config_key, validate_config_value};
pub use deployment::{DeployedResource, DeploymentRecord, TeardownOutcome};
pub use diff::{Change, ChangeKind, ChangeSet, diff};
pub use error::{ConfigError, DeclarationError, DeploymentError, TopologyError};
pub use graph::DependencyGraph;
pub use topology::Topology;
