//! Per-component declarations. Each component takes its inputs plus the
//! handles of what it depends on, declares into a `Topology`, and returns a
//! handle for its dependents.

pub mod beanstalk;
pub mod database;
pub mod iam;
pub mod network;
pub mod secret;
