//! Command implementations

pub mod check;
pub mod config;
pub mod deploy;
pub mod destroy;
pub mod diff;
pub mod plan;
pub mod synth;
pub mod version;
