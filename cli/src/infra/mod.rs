//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: config and state files,
//! template output, and the local provisioning engine.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod config;
pub mod engine;
pub mod state;
pub mod template_store;
