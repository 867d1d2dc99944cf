//! Integration tests for the threetier CLI
//!
//! These tests spawn the actual binary in a scratch working directory and
//! test end-to-end behavior.

mod cli_tests;
mod config_command;
mod lifecycle;
mod support;
mod synth_command;
