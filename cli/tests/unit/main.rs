//! Unit tests for the threetier CLI library
//!
//! These tests use in-memory port doubles and run fast without external I/O.

mod architecture;
mod config_service;
mod deploy_service;
mod mocks;
mod property_tests;
mod scenarios;
mod teardown_service;
