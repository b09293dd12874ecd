//! Unit tests for vpcforge CLI
//!
//! These tests use fakes and temp directories and run fast without
//! touching the network or the real infra root.

mod architecture;
mod config_store;
mod property_tests;
