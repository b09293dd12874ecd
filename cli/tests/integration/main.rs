//! Integration tests for vpcforge CLI
//!
//! These tests spawn the actual binary and test end-to-end behavior.
//! Zones are always passed with `--zones` so no test needs the `aws` CLI.

mod add_vpc;
mod cli_tests;
