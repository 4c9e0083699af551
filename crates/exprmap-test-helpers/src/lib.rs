//! Test utilities and fixtures for exprmap
//!
//! This crate provides shared test helpers used by the integration tests
//! (tests/ directory) of exprmap-core.

pub mod assertions;
pub mod fixtures;
pub mod mocks;

use tracing_subscriber::EnvFilter;

/// Route library logs to the test output. Safe to call from every test;
/// only the first call installs the subscriber.
///
/// Set RUST_LOG=debug to see each inlining and merge.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
