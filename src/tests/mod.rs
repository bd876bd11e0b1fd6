//! Test Modules
//!
//! Engine-level suites that cross module boundaries; unit tests live in
//! `#[cfg(test)]` modules next to the code they exercise.

pub mod server_integration_tests;
