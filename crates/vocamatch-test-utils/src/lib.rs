//! Shared fixtures for Vocamatch tests.

pub mod fixtures;

pub use fixtures::*;
pub use pretty_assertions;
