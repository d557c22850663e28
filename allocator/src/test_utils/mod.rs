//! Test utilities
//!
//! Manual mock implementations and test fixtures for unit testing.
//!
//! The mocks keep one lock per row rather than one lock per table, so
//! concurrent tests exercise the same check-and-increment races the database
//! adapters resolve with conditional updates.

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
