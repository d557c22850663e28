//! Review allocator
//!
//! Assigns grant-proposal reviewers to proposals within a fund, assembles
//! peer panels for submitted reviews and scores review confidence.
//! Uses hexagonal (ports & adapters) architecture: the `app` services depend
//! only on the `domain::ports` traits, and `adapters` implements them on
//! PostgreSQL.

pub mod adapters;
pub mod app;
pub mod config;
pub mod domain;
pub mod entity;
pub mod error;

#[cfg(test)]
pub mod test_utils;

pub use app::{
    compute_confidence, AllocationSettings, BulkAssignmentService, IndividualAssignmentService,
    PeerPanelService,
};
pub use error::{AllocationError, DomainError};
