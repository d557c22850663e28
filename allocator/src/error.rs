//! Unified error types for the review allocator
//!
//! This module defines error types for each layer:
//! - `DomainError`: Store and business-rule errors raised behind the ports
//! - `AllocationError`: Service layer errors (wraps domain errors for callers)
//!
//! A reviewer/proposal pair failing eligibility is not an error. It shows up as
//! an empty result or a `SkipReason` in the run report.

use thiserror::Error;

use crate::domain::entities::ReviewerId;

/// Domain layer errors - raised by port implementations
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Entity already exists: {0}")]
    AlreadyExists(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Service layer errors - returned by the allocation entry points
#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// Every planned pick was rejected by the atomic increment and no
    /// replacement candidate could be committed.
    #[error("Capacity exceeded for reviewer {reviewer_id} ({rejected} proposal(s) rejected)")]
    CapacityExceeded {
        reviewer_id: ReviewerId,
        rejected: usize,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence failed after {attempts} attempt(s): {message}")]
    PersistenceFailure { attempts: u32, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
