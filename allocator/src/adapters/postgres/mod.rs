//! PostgreSQL adapters
//!
//! Implementations of repository traits using SeaORM and PostgreSQL.
//! Counter increments are single conditional `UPDATE` statements, so the cap
//! is checked against the row at increment time.

pub mod assignment_repo;
pub mod peer_evaluation_repo;
pub mod preference_repo;
pub mod proposal_repo;
pub mod review_repo;
pub mod reviewer_repo;


pub use assignment_repo::PostgresAssignmentRepository;
pub use peer_evaluation_repo::PostgresPeerEvaluationRepository;
pub use preference_repo::PostgresPreferenceRepository;
pub use proposal_repo::PostgresProposalRepository;
pub use review_repo::PostgresReviewRepository;
pub use reviewer_repo::PostgresReviewerRepository;

use sea_orm::{DbErr, SqlErr};
use serde::de::DeserializeOwned;

use crate::error::DomainError;

/// Decode a JSONB column, treating malformed values as empty
fn from_json<T: DeserializeOwned + Default>(value: serde_json::Value) -> T {
    serde_json::from_value(value).unwrap_or_default()
}

/// Map a write error, surfacing unique constraint violations as `AlreadyExists`
fn write_error(e: DbErr) -> DomainError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) => DomainError::AlreadyExists(msg),
        _ => DomainError::Database(e.to_string()),
    }
}

/// Non-negative database integer as a counter
fn counter(value: i32) -> u32 {
    value.max(0) as u32
}
