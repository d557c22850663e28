//! Allocation configuration constants
//!
//! Defaults for capacities, panel sizes and persistence behaviour, plus the
//! `AllocationSettings` value every service receives explicitly.

use super::match_scorer::ExpertiseMatrix;

/// Assignments per reviewer per pass for scopes without their own cap
pub const DEFAULT_REVIEW_CAPACITY: u32 = 5;

/// Minimum number of peer evaluators on a panel
pub const MIN_PEER_REVIEWS: usize = 2;

/// Open peer evaluations per reviewer (2/3 of a total capacity of 9)
pub const MAX_PEER_REVIEW_CAPACITY: u32 = 6;

/// Days between assignment and due date
pub const REVIEW_DUE_DAYS: i64 = 7;

/// Days between peer evaluation assignment and due date
pub const PEER_REVIEW_DUE_DAYS: i64 = 7;

/// Sink attempts per batch (first try plus one retry)
pub const PERSIST_ATTEMPTS: u32 = 2;

/// Runtime knobs shared by all allocation services
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationSettings {
    pub default_capacity: u32,
    pub min_peer_reviews: usize,
    pub max_peer_review_capacity: u32,
    pub review_due_days: i64,
    pub peer_review_due_days: i64,
    pub persist_attempts: u32,
    pub matrix: ExpertiseMatrix,
}

impl Default for AllocationSettings {
    fn default() -> Self {
        Self {
            default_capacity: DEFAULT_REVIEW_CAPACITY,
            min_peer_reviews: MIN_PEER_REVIEWS,
            max_peer_review_capacity: MAX_PEER_REVIEW_CAPACITY,
            review_due_days: REVIEW_DUE_DAYS,
            peer_review_due_days: PEER_REVIEW_DUE_DAYS,
            persist_attempts: PERSIST_ATTEMPTS,
            matrix: ExpertiseMatrix::default(),
        }
    }
}

impl AllocationSettings {
    /// Sink attempts, never fewer than one
    pub fn attempts(&self) -> u32 {
        self.persist_attempts.max(1)
    }
}
