//! Review domain entity
//!
//! A primary review written against an assignment. The allocator only reads
//! reviews: submitted ones trigger panel assembly and feed confidence scoring.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::proposal::ProposalId;
use super::reviewer::ReviewerId;

/// Unique identifier for a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewId(pub Uuid);

impl ReviewId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReviewId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ReviewId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ReviewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Review status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Assigned,
    InProgress,
    Submitted,
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewStatus::Assigned => write!(f, "assigned"),
            ReviewStatus::InProgress => write!(f, "in_progress"),
            ReviewStatus::Submitted => write!(f, "submitted"),
        }
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "assigned" => Ok(ReviewStatus::Assigned),
            "in_progress" | "inprogress" => Ok(ReviewStatus::InProgress),
            "submitted" => Ok(ReviewStatus::Submitted),
            _ => Err(format!("Unknown review status: {}", s)),
        }
    }
}

/// A primary review of a proposal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub proposal_id: ProposalId,
    pub reviewer_id: ReviewerId,
    pub status: ReviewStatus,
    /// Overall numeric rating, present once submitted
    pub rating: Option<f64>,
}

impl Review {
    pub fn is_submitted(&self) -> bool {
        self.status == ReviewStatus::Submitted
    }
}
