//! Assignment domain entity
//!
//! A reviewer's obligation to review one proposal. Only the allocator creates
//! assignments; a (reviewer, proposal) pair is assigned at most once.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::fund::FundId;
use super::proposal::ProposalId;
use super::reviewer::ReviewerId;

/// Unique identifier for an assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentId(pub Uuid);

impl AssignmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AssignmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AssignmentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Priority bucket a proposal was allocated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    /// Reviewer's primary expertise covers the proposal's category
    Direct,
    /// An adjacent expertise area covers the category
    Related,
    /// Everything else
    Other,
}

impl MatchTier {
    pub const ALL: [MatchTier; 3] = [MatchTier::Direct, MatchTier::Related, MatchTier::Other];
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchTier::Direct => write!(f, "direct"),
            MatchTier::Related => write!(f, "related"),
            MatchTier::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for MatchTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" => Ok(MatchTier::Direct),
            "related" => Ok(MatchTier::Related),
            "other" => Ok(MatchTier::Other),
            _ => Err(format!("Unknown match tier: {}", s)),
        }
    }
}

/// Assignment lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Assigned,
    InProgress,
    Submitted,
    Expired,
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignmentStatus::Assigned => write!(f, "assigned"),
            AssignmentStatus::InProgress => write!(f, "in_progress"),
            AssignmentStatus::Submitted => write!(f, "submitted"),
            AssignmentStatus::Expired => write!(f, "expired"),
        }
    }
}

impl std::str::FromStr for AssignmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "assigned" => Ok(AssignmentStatus::Assigned),
            "in_progress" | "inprogress" => Ok(AssignmentStatus::InProgress),
            "submitted" => Ok(AssignmentStatus::Submitted),
            "expired" => Ok(AssignmentStatus::Expired),
            _ => Err(format!("Unknown assignment status: {}", s)),
        }
    }
}

/// A finalized assignment record, as handed to the assignment sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub reviewer_id: ReviewerId,
    pub proposal_id: ProposalId,
    pub fund_id: FundId,
    pub tier: MatchTier,
    pub assigned_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub status: AssignmentStatus,
}

impl Assignment {
    /// Build a fresh record for a committed pick
    pub fn new(
        reviewer_id: ReviewerId,
        proposal_id: ProposalId,
        fund_id: FundId,
        tier: MatchTier,
        assigned_at: DateTime<Utc>,
        due_in_days: i64,
    ) -> Self {
        Self {
            id: AssignmentId::new(),
            reviewer_id,
            proposal_id,
            fund_id,
            tier,
            assigned_at,
            due_date: assigned_at + Duration::days(due_in_days),
            status: AssignmentStatus::Assigned,
        }
    }

    /// Check if the assignment still occupies a reviewer slot
    pub fn is_open(&self) -> bool {
        matches!(
            self.status,
            AssignmentStatus::Assigned | AssignmentStatus::InProgress
        )
    }
}
