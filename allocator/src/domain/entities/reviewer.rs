//! Reviewer domain entity
//!
//! A reviewer profile as seen by one allocation pass. The store owns the
//! authoritative counters; this is a snapshot that may already be stale.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::expertise::{ExpertiseArea, ExpertiseScores};
use super::proposal::ProposalId;

/// Unique identifier for a reviewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReviewerId(pub Uuid);

impl ReviewerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReviewerId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ReviewerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ReviewerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reviewer taking part in a review round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewerProfile {
    pub id: ReviewerId,
    pub name: String,
    pub primary_expertise: ExpertiseArea,
    pub expertise: ExpertiseScores,
    /// Interest tags, matched against proposal detailed tags
    pub interests: BTreeSet<String>,
    /// Proposals the reviewer declared an affiliation with (conflict of interest)
    pub affiliated_proposals: BTreeSet<ProposalId>,
    /// Open primary review assignments
    pub active_reviews: u32,
    /// Primary review cap for the round
    pub max_capacity: u32,
    /// Open peer evaluations
    pub active_peer_reviews: u32,
    pub is_active: bool,
}

impl ReviewerProfile {
    /// How many more primary assignments fit under `max_capacity`
    pub fn remaining_capacity(&self) -> u32 {
        self.max_capacity.saturating_sub(self.active_reviews)
    }

    /// Check if the reviewer declared a conflict with this proposal
    pub fn is_affiliated_with(&self, proposal_id: &ProposalId) -> bool {
        self.affiliated_proposals.contains(proposal_id)
    }

    /// Check if another open peer evaluation fits under `max_peer_capacity`
    pub fn has_peer_capacity(&self, max_peer_capacity: u32) -> bool {
        self.active_peer_reviews < max_peer_capacity
    }
}
