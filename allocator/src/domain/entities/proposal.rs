//! Proposal domain entity
//!
//! A grant proposal waiting for reviews in a fund.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::expertise::ChallengeCategory;
use super::fund::FundId;

/// Unique identifier for a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProposalId(pub Uuid);

impl ProposalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProposalId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ProposalId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ProposalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Default number of reviews a proposal needs
pub const DEFAULT_MIN_REQUIRED_REVIEWS: u32 = 5;

/// A proposal open for review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub fund_id: FundId,
    pub title: String,
    pub category: ChallengeCategory,
    pub primary_tag: String,
    pub detailed_tags: BTreeSet<String>,
    /// Committed review assignments
    pub current_reviews: u32,
    pub min_required_reviews: u32,
    pub requested_funding: f64,
}

impl Proposal {
    /// Check if the proposal still needs reviews
    pub fn needs_reviews(&self) -> bool {
        self.current_reviews < self.min_required_reviews
    }

    /// Reviews still missing before the minimum is met
    pub fn review_deficit(&self) -> u32 {
        self.min_required_reviews
            .saturating_sub(self.current_reviews)
    }
}
