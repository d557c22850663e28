//! Fund preference domain entity
//!
//! Each reviewer records exactly one preference per fund, describing which
//! proposals they are willing to review.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::expertise::ChallengeCategory;
use super::fund::FundId;
use super::proposal::ProposalId;
use super::reviewer::ReviewerId;

/// Which proposals a reviewer is willing to take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewScope {
    /// Any proposal
    All,
    /// Only proposals in `selected_categories`
    Category,
    /// Any proposal, ranked by expertise and bounded by `max_reviews`
    ExpertiseBased,
    /// Any proposal, leftover slots filled in shuffled order
    Random,
}

impl std::fmt::Display for ReviewScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewScope::All => write!(f, "all"),
            ReviewScope::Category => write!(f, "category"),
            ReviewScope::ExpertiseBased => write!(f, "expertise_based"),
            ReviewScope::Random => write!(f, "random"),
        }
    }
}

impl std::str::FromStr for ReviewScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(ReviewScope::All),
            "category" => Ok(ReviewScope::Category),
            "expertise_based" | "expertise-based" | "expertisebased" => {
                Ok(ReviewScope::ExpertiseBased)
            }
            "random" => Ok(ReviewScope::Random),
            _ => Err(format!("Unknown review scope: {}", s)),
        }
    }
}

/// A reviewer's preferences for one fund
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundPreferences {
    pub reviewer_id: ReviewerId,
    pub fund_id: FundId,
    pub scope: ReviewScope,
    /// Only meaningful for `ReviewScope::ExpertiseBased`
    pub max_reviews: Option<u32>,
    /// Only meaningful for `ReviewScope::Category`
    pub selected_categories: BTreeSet<ChallengeCategory>,
    pub excluded_proposals: BTreeSet<ProposalId>,
}

impl FundPreferences {
    /// Scope-level cap on assignments for one pass.
    ///
    /// EXPERTISE-BASED preferences use `max_reviews` (falling back to the
    /// default when unset); every other scope uses the default.
    pub fn scope_capacity(&self, default_capacity: u32) -> u32 {
        match self.scope {
            ReviewScope::ExpertiseBased => self.max_reviews.unwrap_or(default_capacity),
            _ => default_capacity,
        }
    }

    /// Check if the reviewer accepts proposals from this category
    pub fn accepts_category(&self, category: ChallengeCategory) -> bool {
        match self.scope {
            ReviewScope::Category => self.selected_categories.contains(&category),
            _ => true,
        }
    }
}
