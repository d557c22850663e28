//! Test fixtures
//!
//! Factory functions for creating test data with sensible defaults.
//! Each fixture function creates a valid entity that can be customized.

use std::collections::BTreeSet;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::entities::{
    Assignment, ChallengeCategory, ExpertiseArea, ExpertiseScores, FundId, FundPreferences,
    MatchTier, Proposal, ProposalId, ReviewScope, Review, ReviewId, ReviewStatus, ReviewerId,
    ReviewerProfile, DEFAULT_MIN_REQUIRED_REVIEWS,
};

/// Build a tag set from string literals
pub fn tags(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Create a test reviewer with default values
pub fn test_reviewer() -> ReviewerProfile {
    ReviewerProfile {
        id: ReviewerId(Uuid::new_v4()),
        name: "test-reviewer".to_string(),
        primary_expertise: ExpertiseArea::Technical,
        expertise: ExpertiseScores::new(4, 2, 1),
        interests: BTreeSet::new(),
        affiliated_proposals: BTreeSet::new(),
        active_reviews: 0,
        max_capacity: 10,
        active_peer_reviews: 0,
        is_active: true,
    }
}

/// Create a test reviewer with a primary area and interest tags
pub fn test_reviewer_with(area: ExpertiseArea, interests: &[&str]) -> ReviewerProfile {
    ReviewerProfile {
        primary_expertise: area,
        interests: tags(interests),
        ..test_reviewer()
    }
}

/// Create a test reviewer with a specific capacity and load
pub fn test_reviewer_with_capacity(max_capacity: u32, active_reviews: u32) -> ReviewerProfile {
    ReviewerProfile {
        max_capacity,
        active_reviews,
        ..test_reviewer()
    }
}

/// Create a test proposal with default values
pub fn test_proposal() -> Proposal {
    Proposal {
        id: ProposalId(Uuid::new_v4()),
        fund_id: FundId(Uuid::new_v4()),
        title: "Test Proposal".to_string(),
        category: ChallengeCategory::OpenSource,
        primary_tag: "infrastructure".to_string(),
        detailed_tags: BTreeSet::new(),
        current_reviews: 0,
        min_required_reviews: DEFAULT_MIN_REQUIRED_REVIEWS,
        requested_funding: 10_000.0,
    }
}

/// Create a test proposal in a category with detailed tags
pub fn test_proposal_in(category: ChallengeCategory, detailed_tags: &[&str]) -> Proposal {
    Proposal {
        category,
        detailed_tags: tags(detailed_tags),
        ..test_proposal()
    }
}

/// Create a test proposal inside a fund
pub fn test_proposal_for_fund(fund_id: FundId, category: ChallengeCategory) -> Proposal {
    Proposal {
        fund_id,
        category,
        ..test_proposal()
    }
}

/// Create a test proposal with review counters set
pub fn test_proposal_with_reviews(current_reviews: u32, min_required_reviews: u32) -> Proposal {
    Proposal {
        current_reviews,
        min_required_reviews,
        ..test_proposal()
    }
}

/// Create fund preferences with the given scope and nothing excluded
pub fn test_preferences(
    reviewer_id: ReviewerId,
    fund_id: FundId,
    scope: ReviewScope,
) -> FundPreferences {
    FundPreferences {
        reviewer_id,
        fund_id,
        scope,
        max_reviews: None,
        selected_categories: BTreeSet::new(),
        excluded_proposals: BTreeSet::new(),
    }
}

/// Create a submitted review with a rating
pub fn test_submitted_review(
    proposal_id: ProposalId,
    reviewer_id: ReviewerId,
    rating: f64,
) -> Review {
    Review {
        id: ReviewId(Uuid::new_v4()),
        proposal_id,
        reviewer_id,
        status: ReviewStatus::Submitted,
        rating: Some(rating),
    }
}

/// Create a review that is still being written
pub fn test_draft_review(proposal_id: ProposalId, reviewer_id: ReviewerId) -> Review {
    Review {
        id: ReviewId(Uuid::new_v4()),
        proposal_id,
        reviewer_id,
        status: ReviewStatus::InProgress,
        rating: None,
    }
}

/// Create an open assignment record
pub fn test_assignment(reviewer_id: ReviewerId, proposal: &Proposal) -> Assignment {
    Assignment::new(
        reviewer_id,
        proposal.id,
        proposal.fund_id,
        MatchTier::Direct,
        Utc::now(),
        7,
    )
}
