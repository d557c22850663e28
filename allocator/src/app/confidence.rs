//! Review confidence scoring
//!
//! How far a proposal's current review set can be trusted, combining review
//! coverage with the reviewers' expertise in the proposal's category. Pure
//! and recomputed on demand.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::entities::{
    ChallengeCategory, Proposal, ProposalId, ReviewerProfile, MAX_EXPERTISE_LEVEL,
};
use crate::domain::ports::{ProposalRepository, ReviewRepository, ReviewerRepository};
use crate::error::AllocationError;

/// A reviewer and the rating they gave
#[derive(Debug, Clone)]
pub struct RatedReview {
    pub reviewer: ReviewerProfile,
    pub rating: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceBreakdown {
    /// Reviews collected relative to the minimum, capped at 1
    pub coverage: f64,
    /// Mean normalized expertise of the reviewers
    pub expertise: f64,
    pub confidence: f64,
    /// Mean rating, `None` without reviews
    pub mean_rating: Option<f64>,
}

/// Reviewer's expertise for a category on a 0-1 scale.
///
/// Uses the sub-score of the category's family, or the strongest sub-score
/// for categories without one.
pub fn expertise_score(reviewer: &ReviewerProfile, category: ChallengeCategory) -> f64 {
    let level = match category.family() {
        Some(area) => reviewer.expertise.level(area),
        None => reviewer.expertise.max_level(),
    };
    f64::from(level) / f64::from(MAX_EXPERTISE_LEVEL)
}

pub fn confidence_breakdown(proposal: &Proposal, reviews: &[RatedReview]) -> ConfidenceBreakdown {
    if reviews.is_empty() {
        return ConfidenceBreakdown {
            coverage: 0.0,
            expertise: 0.0,
            confidence: 0.0,
            mean_rating: None,
        };
    }

    let count = reviews.len() as f64;
    let coverage = if proposal.min_required_reviews == 0 {
        1.0
    } else {
        (count / f64::from(proposal.min_required_reviews)).min(1.0)
    };
    let expertise = reviews
        .iter()
        .map(|r| expertise_score(&r.reviewer, proposal.category))
        .sum::<f64>()
        / count;
    let mean_rating = reviews.iter().map(|r| r.rating).sum::<f64>() / count;

    ConfidenceBreakdown {
        coverage,
        expertise,
        confidence: (0.5 * coverage + 0.5 * expertise).clamp(0.0, 1.0),
        mean_rating: Some(mean_rating),
    }
}

/// Confidence in [0, 1]; 0 without reviews
pub fn compute_confidence(proposal: &Proposal, reviews: &[RatedReview]) -> f64 {
    confidence_breakdown(proposal, reviews).confidence
}

/// Loads a proposal's submitted, rated reviews and scores them
pub struct ConfidenceService<PR, RVR, RR>
where
    PR: ProposalRepository,
    RVR: ReviewRepository,
    RR: ReviewerRepository,
{
    proposals: Arc<PR>,
    reviews: Arc<RVR>,
    reviewers: Arc<RR>,
}

impl<PR, RVR, RR> ConfidenceService<PR, RVR, RR>
where
    PR: ProposalRepository,
    RVR: ReviewRepository,
    RR: ReviewerRepository,
{
    pub fn new(proposals: Arc<PR>, reviews: Arc<RVR>, reviewers: Arc<RR>) -> Self {
        Self {
            proposals,
            reviews,
            reviewers,
        }
    }

    pub async fn for_proposal(
        &self,
        proposal_id: &ProposalId,
    ) -> Result<ConfidenceBreakdown, AllocationError> {
        let proposal = self
            .proposals
            .find_by_id(proposal_id)
            .await?
            .ok_or_else(|| AllocationError::NotFound(format!("Proposal {}", proposal_id)))?;

        let mut rated = Vec::new();
        for review in self.reviews.find_by_proposal(proposal_id).await? {
            let Some(rating) = review.rating.filter(|_| review.is_submitted()) else {
                continue;
            };
            match self.reviewers.find_by_id(&review.reviewer_id).await? {
                Some(reviewer) => rated.push(RatedReview { reviewer, rating }),
                None => tracing::warn!(
                    review_id = %review.id,
                    reviewer_id = %review.reviewer_id,
                    "Review author not found, skipping"
                ),
            }
        }

        Ok(confidence_breakdown(&proposal, &rated))
    }
}
