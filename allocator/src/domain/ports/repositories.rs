//! Repository port traits
//!
//! These traits define the store the allocator reads snapshots from and
//! writes finalized records to. Implementations are provided by adapters
//! (e.g., PostgreSQL).
//!
//! The `try_increment_*` methods are the only writes to shared counters. Each
//! one is a single check-and-increment against the authoritative row, so a
//! decision made on a stale snapshot is corrected at commit time.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::domain::entities::{
    Assignment, AssignmentId, FundId, FundPreferences, PeerEvaluation, PeerEvaluationId, Proposal,
    ProposalId, Review, ReviewId, ReviewerId, ReviewerProfile,
};
use crate::error::DomainError;

/// Repository for reviewer profiles and their load counters
#[async_trait]
pub trait ReviewerRepository: Send + Sync {
    /// Find a reviewer by ID
    async fn find_by_id(&self, id: &ReviewerId) -> Result<Option<ReviewerProfile>, DomainError>;

    /// Find all active reviewers taking part in a fund
    async fn find_active_by_fund(
        &self,
        fund_id: &FundId,
    ) -> Result<Vec<ReviewerProfile>, DomainError>;

    /// Increment `active_reviews` if it is still below `max_capacity`.
    /// Returns `false` (and changes nothing) when the reviewer is full.
    async fn try_increment_active_reviews(&self, id: &ReviewerId) -> Result<bool, DomainError>;

    /// Undo one successful `try_increment_active_reviews`
    async fn release_active_review(&self, id: &ReviewerId) -> Result<(), DomainError>;

    /// Increment `active_peer_reviews` if it is still below `max_peer_capacity`
    async fn try_increment_peer_reviews(
        &self,
        id: &ReviewerId,
        max_peer_capacity: u32,
    ) -> Result<bool, DomainError>;

    /// Undo one successful `try_increment_peer_reviews`
    async fn release_peer_review(&self, id: &ReviewerId) -> Result<(), DomainError>;
}

/// Repository for proposals and their review counters
#[async_trait]
pub trait ProposalRepository: Send + Sync {
    /// Find a proposal by ID
    async fn find_by_id(&self, id: &ProposalId) -> Result<Option<Proposal>, DomainError>;

    /// Find proposals of a fund that still accept reviews
    async fn find_open_by_fund(&self, fund_id: &FundId) -> Result<Vec<Proposal>, DomainError>;

    /// Find every proposal of a fund, full ones included
    async fn find_by_fund(&self, fund_id: &FundId) -> Result<Vec<Proposal>, DomainError>;

    /// Increment `current_reviews` if it is still below `min_required_reviews`.
    /// Returns `false` (and changes nothing) when the proposal is full.
    async fn try_increment_reviews(&self, id: &ProposalId) -> Result<bool, DomainError>;

    /// Undo one successful `try_increment_reviews`
    async fn release_review(&self, id: &ProposalId) -> Result<(), DomainError>;
}

/// Repository for per-fund reviewer preferences
#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    /// All preference records of a fund (one per reviewer)
    async fn find_by_fund(&self, fund_id: &FundId) -> Result<Vec<FundPreferences>, DomainError>;

    /// The preference record of one reviewer in one fund
    async fn find(
        &self,
        reviewer_id: &ReviewerId,
        fund_id: &FundId,
    ) -> Result<Option<FundPreferences>, DomainError>;
}

/// Repository for assignment records (the assignment sink)
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Durably append a batch of assignments. All or nothing: a duplicate
    /// (reviewer, proposal) pair fails the whole batch with `AlreadyExists`.
    async fn create_many(&self, assignments: &[Assignment]) -> Result<(), DomainError>;

    /// Proposals already assigned to a reviewer within a fund
    async fn find_proposal_ids_by_reviewer(
        &self,
        reviewer_id: &ReviewerId,
        fund_id: &FundId,
    ) -> Result<HashSet<ProposalId>, DomainError>;

    /// All assignments for a proposal
    async fn find_by_proposal(&self, proposal_id: &ProposalId)
        -> Result<Vec<Assignment>, DomainError>;

    /// The subset of `ids` that is stored
    async fn find_existing_ids(
        &self,
        ids: &[AssignmentId],
    ) -> Result<HashSet<AssignmentId>, DomainError>;
}

/// Repository for primary reviews (read-only for the allocator)
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Find a review by ID
    async fn find_by_id(&self, id: &ReviewId) -> Result<Option<Review>, DomainError>;

    /// Find all reviews of a proposal
    async fn find_by_proposal(&self, proposal_id: &ProposalId) -> Result<Vec<Review>, DomainError>;

    /// Find submitted reviews of any of the given proposals
    async fn find_submitted_by_proposals(
        &self,
        proposal_ids: &[ProposalId],
    ) -> Result<Vec<Review>, DomainError>;
}

/// Repository for peer evaluations (the panel sink)
#[async_trait]
pub trait PeerEvaluationRepository: Send + Sync {
    /// Durably append a panel. All or nothing: a duplicate (review, evaluator)
    /// pair fails the whole batch with `AlreadyExists`.
    async fn create_many(&self, evaluations: &[PeerEvaluation]) -> Result<(), DomainError>;

    /// Find peer evaluations attached to a review
    async fn find_by_review(&self, review_id: &ReviewId)
        -> Result<Vec<PeerEvaluation>, DomainError>;

    /// The subset of `ids` that is stored
    async fn find_existing_ids(
        &self,
        ids: &[PeerEvaluationId],
    ) -> Result<HashSet<PeerEvaluationId>, DomainError>;
}
