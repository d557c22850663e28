//! Mock implementations of port traits
//!
//! These are in-memory implementations that can be configured for testing.
//! They store data in memory and allow tests to verify behavior.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::domain::entities::{
    Assignment, AssignmentId, FundId, FundPreferences, PeerEvaluation, PeerEvaluationId, Proposal,
    ProposalId, Review, ReviewId, ReviewerId, ReviewerProfile,
};
use crate::domain::ports::{
    AssignmentRepository, PeerEvaluationRepository, PreferenceRepository, ProposalRepository,
    ReviewRepository, ReviewerRepository,
};
use crate::error::DomainError;

// ============================================================================
// In-Memory Reviewer Repository
// ============================================================================

/// Reviewers are not tied to funds here: every active reviewer takes part in
/// every fund.
#[derive(Default)]
pub struct InMemoryReviewerRepository {
    reviewers: Arc<RwLock<HashMap<ReviewerId, Arc<Mutex<ReviewerProfile>>>>>,
}

impl InMemoryReviewerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with a reviewer for testing
    pub fn with_reviewer(self, reviewer: ReviewerProfile) -> Self {
        self.reviewers
            .write()
            .unwrap()
            .insert(reviewer.id, Arc::new(Mutex::new(reviewer)));
        self
    }

    fn row(&self, id: &ReviewerId) -> Result<Arc<Mutex<ReviewerProfile>>, DomainError> {
        self.reviewers
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("Reviewer {}", id)))
    }

    /// Current counters of a reviewer: (active_reviews, active_peer_reviews)
    pub fn load(&self, id: &ReviewerId) -> (u32, u32) {
        let row = self.row(id).unwrap();
        let reviewer = row.lock().unwrap();
        (reviewer.active_reviews, reviewer.active_peer_reviews)
    }
}

#[async_trait]
impl ReviewerRepository for InMemoryReviewerRepository {
    async fn find_by_id(&self, id: &ReviewerId) -> Result<Option<ReviewerProfile>, DomainError> {
        let reviewers = self.reviewers.read().unwrap();
        Ok(reviewers.get(id).map(|row| row.lock().unwrap().clone()))
    }

    async fn find_active_by_fund(
        &self,
        _fund_id: &FundId,
    ) -> Result<Vec<ReviewerProfile>, DomainError> {
        let reviewers = self.reviewers.read().unwrap();
        Ok(reviewers
            .values()
            .map(|row| row.lock().unwrap().clone())
            .filter(|r| r.is_active)
            .collect())
    }

    async fn try_increment_active_reviews(&self, id: &ReviewerId) -> Result<bool, DomainError> {
        let row = self.row(id)?;
        let mut reviewer = row.lock().unwrap();
        if reviewer.active_reviews >= reviewer.max_capacity {
            return Ok(false);
        }
        reviewer.active_reviews += 1;
        Ok(true)
    }

    async fn release_active_review(&self, id: &ReviewerId) -> Result<(), DomainError> {
        let row = self.row(id)?;
        let mut reviewer = row.lock().unwrap();
        reviewer.active_reviews = reviewer.active_reviews.saturating_sub(1);
        Ok(())
    }

    async fn try_increment_peer_reviews(
        &self,
        id: &ReviewerId,
        max_peer_capacity: u32,
    ) -> Result<bool, DomainError> {
        let row = self.row(id)?;
        let mut reviewer = row.lock().unwrap();
        if reviewer.active_peer_reviews >= max_peer_capacity {
            return Ok(false);
        }
        reviewer.active_peer_reviews += 1;
        Ok(true)
    }

    async fn release_peer_review(&self, id: &ReviewerId) -> Result<(), DomainError> {
        let row = self.row(id)?;
        let mut reviewer = row.lock().unwrap();
        reviewer.active_peer_reviews = reviewer.active_peer_reviews.saturating_sub(1);
        Ok(())
    }
}

// ============================================================================
// In-Memory Proposal Repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryProposalRepository {
    proposals: Arc<RwLock<HashMap<ProposalId, Arc<Mutex<Proposal>>>>>,
    fail_increments: AtomicBool,
}

impl InMemoryProposalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with a proposal for testing
    pub fn with_proposal(self, proposal: Proposal) -> Self {
        self.proposals
            .write()
            .unwrap()
            .insert(proposal.id, Arc::new(Mutex::new(proposal)));
        self
    }

    /// Make every `try_increment_reviews` call fail with a database error
    pub fn with_failing_increments(self) -> Self {
        self.fail_increments.store(true, Ordering::SeqCst);
        self
    }

    fn row(&self, id: &ProposalId) -> Result<Arc<Mutex<Proposal>>, DomainError> {
        self.proposals
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("Proposal {}", id)))
    }

    /// Current `current_reviews` of a proposal
    pub fn reviews_of(&self, id: &ProposalId) -> u32 {
        self.row(id).unwrap().lock().unwrap().current_reviews
    }
}

#[async_trait]
impl ProposalRepository for InMemoryProposalRepository {
    async fn find_by_id(&self, id: &ProposalId) -> Result<Option<Proposal>, DomainError> {
        let proposals = self.proposals.read().unwrap();
        Ok(proposals.get(id).map(|row| row.lock().unwrap().clone()))
    }

    async fn find_open_by_fund(&self, fund_id: &FundId) -> Result<Vec<Proposal>, DomainError> {
        let proposals = self.proposals.read().unwrap();
        Ok(proposals
            .values()
            .map(|row| row.lock().unwrap().clone())
            .filter(|p| p.fund_id == *fund_id && p.needs_reviews())
            .collect())
    }

    async fn find_by_fund(&self, fund_id: &FundId) -> Result<Vec<Proposal>, DomainError> {
        let proposals = self.proposals.read().unwrap();
        Ok(proposals
            .values()
            .map(|row| row.lock().unwrap().clone())
            .filter(|p| p.fund_id == *fund_id)
            .collect())
    }

    async fn try_increment_reviews(&self, id: &ProposalId) -> Result<bool, DomainError> {
        if self.fail_increments.load(Ordering::SeqCst) {
            return Err(DomainError::Database("connection reset".to_string()));
        }
        let row = self.row(id)?;
        let mut proposal = row.lock().unwrap();
        if proposal.current_reviews >= proposal.min_required_reviews {
            return Ok(false);
        }
        proposal.current_reviews += 1;
        Ok(true)
    }

    async fn release_review(&self, id: &ProposalId) -> Result<(), DomainError> {
        let row = self.row(id)?;
        let mut proposal = row.lock().unwrap();
        proposal.current_reviews = proposal.current_reviews.saturating_sub(1);
        Ok(())
    }
}

// ============================================================================
// In-Memory Preference Repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryPreferenceRepository {
    preferences: Arc<RwLock<HashMap<(ReviewerId, FundId), FundPreferences>>>,
}

impl InMemoryPreferenceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with a preference record for testing
    pub fn with_preferences(self, preferences: FundPreferences) -> Self {
        self.preferences
            .write()
            .unwrap()
            .insert((preferences.reviewer_id, preferences.fund_id), preferences);
        self
    }
}

#[async_trait]
impl PreferenceRepository for InMemoryPreferenceRepository {
    async fn find_by_fund(&self, fund_id: &FundId) -> Result<Vec<FundPreferences>, DomainError> {
        let preferences = self.preferences.read().unwrap();
        Ok(preferences
            .values()
            .filter(|p| p.fund_id == *fund_id)
            .cloned()
            .collect())
    }

    async fn find(
        &self,
        reviewer_id: &ReviewerId,
        fund_id: &FundId,
    ) -> Result<Option<FundPreferences>, DomainError> {
        let preferences = self.preferences.read().unwrap();
        Ok(preferences.get(&(*reviewer_id, *fund_id)).cloned())
    }
}

// ============================================================================
// In-Memory Assignment Repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryAssignmentRepository {
    assignments: Arc<RwLock<Vec<Assignment>>>,
    failures_left: AtomicU32,
    lost_acks_left: AtomicU32,
    create_calls: AtomicU32,
}

impl InMemoryAssignmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with an assignment for testing
    pub fn with_assignment(self, assignment: Assignment) -> Self {
        self.assignments.write().unwrap().push(assignment);
        self
    }

    /// Fail the next `count` calls to `create_many` with a database error
    pub fn with_failures(self, count: u32) -> Self {
        self.failures_left.store(count, Ordering::SeqCst);
        self
    }

    /// Store the next `count` batches but report a database error for them,
    /// like a connection dropping after the commit
    pub fn with_lost_acks(self, count: u32) -> Self {
        self.lost_acks_left.store(count, Ordering::SeqCst);
        self
    }

    /// Every stored assignment
    pub fn all(&self) -> Vec<Assignment> {
        self.assignments.read().unwrap().clone()
    }

    /// Number of `create_many` calls, failed ones included
    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryAssignmentRepository {
    async fn create_many(&self, assignments: &[Assignment]) -> Result<(), DomainError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(DomainError::Database("assignment sink unavailable".to_string()));
        }

        let mut stored = self.assignments.write().unwrap();
        let mut pairs: HashSet<(ReviewerId, ProposalId)> = stored
            .iter()
            .map(|a| (a.reviewer_id, a.proposal_id))
            .collect();
        for assignment in assignments {
            if !pairs.insert((assignment.reviewer_id, assignment.proposal_id)) {
                return Err(DomainError::AlreadyExists(format!(
                    "Assignment of proposal {} to reviewer {}",
                    assignment.proposal_id, assignment.reviewer_id
                )));
            }
        }
        stored.extend(assignments.iter().cloned());

        let lost = self
            .lost_acks_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lost {
            return Err(DomainError::Database("connection closed after commit".to_string()));
        }
        Ok(())
    }

    async fn find_proposal_ids_by_reviewer(
        &self,
        reviewer_id: &ReviewerId,
        fund_id: &FundId,
    ) -> Result<HashSet<ProposalId>, DomainError> {
        let stored = self.assignments.read().unwrap();
        Ok(stored
            .iter()
            .filter(|a| a.reviewer_id == *reviewer_id && a.fund_id == *fund_id)
            .map(|a| a.proposal_id)
            .collect())
    }

    async fn find_by_proposal(
        &self,
        proposal_id: &ProposalId,
    ) -> Result<Vec<Assignment>, DomainError> {
        let stored = self.assignments.read().unwrap();
        Ok(stored
            .iter()
            .filter(|a| a.proposal_id == *proposal_id)
            .cloned()
            .collect())
    }

    async fn find_existing_ids(
        &self,
        ids: &[AssignmentId],
    ) -> Result<HashSet<AssignmentId>, DomainError> {
        let stored = self.assignments.read().unwrap();
        Ok(stored
            .iter()
            .map(|a| a.id)
            .filter(|id| ids.contains(id))
            .collect())
    }
}

// ============================================================================
// In-Memory Review Repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryReviewRepository {
    reviews: Arc<RwLock<HashMap<ReviewId, Review>>>,
}

impl InMemoryReviewRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with a review for testing
    pub fn with_review(self, review: Review) -> Self {
        self.reviews.write().unwrap().insert(review.id, review);
        self
    }
}

#[async_trait]
impl ReviewRepository for InMemoryReviewRepository {
    async fn find_by_id(&self, id: &ReviewId) -> Result<Option<Review>, DomainError> {
        let reviews = self.reviews.read().unwrap();
        Ok(reviews.get(id).cloned())
    }

    async fn find_by_proposal(&self, proposal_id: &ProposalId) -> Result<Vec<Review>, DomainError> {
        let reviews = self.reviews.read().unwrap();
        Ok(reviews
            .values()
            .filter(|r| r.proposal_id == *proposal_id)
            .cloned()
            .collect())
    }

    async fn find_submitted_by_proposals(
        &self,
        proposal_ids: &[ProposalId],
    ) -> Result<Vec<Review>, DomainError> {
        let reviews = self.reviews.read().unwrap();
        Ok(reviews
            .values()
            .filter(|r| r.is_submitted() && proposal_ids.contains(&r.proposal_id))
            .cloned()
            .collect())
    }
}

// ============================================================================
// In-Memory Peer Evaluation Repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryPeerEvaluationRepository {
    evaluations: Arc<RwLock<Vec<PeerEvaluation>>>,
    failures_left: AtomicU32,
    lost_acks_left: AtomicU32,
}

impl InMemoryPeerEvaluationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with a peer evaluation for testing
    pub fn with_evaluation(self, evaluation: PeerEvaluation) -> Self {
        self.evaluations.write().unwrap().push(evaluation);
        self
    }

    /// Fail the next `count` calls to `create_many` with a database error
    pub fn with_failures(self, count: u32) -> Self {
        self.failures_left.store(count, Ordering::SeqCst);
        self
    }

    /// Store the next `count` batches but report a database error for them
    pub fn with_lost_acks(self, count: u32) -> Self {
        self.lost_acks_left.store(count, Ordering::SeqCst);
        self
    }

    /// Every stored evaluation
    pub fn all(&self) -> Vec<PeerEvaluation> {
        self.evaluations.read().unwrap().clone()
    }
}

#[async_trait]
impl PeerEvaluationRepository for InMemoryPeerEvaluationRepository {
    async fn create_many(&self, evaluations: &[PeerEvaluation]) -> Result<(), DomainError> {
        let injected = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(DomainError::Database("peer evaluation sink unavailable".to_string()));
        }

        let mut stored = self.evaluations.write().unwrap();
        let mut pairs: HashSet<(ReviewId, ReviewerId)> = stored
            .iter()
            .map(|e| (e.review_id, e.evaluator_id))
            .collect();
        for evaluation in evaluations {
            if !pairs.insert((evaluation.review_id, evaluation.evaluator_id)) {
                return Err(DomainError::AlreadyExists(format!(
                    "Peer evaluation of review {} by {}",
                    evaluation.review_id, evaluation.evaluator_id
                )));
            }
        }
        stored.extend(evaluations.iter().cloned());

        let lost = self
            .lost_acks_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lost {
            return Err(DomainError::Database("connection closed after commit".to_string()));
        }
        Ok(())
    }

    async fn find_by_review(
        &self,
        review_id: &ReviewId,
    ) -> Result<Vec<PeerEvaluation>, DomainError> {
        let stored = self.evaluations.read().unwrap();
        Ok(stored
            .iter()
            .filter(|e| e.review_id == *review_id)
            .cloned()
            .collect())
    }

    async fn find_existing_ids(
        &self,
        ids: &[PeerEvaluationId],
    ) -> Result<HashSet<PeerEvaluationId>, DomainError> {
        let stored = self.evaluations.read().unwrap();
        Ok(stored
            .iter()
            .map(|e| e.id)
            .filter(|id| ids.contains(id))
            .collect())
    }
}
