//! Assignment committer
//!
//! Turns an allocation plan into durable assignments. Each pick reserves a
//! proposal slot and a reviewer slot through the store's atomic
//! check-and-increment; rejected picks are backfilled from the plan's
//! reserves of the same tier. The finished batch goes to the assignment sink
//! with a bounded retry, and every reservation is released if it never lands.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;

use super::allocation_config::AllocationSettings;
use super::retry::persist_with_retry;
use super::tiered_allocator::{AllocationPlan, RankedCandidate};
use crate::domain::entities::{Assignment, AssignmentId, FundId, ProposalId, ReviewerId};
use crate::domain::ports::{AssignmentRepository, ProposalRepository, ReviewerRepository};
use crate::error::{AllocationError, DomainError};

/// What happened to a plan at commit time
#[derive(Debug, Clone, Default)]
pub struct CommitOutcome {
    /// Records accepted by the sink
    pub assignments: Vec<Assignment>,
    /// Picks (and replacements) rejected because the proposal filled up
    pub rejected: usize,
    /// Replacements that took the place of a rejected pick
    pub backfilled: usize,
    /// Rejected picks with no same-tier replacement left
    pub unfilled: usize,
    /// The reviewer's own counter refused further assignments
    pub reviewer_saturated: bool,
}

enum SlotReservation {
    Reserved,
    ProposalFull,
    ReviewerFull,
}

/// Commits plans against the store
pub struct AssignmentCommitter<RR, PR, AR>
where
    RR: ReviewerRepository,
    PR: ProposalRepository,
    AR: AssignmentRepository,
{
    reviewers: Arc<RR>,
    proposals: Arc<PR>,
    assignments: Arc<AR>,
    settings: AllocationSettings,
}

impl<RR, PR, AR> AssignmentCommitter<RR, PR, AR>
where
    RR: ReviewerRepository,
    PR: ProposalRepository,
    AR: AssignmentRepository,
{
    pub fn new(
        reviewers: Arc<RR>,
        proposals: Arc<PR>,
        assignments: Arc<AR>,
        settings: AllocationSettings,
    ) -> Self {
        Self {
            reviewers,
            proposals,
            assignments,
            settings,
        }
    }

    pub fn settings(&self) -> &AllocationSettings {
        &self.settings
    }

    /// Proposals the reviewer already holds in this fund
    pub async fn already_assigned(
        &self,
        reviewer_id: &ReviewerId,
        fund_id: &FundId,
    ) -> Result<HashSet<ProposalId>, AllocationError> {
        Ok(self
            .assignments
            .find_proposal_ids_by_reviewer(reviewer_id, fund_id)
            .await?)
    }

    /// Build unsaved records for a plan's picks (used by dry runs)
    pub fn preview(&self, fund_id: &FundId, plan: &AllocationPlan) -> Vec<Assignment> {
        let now = Utc::now();
        plan.picks()
            .iter()
            .map(|c| {
                Assignment::new(
                    plan.reviewer_id,
                    c.proposal_id,
                    *fund_id,
                    c.tier,
                    now,
                    self.settings.review_due_days,
                )
            })
            .collect()
    }

    /// Reserve, record and persist the plan's picks.
    ///
    /// Store errors and sink failures release every reservation taken so far
    /// before being returned.
    pub async fn commit(
        &self,
        fund_id: &FundId,
        plan: &AllocationPlan,
    ) -> Result<CommitOutcome, AllocationError> {
        let reviewer_id = plan.reviewer_id;
        let mut outcome = CommitOutcome::default();
        let mut reserved: Vec<RankedCandidate> = Vec::new();
        let mut spare: Vec<&RankedCandidate> = plan.reserves().iter().collect();
        let mut queue: VecDeque<(&RankedCandidate, bool)> =
            plan.picks().iter().map(|c| (c, false)).collect();

        while let Some((candidate, is_replacement)) = queue.pop_front() {
            let reservation = match self.reserve_slot(&reviewer_id, &candidate.proposal_id).await {
                Ok(reservation) => reservation,
                Err(e) => {
                    tracing::error!(
                        reviewer_id = %reviewer_id,
                        proposal_id = %candidate.proposal_id,
                        error = %e,
                        "Store error while reserving assignment slot"
                    );
                    self.release_all(&reviewer_id, &reserved).await;
                    return Err(e.into());
                }
            };

            match reservation {
                SlotReservation::Reserved => {
                    if is_replacement {
                        outcome.backfilled += 1;
                    }
                    reserved.push(candidate.clone());
                }
                SlotReservation::ProposalFull => {
                    outcome.rejected += 1;
                    tracing::debug!(
                        reviewer_id = %reviewer_id,
                        proposal_id = %candidate.proposal_id,
                        tier = %candidate.tier,
                        "Proposal filled up before commit"
                    );
                    match spare.iter().position(|c| c.tier == candidate.tier) {
                        Some(pos) => queue.push_front((spare.remove(pos), true)),
                        None => outcome.unfilled += 1,
                    }
                }
                SlotReservation::ReviewerFull => {
                    tracing::debug!(reviewer_id = %reviewer_id, "Reviewer reached capacity during commit");
                    outcome.reviewer_saturated = true;
                    break;
                }
            }
        }

        if reserved.is_empty() {
            return Ok(outcome);
        }

        let now = Utc::now();
        let records: Vec<Assignment> = reserved
            .iter()
            .map(|c| {
                Assignment::new(
                    reviewer_id,
                    c.proposal_id,
                    *fund_id,
                    c.tier,
                    now,
                    self.settings.review_due_days,
                )
            })
            .collect();

        let ids: Vec<AssignmentId> = records.iter().map(|a| a.id).collect();
        let written = persist_with_retry(
            self.settings.attempts(),
            "assignments",
            records.len(),
            || self.assignments.create_many(&records),
            || self.batch_stored(&ids),
        )
        .await;
        if let Err(e) = written {
            self.release_all(&reviewer_id, &reserved).await;
            return Err(e);
        }

        outcome.assignments = records;
        Ok(outcome)
    }

    /// Whether every record of a batch is already in the sink
    async fn batch_stored(&self, ids: &[AssignmentId]) -> Result<bool, DomainError> {
        let stored = self.assignments.find_existing_ids(ids).await?;
        Ok(stored.len() == ids.len())
    }

    /// Proposal first, then reviewer. A full reviewer hands the proposal slot back.
    async fn reserve_slot(
        &self,
        reviewer_id: &ReviewerId,
        proposal_id: &ProposalId,
    ) -> Result<SlotReservation, DomainError> {
        if !self.proposals.try_increment_reviews(proposal_id).await? {
            return Ok(SlotReservation::ProposalFull);
        }

        match self.reviewers.try_increment_active_reviews(reviewer_id).await {
            Ok(true) => Ok(SlotReservation::Reserved),
            Ok(false) => {
                self.proposals.release_review(proposal_id).await?;
                Ok(SlotReservation::ReviewerFull)
            }
            Err(e) => {
                if let Err(release_err) = self.proposals.release_review(proposal_id).await {
                    tracing::error!(
                        proposal_id = %proposal_id,
                        error = %release_err,
                        "Failed to release proposal slot"
                    );
                }
                Err(e)
            }
        }
    }

    async fn release_all(&self, reviewer_id: &ReviewerId, reserved: &[RankedCandidate]) {
        for candidate in reserved {
            if let Err(e) = self.proposals.release_review(&candidate.proposal_id).await {
                tracing::error!(
                    proposal_id = %candidate.proposal_id,
                    error = %e,
                    "Failed to release proposal slot"
                );
            }
            if let Err(e) = self.reviewers.release_active_review(reviewer_id).await {
                tracing::error!(reviewer_id = %reviewer_id, error = %e, "Failed to release reviewer slot");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::match_scorer::ExpertiseMatrix;
    use crate::app::tiered_allocator::TieredAllocator;
    use crate::domain::entities::{
        ChallengeCategory, ExpertiseArea, MatchTier, Proposal, ReviewScope, ReviewerProfile,
    };
    use crate::domain::ports::ReviewerRepository;
    use crate::test_utils::*;

    type Committer = AssignmentCommitter<
        InMemoryReviewerRepository,
        InMemoryProposalRepository,
        InMemoryAssignmentRepository,
    >;

    fn setup(
        reviewer: &ReviewerProfile,
        proposals: &[Proposal],
        sink: InMemoryAssignmentRepository,
    ) -> (
        Committer,
        Arc<InMemoryReviewerRepository>,
        Arc<InMemoryProposalRepository>,
        Arc<InMemoryAssignmentRepository>,
    ) {
        let reviewers = Arc::new(InMemoryReviewerRepository::new().with_reviewer(reviewer.clone()));
        let proposal_repo = Arc::new(
            proposals
                .iter()
                .cloned()
                .fold(InMemoryProposalRepository::new(), |repo, p| repo.with_proposal(p)),
        );
        let sink = Arc::new(sink);
        let committer = AssignmentCommitter::new(
            reviewers.clone(),
            proposal_repo.clone(),
            sink.clone(),
            AllocationSettings::default(),
        );
        (committer, reviewers, proposal_repo, sink)
    }

    fn plan_for(reviewer: &ReviewerProfile, proposals: &[Proposal], capacity: u32) -> AllocationPlan {
        let matrix = ExpertiseMatrix::default();
        let eligible: Vec<&Proposal> = proposals.iter().collect();
        TieredAllocator::new(&matrix).allocate(reviewer, ReviewScope::All, &eligible, capacity, 0)
    }

    // ==========================================================================
    // Happy path
    // ==========================================================================

    #[tokio::test]
    async fn test_commit_persists_and_increments_counters() {
        let reviewer = test_reviewer_with(ExpertiseArea::Technical, &[]);
        let fund_id = FundId::new();
        let proposals = vec![
            test_proposal_for_fund(fund_id, ChallengeCategory::OpenSource),
            test_proposal_for_fund(fund_id, ChallengeCategory::OpenSource),
        ];
        let (committer, reviewers, proposal_repo, sink) =
            setup(&reviewer, &proposals, InMemoryAssignmentRepository::new());

        let outcome = committer
            .commit(&fund_id, &plan_for(&reviewer, &proposals, 5))
            .await
            .expect("commit should succeed");

        assert_eq!(outcome.assignments.len(), 2);
        assert_eq!(outcome.rejected, 0);
        assert_eq!(sink.all().len(), 2);
        assert_eq!(reviewers.load(&reviewer.id).0, 2);
        for p in &proposals {
            assert_eq!(proposal_repo.reviews_of(&p.id), 1);
        }

        let record = &outcome.assignments[0];
        assert_eq!(record.fund_id, fund_id);
        assert_eq!(record.due_date - record.assigned_at, chrono::Duration::days(7));
    }

    // ==========================================================================
    // Contention
    // ==========================================================================

    #[tokio::test]
    async fn test_full_proposal_is_backfilled_from_same_tier() {
        let reviewer = test_reviewer_with(ExpertiseArea::Technical, &["defi"]);
        let fund_id = FundId::new();
        let mut full = test_proposal_for_fund(fund_id, ChallengeCategory::OpenSource);
        full.detailed_tags = tags(&["defi"]);
        let spare = test_proposal_for_fund(fund_id, ChallengeCategory::OpenSource);

        // Plan from a snapshot where `full` still had room
        let plan = plan_for(&reviewer, &[full.clone(), spare.clone()], 1);
        assert_eq!(plan.picks()[0].proposal_id, full.id);

        let mut stored_full = full.clone();
        stored_full.current_reviews = stored_full.min_required_reviews;
        let (committer, _, proposal_repo, _) = setup(
            &reviewer,
            &[stored_full, spare.clone()],
            InMemoryAssignmentRepository::new(),
        );

        let outcome = committer.commit(&fund_id, &plan).await.unwrap();

        assert_eq!(outcome.rejected, 1);
        assert_eq!(outcome.backfilled, 1);
        assert_eq!(outcome.assignments.len(), 1);
        assert_eq!(outcome.assignments[0].proposal_id, spare.id);
        assert_eq!(proposal_repo.reviews_of(&spare.id), 1);
    }

    #[tokio::test]
    async fn test_rejected_pick_without_same_tier_reserve_is_dropped() {
        let reviewer = test_reviewer_with(ExpertiseArea::Technical, &[]);
        let fund_id = FundId::new();
        let direct = test_proposal_for_fund(fund_id, ChallengeCategory::OpenSource);
        let other = test_proposal_for_fund(fund_id, ChallengeCategory::Ecosystem);
        let plan = plan_for(&reviewer, &[direct.clone(), other.clone()], 1);
        assert_eq!(plan.reserves()[0].tier, MatchTier::Other);

        let mut stored_direct = direct.clone();
        stored_direct.current_reviews = stored_direct.min_required_reviews;
        let (committer, _, proposal_repo, sink) = setup(
            &reviewer,
            &[stored_direct, other.clone()],
            InMemoryAssignmentRepository::new(),
        );

        let outcome = committer.commit(&fund_id, &plan).await.unwrap();

        assert!(outcome.assignments.is_empty());
        assert_eq!(outcome.rejected, 1);
        assert_eq!(outcome.unfilled, 1);
        assert_eq!(proposal_repo.reviews_of(&other.id), 0);
        assert_eq!(sink.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_reviewer_at_capacity_stops_commit_and_releases_proposal() {
        let fund_id = FundId::new();
        let snapshot = test_reviewer_with_capacity(3, 1);
        let proposals = vec![
            test_proposal_for_fund(fund_id, ChallengeCategory::OpenSource),
            test_proposal_for_fund(fund_id, ChallengeCategory::OpenSource),
        ];
        let plan = plan_for(&snapshot, &proposals, 2);

        // Another pass filled two of the three slots in the meantime
        let stored = ReviewerProfile {
            active_reviews: 2,
            ..snapshot.clone()
        };
        let (committer, reviewers, proposal_repo, _) =
            setup(&stored, &proposals, InMemoryAssignmentRepository::new());

        let outcome = committer.commit(&fund_id, &plan).await.unwrap();

        assert_eq!(outcome.assignments.len(), 1);
        assert!(outcome.reviewer_saturated);
        assert_eq!(reviewers.load(&stored.id).0, 3);
        let total: u32 = proposals.iter().map(|p| proposal_repo.reviews_of(&p.id)).sum();
        assert_eq!(total, 1);
    }

    // ==========================================================================
    // Persistence failures
    // ==========================================================================

    #[tokio::test]
    async fn test_transient_sink_failure_is_retried() {
        let reviewer = test_reviewer();
        let fund_id = FundId::new();
        let proposals = vec![test_proposal_for_fund(fund_id, ChallengeCategory::OpenSource)];
        let (committer, _, _, sink) = setup(
            &reviewer,
            &proposals,
            InMemoryAssignmentRepository::new().with_failures(1),
        );

        let outcome = committer
            .commit(&fund_id, &plan_for(&reviewer, &proposals, 1))
            .await
            .unwrap();

        assert_eq!(outcome.assignments.len(), 1);
        assert_eq!(sink.create_calls(), 2);
        assert_eq!(sink.all().len(), 1);
    }

    #[tokio::test]
    async fn test_persistent_sink_failure_releases_every_counter() {
        let reviewer = test_reviewer();
        let fund_id = FundId::new();
        let proposals = vec![
            test_proposal_for_fund(fund_id, ChallengeCategory::OpenSource),
            test_proposal_for_fund(fund_id, ChallengeCategory::Product),
        ];
        let (committer, reviewers, proposal_repo, sink) = setup(
            &reviewer,
            &proposals,
            InMemoryAssignmentRepository::new().with_failures(2),
        );

        let result = committer
            .commit(&fund_id, &plan_for(&reviewer, &proposals, 2))
            .await;

        assert!(matches!(
            result,
            Err(AllocationError::PersistenceFailure { attempts: 2, .. })
        ));
        assert!(sink.all().is_empty());
        assert_eq!(reviewers.load(&reviewer.id).0, 0);
        for p in &proposals {
            assert_eq!(proposal_repo.reviews_of(&p.id), 0);
        }
    }

    #[tokio::test]
    async fn test_write_committed_before_error_keeps_counters() {
        let reviewer = test_reviewer();
        let fund_id = FundId::new();
        let proposals = vec![test_proposal_for_fund(fund_id, ChallengeCategory::OpenSource)];
        let (committer, reviewers, proposal_repo, sink) = setup(
            &reviewer,
            &proposals,
            InMemoryAssignmentRepository::new().with_lost_acks(1),
        );

        let outcome = committer
            .commit(&fund_id, &plan_for(&reviewer, &proposals, 1))
            .await
            .expect("the first attempt was stored");

        assert_eq!(outcome.assignments.len(), 1);
        assert_eq!(sink.create_calls(), 2);
        assert_eq!(sink.all().len(), 1);
        assert_eq!(proposal_repo.reviews_of(&proposals[0].id), 1);
        assert_eq!(reviewers.load(&reviewer.id).0, 1);
    }

    #[tokio::test]
    async fn test_duplicate_pair_is_not_retried() {
        let reviewer = test_reviewer();
        let fund_id = FundId::new();
        let proposal = test_proposal_for_fund(fund_id, ChallengeCategory::OpenSource);
        let existing = test_assignment(reviewer.id, &proposal);
        let (committer, reviewers, _, sink) = setup(
            &reviewer,
            std::slice::from_ref(&proposal),
            InMemoryAssignmentRepository::new().with_assignment(existing),
        );

        let result = committer
            .commit(&fund_id, &plan_for(&reviewer, &[proposal], 1))
            .await;

        assert!(matches!(
            result,
            Err(AllocationError::Domain(DomainError::AlreadyExists(_)))
        ));
        assert_eq!(sink.create_calls(), 1);
        assert_eq!(reviewers.load(&reviewer.id).0, 0);
    }

    #[tokio::test]
    async fn test_store_error_propagates_after_release() {
        let reviewer = test_reviewer();
        let fund_id = FundId::new();
        let proposals = vec![test_proposal_for_fund(fund_id, ChallengeCategory::OpenSource)];
        let reviewers = Arc::new(InMemoryReviewerRepository::new().with_reviewer(reviewer.clone()));
        let proposal_repo = Arc::new(
            InMemoryProposalRepository::new()
                .with_proposal(proposals[0].clone())
                .with_failing_increments(),
        );
        let committer = AssignmentCommitter::new(
            reviewers.clone(),
            proposal_repo,
            Arc::new(InMemoryAssignmentRepository::new()),
            AllocationSettings::default(),
        );

        let result = committer
            .commit(&fund_id, &plan_for(&reviewer, &proposals, 1))
            .await;

        assert!(matches!(
            result,
            Err(AllocationError::Domain(DomainError::Database(_)))
        ));
        let stored = reviewers.find_by_id(&reviewer.id).await.unwrap().unwrap();
        assert_eq!(stored.active_reviews, 0);
    }
}
