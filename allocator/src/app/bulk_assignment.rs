//! Bulk assignment run
//!
//! One pass over every reviewer of a fund. Reviewers are processed in a
//! seeded random order so no reviewer is systematically favoured, and the
//! seed is reported so the run can be replayed. One reviewer's failure never
//! aborts the pass.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

use super::allocation_config::AllocationSettings;
use super::assignment_committer::AssignmentCommitter;
use super::eligibility::{filter_eligible, pass_capacity};
use super::run_report::{ReviewerOutcome, RunReport, SkipReason};
use super::tiered_allocator::TieredAllocator;
use crate::domain::entities::{
    Assignment, FundId, FundPreferences, Proposal, ProposalId, ReviewerId, ReviewerProfile,
};
use crate::domain::ports::{
    AssignmentRepository, PreferenceRepository, ProposalRepository, ReviewerRepository,
};
use crate::error::AllocationError;

/// Inputs of one bulk pass: a snapshot of the fund plus run options
#[derive(Debug, Clone)]
pub struct BulkRunRequest {
    pub fund_id: FundId,
    pub reviewers: Vec<ReviewerProfile>,
    pub proposals: Vec<Proposal>,
    pub preferences: HashMap<ReviewerId, FundPreferences>,
    pub seed: u64,
    /// Plan and report without touching the store
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct BulkRunOutcome {
    pub assignments: Vec<Assignment>,
    pub report: RunReport,
}

/// Service running bulk passes for a fund
pub struct BulkAssignmentService<RR, PR, PFR, AR>
where
    RR: ReviewerRepository,
    PR: ProposalRepository,
    PFR: PreferenceRepository,
    AR: AssignmentRepository,
{
    reviewers: Arc<RR>,
    proposals: Arc<PR>,
    preferences: Arc<PFR>,
    committer: AssignmentCommitter<RR, PR, AR>,
}

impl<RR, PR, PFR, AR> BulkAssignmentService<RR, PR, PFR, AR>
where
    RR: ReviewerRepository,
    PR: ProposalRepository,
    PFR: PreferenceRepository,
    AR: AssignmentRepository,
{
    pub fn new(
        reviewers: Arc<RR>,
        proposals: Arc<PR>,
        preferences: Arc<PFR>,
        assignments: Arc<AR>,
        settings: AllocationSettings,
    ) -> Self {
        let committer =
            AssignmentCommitter::new(reviewers.clone(), proposals.clone(), assignments, settings);
        Self {
            reviewers,
            proposals,
            preferences,
            committer,
        }
    }

    /// Load a snapshot of the fund from the store
    pub async fn load_request(
        &self,
        fund_id: FundId,
        seed: u64,
        dry_run: bool,
    ) -> Result<BulkRunRequest, AllocationError> {
        let reviewers = self.reviewers.find_active_by_fund(&fund_id).await?;
        let proposals = self.proposals.find_open_by_fund(&fund_id).await?;
        let preferences = self
            .preferences
            .find_by_fund(&fund_id)
            .await?
            .into_iter()
            .map(|p| (p.reviewer_id, p))
            .collect();

        Ok(BulkRunRequest {
            fund_id,
            reviewers,
            proposals,
            preferences,
            seed,
            dry_run,
        })
    }

    /// Load the fund and run a pass over it. Only snapshot loading can fail.
    pub async fn run_fund(
        &self,
        fund_id: FundId,
        seed: u64,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> Result<BulkRunOutcome, AllocationError> {
        let request = self.load_request(fund_id, seed, dry_run).await?;
        Ok(self.run(request, cancel).await)
    }

    /// Run one pass over a snapshot.
    ///
    /// Cancellation is checked between reviewers; assignments already
    /// committed stay committed and the remaining reviewers are reported as
    /// skipped.
    pub async fn run(&self, request: BulkRunRequest, cancel: &CancellationToken) -> BulkRunOutcome {
        let BulkRunRequest {
            fund_id,
            reviewers,
            mut proposals,
            preferences,
            seed,
            dry_run,
        } = request;

        tracing::info!(
            fund_id = %fund_id,
            seed = seed,
            reviewers = reviewers.len(),
            proposals = proposals.len(),
            dry_run = dry_run,
            "Starting bulk assignment run"
        );

        let mut rng = StdRng::seed_from_u64(seed);
        let mut order = reviewers;
        order.sort_by_key(|r| r.id);
        order.dedup_by_key(|r| r.id);
        order.shuffle(&mut rng);

        let positions: HashMap<ProposalId, usize> = proposals
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();

        let mut report = RunReport::new(fund_id, seed, dry_run);
        let mut assignments = Vec::new();
        let mut remaining = order.into_iter();

        while let Some(reviewer) = remaining.next() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                for skipped in std::iter::once(reviewer).chain(remaining.by_ref()) {
                    report.record(
                        ReviewerOutcome::skipped(skipped.id, 0, SkipReason::Cancelled),
                        &[],
                    );
                }
                tracing::warn!(fund_id = %fund_id, "Bulk assignment run cancelled");
                break;
            }

            let reviewer_seed: u64 = rng.gen();
            let (outcome, made) = self
                .serve_reviewer(
                    &fund_id,
                    &reviewer,
                    &proposals,
                    preferences.get(&reviewer.id),
                    reviewer_seed,
                    dry_run,
                )
                .await;

            // Later reviewers see this reviewer's picks in the local snapshot
            for assignment in &made {
                if let Some(&i) = positions.get(&assignment.proposal_id) {
                    proposals[i].current_reviews += 1;
                }
            }

            tracing::debug!(
                reviewer_id = %reviewer.id,
                assigned = outcome.assigned,
                rejected = outcome.rejected,
                status = ?outcome.status,
                "Reviewer processed"
            );
            report.record(outcome, &made);
            assignments.extend(made);
        }

        report.finish();
        tracing::info!(
            fund_id = %fund_id,
            seed = seed,
            total_assignments = report.total_assignments,
            fully_served = report.fully_served,
            partially_served = report.partially_served,
            skipped = report.skipped,
            failed = report.failed,
            cancelled = report.cancelled,
            "Bulk assignment run finished"
        );

        BulkRunOutcome {
            assignments,
            report,
        }
    }

    async fn serve_reviewer(
        &self,
        fund_id: &FundId,
        reviewer: &ReviewerProfile,
        proposals: &[Proposal],
        preferences: Option<&FundPreferences>,
        seed: u64,
        dry_run: bool,
    ) -> (ReviewerOutcome, Vec<Assignment>) {
        let settings = self.committer.settings();

        let Some(preferences) = preferences else {
            return (
                ReviewerOutcome::skipped(reviewer.id, 0, SkipReason::MissingPreferences),
                Vec::new(),
            );
        };
        if !reviewer.is_active {
            return (
                ReviewerOutcome::skipped(reviewer.id, 0, SkipReason::Inactive),
                Vec::new(),
            );
        }
        if preferences.reviewer_id != reviewer.id || preferences.fund_id != *fund_id {
            let err = AllocationError::InvalidInput(format!(
                "preference record of reviewer {} in fund {} does not match",
                preferences.reviewer_id, preferences.fund_id
            ));
            return (ReviewerOutcome::failed(reviewer.id, 0, err), Vec::new());
        }

        let capacity = pass_capacity(reviewer, preferences, settings.default_capacity);
        if capacity == 0 {
            return (
                ReviewerOutcome::skipped(reviewer.id, 0, SkipReason::NoCapacity),
                Vec::new(),
            );
        }

        let already_assigned = match self.committer.already_assigned(&reviewer.id, fund_id).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(reviewer_id = %reviewer.id, error = %e, "Failed to load existing assignments");
                return (ReviewerOutcome::failed(reviewer.id, capacity, e), Vec::new());
            }
        };

        let eligible = filter_eligible(proposals, reviewer, preferences, &already_assigned);
        if eligible.is_empty() {
            return (
                ReviewerOutcome::skipped(reviewer.id, capacity, SkipReason::NotEligible),
                Vec::new(),
            );
        }

        let plan = TieredAllocator::new(&settings.matrix).allocate(
            reviewer,
            preferences.scope,
            &eligible,
            capacity,
            seed,
        );

        if dry_run {
            let made = self.committer.preview(fund_id, &plan);
            let outcome = ReviewerOutcome::served(reviewer.id, capacity, made.len(), 0, 0);
            return (outcome, made);
        }

        match self.committer.commit(fund_id, &plan).await {
            Ok(commit) => {
                let outcome = ReviewerOutcome::served(
                    reviewer.id,
                    capacity,
                    commit.assignments.len(),
                    commit.rejected,
                    commit.backfilled,
                );
                (outcome, commit.assignments)
            }
            Err(e) => {
                tracing::warn!(reviewer_id = %reviewer.id, error = %e, "Reviewer assignment failed");
                (ReviewerOutcome::failed(reviewer.id, capacity, e), Vec::new())
            }
        }
    }
}
