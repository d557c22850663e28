//! Individual assignment request
//!
//! On-demand assignment for a single reviewer who asks for more work
//! mid-round. Shares eligibility, ranking and commit with the bulk pass but
//! breaks ties by urgency: proposals furthest from their review minimum,
//! then the largest funding requests, come first.

use std::sync::Arc;

use super::allocation_config::AllocationSettings;
use super::assignment_committer::AssignmentCommitter;
use super::eligibility::{filter_eligible, pass_capacity};
use super::tiered_allocator::{TieBreak, TieredAllocator};
use crate::domain::entities::{
    Assignment, FundId, FundPreferences, Proposal, ReviewerId, ReviewerProfile,
};
use crate::domain::ports::{
    AssignmentRepository, PreferenceRepository, ProposalRepository, ReviewerRepository,
};
use crate::error::AllocationError;

/// Options of one individual request
#[derive(Debug, Clone, Copy, Default)]
pub struct IndividualOptions {
    /// Upper bound on assignments, below the scope and remaining capacity
    pub requested: Option<u32>,
    /// Seed for RANDOM-scope shuffles (fresh entropy when unset)
    pub seed: Option<u64>,
    pub dry_run: bool,
}

/// Service handling single-reviewer requests
pub struct IndividualAssignmentService<RR, PR, PFR, AR>
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

impl<RR, PR, PFR, AR> IndividualAssignmentService<RR, PR, PFR, AR>
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

    /// Load the reviewer, their preferences and the fund's open proposals,
    /// then serve the request
    pub async fn request_for(
        &self,
        reviewer_id: &ReviewerId,
        fund_id: &FundId,
        options: IndividualOptions,
    ) -> Result<Vec<Assignment>, AllocationError> {
        let reviewer = self
            .reviewers
            .find_by_id(reviewer_id)
            .await?
            .ok_or_else(|| AllocationError::NotFound(format!("Reviewer {}", reviewer_id)))?;
        let preferences = self
            .preferences
            .find(reviewer_id, fund_id)
            .await?
            .ok_or_else(|| {
                AllocationError::InvalidInput(format!(
                    "Reviewer {} has no preferences for fund {}",
                    reviewer_id, fund_id
                ))
            })?;
        let proposals = self.proposals.find_open_by_fund(fund_id).await?;

        self.request(&reviewer, fund_id, &proposals, &preferences, options)
            .await
    }

    /// Assign up to the reviewer's capacity from a proposal snapshot.
    ///
    /// Returns an empty list when the reviewer has no capacity or nothing is
    /// eligible, and `CapacityExceeded` when every pick was lost to a
    /// concurrent allocation with no replacement available.
    pub async fn request(
        &self,
        reviewer: &ReviewerProfile,
        fund_id: &FundId,
        proposals: &[Proposal],
        preferences: &FundPreferences,
        options: IndividualOptions,
    ) -> Result<Vec<Assignment>, AllocationError> {
        if preferences.reviewer_id != reviewer.id || preferences.fund_id != *fund_id {
            return Err(AllocationError::InvalidInput(format!(
                "Preferences of reviewer {} in fund {} do not belong to reviewer {} in fund {}",
                preferences.reviewer_id, preferences.fund_id, reviewer.id, fund_id
            )));
        }
        if !reviewer.is_active {
            tracing::debug!(reviewer_id = %reviewer.id, "Inactive reviewer requested assignments");
            return Ok(Vec::new());
        }

        let settings = self.committer.settings();
        let mut capacity = pass_capacity(reviewer, preferences, settings.default_capacity);
        if let Some(requested) = options.requested {
            capacity = capacity.min(requested);
        }
        if capacity == 0 {
            tracing::debug!(reviewer_id = %reviewer.id, "No capacity for individual request");
            return Ok(Vec::new());
        }

        let already_assigned = self.committer.already_assigned(&reviewer.id, fund_id).await?;
        let eligible = filter_eligible(proposals, reviewer, preferences, &already_assigned);
        if eligible.is_empty() {
            tracing::debug!(reviewer_id = %reviewer.id, "No eligible proposals for individual request");
            return Ok(Vec::new());
        }

        let seed = options.seed.unwrap_or_else(rand::random);
        let plan = TieredAllocator::new(&settings.matrix)
            .with_tie_break(TieBreak::Urgency)
            .allocate(reviewer, preferences.scope, &eligible, capacity, seed);

        if options.dry_run {
            return Ok(self.committer.preview(fund_id, &plan));
        }

        let outcome = self.committer.commit(fund_id, &plan).await?;
        if outcome.assignments.is_empty() && (outcome.rejected > 0 || outcome.reviewer_saturated) {
            tracing::debug!(
                reviewer_id = %reviewer.id,
                rejected = outcome.rejected,
                "Every pick was rejected at commit"
            );
            return Err(AllocationError::CapacityExceeded {
                reviewer_id: reviewer.id,
                rejected: outcome.rejected,
            });
        }

        tracing::info!(
            reviewer_id = %reviewer.id,
            fund_id = %fund_id,
            assigned = outcome.assignments.len(),
            backfilled = outcome.backfilled,
            "Individual assignment completed"
        );

        Ok(outcome.assignments)
    }
}
