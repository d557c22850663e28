//! Peer panel assembly
//!
//! Once a primary review is submitted, a small panel of other reviewers is
//! chosen to evaluate it. The panel mixes one evaluator sharing the author's
//! primary expertise with one from a different area, each the closest
//! interest match in its group, and is backfilled by interest overlap up to
//! the minimum size. Peer load is reserved per evaluator with an atomic
//! check-and-increment so no one exceeds the peer review cap.
//!
//! Besides single reviews, the service sweeps a whole fund for submitted
//! reviews whose panel is short, and serves evaluators asking for more peer
//! evaluations.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use super::allocation_config::AllocationSettings;
use super::match_scorer::{diversity_class, interest_overlap, DiversityClass};
use super::retry::persist_with_retry;
use crate::domain::entities::{
    FundId, PeerEvaluation, PeerEvaluationId, Review, ReviewId, ReviewerId, ReviewerProfile,
};
use crate::domain::ports::{
    AssignmentRepository, PeerEvaluationRepository, ProposalRepository, ReviewRepository,
    ReviewerRepository,
};
use crate::error::{AllocationError, DomainError};

/// A potential evaluator ranked against the review's author
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelCandidate {
    pub evaluator_id: ReviewerId,
    pub diversity: DiversityClass,
    pub interest_overlap: usize,
}

/// How one review fared in a fund sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PanelStatus {
    Assembled,
    /// Some evaluators were added but the panel is still short
    Undersized,
    AlreadyComplete,
    /// No one could be added
    NoEligible,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelOutcome {
    pub review_id: ReviewId,
    pub assigned: usize,
    #[serde(flatten)]
    pub status: PanelStatus,
}

/// Result of sweeping a fund for reviews without a full panel
#[derive(Debug, Clone, Default, Serialize)]
pub struct PanelSweepReport {
    pub fund_id: FundId,
    pub reviews: usize,
    pub assembled: usize,
    pub undersized: usize,
    pub already_complete: usize,
    pub no_eligible: usize,
    pub failed: usize,
    pub evaluators_assigned: usize,
    pub outcomes: Vec<PanelOutcome>,
}

impl PanelSweepReport {
    fn new(fund_id: FundId) -> Self {
        Self {
            fund_id,
            ..Self::default()
        }
    }

    fn record(&mut self, outcome: PanelOutcome) {
        self.reviews += 1;
        self.evaluators_assigned += outcome.assigned;
        match outcome.status {
            PanelStatus::Assembled => self.assembled += 1,
            PanelStatus::Undersized => self.undersized += 1,
            PanelStatus::AlreadyComplete => self.already_complete += 1,
            PanelStatus::NoEligible => self.no_eligible += 1,
            PanelStatus::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

/// Options of an evaluator asking for more peer evaluations
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerRequestOptions {
    /// Upper bound below the evaluator's remaining peer capacity
    pub requested: Option<u32>,
    pub dry_run: bool,
}

/// Reviewers allowed to evaluate `original`'s review: active, not the
/// author, not excluded, and below the peer review cap
pub fn eligible_evaluators<'a>(
    original: &ReviewerProfile,
    candidates: &'a [ReviewerProfile],
    excluded: &HashSet<ReviewerId>,
    max_peer_capacity: u32,
) -> Vec<&'a ReviewerProfile> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|c| c.id != original.id)
        .filter(|c| c.is_active)
        .filter(|c| !excluded.contains(&c.id))
        .filter(|c| c.has_peer_capacity(max_peer_capacity))
        .filter(|c| seen.insert(c.id))
        .collect()
}

/// Rank evaluators in panel order.
///
/// The best evaluator of each diversity class missing from `covered` comes
/// first (SAME before DIFFERENT), followed by everyone else by interest
/// overlap (ties by reviewer id). Taking the first `n` entries gives the
/// `n` evaluators to add; the rest are replacements.
pub fn rank_panel(
    original: &ReviewerProfile,
    eligible: &[&ReviewerProfile],
    covered: &HashSet<DiversityClass>,
) -> Vec<PanelCandidate> {
    let mut ranked: Vec<PanelCandidate> = eligible
        .iter()
        .map(|c| PanelCandidate {
            evaluator_id: c.id,
            diversity: diversity_class(original, c),
            interest_overlap: interest_overlap(original, c),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.interest_overlap
            .cmp(&a.interest_overlap)
            .then_with(|| a.evaluator_id.cmp(&b.evaluator_id))
    });

    let mut leaders = Vec::with_capacity(2);
    for class in [DiversityClass::Same, DiversityClass::Different] {
        if covered.contains(&class) {
            continue;
        }
        if let Some(pos) = ranked.iter().position(|c| c.diversity == class) {
            leaders.push(ranked.remove(pos));
        }
    }
    leaders.extend(ranked);
    leaders
}

/// Pure selection of a fresh panel: the first `panel_size` entries of `rank_panel`
pub fn select_panel(
    original: &ReviewerProfile,
    eligible: &[&ReviewerProfile],
    panel_size: usize,
) -> Vec<PanelCandidate> {
    let mut ranked = rank_panel(original, eligible, &HashSet::new());
    ranked.truncate(panel_size);
    ranked
}

/// Service assembling and persisting peer panels
pub struct PeerPanelService<RR, PR, RVR, AR, PER>
where
    RR: ReviewerRepository,
    PR: ProposalRepository,
    RVR: ReviewRepository,
    AR: AssignmentRepository,
    PER: PeerEvaluationRepository,
{
    reviewers: Arc<RR>,
    proposals: Arc<PR>,
    reviews: Arc<RVR>,
    assignments: Arc<AR>,
    evaluations: Arc<PER>,
    settings: AllocationSettings,
}

impl<RR, PR, RVR, AR, PER> PeerPanelService<RR, PR, RVR, AR, PER>
where
    RR: ReviewerRepository,
    PR: ProposalRepository,
    RVR: ReviewRepository,
    AR: AssignmentRepository,
    PER: PeerEvaluationRepository,
{
    pub fn new(
        reviewers: Arc<RR>,
        proposals: Arc<PR>,
        reviews: Arc<RVR>,
        assignments: Arc<AR>,
        evaluations: Arc<PER>,
        settings: AllocationSettings,
    ) -> Self {
        Self {
            reviewers,
            proposals,
            reviews,
            assignments,
            evaluations,
            settings,
        }
    }

    /// Load a review and the active reviewers of its fund, then assemble
    pub async fn assemble_for_review(
        &self,
        review_id: &ReviewId,
    ) -> Result<Vec<PeerEvaluation>, AllocationError> {
        let review = self
            .reviews
            .find_by_id(review_id)
            .await?
            .ok_or_else(|| AllocationError::NotFound(format!("Review {}", review_id)))?;
        let proposal = self
            .proposals
            .find_by_id(&review.proposal_id)
            .await?
            .ok_or_else(|| AllocationError::NotFound(format!("Proposal {}", review.proposal_id)))?;
        let candidates = self.reviewers.find_active_by_fund(&proposal.fund_id).await?;

        self.assemble(&review, &candidates).await
    }

    /// Choose, reserve and persist a panel for a submitted review.
    ///
    /// Returns an empty list (with a warning) when no one is eligible or the
    /// review already has a full panel. A partial panel is topped up, led by
    /// the diversity classes it is still missing.
    pub async fn assemble(
        &self,
        review: &Review,
        candidates: &[ReviewerProfile],
    ) -> Result<Vec<PeerEvaluation>, AllocationError> {
        if !review.is_submitted() {
            return Err(AllocationError::InvalidInput(format!(
                "Review {} is {} and cannot be peer evaluated",
                review.id, review.status
            )));
        }

        let existing = self.evaluations.find_by_review(&review.id).await?;
        self.top_up(review, candidates, &existing).await
    }

    /// Assemble panels for every submitted review of a fund whose panel is
    /// short. A failure on one review is recorded and the sweep moves on;
    /// only loading the fund can fail the whole call.
    pub async fn assemble_pending(
        &self,
        fund_id: &FundId,
    ) -> Result<PanelSweepReport, AllocationError> {
        let proposal_ids: Vec<_> = self
            .proposals
            .find_by_fund(fund_id)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        let mut reviews = self.reviews.find_submitted_by_proposals(&proposal_ids).await?;
        reviews.sort_by_key(|r| r.id.0);
        let mut candidates = self.reviewers.find_active_by_fund(fund_id).await?;

        tracing::info!(
            fund_id = %fund_id,
            reviews = reviews.len(),
            candidates = candidates.len(),
            "Starting peer panel sweep"
        );

        let mut report = PanelSweepReport::new(*fund_id);
        for review in &reviews {
            let outcome = self.sweep_one(review, &mut candidates).await;
            if let PanelStatus::Failed { error } = &outcome.status {
                tracing::warn!(review_id = %review.id, error = %error, "Peer panel failed");
            }
            report.record(outcome);
        }

        tracing::info!(
            fund_id = %fund_id,
            assembled = report.assembled,
            undersized = report.undersized,
            already_complete = report.already_complete,
            no_eligible = report.no_eligible,
            failed = report.failed,
            evaluators = report.evaluators_assigned,
            "Peer panel sweep finished"
        );

        Ok(report)
    }

    async fn sweep_one(
        &self,
        review: &Review,
        candidates: &mut [ReviewerProfile],
    ) -> PanelOutcome {
        let existing = match self.evaluations.find_by_review(&review.id).await {
            Ok(existing) => existing,
            Err(e) => return failed_panel(review.id, e),
        };
        let wanted = self.settings.min_peer_reviews.saturating_sub(existing.len());
        if wanted == 0 {
            return PanelOutcome {
                review_id: review.id,
                assigned: 0,
                status: PanelStatus::AlreadyComplete,
            };
        }

        match self.top_up(review, candidates, &existing).await {
            Ok(panel) => {
                // Later reviews see this panel's load in the local snapshot
                for evaluation in &panel {
                    if let Some(c) = candidates.iter_mut().find(|c| c.id == evaluation.evaluator_id) {
                        c.active_peer_reviews += 1;
                    }
                }
                let status = if panel.is_empty() {
                    PanelStatus::NoEligible
                } else if panel.len() < wanted {
                    PanelStatus::Undersized
                } else {
                    PanelStatus::Assembled
                };
                PanelOutcome {
                    review_id: review.id,
                    assigned: panel.len(),
                    status,
                }
            }
            Err(e) => failed_panel(review.id, e),
        }
    }

    /// Serve an evaluator asking for more peer evaluations in a fund.
    ///
    /// Candidate reviews are the fund's submitted reviews whose panel is
    /// short and that the evaluator may judge; the ones furthest below the
    /// minimum panel size come first. Returns an empty list when the
    /// evaluator is inactive, has no peer capacity left or nothing fits.
    pub async fn request_evaluations(
        &self,
        evaluator_id: &ReviewerId,
        fund_id: &FundId,
        options: PeerRequestOptions,
    ) -> Result<Vec<PeerEvaluation>, AllocationError> {
        let evaluator = self
            .reviewers
            .find_by_id(evaluator_id)
            .await?
            .ok_or_else(|| AllocationError::NotFound(format!("Reviewer {}", evaluator_id)))?;
        if !evaluator.is_active {
            tracing::debug!(evaluator_id = %evaluator.id, "Inactive evaluator requested peer evaluations");
            return Ok(Vec::new());
        }

        let remaining = self
            .settings
            .max_peer_review_capacity
            .saturating_sub(evaluator.active_peer_reviews);
        let limit = options.requested.map_or(remaining, |n| n.min(remaining)) as usize;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let proposal_ids: Vec<_> = self
            .proposals
            .find_by_fund(fund_id)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        let reviews = self.reviews.find_submitted_by_proposals(&proposal_ids).await?;

        let mut open: Vec<(usize, ReviewId)> = Vec::new();
        for review in reviews.iter().filter(|r| r.reviewer_id != evaluator.id) {
            let existing = self.evaluations.find_by_review(&review.id).await?;
            let deficit = self.settings.min_peer_reviews.saturating_sub(existing.len());
            if deficit == 0 {
                continue;
            }
            if self.exclusions(review, &existing).await?.contains(&evaluator.id) {
                continue;
            }
            open.push((deficit, review.id));
        }
        open.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1 .0.cmp(&b.1 .0)));
        open.truncate(limit);

        let now = Utc::now();
        if options.dry_run {
            return Ok(open
                .iter()
                .map(|(_, review_id)| {
                    PeerEvaluation::pending(*review_id, evaluator.id, now, self.settings.peer_review_due_days)
                })
                .collect());
        }

        let mut records = Vec::with_capacity(open.len());
        for (_, review_id) in &open {
            let accepted = match self
                .reviewers
                .try_increment_peer_reviews(&evaluator.id, self.settings.max_peer_review_capacity)
                .await
            {
                Ok(accepted) => accepted,
                Err(e) => {
                    self.release_all(&vec![evaluator.id; records.len()]).await;
                    return Err(e.into());
                }
            };
            if !accepted {
                tracing::debug!(evaluator_id = %evaluator.id, "Evaluator reached peer review cap");
                break;
            }
            records.push(PeerEvaluation::pending(
                *review_id,
                evaluator.id,
                now,
                self.settings.peer_review_due_days,
            ));
        }

        if records.is_empty() {
            if open.is_empty() {
                return Ok(Vec::new());
            }
            return Err(AllocationError::CapacityExceeded {
                reviewer_id: evaluator.id,
                rejected: open.len(),
            });
        }

        self.persist(&records).await?;
        tracing::info!(
            evaluator_id = %evaluator.id,
            fund_id = %fund_id,
            evaluations = records.len(),
            "Peer evaluations assigned on request"
        );

        Ok(records)
    }

    /// Add evaluators to `review` until it has the minimum panel size
    async fn top_up(
        &self,
        review: &Review,
        candidates: &[ReviewerProfile],
        existing: &[PeerEvaluation],
    ) -> Result<Vec<PeerEvaluation>, AllocationError> {
        let panel_size = self.settings.min_peer_reviews.saturating_sub(existing.len());
        if panel_size == 0 {
            tracing::debug!(review_id = %review.id, "Peer panel already complete");
            return Ok(Vec::new());
        }

        let original = self.profile(&review.reviewer_id, candidates).await?.ok_or_else(|| {
            AllocationError::NotFound(format!("Reviewer {}", review.reviewer_id))
        })?;

        let mut covered = HashSet::new();
        for evaluation in existing {
            match self.profile(&evaluation.evaluator_id, candidates).await? {
                Some(evaluator) => {
                    covered.insert(diversity_class(&original, &evaluator));
                }
                None => tracing::warn!(
                    review_id = %review.id,
                    evaluator_id = %evaluation.evaluator_id,
                    "Panel member not found"
                ),
            }
        }

        let excluded = self.exclusions(review, existing).await?;
        let eligible = eligible_evaluators(
            &original,
            candidates,
            &excluded,
            self.settings.max_peer_review_capacity,
        );
        if eligible.is_empty() {
            tracing::warn!(review_id = %review.id, "No eligible peer evaluators");
            return Ok(Vec::new());
        }

        let ranked = rank_panel(&original, &eligible, &covered);
        let split = panel_size.min(ranked.len());
        let mut spare: Vec<PanelCandidate> = ranked[split..].to_vec();
        let mut queue: VecDeque<PanelCandidate> = ranked[..split].iter().cloned().collect();
        let mut reserved: Vec<ReviewerId> = Vec::new();

        while let Some(candidate) = queue.pop_front() {
            let accepted = match self
                .reviewers
                .try_increment_peer_reviews(
                    &candidate.evaluator_id,
                    self.settings.max_peer_review_capacity,
                )
                .await
            {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::error!(
                        evaluator_id = %candidate.evaluator_id,
                        error = %e,
                        "Store error while reserving peer evaluator"
                    );
                    self.release_all(&reserved).await;
                    return Err(e.into());
                }
            };

            if accepted {
                reserved.push(candidate.evaluator_id);
                continue;
            }

            tracing::debug!(evaluator_id = %candidate.evaluator_id, "Evaluator reached peer review cap");
            let replacement = spare
                .iter()
                .position(|c| c.diversity == candidate.diversity)
                .or((!spare.is_empty()).then_some(0));
            if let Some(pos) = replacement {
                queue.push_front(spare.remove(pos));
            }
        }

        if reserved.is_empty() {
            tracing::warn!(review_id = %review.id, "Every peer evaluator was at capacity");
            return Ok(Vec::new());
        }
        if reserved.len() < panel_size {
            tracing::warn!(
                review_id = %review.id,
                panel = reserved.len(),
                wanted = panel_size,
                "Peer panel is undersized"
            );
        }

        let now = Utc::now();
        let records: Vec<PeerEvaluation> = reserved
            .iter()
            .map(|evaluator_id| {
                PeerEvaluation::pending(
                    review.id,
                    *evaluator_id,
                    now,
                    self.settings.peer_review_due_days,
                )
            })
            .collect();

        self.persist(&records).await?;
        tracing::info!(
            review_id = %review.id,
            evaluators = records.len(),
            "Peer panel assembled"
        );

        Ok(records)
    }

    /// A reviewer from the snapshot, falling back to the store
    async fn profile(
        &self,
        id: &ReviewerId,
        candidates: &[ReviewerProfile],
    ) -> Result<Option<ReviewerProfile>, DomainError> {
        match candidates.iter().find(|c| c.id == *id) {
            Some(profile) => Ok(Some(profile.clone())),
            None => self.reviewers.find_by_id(id).await,
        }
    }

    /// Panel members, reviewers and assignees of the reviewed proposal
    async fn exclusions(
        &self,
        review: &Review,
        existing: &[PeerEvaluation],
    ) -> Result<HashSet<ReviewerId>, DomainError> {
        let mut excluded: HashSet<ReviewerId> = existing.iter().map(|e| e.evaluator_id).collect();
        excluded.extend(
            self.reviews
                .find_by_proposal(&review.proposal_id)
                .await?
                .into_iter()
                .map(|r| r.reviewer_id),
        );
        excluded.extend(
            self.assignments
                .find_by_proposal(&review.proposal_id)
                .await?
                .into_iter()
                .map(|a| a.reviewer_id),
        );
        Ok(excluded)
    }

    /// Write reserved evaluations, releasing their peer load if they never land
    async fn persist(&self, records: &[PeerEvaluation]) -> Result<(), AllocationError> {
        let ids: Vec<PeerEvaluationId> = records.iter().map(|e| e.id).collect();
        let written = persist_with_retry(
            self.settings.attempts(),
            "peer_evaluations",
            records.len(),
            || self.evaluations.create_many(records),
            || self.batch_stored(&ids),
        )
        .await;
        if let Err(e) = written {
            let evaluators: Vec<ReviewerId> = records.iter().map(|e| e.evaluator_id).collect();
            self.release_all(&evaluators).await;
            return Err(e);
        }
        Ok(())
    }

    async fn batch_stored(&self, ids: &[PeerEvaluationId]) -> Result<bool, DomainError> {
        let stored = self.evaluations.find_existing_ids(ids).await?;
        Ok(stored.len() == ids.len())
    }

    async fn release_all(&self, evaluators: &[ReviewerId]) {
        for evaluator_id in evaluators {
            if let Err(e) = self.reviewers.release_peer_review(evaluator_id).await {
                tracing::error!(
                    evaluator_id = %evaluator_id,
                    error = %e,
                    "Failed to release peer evaluator slot"
                );
            }
        }
    }
}

fn failed_panel(review_id: ReviewId, error: impl ToString) -> PanelOutcome {
    PanelOutcome {
        review_id,
        assigned: 0,
        status: PanelStatus::Failed {
            error: error.to_string(),
        },
    }
}
