//! Bulk run report
//!
//! Per-reviewer outcomes and aggregate counts for one bulk pass. Serializes
//! to JSON for operators.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::entities::{Assignment, FundId, MatchTier, ReviewerId};

/// Why a reviewer received nothing in a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No preference record for this fund
    MissingPreferences,
    Inactive,
    /// Scope cap or remaining capacity is zero
    NoCapacity,
    /// Nothing passed the eligibility filter
    NotEligible,
    /// Every planned proposal filled up before commit
    ProposalsFull,
    /// The run was cancelled before this reviewer was reached
    Cancelled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingPreferences => write!(f, "missing_preferences"),
            SkipReason::Inactive => write!(f, "inactive"),
            SkipReason::NoCapacity => write!(f, "no_capacity"),
            SkipReason::NotEligible => write!(f, "not_eligible"),
            SkipReason::ProposalsFull => write!(f, "proposals_full"),
            SkipReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReviewerStatus {
    FullyServed,
    PartiallyServed,
    Skipped { reason: SkipReason },
    Failed { error: String },
}

/// What one reviewer got out of a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewerOutcome {
    pub reviewer_id: ReviewerId,
    pub capacity: u32,
    pub assigned: usize,
    pub rejected: usize,
    pub backfilled: usize,
    #[serde(flatten)]
    pub status: ReviewerStatus,
}

impl ReviewerOutcome {
    pub fn skipped(reviewer_id: ReviewerId, capacity: u32, reason: SkipReason) -> Self {
        Self {
            reviewer_id,
            capacity,
            assigned: 0,
            rejected: 0,
            backfilled: 0,
            status: ReviewerStatus::Skipped { reason },
        }
    }

    pub fn failed(reviewer_id: ReviewerId, capacity: u32, error: impl ToString) -> Self {
        Self {
            reviewer_id,
            capacity,
            assigned: 0,
            rejected: 0,
            backfilled: 0,
            status: ReviewerStatus::Failed {
                error: error.to_string(),
            },
        }
    }

    /// Outcome of a pass that reached the commit phase
    pub fn served(
        reviewer_id: ReviewerId,
        capacity: u32,
        assigned: usize,
        rejected: usize,
        backfilled: usize,
    ) -> Self {
        let status = if assigned == 0 {
            let reason = if rejected > 0 {
                SkipReason::ProposalsFull
            } else {
                SkipReason::NoCapacity
            };
            ReviewerStatus::Skipped { reason }
        } else if assigned >= capacity as usize {
            ReviewerStatus::FullyServed
        } else {
            ReviewerStatus::PartiallyServed
        };

        Self {
            reviewer_id,
            capacity,
            assigned,
            rejected,
            backfilled,
            status,
        }
    }
}

/// Aggregate report of one bulk pass
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub fund_id: FundId,
    /// Seed that reproduces this run's reviewer order and shuffles
    pub seed: u64,
    pub dry_run: bool,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub fully_served: usize,
    pub partially_served: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total_assignments: usize,
    pub tier_counts: BTreeMap<MatchTier, usize>,
    pub outcomes: Vec<ReviewerOutcome>,
}

impl RunReport {
    pub fn new(fund_id: FundId, seed: u64, dry_run: bool) -> Self {
        Self {
            fund_id,
            seed,
            dry_run,
            cancelled: false,
            started_at: Utc::now(),
            finished_at: None,
            fully_served: 0,
            partially_served: 0,
            skipped: 0,
            failed: 0,
            total_assignments: 0,
            tier_counts: BTreeMap::new(),
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: ReviewerOutcome, assignments: &[Assignment]) {
        match outcome.status {
            ReviewerStatus::FullyServed => self.fully_served += 1,
            ReviewerStatus::PartiallyServed => self.partially_served += 1,
            ReviewerStatus::Skipped { .. } => self.skipped += 1,
            ReviewerStatus::Failed { .. } => self.failed += 1,
        }
        for assignment in assignments {
            *self.tier_counts.entry(assignment.tier).or_insert(0) += 1;
        }
        self.total_assignments += assignments.len();
        self.outcomes.push(outcome);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn outcome_for(&self, reviewer_id: &ReviewerId) -> Option<&ReviewerOutcome> {
        self.outcomes.iter().find(|o| o.reviewer_id == *reviewer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn served_status_depends_on_capacity() {
        let id = ReviewerId::new();
        assert_eq!(
            ReviewerOutcome::served(id, 3, 3, 0, 0).status,
            ReviewerStatus::FullyServed
        );
        assert_eq!(
            ReviewerOutcome::served(id, 3, 1, 0, 0).status,
            ReviewerStatus::PartiallyServed
        );
        assert_eq!(
            ReviewerOutcome::served(id, 3, 0, 2, 0).status,
            ReviewerStatus::Skipped {
                reason: SkipReason::ProposalsFull
            }
        );
    }

    #[test]
    fn report_counts_statuses() {
        let mut report = RunReport::new(FundId::new(), 42, false);
        report.record(ReviewerOutcome::served(ReviewerId::new(), 2, 2, 0, 0), &[]);
        report.record(
            ReviewerOutcome::skipped(ReviewerId::new(), 0, SkipReason::NoCapacity),
            &[],
        );
        report.record(ReviewerOutcome::failed(ReviewerId::new(), 5, "boom"), &[]);
        report.finish();

        assert_eq!(report.fully_served, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.outcomes.len(), 3);
        assert!(report.finished_at.is_some());
    }

    #[test]
    fn outcome_serializes_flat() {
        let outcome = ReviewerOutcome::skipped(ReviewerId::new(), 0, SkipReason::NotEligible);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "not_eligible");
        assert_eq!(json["assigned"], 0);
    }
}
