//! Eligibility filter
//!
//! Decides which proposals a reviewer may be assigned in one pass. A proposal
//! is eligible when the reviewer has not excluded it, is not affiliated with
//! it, does not already hold it, the proposal still needs reviews, and (for
//! CATEGORY scope) its category was selected.

use std::collections::HashSet;

use crate::domain::entities::{FundPreferences, Proposal, ProposalId, ReviewerProfile};

/// Filter a proposal snapshot down to what `reviewer` may take.
///
/// Input order is preserved; ranking happens later.
pub fn filter_eligible<'a>(
    proposals: &'a [Proposal],
    reviewer: &ReviewerProfile,
    preferences: &FundPreferences,
    already_assigned: &HashSet<ProposalId>,
) -> Vec<&'a Proposal> {
    proposals
        .iter()
        .filter(|p| !preferences.excluded_proposals.contains(&p.id))
        .filter(|p| !reviewer.is_affiliated_with(&p.id))
        .filter(|p| !already_assigned.contains(&p.id))
        .filter(|p| p.needs_reviews())
        .filter(|p| preferences.accepts_category(p.category))
        .collect()
}

/// Assignments the reviewer can take in this pass: the scope cap, bounded by
/// the reviewer's remaining capacity.
pub fn pass_capacity(
    reviewer: &ReviewerProfile,
    preferences: &FundPreferences,
    default_capacity: u32,
) -> u32 {
    preferences
        .scope_capacity(default_capacity)
        .min(reviewer.remaining_capacity())
}
