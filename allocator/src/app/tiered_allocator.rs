//! Tiered allocator
//!
//! Ranks a reviewer's eligible proposals into priority tiers and picks up to
//! the pass capacity. Ranking is deterministic given the inputs and the seed;
//! the only randomness is the seeded shuffle of the OTHER tier for RANDOM
//! scope.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use super::match_scorer::{tag_overlap_score, ExpertiseMatrix};
use crate::domain::entities::{MatchTier, Proposal, ProposalId, ReviewScope, ReviewerId, ReviewerProfile};

/// One ranked proposal in an allocation plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedCandidate {
    pub proposal_id: ProposalId,
    pub tier: MatchTier,
    pub tag_overlap: usize,
}

/// How proposals with equal tag overlap are ordered inside a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Fewest current reviews first, then proposal id
    #[default]
    FewestReviews,
    /// Largest review deficit first, then largest requested funding, then proposal id
    Urgency,
}

impl TieBreak {
    fn compare(&self, a: &Proposal, b: &Proposal) -> Ordering {
        match self {
            TieBreak::FewestReviews => a
                .current_reviews
                .cmp(&b.current_reviews)
                .then_with(|| a.id.cmp(&b.id)),
            TieBreak::Urgency => b
                .review_deficit()
                .cmp(&a.review_deficit())
                .then_with(|| b.requested_funding.total_cmp(&a.requested_funding))
                .then_with(|| a.id.cmp(&b.id)),
        }
    }
}

/// Ranked proposals for one reviewer. The first `capacity` entries are the
/// picks; the rest are reserves used to backfill rejected picks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
    pub reviewer_id: ReviewerId,
    pub capacity: usize,
    ranked: Vec<RankedCandidate>,
}

impl AllocationPlan {
    pub fn picks(&self) -> &[RankedCandidate] {
        &self.ranked[..self.split()]
    }

    pub fn reserves(&self) -> &[RankedCandidate] {
        &self.ranked[self.split()..]
    }

    /// Planned (reviewer, proposal) pairs in pick order
    pub fn pairs(&self) -> Vec<(ReviewerId, ProposalId)> {
        self.picks()
            .iter()
            .map(|c| (self.reviewer_id, c.proposal_id))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.picks().is_empty()
    }

    fn split(&self) -> usize {
        self.capacity.min(self.ranked.len())
    }
}

/// Builds allocation plans against an expertise matrix
pub struct TieredAllocator<'a> {
    matrix: &'a ExpertiseMatrix,
    tie_break: TieBreak,
}

impl<'a> TieredAllocator<'a> {
    pub fn new(matrix: &'a ExpertiseMatrix) -> Self {
        Self {
            matrix,
            tie_break: TieBreak::default(),
        }
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Rank `eligible` for `reviewer` and plan up to `capacity` picks.
    ///
    /// DIRECT proposals come first, then RELATED, then OTHER. Inside a tier,
    /// higher tag overlap wins and the tie-break decides the rest. For RANDOM
    /// scope the OTHER tier is shuffled with `seed` instead.
    pub fn allocate(
        &self,
        reviewer: &ReviewerProfile,
        scope: ReviewScope,
        eligible: &[&Proposal],
        capacity: u32,
        seed: u64,
    ) -> AllocationPlan {
        let mut seen = HashSet::new();
        let mut buckets: BTreeMap<MatchTier, Vec<(&Proposal, usize)>> = BTreeMap::new();
        for proposal in eligible {
            if !seen.insert(proposal.id) {
                continue;
            }
            let tier = self.matrix.expertise_tier(proposal, reviewer);
            buckets
                .entry(tier)
                .or_default()
                .push((*proposal, tag_overlap_score(proposal, reviewer)));
        }

        let mut ranked = Vec::with_capacity(seen.len());
        for (tier, mut bucket) in buckets {
            if tier == MatchTier::Other && scope == ReviewScope::Random {
                // Shuffle from a canonical order so the result only depends on the seed
                bucket.sort_by(|a, b| a.0.id.cmp(&b.0.id));
                bucket.shuffle(&mut StdRng::seed_from_u64(seed));
            } else {
                bucket.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| self.tie_break.compare(a.0, b.0)));
            }
            ranked.extend(bucket.into_iter().map(|(proposal, overlap)| RankedCandidate {
                proposal_id: proposal.id,
                tier,
                tag_overlap: overlap,
            }));
        }

        AllocationPlan {
            reviewer_id: reviewer.id,
            capacity: capacity as usize,
            ranked,
        }
    }
}
