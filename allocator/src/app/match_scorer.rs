//! Match scoring
//!
//! Pure, deterministic scoring of reviewer/proposal affinity and
//! reviewer/reviewer diversity. The expertise relation lives in
//! `ExpertiseMatrix` so it can be swapped without touching allocation logic.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::domain::entities::{
    ChallengeCategory, ExpertiseArea, MatchTier, Proposal, ReviewerProfile,
};

/// Whether two reviewers share a primary expertise area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiversityClass {
    Same,
    Different,
}

/// Which expertise areas cover which challenge categories, and which areas
/// count as related to each other
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpertiseMatrix {
    related: BTreeSet<(ExpertiseArea, ExpertiseArea)>,
    coverage: BTreeMap<ExpertiseArea, BTreeSet<ChallengeCategory>>,
}

impl Default for ExpertiseMatrix {
    fn default() -> Self {
        Self::empty()
            .with_related(ExpertiseArea::Technical, ExpertiseArea::Product)
            .with_related(ExpertiseArea::Community, ExpertiseArea::Product)
            .with_coverage(
                ExpertiseArea::Technical,
                [
                    ChallengeCategory::OpenSource,
                    ChallengeCategory::Concept,
                    ChallengeCategory::Product,
                    ChallengeCategory::Partnership,
                ],
            )
            .with_coverage(
                ExpertiseArea::Product,
                [
                    ChallengeCategory::Concept,
                    ChallengeCategory::Product,
                    ChallengeCategory::Partnership,
                ],
            )
            .with_coverage(ExpertiseArea::Community, [ChallengeCategory::Ecosystem])
    }
}

impl ExpertiseMatrix {
    /// A matrix with no relations and no coverage (everything is `Other`)
    pub fn empty() -> Self {
        Self {
            related: BTreeSet::new(),
            coverage: BTreeMap::new(),
        }
    }

    /// Mark two areas as related (symmetric)
    pub fn with_related(mut self, a: ExpertiseArea, b: ExpertiseArea) -> Self {
        if a != b {
            self.related.insert(ordered_pair(a, b));
        }
        self
    }

    /// Add categories directly covered by an area
    pub fn with_coverage(
        mut self,
        area: ExpertiseArea,
        categories: impl IntoIterator<Item = ChallengeCategory>,
    ) -> Self {
        self.coverage.entry(area).or_default().extend(categories);
        self
    }

    pub fn are_related(&self, a: ExpertiseArea, b: ExpertiseArea) -> bool {
        a != b && self.related.contains(&ordered_pair(a, b))
    }

    pub fn covers(&self, area: ExpertiseArea, category: ChallengeCategory) -> bool {
        self.coverage
            .get(&area)
            .is_some_and(|categories| categories.contains(&category))
    }

    /// Tier of a proposal for a reviewer:
    /// - `Direct` when the reviewer's primary area covers the category
    /// - `Related` when an area related to the primary one covers it
    /// - `Other` otherwise
    pub fn expertise_tier(&self, proposal: &Proposal, reviewer: &ReviewerProfile) -> MatchTier {
        let primary = reviewer.primary_expertise;
        if self.covers(primary, proposal.category) {
            return MatchTier::Direct;
        }

        let related = ExpertiseArea::ALL
            .iter()
            .any(|area| self.are_related(primary, *area) && self.covers(*area, proposal.category));
        if related {
            MatchTier::Related
        } else {
            MatchTier::Other
        }
    }
}

fn ordered_pair(a: ExpertiseArea, b: ExpertiseArea) -> (ExpertiseArea, ExpertiseArea) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Number of proposal detailed tags the reviewer is interested in.
/// Only used for ordering, so it is not normalized.
pub fn tag_overlap_score(proposal: &Proposal, reviewer: &ReviewerProfile) -> usize {
    proposal
        .detailed_tags
        .intersection(&reviewer.interests)
        .count()
}

/// Number of interests two reviewers share
pub fn interest_overlap(a: &ReviewerProfile, b: &ReviewerProfile) -> usize {
    a.interests.intersection(&b.interests).count()
}

pub fn diversity_class(a: &ReviewerProfile, b: &ReviewerProfile) -> DiversityClass {
    if a.primary_expertise == b.primary_expertise {
        DiversityClass::Same
    } else {
        DiversityClass::Different
    }
}
