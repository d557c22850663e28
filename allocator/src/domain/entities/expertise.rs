//! Expertise and challenge category types
//!
//! Closed vocabularies shared by reviewers and proposals.

use serde::{Deserialize, Serialize};

/// Primary expertise area of a reviewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpertiseArea {
    Technical,
    Product,
    Community,
}

impl ExpertiseArea {
    pub const ALL: [ExpertiseArea; 3] = [
        ExpertiseArea::Technical,
        ExpertiseArea::Product,
        ExpertiseArea::Community,
    ];
}

impl std::fmt::Display for ExpertiseArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpertiseArea::Technical => write!(f, "technical"),
            ExpertiseArea::Product => write!(f, "product"),
            ExpertiseArea::Community => write!(f, "community"),
        }
    }
}

impl std::str::FromStr for ExpertiseArea {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "technical" => Ok(ExpertiseArea::Technical),
            "product" => Ok(ExpertiseArea::Product),
            "community" => Ok(ExpertiseArea::Community),
            _ => Err(format!("Unknown expertise area: {}", s)),
        }
    }
}

/// Funding challenge a proposal was submitted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeCategory {
    Concept,
    Product,
    OpenSource,
    Ecosystem,
    Partnership,
}

impl ChallengeCategory {
    /// Expertise area whose sub-score rates a reviewer for this category.
    ///
    /// `None` for categories that span several areas; callers fall back to the
    /// reviewer's strongest sub-score.
    pub fn family(&self) -> Option<ExpertiseArea> {
        match self {
            ChallengeCategory::OpenSource => Some(ExpertiseArea::Technical),
            ChallengeCategory::Product => Some(ExpertiseArea::Product),
            ChallengeCategory::Ecosystem => Some(ExpertiseArea::Community),
            ChallengeCategory::Concept | ChallengeCategory::Partnership => None,
        }
    }
}

impl std::fmt::Display for ChallengeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChallengeCategory::Concept => write!(f, "concept"),
            ChallengeCategory::Product => write!(f, "product"),
            ChallengeCategory::OpenSource => write!(f, "open_source"),
            ChallengeCategory::Ecosystem => write!(f, "ecosystem"),
            ChallengeCategory::Partnership => write!(f, "partnership"),
        }
    }
}

impl std::str::FromStr for ChallengeCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "concept" => Ok(ChallengeCategory::Concept),
            "product" => Ok(ChallengeCategory::Product),
            "open_source" | "opensource" => Ok(ChallengeCategory::OpenSource),
            "ecosystem" => Ok(ChallengeCategory::Ecosystem),
            "partnership" => Ok(ChallengeCategory::Partnership),
            _ => Err(format!("Unknown challenge category: {}", s)),
        }
    }
}

/// Self-declared expertise levels (0-5). Missing levels count as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertiseScores {
    pub technical: Option<u8>,
    pub product: Option<u8>,
    pub community: Option<u8>,
}

/// Upper bound of a sub-score
pub const MAX_EXPERTISE_LEVEL: u8 = 5;

impl ExpertiseScores {
    pub fn new(technical: u8, product: u8, community: u8) -> Self {
        Self {
            technical: Some(technical),
            product: Some(product),
            community: Some(community),
        }
    }

    /// Level for one area, clamped to the 0-5 scale
    pub fn level(&self, area: ExpertiseArea) -> u8 {
        let level = match area {
            ExpertiseArea::Technical => self.technical,
            ExpertiseArea::Product => self.product,
            ExpertiseArea::Community => self.community,
        };
        level.unwrap_or(0).min(MAX_EXPERTISE_LEVEL)
    }

    /// Strongest of the three sub-scores
    pub fn max_level(&self) -> u8 {
        ExpertiseArea::ALL
            .iter()
            .map(|area| self.level(*area))
            .max()
            .unwrap_or(0)
    }
}
