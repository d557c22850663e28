//! Domain entities
//!
//! Pure domain models for reviewers, proposals and the records the allocator
//! produces. These are separate from the SeaORM entities in the `entity` module.

pub mod assignment;
pub mod expertise;
pub mod fund;
pub mod peer_evaluation;
pub mod preferences;
pub mod proposal;
pub mod review;
pub mod reviewer;

pub use assignment::{Assignment, AssignmentId, AssignmentStatus, MatchTier};
pub use expertise::{ChallengeCategory, ExpertiseArea, ExpertiseScores, MAX_EXPERTISE_LEVEL};
pub use fund::FundId;
pub use peer_evaluation::{PeerEvaluation, PeerEvaluationId, PeerEvaluationStatus};
pub use preferences::{FundPreferences, ReviewScope};
pub use proposal::{Proposal, ProposalId, DEFAULT_MIN_REQUIRED_REVIEWS};
pub use review::{Review, ReviewId, ReviewStatus};
pub use reviewer::{ReviewerId, ReviewerProfile};
