//! Domain ports (traits)
//!
//! Port traits define interfaces that the allocation services require.
//! Adapters provide concrete implementations of these traits.

pub mod repositories;

pub use repositories::{
    AssignmentRepository, PeerEvaluationRepository, PreferenceRepository, ProposalRepository,
    ReviewRepository, ReviewerRepository,
};
