//! Application layer
//!
//! Allocation use cases. The scoring, filtering and ranking modules are
//! pure; the services coordinate them with the store through the ports.

pub mod allocation_config;
pub mod assignment_committer;
pub mod bulk_assignment;
pub mod confidence;
pub mod eligibility;
pub mod individual_assignment;
pub mod match_scorer;
pub mod peer_panel;
pub mod retry;
pub mod run_report;
pub mod tiered_allocator;

// Re-export allocation defaults for public API (constants used by consumers)
#[allow(unused_imports)]
pub use allocation_config::*;
pub use assignment_committer::{AssignmentCommitter, CommitOutcome};
pub use bulk_assignment::{BulkAssignmentService, BulkRunOutcome, BulkRunRequest};
pub use confidence::{
    compute_confidence, confidence_breakdown, expertise_score, ConfidenceBreakdown,
    ConfidenceService, RatedReview,
};
pub use eligibility::{filter_eligible, pass_capacity};
pub use individual_assignment::{IndividualAssignmentService, IndividualOptions};
pub use match_scorer::{
    diversity_class, interest_overlap, tag_overlap_score, DiversityClass, ExpertiseMatrix,
};
pub use peer_panel::{
    eligible_evaluators, rank_panel, select_panel, PanelCandidate, PanelOutcome, PanelStatus,
    PanelSweepReport, PeerPanelService, PeerRequestOptions,
};
pub use run_report::{ReviewerOutcome, ReviewerStatus, RunReport, SkipReason};
pub use tiered_allocator::{AllocationPlan, RankedCandidate, TieBreak, TieredAllocator};
