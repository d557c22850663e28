//! Peer evaluation domain entity
//!
//! A second-level review: one evaluator scoring someone else's submitted
//! review. The evaluator is never the review's author.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::review::ReviewId;
use super::reviewer::ReviewerId;

/// Unique identifier for a peer evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerEvaluationId(pub Uuid);

impl PeerEvaluationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PeerEvaluationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for PeerEvaluationId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for PeerEvaluationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Peer evaluation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerEvaluationStatus {
    Pending,
    InProgress,
    Completed,
}

impl std::fmt::Display for PeerEvaluationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerEvaluationStatus::Pending => write!(f, "pending"),
            PeerEvaluationStatus::InProgress => write!(f, "in_progress"),
            PeerEvaluationStatus::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for PeerEvaluationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(PeerEvaluationStatus::Pending),
            "in_progress" | "inprogress" => Ok(PeerEvaluationStatus::InProgress),
            "completed" => Ok(PeerEvaluationStatus::Completed),
            _ => Err(format!("Unknown peer evaluation status: {}", s)),
        }
    }
}

/// A peer evaluation of one review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerEvaluation {
    pub id: PeerEvaluationId,
    pub review_id: ReviewId,
    pub evaluator_id: ReviewerId,
    /// Criterion name -> score (0-5), empty until the evaluator submits
    pub scores: BTreeMap<String, u8>,
    pub status: PeerEvaluationStatus,
    pub created_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

impl PeerEvaluation {
    /// A freshly assigned, unscored evaluation
    pub fn pending(
        review_id: ReviewId,
        evaluator_id: ReviewerId,
        created_at: DateTime<Utc>,
        due_in_days: i64,
    ) -> Self {
        Self {
            id: PeerEvaluationId::new(),
            review_id,
            evaluator_id,
            scores: BTreeMap::new(),
            status: PeerEvaluationStatus::Pending,
            created_at,
            due_date: created_at + Duration::days(due_in_days),
        }
    }

    /// Check if the evaluation still counts against the evaluator's peer load
    pub fn is_open(&self) -> bool {
        self.status != PeerEvaluationStatus::Completed
    }
}
