//! Fund identifier
//!
//! A fund is one review round. Reviewers, proposals and preferences are all
//! scoped to a fund.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a fund
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FundId(pub Uuid);

impl FundId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FundId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for FundId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for FundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
