//! SeaORM entity models
//!
//! Row shapes of the allocator's PostgreSQL tables (see
//! `migrations/0001_init.sql`). Set-valued columns are stored as JSONB arrays.

pub mod assignments;
pub mod fund_preferences;
pub mod peer_evaluations;
pub mod proposals;
pub mod reviewers;
pub mod reviews;
