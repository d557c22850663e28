//! Domain layer
//!
//! Contains pure business types with no storage dependencies.
//! - `entities`: Domain models for reviewers, proposals and allocation records
//! - `ports`: Trait definitions for the store the allocator reads and writes

pub mod entities;
pub mod ports;
