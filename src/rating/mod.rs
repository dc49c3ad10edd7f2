//! Rating system integration for ELO and Glicko-2
//!
//! This module provides the stateless transition engine both the ledger and
//! the recalculation layer fold matches through, built on the skillratings
//! crate.

pub mod engine;

// Re-export commonly used types
pub use engine::RatingEngine;
