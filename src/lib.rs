//! Pinfall - rating and strength-of-schedule analytics for wrestling seasons
//!
//! This crate ingests wrestling match results, maintains ELO and Glicko-2
//! ratings per athlete per season over an append-only match ledger, and
//! derives schedule-strength and quality/upset analytics from that ledger.

pub mod analytics;
pub mod config;
pub mod error;
pub mod ledger;
pub mod rating;
pub mod recalc;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{LedgerError, Result};
pub use types::*;

// Re-export key components
pub use analytics::AnalyticsAggregator;
pub use ledger::{MatchLedger, MatchStore, SeasonStore};
pub use rating::RatingEngine;
pub use recalc::{RecalculationOrchestrator, RecalculationReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
