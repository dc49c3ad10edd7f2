//! Append-only match ledger: deduplication, ordering, and replay
//!
//! The ledger owns the history of processed matches per season. Rows are
//! written once with full before/after rating snapshots; replaying them in
//! date order through the rating engine reproduces every season aggregate.

pub mod hash;
pub mod ingest;
pub mod store;

// Re-export commonly used items
pub use hash::match_hash;
pub use ingest::MatchLedger;
pub use store::{InMemoryMatchStore, InMemorySeasonStore, MatchStore, SeasonStore};
