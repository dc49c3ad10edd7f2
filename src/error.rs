//! Error types for the rating and analytics engine
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the crate.

use uuid::Uuid;

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific ledger and analytics scenarios
///
/// A duplicate match is deliberately NOT represented here: re-scraped
/// observations are an expected, frequent outcome and are reported as
/// `IngestOutcome::Duplicate` instead of an error.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Season ranking not found: {season_id}")]
    SeasonNotFound { season_id: Uuid },

    #[error("Invalid rating state: {reason}")]
    InvalidRatingState { reason: String },

    #[error("Invalid match observation: {reason}")]
    InvalidObservation { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal engine error: {message}")]
    InternalError { message: String },
}
