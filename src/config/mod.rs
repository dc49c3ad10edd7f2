//! Configuration management for the pinfall engine
//!
//! This module handles configuration loading from environment variables,
//! validation, and default values for the rating and recalculation layers.

pub mod app;
pub mod rating;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, RecalculationSettings, ServiceSettings};
pub use rating::{GlickoSettings, RatingWeights, ResultTypeWeights, TournamentTypeWeights};
