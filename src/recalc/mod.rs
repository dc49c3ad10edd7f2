//! Batch recalculation orchestration

pub mod orchestrator;

// Re-export commonly used types
pub use orchestrator::{RecalculationOrchestrator, RecalculationReport, SeasonRecalculationError};
