//! Main application configuration
//!
//! This module defines the primary configuration structures for the pinfall
//! rating engine, including environment variable loading and validation.

use crate::config::rating::RatingWeights;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub rating: RatingWeights,
    #[serde(default)]
    pub recalculation: RecalculationSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Service name for logging
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Batch recalculation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecalculationSettings {
    /// Maximum seasons replayed concurrently during `recalculate_all`.
    /// Each unit of work is a full ledger replay, so this is bounded to
    /// I/O capacity rather than fanned out per season.
    pub worker_pool_size: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "pinfall".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for RecalculationSettings {
    fn default() -> Self {
        Self {
            worker_pool_size: 8,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }

        // Rating settings
        if let Ok(base_k) = env::var("RATING_BASE_K") {
            config.rating.base_k = base_k
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_BASE_K value: {}", base_k))?;
        }
        if let Ok(tau) = env::var("GLICKO_TAU") {
            config.rating.glicko.tau = tau
                .parse()
                .map_err(|_| anyhow!("Invalid GLICKO_TAU value: {}", tau))?;
        }
        if let Ok(tolerance) = env::var("GLICKO_CONVERGENCE_TOLERANCE") {
            config.rating.glicko.convergence_tolerance = tolerance.parse().map_err(|_| {
                anyhow!("Invalid GLICKO_CONVERGENCE_TOLERANCE value: {}", tolerance)
            })?;
        }

        // Recalculation settings
        if let Ok(pool) = env::var("RECALC_WORKER_POOL_SIZE") {
            config.recalculation.worker_pool_size = pool
                .parse()
                .map_err(|_| anyhow!("Invalid RECALC_WORKER_POOL_SIZE value: {}", pool))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.name.is_empty() {
        return Err(anyhow!("Service name cannot be empty"));
    }

    if config.recalculation.worker_pool_size == 0 {
        return Err(anyhow!("Recalculation worker pool size must be greater than 0"));
    }

    config.rating.validate()?;

    Ok(())
}
