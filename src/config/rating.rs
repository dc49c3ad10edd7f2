//! Rating system configuration
//!
//! The K-factor tables and Glicko-2 parameters are an explicit configuration
//! surface. The hard contract is the shape, not the numbers: more decisive
//! results and higher-stakes tournaments always carry a strictly larger K.

use crate::error::LedgerError;
use crate::types::{ResultType, TournamentType};
use serde::{Deserialize, Serialize};

/// K multipliers per result type
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResultTypeWeights {
    pub decision: f64,
    pub major_decision: f64,
    pub technical_fall: f64,
    pub fall: f64,
}

impl Default for ResultTypeWeights {
    fn default() -> Self {
        Self {
            decision: 1.0,
            major_decision: 1.2,
            technical_fall: 1.4,
            fall: 1.5,
        }
    }
}

impl ResultTypeWeights {
    /// Multiplier for a result type; exhaustive so a new variant cannot
    /// silently fall through to a default weight
    pub fn weight(&self, result_type: ResultType) -> f64 {
        match result_type {
            ResultType::Decision => self.decision,
            ResultType::MajorDecision => self.major_decision,
            ResultType::TechnicalFall => self.technical_fall,
            ResultType::Fall => self.fall,
        }
    }
}

/// K multipliers per tournament tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TournamentTypeWeights {
    pub local: f64,
    pub district: f64,
    pub regional: f64,
    pub state: f64,
    pub national: f64,
}

impl Default for TournamentTypeWeights {
    fn default() -> Self {
        Self {
            local: 1.0,
            district: 1.1,
            regional: 1.2,
            state: 1.35,
            national: 1.5,
        }
    }
}

impl TournamentTypeWeights {
    /// Multiplier for a tournament tier; exhaustive so a new variant cannot
    /// silently fall through to a default weight
    pub fn weight(&self, tournament_type: TournamentType) -> f64 {
        match tournament_type {
            TournamentType::Local => self.local,
            TournamentType::District => self.district,
            TournamentType::Regional => self.regional,
            TournamentType::State => self.state,
            TournamentType::National => self.national,
        }
    }
}

/// Glicko-2 algorithm parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GlickoSettings {
    /// Volatility change constraint (tau)
    pub tau: f64,
    /// Epsilon bounding the volatility convergence iteration
    pub convergence_tolerance: f64,
    /// Irreducible uncertainty; RD never drops below this
    pub rd_floor: f64,
    /// RD never grows past this, including through inactivity decay
    pub rd_ceiling: f64,
    /// Per-idle-season RD inflation constant `c` in
    /// `rd' = min(ceiling, sqrt(rd^2 + c^2 * t))`
    pub inactivity_inflation: f64,
}

impl Default for GlickoSettings {
    fn default() -> Self {
        Self {
            tau: 0.5,
            convergence_tolerance: 0.000_001,
            rd_floor: 30.0,
            rd_ceiling: 350.0,
            inactivity_inflation: 150.0,
        }
    }
}

/// Full rating configuration: base K plus the weight tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingWeights {
    pub base_k: f64,
    pub result_type_weight: ResultTypeWeights,
    pub tournament_type_weight: TournamentTypeWeights,
    pub glicko: GlickoSettings,
}

impl Default for RatingWeights {
    fn default() -> Self {
        Self {
            base_k: 32.0,
            result_type_weight: ResultTypeWeights::default(),
            tournament_type_weight: TournamentTypeWeights::default(),
            glicko: GlickoSettings::default(),
        }
    }
}

impl RatingWeights {
    /// Create conservative configuration (slower rating movement)
    pub fn conservative() -> Self {
        Self {
            base_k: 24.0,
            ..Self::default()
        }
    }

    /// Create aggressive configuration (faster rating movement)
    pub fn aggressive() -> Self {
        Self {
            base_k: 40.0,
            ..Self::default()
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.base_k <= 0.0 {
            return Err(LedgerError::ConfigurationError {
                message: "Base K must be positive".to_string(),
            }
            .into());
        }

        let result = &self.result_type_weight;
        let ordered = result.decision <= result.major_decision
            && result.major_decision <= result.technical_fall
            && result.technical_fall <= result.fall;
        if result.decision <= 0.0 || !ordered {
            return Err(LedgerError::ConfigurationError {
                message: "Result type weights must be positive and non-decreasing \
                          from decision to fall"
                    .to_string(),
            }
            .into());
        }

        let tournament = &self.tournament_type_weight;
        let ordered = tournament.local <= tournament.district
            && tournament.district <= tournament.regional
            && tournament.regional <= tournament.state
            && tournament.state <= tournament.national;
        if tournament.local <= 0.0 || !ordered {
            return Err(LedgerError::ConfigurationError {
                message: "Tournament type weights must be positive and non-decreasing \
                          from local to national"
                    .to_string(),
            }
            .into());
        }

        if self.glicko.tau <= 0.0 {
            return Err(LedgerError::ConfigurationError {
                message: "Glicko tau must be positive".to_string(),
            }
            .into());
        }
        if self.glicko.convergence_tolerance <= 0.0 {
            return Err(LedgerError::ConfigurationError {
                message: "Glicko convergence tolerance must be positive".to_string(),
            }
            .into());
        }
        if self.glicko.rd_floor <= 0.0 || self.glicko.rd_floor >= self.glicko.rd_ceiling {
            return Err(LedgerError::ConfigurationError {
                message: "Glicko RD floor must be positive and below the ceiling".to_string(),
            }
            .into());
        }
        if self.glicko.inactivity_inflation < 0.0 {
            return Err(LedgerError::ConfigurationError {
                message: "Glicko inactivity inflation must be non-negative".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
