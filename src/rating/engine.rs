//! Stateless rating transition engine
//!
//! This module applies a single match outcome to both competing rating
//! systems (ELO and Glicko-2) using the skillratings crate. It holds no
//! state and performs no I/O; chronology, deduplication, and persistence
//! are the ledger's responsibility.

use crate::config::rating::RatingWeights;
use crate::error::LedgerError;
use crate::types::{AthleteRating, GlickoRating, MatchResult, ResultType, TournamentType};
use skillratings::elo::{elo, EloConfig, EloRating};
use skillratings::glicko2::{glicko2, Glicko2Config, Glicko2Rating};
use skillratings::Outcomes;

/// Rating transition engine for a single match outcome
#[derive(Debug, Clone)]
pub struct RatingEngine {
    weights: RatingWeights,
}

impl RatingEngine {
    /// Create a new engine with validated configuration
    pub fn new(weights: RatingWeights) -> crate::error::Result<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    /// Current weight configuration
    pub fn weights(&self) -> &RatingWeights {
        &self.weights
    }

    /// Effective K for one match: base K scaled by result decisiveness and
    /// tournament stakes
    pub fn effective_k(&self, result_type: ResultType, tournament_type: TournamentType) -> f64 {
        self.weights.base_k
            * self.weights.result_type_weight.weight(result_type)
            * self.weights.tournament_type_weight.weight(tournament_type)
    }

    /// Expected score of the athlete against the opponent under ELO
    pub fn expected_score(&self, athlete_elo: f64, opponent_elo: f64) -> f64 {
        let (expected, _) = skillratings::elo::expected_score(
            &EloRating { rating: athlete_elo },
            &EloRating {
                rating: opponent_elo,
            },
        );
        expected
    }

    /// Apply one match outcome and return both sides' new rating state
    ///
    /// The outcome is from the athlete's perspective. Both input states must
    /// be numerically sound; corrupted state is fatal and signals a ledger
    /// bug upstream.
    pub fn apply_match(
        &self,
        athlete: &AthleteRating,
        opponent: &AthleteRating,
        result: MatchResult,
        result_type: ResultType,
        tournament_type: TournamentType,
    ) -> crate::error::Result<(AthleteRating, AthleteRating)> {
        self.validate_state(athlete, "athlete")?;
        self.validate_state(opponent, "opponent")?;

        let outcome = match result {
            MatchResult::Win => Outcomes::WIN,
            MatchResult::Loss => Outcomes::LOSS,
        };

        let k = self.effective_k(result_type, tournament_type);
        let (athlete_elo, opponent_elo) = elo(
            &EloRating {
                rating: athlete.elo,
            },
            &EloRating {
                rating: opponent.elo,
            },
            &outcome,
            &EloConfig { k },
        );

        let glicko_config = Glicko2Config {
            tau: self.weights.glicko.tau,
            convergence_tolerance: self.weights.glicko.convergence_tolerance,
        };
        let (athlete_glicko, opponent_glicko) = glicko2(
            &athlete.glicko.into(),
            &opponent.glicko.into(),
            &outcome,
            &glicko_config,
        );

        Ok((
            AthleteRating {
                elo: athlete_elo.rating,
                glicko: self.clamp_deviation(athlete_glicko),
            },
            AthleteRating {
                elo: opponent_elo.rating,
                glicko: self.clamp_deviation(opponent_glicko),
            },
        ))
    }

    /// Inflate RD toward the ceiling for seasons an athlete sat out
    ///
    /// Pure calculation; the ledger decides when calendar context justifies
    /// applying it. Rating and volatility are untouched.
    pub fn inactivity_decay(&self, glicko: &GlickoRating, idle_seasons: u32) -> GlickoRating {
        if idle_seasons == 0 {
            return *glicko;
        }

        let c = self.weights.glicko.inactivity_inflation;
        let inflated =
            (glicko.deviation * glicko.deviation + c * c * f64::from(idle_seasons)).sqrt();

        GlickoRating {
            rating: glicko.rating,
            deviation: inflated.min(self.weights.glicko.rd_ceiling),
            volatility: glicko.volatility,
        }
    }

    /// Keep RD inside the configured band after an update
    fn clamp_deviation(&self, rating: Glicko2Rating) -> GlickoRating {
        GlickoRating {
            rating: rating.rating,
            deviation: rating
                .deviation
                .clamp(self.weights.glicko.rd_floor, self.weights.glicko.rd_ceiling),
            volatility: rating.volatility,
        }
    }

    /// Reject numerically corrupted state before it contaminates the ledger
    fn validate_state(&self, rating: &AthleteRating, side: &str) -> crate::error::Result<()> {
        if !rating.elo.is_finite() || rating.elo <= 0.0 {
            return Err(LedgerError::InvalidRatingState {
                reason: format!("{} ELO is not a positive finite number: {}", side, rating.elo),
            }
            .into());
        }
        if !rating.glicko.rating.is_finite() || rating.glicko.rating <= 0.0 {
            return Err(LedgerError::InvalidRatingState {
                reason: format!(
                    "{} Glicko rating is not a positive finite number: {}",
                    side, rating.glicko.rating
                ),
            }
            .into());
        }
        if !rating.glicko.deviation.is_finite()
            || rating.glicko.deviation <= 0.0
            || rating.glicko.deviation > self.weights.glicko.rd_ceiling
        {
            return Err(LedgerError::InvalidRatingState {
                reason: format!(
                    "{} Glicko deviation {} outside (0, {}]",
                    side, rating.glicko.deviation, self.weights.glicko.rd_ceiling
                ),
            }
            .into());
        }
        if !rating.glicko.volatility.is_finite() || rating.glicko.volatility <= 0.0 {
            return Err(LedgerError::InvalidRatingState {
                reason: format!(
                    "{} Glicko volatility is not positive: {}",
                    side, rating.glicko.volatility
                ),
            }
            .into());
        }
        Ok(())
    }
}

impl Default for RatingEngine {
    fn default() -> Self {
        Self {
            weights: RatingWeights::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rating(elo: f64) -> AthleteRating {
        AthleteRating {
            elo,
            ..AthleteRating::default()
        }
    }

    #[test]
    fn test_elo_beating_stronger_opponent() {
        let engine = RatingEngine::default();

        // 1500 beats 1700 at K=32: expected ~0.2403, new rating ~1524.3
        let expected = engine.expected_score(1500.0, 1700.0);
        assert!((expected - 0.2403).abs() < 0.001);

        let (new_athlete, new_opponent) = engine
            .apply_match(
                &rating(1500.0),
                &rating(1700.0),
                MatchResult::Win,
                ResultType::Decision,
                TournamentType::Local,
            )
            .unwrap();

        assert!((new_athlete.elo - 1524.3).abs() < 0.05);
        assert!(new_opponent.elo < 1700.0);
    }

    #[test]
    fn test_elo_beating_weaker_opponent_gains_less() {
        let engine = RatingEngine::default();

        let (vs_stronger, _) = engine
            .apply_match(
                &rating(1500.0),
                &rating(1700.0),
                MatchResult::Win,
                ResultType::Decision,
                TournamentType::Local,
            )
            .unwrap();
        let (vs_weaker, _) = engine
            .apply_match(
                &rating(1500.0),
                &rating(1300.0),
                MatchResult::Win,
                ResultType::Decision,
                TournamentType::Local,
            )
            .unwrap();

        assert!((vs_weaker.elo - 1507.7).abs() < 0.05);
        // Beating the stronger opponent must yield a strictly larger gain
        assert!(vs_stronger.elo > vs_weaker.elo);
    }

    #[test]
    fn test_effective_k_scales_with_stakes() {
        let engine = RatingEngine::default();

        let decision_local = engine.effective_k(ResultType::Decision, TournamentType::Local);
        let fall_local = engine.effective_k(ResultType::Fall, TournamentType::Local);
        let decision_state = engine.effective_k(ResultType::Decision, TournamentType::State);
        let fall_national = engine.effective_k(ResultType::Fall, TournamentType::National);

        assert_eq!(decision_local, 32.0);
        assert!(fall_local > decision_local);
        assert!(decision_state > decision_local);
        assert!(fall_national > fall_local);
        assert!(fall_national > decision_state);
    }

    #[test]
    fn test_fall_moves_rating_further_than_decision() {
        let engine = RatingEngine::default();

        let (by_decision, _) = engine
            .apply_match(
                &rating(1500.0),
                &rating(1500.0),
                MatchResult::Win,
                ResultType::Decision,
                TournamentType::Local,
            )
            .unwrap();
        let (by_fall, _) = engine
            .apply_match(
                &rating(1500.0),
                &rating(1500.0),
                MatchResult::Win,
                ResultType::Fall,
                TournamentType::Local,
            )
            .unwrap();

        assert!(by_fall.elo > by_decision.elo);
    }

    #[test]
    fn test_glicko_first_match_from_default_priors() {
        let engine = RatingEngine::default();
        let athlete = AthleteRating::default();
        let opponent = AthleteRating::default();

        assert_eq!(athlete.glicko.rating, 1500.0);
        assert_eq!(athlete.glicko.deviation, 350.0);
        assert_eq!(athlete.glicko.volatility, 0.06);

        let (winner, loser) = engine
            .apply_match(
                &athlete,
                &opponent,
                MatchResult::Win,
                ResultType::Decision,
                TournamentType::Local,
            )
            .unwrap();

        assert!(winner.glicko.rating > 1500.0);
        assert!(loser.glicko.rating < 1500.0);
        // One result narrows uncertainty on both sides
        assert!(winner.glicko.deviation < 350.0);
        assert!(loser.glicko.deviation < 350.0);
    }

    #[test]
    fn test_glicko_bounds_hold_across_many_matches() {
        let engine = RatingEngine::default();
        let mut athlete = AthleteRating::default();
        let opponent = rating(1480.0);

        for _ in 0..200 {
            let (next, _) = engine
                .apply_match(
                    &athlete,
                    &opponent,
                    MatchResult::Win,
                    ResultType::Fall,
                    TournamentType::National,
                )
                .unwrap();
            athlete = next;

            assert!(athlete.glicko.deviation >= 30.0);
            assert!(athlete.glicko.deviation <= 350.0);
            assert!(athlete.glicko.volatility > 0.0);
        }
    }

    #[test]
    fn test_inactivity_decay_grows_rd_toward_ceiling() {
        let engine = RatingEngine::default();
        let settled = GlickoRating {
            rating: 1620.0,
            deviation: 60.0,
            volatility: 0.06,
        };

        let unchanged = engine.inactivity_decay(&settled, 0);
        assert_eq!(unchanged.deviation, 60.0);

        let one_season = engine.inactivity_decay(&settled, 1);
        let three_seasons = engine.inactivity_decay(&settled, 3);
        assert!(one_season.deviation > 60.0);
        assert!(three_seasons.deviation > one_season.deviation);
        assert_eq!(one_season.rating, 1620.0);

        let long_idle = engine.inactivity_decay(&settled, 50);
        assert_eq!(long_idle.deviation, 350.0);
    }

    #[test]
    fn test_corrupted_state_is_fatal() {
        let engine = RatingEngine::default();
        let healthy = AthleteRating::default();

        let nan_elo = AthleteRating {
            elo: f64::NAN,
            ..AthleteRating::default()
        };
        assert!(engine
            .apply_match(
                &nan_elo,
                &healthy,
                MatchResult::Win,
                ResultType::Decision,
                TournamentType::Local,
            )
            .is_err());

        let negative_rd = AthleteRating {
            glicko: GlickoRating {
                deviation: -5.0,
                ..GlickoRating::default()
            },
            ..AthleteRating::default()
        };
        assert!(engine
            .apply_match(
                &healthy,
                &negative_rd,
                MatchResult::Loss,
                ResultType::Decision,
                TournamentType::Local,
            )
            .is_err());

        let zero_rating = AthleteRating {
            elo: 0.0,
            ..AthleteRating::default()
        };
        assert!(engine
            .apply_match(
                &zero_rating,
                &healthy,
                MatchResult::Win,
                ResultType::Decision,
                TournamentType::Local,
            )
            .is_err());
    }

    proptest! {
        #[test]
        fn prop_win_raises_and_loss_lowers_elo(
            athlete_elo in 800.0f64..2800.0,
            opponent_elo in 800.0f64..2800.0,
        ) {
            let engine = RatingEngine::default();

            let (after_win, opponent_after) = engine
                .apply_match(
                    &rating(athlete_elo),
                    &rating(opponent_elo),
                    MatchResult::Win,
                    ResultType::Decision,
                    TournamentType::Local,
                )
                .unwrap();
            prop_assert!(after_win.elo > athlete_elo);
            prop_assert!(opponent_after.elo < opponent_elo);

            let (after_loss, _) = engine
                .apply_match(
                    &rating(athlete_elo),
                    &rating(opponent_elo),
                    MatchResult::Loss,
                    ResultType::Decision,
                    TournamentType::Local,
                )
                .unwrap();
            prop_assert!(after_loss.elo < athlete_elo);
        }

        #[test]
        fn prop_transitions_are_deterministic(
            athlete_elo in 800.0f64..2800.0,
            opponent_elo in 800.0f64..2800.0,
        ) {
            let engine = RatingEngine::default();
            let athlete = rating(athlete_elo);
            let opponent = rating(opponent_elo);

            let first = engine
                .apply_match(
                    &athlete,
                    &opponent,
                    MatchResult::Win,
                    ResultType::Fall,
                    TournamentType::State,
                )
                .unwrap();
            let second = engine
                .apply_match(
                    &athlete,
                    &opponent,
                    MatchResult::Win,
                    ResultType::Fall,
                    TournamentType::State,
                )
                .unwrap();

            prop_assert_eq!(first, second);
        }
    }
}
