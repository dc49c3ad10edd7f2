//! Season analytics derived from the match ledger
//!
//! Everything here is a pure fold over a season's ordered rows. The only
//! path that persists derived analytics back onto a season is
//! `get_season_analytics` / the recalculation orchestrator; ingestion never
//! touches these fields.

use crate::error::LedgerError;
use crate::ledger::store::{MatchStore, SeasonStore};
use crate::types::{MatchResult, RankingMatch, SeasonAnalytics, SeasonRankingId};
use std::sync::Arc;
use tracing::debug;

/// A win over an opponent rated above this counts as a quality win.
/// The thresholds define the metric's meaning; they are not configuration.
pub const QUALITY_WIN_THRESHOLD: f64 = 1600.0;

/// A loss to an opponent rated below this counts as a quality loss
pub const QUALITY_LOSS_THRESHOLD: f64 = 1400.0;

/// Strength of record is rescaled from normalized opponent units back into
/// rating space by this factor
const STRENGTH_OF_RECORD_SCALE: f64 = 2000.0;

/// Fold a season's ordered rows into its derived analytics
///
/// Zero matches produce the all-zero/`None` default, never an error.
pub fn aggregate(rows: &[RankingMatch]) -> SeasonAnalytics {
    if rows.is_empty() {
        return SeasonAnalytics::default();
    }

    let mut analytics = SeasonAnalytics {
        matches: rows.len() as u32,
        ..SeasonAnalytics::default()
    };

    let mut opponent_at_time_sum = 0.0;
    let mut opponent_current_sum = 0.0;
    let mut weighted_wins = 0.0;
    let mut total_weight = 0.0;

    for row in rows {
        let opponent_at_time = row.opponent_elo_at_time;
        opponent_at_time_sum += opponent_at_time;
        opponent_current_sum += row.opponent_elo_current;

        let normalized_opponent = (opponent_at_time - 1000.0) / 1000.0;
        total_weight += normalized_opponent;

        match row.result {
            MatchResult::Win => {
                analytics.wins += 1;
                weighted_wins += normalized_opponent;

                if opponent_at_time > QUALITY_WIN_THRESHOLD {
                    analytics.quality_wins += 1;
                }
                if opponent_at_time > row.elo_before {
                    analytics.upset_wins += 1;
                }
            }
            MatchResult::Loss => {
                analytics.losses += 1;

                if opponent_at_time < QUALITY_LOSS_THRESHOLD {
                    analytics.quality_losses += 1;
                }
                if opponent_at_time < row.elo_before {
                    analytics.upset_losses += 1;
                }
            }
        }
    }

    let count = rows.len() as f64;
    analytics.strength_of_schedule = Some(opponent_at_time_sum / count);
    analytics.strength_of_schedule_latest = Some(opponent_current_sum / count);
    // A schedule of opponents all at or below 1000 carries no weight to
    // normalize against
    analytics.strength_of_record = if total_weight > 0.0 {
        Some(weighted_wins / total_weight * STRENGTH_OF_RECORD_SCALE)
    } else {
        None
    };

    analytics
}

/// Store-facing aggregator: derives a season's analytics from its ledger
/// and persists them onto the season row
pub struct AnalyticsAggregator {
    seasons: Arc<dyn SeasonStore>,
    matches: Arc<dyn MatchStore>,
}

impl AnalyticsAggregator {
    pub fn new(seasons: Arc<dyn SeasonStore>, matches: Arc<dyn MatchStore>) -> Self {
        Self { seasons, matches }
    }

    /// Recompute, persist, and return a season's analytics snapshot
    pub async fn get_season_analytics(
        &self,
        season_id: SeasonRankingId,
    ) -> crate::error::Result<SeasonAnalytics> {
        let mut season = self
            .seasons
            .get(season_id)
            .await?
            .ok_or(LedgerError::SeasonNotFound { season_id })?;

        let rows = self.matches.for_season(season_id).await?;
        let analytics = aggregate(&rows);

        debug!(
            "Derived analytics for season {} - matches: {}, sos: {:?}, quality wins: {}",
            season_id, analytics.matches, analytics.strength_of_schedule, analytics.quality_wins
        );

        season.analytics = analytics.clone();
        season.updated_at = crate::utils::current_timestamp();
        self.seasons.update(season).await?;

        Ok(analytics)
    }
}
