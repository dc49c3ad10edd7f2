//! Append-only match ledger
//!
//! The ledger turns raw match observations into durable, ordered,
//! deduplicated `RankingMatch` rows and the corresponding `SeasonRanking`
//! updates. All ingestion and replay for one season is serialized on a
//! per-season mutex; distinct seasons proceed in parallel.

use crate::error::LedgerError;
use crate::ledger::hash::match_hash;
use crate::ledger::store::{MatchStore, SeasonStore};
use crate::rating::RatingEngine;
use crate::types::{
    AthleteId, AthleteRating, AuditEntry, IngestOutcome, RankingMatch, RawMatchObservation,
    SeasonRanking, SeasonRankingId,
};
use anyhow::Context;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The append-only ledger and its season aggregates
pub struct MatchLedger {
    seasons: Arc<dyn SeasonStore>,
    matches: Arc<dyn MatchStore>,
    engine: Arc<RatingEngine>,
    /// One mutex per season; held for the whole ingest/replay call
    season_locks: std::sync::Mutex<HashMap<SeasonRankingId, Arc<tokio::sync::Mutex<()>>>>,
    /// Monotonic ingestion sequence; stable tie-break for same-day matches
    sequence: AtomicU64,
}

impl MatchLedger {
    /// Create a ledger over the given stores, resuming the ingestion
    /// sequence from whatever the match store already holds
    pub async fn new(
        seasons: Arc<dyn SeasonStore>,
        matches: Arc<dyn MatchStore>,
        engine: Arc<RatingEngine>,
    ) -> crate::error::Result<Self> {
        let last_sequence = matches.max_sequence().await?;

        Ok(Self {
            seasons,
            matches,
            engine,
            season_locks: std::sync::Mutex::new(HashMap::new()),
            sequence: AtomicU64::new(last_sequence),
        })
    }

    /// Ingest one raw observation
    ///
    /// Duplicates are an expected outcome of re-scraping and report
    /// `IngestOutcome::Duplicate` without touching any state. A match dated
    /// earlier than the season's most recently processed match triggers a
    /// full date-ordered replay instead of an incremental append.
    pub async fn ingest(
        &self,
        observation: RawMatchObservation,
    ) -> crate::error::Result<IngestOutcome> {
        validate_observation(&observation)?;

        let hash = match_hash(&observation);
        if self.matches.contains_hash(hash).await? {
            debug!(
                "Duplicate observation skipped - athlete: {}, opponent: {}, date: {}, hash: {}",
                observation.athlete_id, observation.opponent_id, observation.match_date, hash
            );
            return Ok(IngestOutcome::Duplicate);
        }

        let season = self.find_or_create_season(&observation).await?;
        let lock = self.season_lock(season.id)?;
        let _guard = lock.lock().await;

        // Re-read under the lock; a concurrent ingest may have advanced it
        let mut season = self
            .seasons
            .get(season.id)
            .await?
            .ok_or(LedgerError::SeasonNotFound { season_id: season.id })?;

        // The hash check races with other ingests of the same observation;
        // the store's uniqueness constraint is the authority, so check again
        // now that this season is serialized.
        if self.matches.contains_hash(hash).await? {
            debug!("Duplicate observation lost the ingest race - hash: {}", hash);
            return Ok(IngestOutcome::Duplicate);
        }

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let opponent = self
            .opponent_state(observation.opponent_id, season.key.year)
            .await?;

        let last_processed = season.last_match_date;
        let out_of_order =
            matches!(last_processed, Some(last) if observation.match_date < last);

        let row_id = crate::utils::generate_ranking_match_id();
        let before = season.rating;
        let (after, _) = self
            .engine
            .apply_match(
                &before,
                &opponent,
                observation.match_result,
                observation.result_type,
                observation.tournament_type,
            )
            .with_context(|| {
                format!(
                    "season {} ingestion halted at match dated {} (last good sequence {})",
                    season.id, observation.match_date, season.last_sequence
                )
            })?;

        let row = RankingMatch {
            id: row_id,
            season_ranking_id: season.id,
            athlete_id: observation.athlete_id,
            opponent_id: observation.opponent_id,
            match_date: observation.match_date,
            sequence,
            result: observation.match_result,
            result_type: observation.result_type,
            tournament_type: observation.tournament_type,
            weight: observation.weight,
            source_url: observation.source_url.clone(),
            match_hash: hash,
            elo_before: before.elo,
            elo_after: after.elo,
            glicko_before: before.glicko,
            glicko_after: after.glicko,
            // The opponent snapshot as it stands right now becomes the
            // immutable at-time record; replay never recomputes it
            opponent_elo_at_time: opponent.elo,
            opponent_glicko_at_time: opponent.glicko,
            opponent_elo_current: opponent.elo,
            opponent_glicko_current: opponent.glicko,
            created_at: crate::utils::current_timestamp(),
        };
        self.matches.insert(row).await?;

        if out_of_order {
            info!(
                "Out-of-order ingestion for season {} - match dated {} precedes last processed \
                 {:?}; replaying full season ledger",
                season.id, observation.match_date, last_processed
            );
            self.replay_locked(&mut season).await?;
        } else {
            apply_result_to_season(&mut season, &observation, after, sequence);
            self.seasons.update(season.clone()).await?;
        }

        info!(
            "Ingested match - athlete: {}, opponent: {}, date: {}, result: {} by {}, \
             elo: {:.1} -> {:.1}",
            observation.athlete_id,
            observation.opponent_id,
            observation.match_date,
            observation.match_result,
            observation.result_type,
            before.elo,
            season.rating.elo
        );

        drop(_guard);

        // The athlete's rating moved; refresh the cached opponent-current
        // snapshot on every historical row that faced them
        self.refresh_opponent_snapshots(observation.athlete_id, season.rating)
            .await;

        Ok(IngestOutcome::Ingested {
            ranking_match_id: row_id,
        })
    }

    /// Replay one season's ledger in date order, regenerating every athlete
    /// before/after snapshot and the season's aggregates
    pub async fn replay_season(&self, season_id: SeasonRankingId) -> crate::error::Result<()> {
        let lock = self.season_lock(season_id)?;
        let _guard = lock.lock().await;

        let mut season = self
            .seasons
            .get(season_id)
            .await?
            .ok_or(LedgerError::SeasonNotFound { season_id })?;

        self.replay_locked(&mut season).await?;
        drop(_guard);

        self.refresh_opponent_snapshots(season.key.athlete_id, season.rating)
            .await;
        Ok(())
    }

    /// Ordered audit trail for a season, with per-row rating deltas
    pub async fn get_audit_trail(
        &self,
        season_id: SeasonRankingId,
    ) -> crate::error::Result<Vec<AuditEntry>> {
        if self.seasons.get(season_id).await?.is_none() {
            return Err(LedgerError::SeasonNotFound { season_id }.into());
        }

        let rows = self.matches.for_season(season_id).await?;
        Ok(rows
            .into_iter()
            .map(|entry| AuditEntry {
                elo_delta: entry.elo_after - entry.elo_before,
                glicko_delta: entry.glicko_after.rating - entry.glicko_before.rating,
                entry,
            })
            .collect())
    }

    /// Mark a season complete; a one-way flag set by an external
    /// collaborator. Rating computations are unaffected by it.
    pub async fn mark_complete(&self, season_id: SeasonRankingId) -> crate::error::Result<()> {
        let lock = self.season_lock(season_id)?;
        let _guard = lock.lock().await;

        let mut season = self
            .seasons
            .get(season_id)
            .await?
            .ok_or(LedgerError::SeasonNotFound { season_id })?;

        if season.complete {
            return Ok(());
        }

        season.complete = true;
        season.updated_at = crate::utils::current_timestamp();
        self.seasons.update(season).await?;

        info!("Season {} marked complete", season_id);
        Ok(())
    }

    /// Full replay with the season lock already held
    async fn replay_locked(&self, season: &mut SeasonRanking) -> crate::error::Result<()> {
        let rows = self.matches.for_season(season.id).await?;

        let mut running = season.seed_rating;
        let mut last_good: Option<crate::types::RankingMatchId> = None;

        reset_to_seed(season);

        for mut row in rows {
            let before = running;
            let opponent = row.opponent_at_time();
            let (after, _) = self
                .engine
                .apply_match(
                    &before,
                    &opponent,
                    row.result,
                    row.result_type,
                    row.tournament_type,
                )
                .with_context(|| {
                    format!(
                        "season {} replay halted at match {}; last good match: {:?}",
                        season.id, row.id, last_good
                    )
                })?;

            row.elo_before = before.elo;
            row.elo_after = after.elo;
            row.glicko_before = before.glicko;
            row.glicko_after = after.glicko;
            self.matches.update(row.clone()).await?;

            accumulate_row(season, &row, after);
            running = after;
            last_good = Some(row.id);
        }

        season.rating = running;
        season.updated_at = crate::utils::current_timestamp();
        self.seasons.update(season.clone()).await?;

        debug!(
            "Replayed season {} - {} matches, elo {:.1}, glicko {:.1}",
            season.id,
            season.wins + season.losses,
            season.rating.elo,
            season.rating.glicko.rating
        );

        Ok(())
    }

    /// Locate the season this observation belongs to, creating it lazily
    ///
    /// A new season seeds from the athlete's most recent prior season, with
    /// RD inflated per idle season, or from default priors for a first-ever
    /// athlete.
    async fn find_or_create_season(
        &self,
        observation: &RawMatchObservation,
    ) -> crate::error::Result<SeasonRanking> {
        let key = observation.season_key();

        if let Some(season) = self.seasons.find_by_key(&key).await? {
            return Ok(season);
        }

        let seed = match self
            .seasons
            .latest_for_athlete(key.athlete_id, key.year - 1)
            .await?
        {
            Some(previous) => {
                let idle_seasons = (key.year - previous.key.year - 1).max(0) as u32;
                AthleteRating {
                    elo: previous.rating.elo,
                    glicko: self
                        .engine
                        .inactivity_decay(&previous.rating.glicko, idle_seasons),
                }
            }
            None => AthleteRating::default(),
        };

        let season = SeasonRanking::new(key.clone(), seed);
        info!(
            "Created season ranking {} - athlete: {}, year: {}, weight: {}, seed elo: {:.1}",
            season.id, key.athlete_id, key.year, key.weight_class, seed.elo
        );

        match self.seasons.insert(season.clone()).await {
            Ok(()) => Ok(season),
            // Lost a creation race; the winner's row is authoritative
            Err(_) => match self.seasons.find_by_key(&key).await? {
                Some(existing) => Ok(existing),
                None => Err(LedgerError::InternalError {
                    message: format!(
                        "Season for athlete {} year {} vanished after insert conflict",
                        key.athlete_id, key.year
                    ),
                }
                .into()),
            },
        }
    }

    /// Opponent's current rating state: their most recent season ranking up
    /// to this season's year, or default priors for an unseen opponent
    async fn opponent_state(
        &self,
        opponent_id: AthleteId,
        year: i32,
    ) -> crate::error::Result<AthleteRating> {
        Ok(self
            .seasons
            .latest_for_athlete(opponent_id, year)
            .await?
            .map(|season| season.rating)
            .unwrap_or_default())
    }

    /// Refresh the mutable opponent-current cache on every row that faced
    /// this athlete. No ordering guarantee; this is retroactive analysis
    /// input, not ledger state, so a failure is logged rather than
    /// propagated.
    async fn refresh_opponent_snapshots(&self, athlete_id: AthleteId, rating: AthleteRating) {
        match self
            .matches
            .refresh_opponent_current(athlete_id, rating.elo, rating.glicko)
            .await
        {
            Ok(refreshed) if refreshed > 0 => {
                debug!(
                    "Refreshed opponent-current snapshots - athlete: {}, rows: {}",
                    athlete_id, refreshed
                );
            }
            Ok(_) => {}
            Err(error) => {
                warn!(
                    "Failed to refresh opponent snapshots for athlete {}: {}",
                    athlete_id, error
                );
            }
        }
    }

    /// Get or create the mutex serializing one season's operations
    fn season_lock(
        &self,
        season_id: SeasonRankingId,
    ) -> crate::error::Result<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .season_locks
            .lock()
            .map_err(|_| LedgerError::InternalError {
                message: "Failed to acquire season lock table".to_string(),
            })?;

        Ok(locks
            .entry(season_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone())
    }
}

/// Reject observations the scraper should never produce
fn validate_observation(observation: &RawMatchObservation) -> crate::error::Result<()> {
    if observation.athlete_id == observation.opponent_id {
        return Err(LedgerError::InvalidObservation {
            reason: format!(
                "Athlete {} cannot wrestle themselves",
                observation.athlete_id
            ),
        }
        .into());
    }
    if observation.weight == 0 {
        return Err(LedgerError::InvalidObservation {
            reason: "Weight class must be positive".to_string(),
        }
        .into());
    }
    if observation.source_url.trim().is_empty() {
        return Err(LedgerError::InvalidObservation {
            reason: "Source URL cannot be empty".to_string(),
        }
        .into());
    }
    Ok(())
}

/// Fold one in-order result into the season's running aggregates
fn apply_result_to_season(
    season: &mut SeasonRanking,
    observation: &RawMatchObservation,
    after: AthleteRating,
    sequence: u64,
) {
    match observation.match_result {
        crate::types::MatchResult::Win => season.wins += 1,
        crate::types::MatchResult::Loss => season.losses += 1,
    }

    season.rating = after;
    update_watermarks(season, after, observation.match_date);
    season.last_match_date = Some(observation.match_date);
    season.last_sequence = sequence;
    season.updated_at = crate::utils::current_timestamp();
}

/// Fold one replayed row into the season's aggregates
fn accumulate_row(season: &mut SeasonRanking, row: &RankingMatch, after: AthleteRating) {
    match row.result {
        crate::types::MatchResult::Win => season.wins += 1,
        crate::types::MatchResult::Loss => season.losses += 1,
    }

    update_watermarks(season, after, row.match_date);
    season.last_match_date = Some(row.match_date);
    season.last_sequence = season.last_sequence.max(row.sequence);
}

/// Watermarks move only when strictly exceeded/undercut
fn update_watermarks(
    season: &mut SeasonRanking,
    after: AthleteRating,
    date: chrono::NaiveDate,
) {
    if after.elo > season.peak_elo {
        season.peak_elo = after.elo;
        season.peak_elo_date = Some(date);
    }
    if after.elo < season.lowest_elo {
        season.lowest_elo = after.elo;
        season.lowest_elo_date = Some(date);
    }
    if after.glicko.rating > season.peak_glicko {
        season.peak_glicko = after.glicko.rating;
        season.peak_glicko_date = Some(date);
    }
    if after.glicko.rating < season.lowest_glicko {
        season.lowest_glicko = after.glicko.rating;
        season.lowest_glicko_date = Some(date);
    }
}

/// Reset a season's foldable state back to its stored seed before replay
fn reset_to_seed(season: &mut SeasonRanking) {
    season.wins = 0;
    season.losses = 0;
    season.rating = season.seed_rating;
    season.peak_elo = season.seed_rating.elo;
    season.peak_elo_date = None;
    season.lowest_elo = season.seed_rating.elo;
    season.lowest_elo_date = None;
    season.peak_glicko = season.seed_rating.glicko.rating;
    season.peak_glicko_date = None;
    season.lowest_glicko = season.seed_rating.glicko.rating;
    season.lowest_glicko_date = None;
    season.last_match_date = None;
    season.last_sequence = 0;
}
