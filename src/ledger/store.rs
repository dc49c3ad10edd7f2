//! Repository interfaces for seasons and ledger rows
//!
//! The engine assumes a record store with transactional writes, not a
//! specific database product. These traits are the seam a database-backed
//! implementation slots in behind; the in-memory implementations back the
//! binaries and the test suite.

use crate::error::LedgerError;
use crate::types::{
    AthleteId, GlickoRating, RankingMatch, RankingMatchId, SeasonKey, SeasonRanking,
    SeasonRankingId,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Storage operations for season rankings
#[async_trait]
pub trait SeasonStore: Send + Sync {
    /// Get a season by id
    async fn get(&self, id: SeasonRankingId) -> crate::error::Result<Option<SeasonRanking>>;

    /// Find a season by its composite key
    async fn find_by_key(&self, key: &SeasonKey) -> crate::error::Result<Option<SeasonRanking>>;

    /// Most recent season for an athlete up to and including `max_year`,
    /// regardless of weight class or team
    async fn latest_for_athlete(
        &self,
        athlete_id: AthleteId,
        max_year: i32,
    ) -> crate::error::Result<Option<SeasonRanking>>;

    /// Insert a new season; fails if the composite key already exists
    async fn insert(&self, season: SeasonRanking) -> crate::error::Result<()>;

    /// Persist an updated season
    async fn update(&self, season: SeasonRanking) -> crate::error::Result<()>;

    /// Ids of every stored season
    async fn all_ids(&self) -> crate::error::Result<Vec<SeasonRankingId>>;
}

/// Storage operations for the append-only match ledger
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Whether a row with this content hash already exists
    async fn contains_hash(&self, hash: Uuid) -> crate::error::Result<bool>;

    /// Append a new ledger row; fails if the hash already exists
    async fn insert(&self, row: RankingMatch) -> crate::error::Result<()>;

    /// Rewrite an existing row (replay snapshots, opponent-current refresh)
    async fn update(&self, row: RankingMatch) -> crate::error::Result<()>;

    /// A season's rows ordered by match date, then ingestion sequence
    async fn for_season(
        &self,
        season_id: SeasonRankingId,
    ) -> crate::error::Result<Vec<RankingMatch>>;

    /// Overwrite the cached opponent-current fields on every row, across
    /// all seasons, where this athlete is the opponent. Touches nothing
    /// else on the rows; returns how many were refreshed.
    async fn refresh_opponent_current(
        &self,
        opponent_id: AthleteId,
        elo: f64,
        glicko: GlickoRating,
    ) -> crate::error::Result<u64>;

    /// Highest ingestion sequence ever issued; 0 for an empty ledger
    async fn max_sequence(&self) -> crate::error::Result<u64>;
}

/// In-memory season store
#[derive(Debug, Default)]
pub struct InMemorySeasonStore {
    seasons: RwLock<HashMap<SeasonRankingId, SeasonRanking>>,
}

impl InMemorySeasonStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SeasonStore for InMemorySeasonStore {
    async fn get(&self, id: SeasonRankingId) -> crate::error::Result<Option<SeasonRanking>> {
        let seasons = self.seasons.read().map_err(|_| LedgerError::InternalError {
            message: "Failed to acquire seasons read lock".to_string(),
        })?;

        Ok(seasons.get(&id).cloned())
    }

    async fn find_by_key(&self, key: &SeasonKey) -> crate::error::Result<Option<SeasonRanking>> {
        let seasons = self.seasons.read().map_err(|_| LedgerError::InternalError {
            message: "Failed to acquire seasons read lock".to_string(),
        })?;

        Ok(seasons.values().find(|s| &s.key == key).cloned())
    }

    async fn latest_for_athlete(
        &self,
        athlete_id: AthleteId,
        max_year: i32,
    ) -> crate::error::Result<Option<SeasonRanking>> {
        let seasons = self.seasons.read().map_err(|_| LedgerError::InternalError {
            message: "Failed to acquire seasons read lock".to_string(),
        })?;

        Ok(seasons
            .values()
            .filter(|s| s.key.athlete_id == athlete_id && s.key.year <= max_year)
            .max_by_key(|s| (s.key.year, s.last_sequence))
            .cloned())
    }

    async fn insert(&self, season: SeasonRanking) -> crate::error::Result<()> {
        let mut seasons = self.seasons.write().map_err(|_| LedgerError::InternalError {
            message: "Failed to acquire seasons write lock".to_string(),
        })?;

        if seasons.values().any(|s| s.key == season.key) {
            return Err(LedgerError::InternalError {
                message: format!(
                    "Season already exists for athlete {} year {} weight {}",
                    season.key.athlete_id, season.key.year, season.key.weight_class
                ),
            }
            .into());
        }

        seasons.insert(season.id, season);
        Ok(())
    }

    async fn update(&self, season: SeasonRanking) -> crate::error::Result<()> {
        let mut seasons = self.seasons.write().map_err(|_| LedgerError::InternalError {
            message: "Failed to acquire seasons write lock".to_string(),
        })?;

        if !seasons.contains_key(&season.id) {
            return Err(LedgerError::SeasonNotFound {
                season_id: season.id,
            }
            .into());
        }

        seasons.insert(season.id, season);
        Ok(())
    }

    async fn all_ids(&self) -> crate::error::Result<Vec<SeasonRankingId>> {
        let seasons = self.seasons.read().map_err(|_| LedgerError::InternalError {
            message: "Failed to acquire seasons read lock".to_string(),
        })?;

        let mut ids: Vec<_> = seasons.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

/// In-memory match ledger store
#[derive(Debug, Default)]
pub struct InMemoryMatchStore {
    rows: RwLock<HashMap<RankingMatchId, RankingMatch>>,
}

impl InMemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MatchStore for InMemoryMatchStore {
    async fn contains_hash(&self, hash: Uuid) -> crate::error::Result<bool> {
        let rows = self.rows.read().map_err(|_| LedgerError::InternalError {
            message: "Failed to acquire ledger read lock".to_string(),
        })?;

        Ok(rows.values().any(|row| row.match_hash == hash))
    }

    async fn insert(&self, row: RankingMatch) -> crate::error::Result<()> {
        let mut rows = self.rows.write().map_err(|_| LedgerError::InternalError {
            message: "Failed to acquire ledger write lock".to_string(),
        })?;

        if rows.values().any(|existing| existing.match_hash == row.match_hash) {
            return Err(LedgerError::InternalError {
                message: format!("Ledger row already exists for hash {}", row.match_hash),
            }
            .into());
        }

        rows.insert(row.id, row);
        Ok(())
    }

    async fn update(&self, row: RankingMatch) -> crate::error::Result<()> {
        let mut rows = self.rows.write().map_err(|_| LedgerError::InternalError {
            message: "Failed to acquire ledger write lock".to_string(),
        })?;

        if !rows.contains_key(&row.id) {
            return Err(LedgerError::InternalError {
                message: format!("Ledger row not found: {}", row.id),
            }
            .into());
        }

        rows.insert(row.id, row);
        Ok(())
    }

    async fn for_season(
        &self,
        season_id: SeasonRankingId,
    ) -> crate::error::Result<Vec<RankingMatch>> {
        let rows = self.rows.read().map_err(|_| LedgerError::InternalError {
            message: "Failed to acquire ledger read lock".to_string(),
        })?;

        let mut season_rows: Vec<RankingMatch> = rows
            .values()
            .filter(|row| row.season_ranking_id == season_id)
            .cloned()
            .collect();

        season_rows.sort_by_key(|row| (row.match_date, row.sequence));
        Ok(season_rows)
    }

    async fn refresh_opponent_current(
        &self,
        opponent_id: AthleteId,
        elo: f64,
        glicko: GlickoRating,
    ) -> crate::error::Result<u64> {
        let mut rows = self.rows.write().map_err(|_| LedgerError::InternalError {
            message: "Failed to acquire ledger write lock".to_string(),
        })?;

        let mut refreshed = 0;
        for row in rows.values_mut().filter(|row| row.opponent_id == opponent_id) {
            row.opponent_elo_current = elo;
            row.opponent_glicko_current = glicko;
            refreshed += 1;
        }

        Ok(refreshed)
    }

    async fn max_sequence(&self) -> crate::error::Result<u64> {
        let rows = self.rows.read().map_err(|_| LedgerError::InternalError {
            message: "Failed to acquire ledger read lock".to_string(),
        })?;

        Ok(rows.values().map(|row| row.sequence).max().unwrap_or(0))
    }
}
