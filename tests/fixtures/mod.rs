//! Shared fixtures for integration tests

use async_trait::async_trait;
use chrono::NaiveDate;
use pinfall::analytics::AnalyticsAggregator;
use pinfall::config::RecalculationSettings;
use pinfall::error::LedgerError;
use pinfall::ledger::{InMemoryMatchStore, InMemorySeasonStore, MatchLedger, SeasonStore};
use pinfall::rating::RatingEngine;
use pinfall::recalc::RecalculationOrchestrator;
use pinfall::types::{
    AthleteId, MatchResult, RawMatchObservation, ResultType, SeasonKey, SeasonRanking,
    SeasonRankingId, TournamentType,
};
use std::sync::{Arc, Mutex};

/// A season store wrapper that can be told to fail for one season id,
/// for exercising partial-failure isolation in batch recalculation
pub struct FailingSeasonStore {
    inner: Arc<InMemorySeasonStore>,
    fail_for: Mutex<Option<SeasonRankingId>>,
}

impl FailingSeasonStore {
    pub fn new(inner: Arc<InMemorySeasonStore>) -> Self {
        Self {
            inner,
            fail_for: Mutex::new(None),
        }
    }

    /// All reads of this season will fail until cleared
    pub fn fail_for(&self, season_id: SeasonRankingId) {
        *self.fail_for.lock().unwrap() = Some(season_id);
    }
}

#[async_trait]
impl SeasonStore for FailingSeasonStore {
    async fn get(&self, id: SeasonRankingId) -> pinfall::error::Result<Option<SeasonRanking>> {
        if *self.fail_for.lock().unwrap() == Some(id) {
            return Err(LedgerError::InternalError {
                message: format!("Injected storage failure for season {}", id),
            }
            .into());
        }
        self.inner.get(id).await
    }

    async fn find_by_key(&self, key: &SeasonKey) -> pinfall::error::Result<Option<SeasonRanking>> {
        self.inner.find_by_key(key).await
    }

    async fn latest_for_athlete(
        &self,
        athlete_id: AthleteId,
        max_year: i32,
    ) -> pinfall::error::Result<Option<SeasonRanking>> {
        self.inner.latest_for_athlete(athlete_id, max_year).await
    }

    async fn insert(&self, season: SeasonRanking) -> pinfall::error::Result<()> {
        self.inner.insert(season).await
    }

    async fn update(&self, season: SeasonRanking) -> pinfall::error::Result<()> {
        self.inner.update(season).await
    }

    async fn all_ids(&self) -> pinfall::error::Result<Vec<SeasonRankingId>> {
        self.inner.all_ids().await
    }
}

/// A complete engine wired over in-memory stores
pub struct TestSystem {
    pub seasons: Arc<FailingSeasonStore>,
    pub matches: Arc<InMemoryMatchStore>,
    pub engine: Arc<RatingEngine>,
    pub ledger: Arc<MatchLedger>,
    pub aggregator: Arc<AnalyticsAggregator>,
    pub orchestrator: RecalculationOrchestrator,
}

/// Integration test setup that creates a complete system
pub async fn create_test_system() -> TestSystem {
    let seasons = Arc::new(FailingSeasonStore::new(Arc::new(InMemorySeasonStore::new())));
    let matches = Arc::new(InMemoryMatchStore::new());
    let engine = Arc::new(RatingEngine::default());

    let ledger = Arc::new(
        MatchLedger::new(seasons.clone(), matches.clone(), engine.clone())
            .await
            .expect("ledger construction over empty stores"),
    );
    let aggregator = Arc::new(AnalyticsAggregator::new(seasons.clone(), matches.clone()));
    let orchestrator = RecalculationOrchestrator::new(
        ledger.clone(),
        aggregator.clone(),
        seasons.clone(),
        RecalculationSettings::default(),
    );

    TestSystem {
        seasons,
        matches,
        engine,
        ledger,
        aggregator,
        orchestrator,
    }
}

/// Observation builder with sensible defaults and a unique source URL
pub fn observation(
    athlete_id: AthleteId,
    opponent_id: AthleteId,
    date: &str,
) -> RawMatchObservation {
    RawMatchObservation {
        athlete_id,
        opponent_id,
        result_type: ResultType::Decision,
        match_result: MatchResult::Win,
        weight: 145,
        match_date: date.parse::<NaiveDate>().expect("valid test date"),
        tournament_type: TournamentType::Local,
        source_url: format!(
            "https://results.example.org/{}/{}/{}",
            athlete_id, opponent_id, date
        ),
        team: None,
        tournament: None,
    }
}

/// Observation builder with every field under the caller's control
pub fn observation_with(
    athlete_id: AthleteId,
    opponent_id: AthleteId,
    date: &str,
    result: MatchResult,
    result_type: ResultType,
    tournament_type: TournamentType,
) -> RawMatchObservation {
    RawMatchObservation {
        match_result: result,
        result_type,
        tournament_type,
        ..observation(athlete_id, opponent_id, date)
    }
}
