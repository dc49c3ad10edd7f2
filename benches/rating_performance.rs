//! Performance benchmarks for rating calculations and season replay

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pinfall::analytics::aggregate;
use pinfall::ledger::{InMemoryMatchStore, InMemorySeasonStore, MatchLedger, MatchStore, SeasonStore};
use pinfall::rating::RatingEngine;
use pinfall::types::{
    AthleteRating, MatchResult, RawMatchObservation, ResultType, TournamentType,
};
use std::sync::Arc;

fn bench_observation(athlete_id: i64, opponent_id: i64, day: u32) -> RawMatchObservation {
    RawMatchObservation {
        athlete_id,
        opponent_id,
        result_type: ResultType::Decision,
        match_result: if opponent_id % 2 == 0 {
            MatchResult::Win
        } else {
            MatchResult::Loss
        },
        weight: 145,
        match_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i64::from(day)),
        tournament_type: TournamentType::Local,
        source_url: format!("https://example.org/{}/{}/{}", athlete_id, opponent_id, day),
        team: None,
        tournament: None,
    }
}

fn bench_rating_transition(c: &mut Criterion) {
    let engine = RatingEngine::default();
    let athlete = AthleteRating {
        elo: 1540.0,
        ..AthleteRating::default()
    };
    let opponent = AthleteRating {
        elo: 1620.0,
        ..AthleteRating::default()
    };

    c.bench_function("rating_transition_single_match", |b| {
        b.iter(|| {
            black_box(engine.apply_match(
                black_box(&athlete),
                black_box(&opponent),
                MatchResult::Win,
                ResultType::Fall,
                TournamentType::State,
            ))
        })
    });
}

fn bench_season_replay(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    // Build one 100-match season once; the benchmark measures replay only
    let (ledger, season_id) = rt.block_on(async {
        let seasons = Arc::new(InMemorySeasonStore::new());
        let matches = Arc::new(InMemoryMatchStore::new());
        let ledger = MatchLedger::new(seasons.clone(), matches, Arc::new(RatingEngine::default()))
            .await
            .unwrap();

        for day in 0..100 {
            ledger
                .ingest(bench_observation(1, 100 + i64::from(day), day))
                .await
                .unwrap();
        }

        let ids = seasons.all_ids().await.unwrap();
        (ledger, ids[0])
    });

    c.bench_function("season_replay_100_matches", |b| {
        b.iter(|| rt.block_on(async { black_box(ledger.replay_season(season_id).await) }))
    });
}

fn bench_analytics_fold(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let rows = rt.block_on(async {
        let seasons = Arc::new(InMemorySeasonStore::new());
        let matches = Arc::new(InMemoryMatchStore::new());
        let ledger = MatchLedger::new(
            seasons.clone(),
            matches.clone(),
            Arc::new(RatingEngine::default()),
        )
        .await
        .unwrap();

        for day in 0..100 {
            ledger
                .ingest(bench_observation(1, 100 + i64::from(day), day))
                .await
                .unwrap();
        }

        let ids = seasons.all_ids().await.unwrap();
        matches.for_season(ids[0]).await.unwrap()
    });

    c.bench_function("analytics_fold_100_matches", |b| {
        b.iter(|| black_box(aggregate(black_box(&rows))))
    });
}

criterion_group!(
    benches,
    bench_rating_transition,
    bench_season_replay,
    bench_analytics_fold
);
criterion_main!(benches);
