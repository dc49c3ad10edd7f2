//! Replay Tester CLI Tool
//!
//! Command-line tool for exercising the ledger end to end with synthetic
//! seasons: deterministic observation generation, shuffled (out-of-order)
//! ingestion, duplicate re-ingestion, batch recalculation, and an
//! independent verification that folding each season's audit trail through
//! the rating engine reproduces its stored rating state.
//!
//! Usage:
//!   cargo run --bin replay-tester -- soak --athletes 20 --matches 15
//!   cargo run --bin replay-tester -- generate --output observations.jsonl

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use pinfall::analytics::AnalyticsAggregator;
use pinfall::ledger::{InMemoryMatchStore, InMemorySeasonStore, MatchLedger, SeasonStore};
use pinfall::rating::RatingEngine;
use pinfall::recalc::RecalculationOrchestrator;
use pinfall::types::{
    IngestOutcome, MatchResult, RawMatchObservation, ResultType, TournamentType,
};
use pinfall::config::RecalculationSettings;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "replay-tester")]
#[command(about = "Synthetic season soak-testing tool for the pinfall ledger")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate, ingest, recalculate, and verify synthetic seasons
    Soak {
        /// Number of athletes
        #[arg(long, default_value = "20")]
        athletes: u32,
        /// Matches per athlete
        #[arg(long, default_value = "15")]
        matches: u32,
        /// Generator seed for reproducible runs
        #[arg(long, default_value = "42")]
        seed: u64,
    },
    /// Write a synthetic observation file for the main binary
    Generate {
        /// Output JSONL path
        #[arg(short, long)]
        output: PathBuf,
        /// Number of athletes
        #[arg(long, default_value = "20")]
        athletes: u32,
        /// Matches per athlete
        #[arg(long, default_value = "15")]
        matches: u32,
        /// Generator seed for reproducible runs
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

/// Small deterministic generator so soak runs are reproducible
struct SyntheticRng(u64);

impl SyntheticRng {
    fn next(&mut self) -> u64 {
        // Constants from Knuth's MMIX linear congruential generator
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 16
    }

    fn pick(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}

fn synthetic_observations(athletes: u32, matches: u32, seed: u64) -> Vec<RawMatchObservation> {
    let mut rng = SyntheticRng(seed);
    let season_start = NaiveDate::from_ymd_opt(2023, 11, 15).unwrap();
    let result_types = [
        ResultType::Decision,
        ResultType::MajorDecision,
        ResultType::TechnicalFall,
        ResultType::Fall,
    ];
    let tournament_types = [
        TournamentType::Local,
        TournamentType::District,
        TournamentType::Regional,
        TournamentType::State,
        TournamentType::National,
    ];

    let mut observations = Vec::new();
    for athlete in 1..=i64::from(athletes) {
        for round in 0..matches {
            let opponent = {
                let candidate = 1 + rng.pick(u64::from(athletes)) as i64;
                if candidate == athlete {
                    1 + (candidate % i64::from(athletes))
                } else {
                    candidate
                }
            };

            observations.push(RawMatchObservation {
                athlete_id: athlete,
                opponent_id: opponent,
                result_type: result_types[rng.pick(4) as usize],
                match_result: if rng.pick(2) == 0 {
                    MatchResult::Win
                } else {
                    MatchResult::Loss
                },
                weight: 145,
                match_date: season_start + chrono::Duration::days(i64::from(round) * 7),
                tournament_type: tournament_types[rng.pick(5) as usize],
                source_url: format!(
                    "https://results.example.org/{}/round/{}",
                    athlete, round
                ),
                team: None,
                tournament: None,
            });
        }
    }

    // Shuffle so ingestion arrives out of chronological order and the
    // ledger's replay path gets exercised
    let len = observations.len();
    for i in (1..len).rev() {
        let j = rng.pick(i as u64 + 1) as usize;
        observations.swap(i, j);
    }

    observations
}

async fn run_soak(athletes: u32, matches: u32, seed: u64) -> Result<()> {
    let seasons = Arc::new(InMemorySeasonStore::new());
    let match_store = Arc::new(InMemoryMatchStore::new());
    let engine = Arc::new(RatingEngine::default());
    let ledger = Arc::new(
        MatchLedger::new(seasons.clone(), match_store.clone(), engine.clone()).await?,
    );
    let aggregator = Arc::new(AnalyticsAggregator::new(seasons.clone(), match_store.clone()));
    let orchestrator = RecalculationOrchestrator::new(
        ledger.clone(),
        aggregator,
        seasons.clone(),
        RecalculationSettings::default(),
    );

    let observations = synthetic_observations(athletes, matches, seed);
    println!(
        "Ingesting {} shuffled observations across {} athletes...",
        observations.len(),
        athletes
    );

    let mut ingested = 0;
    for observation in observations.clone() {
        if let IngestOutcome::Ingested { .. } = ledger.ingest(observation).await? {
            ingested += 1;
        }
    }
    println!("  ingested: {}", ingested);

    println!("Re-ingesting the same observations (all must deduplicate)...");
    let mut duplicates = 0;
    for observation in observations {
        if ledger.ingest(observation).await? == IngestOutcome::Duplicate {
            duplicates += 1;
        }
    }
    println!("  duplicates: {}", duplicates);
    anyhow::ensure!(
        duplicates == ingested,
        "Expected every re-ingested observation to deduplicate"
    );

    println!("Running batch recalculation...");
    let report = orchestrator.recalculate_all().await?;
    println!(
        "  total: {}, succeeded: {}, failed: {}",
        report.total, report.succeeded, report.failed
    );
    anyhow::ensure!(report.failed == 0, "Recalculation reported failures");

    println!("Verifying chronology invariant on every season...");
    let mut verified = 0;
    for season_id in seasons.all_ids().await? {
        let season = seasons
            .get(season_id)
            .await?
            .expect("season enumerated moments ago");
        let trail = ledger.get_audit_trail(season_id).await?;

        let mut running = season.seed_rating;
        let mut last_date = None;
        for entry in &trail {
            anyhow::ensure!(
                last_date <= Some(entry.entry.match_date),
                "Audit trail for season {} is not date-ordered",
                season_id
            );
            last_date = Some(entry.entry.match_date);

            let (after, _) = engine.apply_match(
                &running,
                &entry.entry.opponent_at_time(),
                entry.entry.result,
                entry.entry.result_type,
                entry.entry.tournament_type,
            )?;
            anyhow::ensure!(
                (after.elo - entry.entry.elo_after).abs() < 1e-9,
                "Season {} snapshot diverges at match {}",
                season_id,
                entry.entry.id
            );
            running = after;
        }

        anyhow::ensure!(
            (running.elo - season.rating.elo).abs() < 1e-9,
            "Season {} stored ELO does not match its ledger fold",
            season_id
        );
        verified += 1;
    }

    println!("  verified: {} seasons", verified);
    println!("Soak run passed");
    Ok(())
}

fn run_generate(output: &PathBuf, athletes: u32, matches: u32, seed: u64) -> Result<()> {
    let observations = synthetic_observations(athletes, matches, seed);
    let mut lines = String::new();
    for observation in &observations {
        lines.push_str(&serde_json::to_string(observation)?);
        lines.push('\n');
    }
    std::fs::write(output, lines)?;

    println!(
        "Wrote {} observations to {}",
        observations.len(),
        output.display()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Soak {
            athletes,
            matches,
            seed,
        } => run_soak(athletes, matches, seed).await,
        Commands::Generate {
            output,
            athletes,
            matches,
            seed,
        } => run_generate(&output, athletes, matches, seed),
    }
}
