//! Main entry point for the pinfall rating engine
//!
//! Batch-processing front end for the library: reads raw match observations
//! from a JSONL file, feeds them through the ledger, optionally runs a full
//! recalculation, and prints the resulting season analytics as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use pinfall::analytics::AnalyticsAggregator;
use pinfall::config::AppConfig;
use pinfall::ledger::{InMemoryMatchStore, InMemorySeasonStore, MatchLedger, SeasonStore};
use pinfall::rating::RatingEngine;
use pinfall::recalc::RecalculationOrchestrator;
use pinfall::types::{IngestOutcome, RawMatchObservation};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Pinfall - Wrestling Rating & Strength-of-Schedule Analytics Engine
#[derive(Parser)]
#[command(
    name = "pinfall",
    version,
    about = "Rating and strength-of-schedule analytics engine for wrestling season results",
    long_about = "Pinfall maintains competing ELO and Glicko-2 ratings per athlete per season \
                 over an append-only match ledger with deduplicated, chronologically-correct \
                 replay, and derives strength-of-schedule and quality/upset analytics from \
                 that ledger."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Observations input file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "JSONL file of raw match observations to ingest"
    )]
    ingest: Option<PathBuf>,

    /// Run a full batch recalculation after ingestion
    #[arg(long, help = "Replay every season and re-derive analytics")]
    recalculate: bool,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(long, help = "Validate configuration and exit without processing")]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    Ok(config)
}

/// The assembled engine components
struct Engine {
    seasons: Arc<InMemorySeasonStore>,
    ledger: Arc<MatchLedger>,
    aggregator: Arc<AnalyticsAggregator>,
    orchestrator: RecalculationOrchestrator,
}

async fn build_engine(config: &AppConfig) -> Result<Engine> {
    let seasons = Arc::new(InMemorySeasonStore::new());
    let matches = Arc::new(InMemoryMatchStore::new());
    let rating_engine = Arc::new(RatingEngine::new(config.rating.clone())?);

    let ledger = Arc::new(MatchLedger::new(seasons.clone(), matches.clone(), rating_engine).await?);
    let aggregator = Arc::new(AnalyticsAggregator::new(seasons.clone(), matches.clone()));
    let orchestrator = RecalculationOrchestrator::new(
        ledger.clone(),
        aggregator.clone(),
        seasons.clone(),
        config.recalculation.clone(),
    );

    Ok(Engine {
        seasons,
        ledger,
        aggregator,
        orchestrator,
    })
}

/// Ingest a JSONL observation file; malformed lines are reported and skipped
async fn ingest_file(engine: &Engine, path: &PathBuf) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read observations file: {}", path.display()))?;

    let mut ingested = 0u64;
    let mut duplicates = 0u64;
    let mut rejected = 0u64;

    for (line_number, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let observation: RawMatchObservation = match serde_json::from_str(line) {
            Ok(observation) => observation,
            Err(parse_error) => {
                warn!(
                    "Skipping malformed observation on line {}: {}",
                    line_number + 1,
                    parse_error
                );
                rejected += 1;
                continue;
            }
        };

        match engine.ledger.ingest(observation).await {
            Ok(IngestOutcome::Ingested { .. }) => ingested += 1,
            Ok(IngestOutcome::Duplicate) => duplicates += 1,
            Err(ingest_error) => {
                error!(
                    "Observation on line {} rejected: {:#}",
                    line_number + 1,
                    ingest_error
                );
                rejected += 1;
            }
        }
    }

    info!(
        "Ingestion finished - ingested: {}, duplicates: {}, rejected: {}",
        ingested, duplicates, rejected
    );
    Ok(())
}

/// Print every season's analytics snapshot as a JSON report
async fn print_report(engine: &Engine) -> Result<()> {
    let mut report = Vec::new();

    for season_id in engine.seasons.all_ids().await? {
        let analytics = engine.aggregator.get_season_analytics(season_id).await?;
        let season = engine
            .seasons
            .get(season_id)
            .await?
            .expect("season enumerated moments ago");

        report.push(serde_json::json!({
            "season_ranking_id": season_id,
            "athlete_id": season.key.athlete_id,
            "year": season.key.year,
            "weight_class": season.key.weight_class,
            "elo": season.rating.elo,
            "glicko": season.rating.glicko,
            "peak_elo": season.peak_elo,
            "complete": season.complete,
            "analytics": analytics,
        }));
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Pinfall Rating Engine v{}", pinfall::VERSION);
    info!("   Service: {}", config.service.name);
    info!("   Base K: {}", config.rating.base_k);
    info!(
        "   Recalculation workers: {}",
        config.recalculation.worker_pool_size
    );

    if args.dry_run {
        info!("Configuration validation successful");
        info!("Dry run completed - exiting without processing");
        return Ok(());
    }

    let engine = build_engine(&config).await?;

    if let Some(path) = &args.ingest {
        info!("Ingesting observations from {}", path.display());
        ingest_file(&engine, path).await?;
    } else {
        warn!("No observations file given; nothing to ingest");
    }

    if args.recalculate {
        let report = engine.orchestrator.recalculate_all().await?;
        info!(
            "Recalculation report - total: {}, succeeded: {}, failed: {}",
            report.total, report.succeeded, report.failed
        );
        for failure in &report.errors {
            error!("  season {}: {}", failure.season_id, failure.error);
        }
    }

    print_report(&engine).await?;

    Ok(())
}
