//! Common types used throughout the rating and analytics engine

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use skillratings::glicko2::Glicko2Rating;
use uuid::Uuid;

/// Unique identifier for athletes, resolved upstream by the scraper
pub type AthleteId = i64;

/// Unique identifier for season rankings
pub type SeasonRankingId = Uuid;

/// Unique identifier for ledger rows
pub type RankingMatchId = Uuid;

/// Outcome of a match from the athlete's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchResult {
    Win,
    Loss,
}

impl std::fmt::Display for MatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchResult::Win => write!(f, "win"),
            MatchResult::Loss => write!(f, "loss"),
        }
    }
}

/// How the match was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultType {
    Decision,
    MajorDecision,
    TechnicalFall,
    Fall,
}

impl std::fmt::Display for ResultType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultType::Decision => write!(f, "decision"),
            ResultType::MajorDecision => write!(f, "major-decision"),
            ResultType::TechnicalFall => write!(f, "technical-fall"),
            ResultType::Fall => write!(f, "fall"),
        }
    }
}

/// Significance tier of the event the match took place at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TournamentType {
    Local,
    District,
    Regional,
    State,
    National,
}

impl std::fmt::Display for TournamentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TournamentType::Local => write!(f, "local"),
            TournamentType::District => write!(f, "district"),
            TournamentType::Regional => write!(f, "regional"),
            TournamentType::State => write!(f, "state"),
            TournamentType::National => write!(f, "national"),
        }
    }
}

/// Glicko-2 rating state on the public scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlickoRating {
    pub rating: f64,
    /// Rating deviation (RD); lower means more certain
    pub deviation: f64,
    pub volatility: f64,
}

impl Default for GlickoRating {
    fn default() -> Self {
        Self {
            rating: 1500.0,
            deviation: 350.0,
            volatility: 0.06,
        }
    }
}

impl From<Glicko2Rating> for GlickoRating {
    fn from(rating: Glicko2Rating) -> Self {
        Self {
            rating: rating.rating,
            deviation: rating.deviation,
            volatility: rating.volatility,
        }
    }
}

impl From<GlickoRating> for Glicko2Rating {
    fn from(rating: GlickoRating) -> Self {
        Self {
            rating: rating.rating,
            deviation: rating.deviation,
            volatility: rating.volatility,
        }
    }
}

/// Combined rating state carried through the ledger for one athlete
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AthleteRating {
    pub elo: f64,
    pub glicko: GlickoRating,
}

impl Default for AthleteRating {
    fn default() -> Self {
        Self {
            elo: 1500.0,
            glicko: GlickoRating::default(),
        }
    }
}

/// Athlete identity. Ratings are season-scoped and live on `SeasonRanking`,
/// never here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Athlete {
    pub id: AthleteId,
    pub name: String,
    pub state: String,
}

/// Composite identity of a season ranking; uniqueness is enforced on the
/// whole tuple by the season store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeasonKey {
    pub athlete_id: AthleteId,
    /// Season labeled by its ending year (a 2023/24 season is 2024)
    pub year: i32,
    pub weight_class: u32,
    pub team: String,
    pub tournament: String,
}

/// Raw match observation delivered by the scraping collaborator, with
/// identities already resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMatchObservation {
    pub athlete_id: AthleteId,
    pub opponent_id: AthleteId,
    pub result_type: ResultType,
    pub match_result: MatchResult,
    pub weight: u32,
    pub match_date: NaiveDate,
    pub tournament_type: TournamentType,
    pub source_url: String,
    /// Team context for season-key derivation; absent normalizes to empty
    #[serde(default)]
    pub team: Option<String>,
    /// Tournament context for season-key derivation; absent normalizes to empty
    #[serde(default)]
    pub tournament: Option<String>,
}

impl RawMatchObservation {
    /// Derive the season key this observation belongs to
    pub fn season_key(&self) -> SeasonKey {
        SeasonKey {
            athlete_id: self.athlete_id,
            year: crate::utils::season_year(self.match_date),
            weight_class: self.weight,
            team: self.team.clone().unwrap_or_default(),
            tournament: self.tournament.clone().unwrap_or_default(),
        }
    }
}

/// Running state of one athlete's season
///
/// Mutated exclusively by replaying its own `RankingMatch` ledger in
/// chronological order; external callers never write rating fields directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonRanking {
    pub id: SeasonRankingId,
    pub key: SeasonKey,

    pub wins: u32,
    pub losses: u32,

    /// Current rating state, reproducible by folding the season's ledger
    pub rating: AthleteRating,
    /// Rating state the season started from; replay resets to this
    pub seed_rating: AthleteRating,

    pub peak_elo: f64,
    pub peak_elo_date: Option<NaiveDate>,
    pub lowest_elo: f64,
    pub lowest_elo_date: Option<NaiveDate>,
    pub peak_glicko: f64,
    pub peak_glicko_date: Option<NaiveDate>,
    pub lowest_glicko: f64,
    pub lowest_glicko_date: Option<NaiveDate>,

    /// Derived analytics, written only by the aggregator
    pub analytics: SeasonAnalytics,

    /// One-way terminal flag set by an external collaborator; never inferred
    pub complete: bool,

    pub last_match_date: Option<NaiveDate>,
    pub last_sequence: u64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SeasonRanking {
    /// Create a fresh season starting from the given seed rating
    pub fn new(key: SeasonKey, seed_rating: AthleteRating) -> Self {
        let now = crate::utils::current_timestamp();
        Self {
            id: crate::utils::generate_season_ranking_id(),
            key,
            wins: 0,
            losses: 0,
            rating: seed_rating,
            seed_rating,
            peak_elo: seed_rating.elo,
            peak_elo_date: None,
            lowest_elo: seed_rating.elo,
            lowest_elo_date: None,
            peak_glicko: seed_rating.glicko.rating,
            peak_glicko_date: None,
            lowest_glicko: seed_rating.glicko.rating,
            lowest_glicko_date: None,
            analytics: SeasonAnalytics::default(),
            complete: false,
            last_match_date: None,
            last_sequence: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the season has processed at least one match
    pub fn is_active(&self) -> bool {
        self.wins + self.losses > 0
    }
}

/// One immutable ledger row per processed match
///
/// Everything except the `opponent_current_*` fields is written once and
/// only ever rewritten by a full season replay. The opponent at-time
/// snapshot is never recomputed, even by replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingMatch {
    pub id: RankingMatchId,
    pub season_ranking_id: SeasonRankingId,
    pub athlete_id: AthleteId,
    pub opponent_id: AthleteId,

    pub match_date: NaiveDate,
    /// Ingestion sequence; stable tie-break for same-day matches
    pub sequence: u64,

    pub result: MatchResult,
    pub result_type: ResultType,
    pub tournament_type: TournamentType,
    pub weight: u32,
    pub source_url: String,

    /// Content-derived hash, globally unique, used purely for deduplication
    pub match_hash: Uuid,

    pub elo_before: f64,
    pub elo_after: f64,
    pub glicko_before: GlickoRating,
    pub glicko_after: GlickoRating,

    /// Opponent rating as it stood historically at the moment of this match
    pub opponent_elo_at_time: f64,
    pub opponent_glicko_at_time: GlickoRating,

    /// Opponent's most recently known rating, refreshed opportunistically
    pub opponent_elo_current: f64,
    pub opponent_glicko_current: GlickoRating,

    pub created_at: DateTime<Utc>,
}

impl RankingMatch {
    /// Athlete rating state going into this match
    pub fn rating_before(&self) -> AthleteRating {
        AthleteRating {
            elo: self.elo_before,
            glicko: self.glicko_before,
        }
    }

    /// Athlete rating state coming out of this match
    pub fn rating_after(&self) -> AthleteRating {
        AthleteRating {
            elo: self.elo_after,
            glicko: self.glicko_after,
        }
    }

    /// Opponent rating state as recorded at match time
    pub fn opponent_at_time(&self) -> AthleteRating {
        AthleteRating {
            elo: self.opponent_elo_at_time,
            glicko: self.opponent_glicko_at_time,
        }
    }
}

/// Outcome of ingesting one raw observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum IngestOutcome {
    /// A new ledger row was written
    Ingested { ranking_match_id: RankingMatchId },
    /// The observation's hash already exists; nothing changed
    Duplicate,
}

/// Derived schedule-strength and quality metrics for one season
///
/// A season with zero matches yields the all-zero/`None` default rather
/// than an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonAnalytics {
    pub matches: u32,
    pub wins: u32,
    pub losses: u32,

    /// Mean opponent ELO as it stood when each match was played
    pub strength_of_schedule: Option<f64>,
    /// Mean of opponents' most recently known ELO
    pub strength_of_schedule_latest: Option<f64>,
    /// Win/loss record reweighted by opponent quality, in rating space
    pub strength_of_record: Option<f64>,

    pub quality_wins: u32,
    pub quality_losses: u32,
    pub upset_wins: u32,
    pub upset_losses: u32,
}

/// One audit-trail entry: a ledger row plus its rating deltas
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entry: RankingMatch,
    pub elo_delta: f64,
    pub glicko_delta: f64,
}
