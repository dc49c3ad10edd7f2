//! Utility functions for the rating and analytics engine

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use uuid::Uuid;

/// Generate a new unique season ranking ID
pub fn generate_season_ranking_id() -> Uuid {
    Uuid::new_v4()
}

/// Generate a new unique ranking match ID
pub fn generate_ranking_match_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Season year a match date belongs to
///
/// A school wrestling season spans roughly November through March and is
/// labeled by its ending year: August-December dates belong to the next
/// calendar year's season, January-July dates to their own.
pub fn season_year(date: NaiveDate) -> i32 {
    if date.month() >= 8 {
        date.year() + 1
    } else {
        date.year()
    }
}
