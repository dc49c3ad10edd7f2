//! Content-derived match hashing for deduplication
//!
//! Re-scraping the same contest must never double-count it. The hash is a
//! UUID v5 over a stable projection of the observation, so the same contest
//! observed twice always collides and any change to the contest's identity
//! does not.

use crate::types::RawMatchObservation;
use uuid::Uuid;

/// Fixed namespace for match hashes; changing it would orphan every ledger row
const MATCH_HASH_NAMESPACE: Uuid = Uuid::from_u128(0x8c9e_5f0a_1d42_4b7e_9a3c_6d81_2f50_7b19);

/// Compute the deduplication hash for a raw observation
///
/// The projection covers the contest's identity: participants, date, outcome,
/// result type, weight, tournament tier, and source. Team/tournament context
/// fields are excluded; they scope the season key, not the contest.
pub fn match_hash(observation: &RawMatchObservation) -> Uuid {
    let projection = format!(
        "{}|{}|{}|{}|{}|{}|{}|{}",
        observation.athlete_id,
        observation.opponent_id,
        observation.match_date,
        observation.match_result,
        observation.result_type,
        observation.weight,
        observation.tournament_type,
        observation.source_url.trim().to_lowercase(),
    );

    Uuid::new_v5(&MATCH_HASH_NAMESPACE, projection.as_bytes())
}
