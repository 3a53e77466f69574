//! Rating training from finished matches.
//!
//! Reads a JSON list of results, replays them through the Elo update in
//! file order on top of the stored ratings, and writes the ratings back.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::model::{EloModel, EloParams, RatingStore};
use crate::storage::Storage;
use crate::types::{MatchResult, ValueBotError};

#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub results_applied: usize,
    pub ratings_stored: usize,
}

/// Parse a results file (`[{sport_key, home_team, away_team, home_result}]`).
pub fn load_results(path: &str) -> Result<Vec<MatchResult>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read results file: {path}"))?;
    let results: Vec<MatchResult> = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse results file: {path}"))?;
    Ok(results)
}

fn validate(result: &MatchResult, index: usize) -> Result<(), ValueBotError> {
    if ![0.0, 0.5, 1.0].contains(&result.home_result) {
        return Err(ValueBotError::InvalidResult(format!(
            "entry {index} ({} vs {}): home_result must be 0, 0.5 or 1, got {}",
            result.home_team, result.away_team, result.home_result
        )));
    }
    if result.home_team.is_empty() || result.away_team.is_empty() {
        return Err(ValueBotError::InvalidResult(format!(
            "entry {index}: team names must not be empty"
        )));
    }
    Ok(())
}

/// Apply `results` to the stored ratings and persist them.
///
/// Every result is validated before any rating moves, so a bad file leaves
/// storage untouched.
pub async fn train_ratings(
    storage: &Storage,
    params: EloParams,
    results: &[MatchResult],
) -> Result<TrainingSummary> {
    for (i, result) in results.iter().enumerate() {
        validate(result, i)?;
    }

    let ratings = storage.load_ratings().await?;
    let mut model = EloModel::new(ratings, params);

    for result in results {
        model.update_from_result(&result.to_event(), result.home_result);
    }

    let ratings = model.into_store();
    storage.save_ratings(&ratings).await?;

    let summary = TrainingSummary {
        results_applied: results.len(),
        ratings_stored: ratings.len(),
    };
    info!(
        results = summary.results_applied,
        ratings = summary.ratings_stored,
        "Ratings trained"
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
