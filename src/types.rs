//! Shared types for VALUEBOT.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that provider, model, strategy,
//! and engine modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Market vocabulary
// ---------------------------------------------------------------------------

/// Head-to-head (moneyline) market key as used by the odds feeds.
pub const MARKET_H2H: &str = "h2h";

/// Normalised selection label for the home side of an h2h market.
pub const SELECTION_HOME: &str = "HOME";

/// Normalised selection label for the away side of an h2h market.
pub const SELECTION_AWAY: &str = "AWAY";

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A scheduled match between two participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique per source + date + matchup.
    pub id: String,
    /// Domain key, e.g. "basketball_ncaab".
    pub sport_key: String,
    pub commence_time: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    pub league: Option<String>,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} vs {}", self.home_team, self.away_team)
    }
}

impl Event {
    /// Helper to build a test/sample event with sensible defaults.
    #[cfg(test)]
    pub fn sample(id: &str, home: &str, away: &str) -> Self {
        Event {
            id: id.to_string(),
            sport_key: "basketball_ncaab".to_string(),
            commence_time: Utc::now(),
            home_team: home.to_string(),
            away_team: away.to_string(),
            league: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Market odds
// ---------------------------------------------------------------------------

/// One observed price for one selection of one market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOdd {
    pub event_id: String,
    /// "h2h", "spreads", "totals", ...
    pub market: String,
    /// "HOME", "AWAY", or a labelled line such as "Over 145.5".
    pub selection: String,
    /// Decimal odds.
    pub odds: f64,
    pub bookmaker: String,
    pub last_update: DateTime<Utc>,
}

impl fmt::Display for MarketOdd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} {} @ {:.2}",
            self.bookmaker, self.event_id, self.market, self.selection, self.odds,
        )
    }
}

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// A priced selection scored by the rating model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub event: Event,
    pub market: String,
    pub selection: String,
    pub odds: f64,
    /// Model probability of the selection occurring.
    pub p_model: f64,
    pub bookmaker: String,
}

impl Candidate {
    /// Expected value per unit staked: `p * odds - 1`.
    pub fn ev(&self) -> f64 {
        self.p_model * self.odds - 1.0
    }

    /// Whether the candidate is numerically fit to enter selection.
    pub fn is_well_formed(&self) -> bool {
        self.odds > 1.0 && (0.0..=1.0).contains(&self.p_model)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} {} | odds={:.2} | p={:.3} | EV={:.2}%",
            self.event,
            self.market,
            self.selection,
            self.odds,
            self.p_model,
            self.ev() * 100.0,
        )
    }
}

// ---------------------------------------------------------------------------
// Results (training input)
// ---------------------------------------------------------------------------

/// A finished match used to update ratings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub sport_key: String,
    pub home_team: String,
    pub away_team: String,
    /// 1.0 home win, 0.5 draw, 0.0 away win.
    pub home_result: f64,
}

impl MatchResult {
    /// Minimal event carrying the participants of this result.
    pub fn to_event(&self) -> Event {
        Event {
            id: format!("result_{}_{}_{}", self.sport_key, self.home_team, self.away_team),
            sport_key: self.sport_key.clone(),
            commence_time: Utc::now(),
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            league: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for VALUEBOT.
#[derive(Debug, thiserror::Error)]
pub enum ValueBotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Invalid selection parameters: {0}")]
    InvalidSelection(String),

    #[error("Invalid match result: {0}")]
    InvalidResult(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
