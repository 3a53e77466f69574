//! Elo win-probability model.
//!
//! `P(home) = 1 / (1 + 10^(-(R_home + home_advantage - R_away) / 400))`
//!
//! A 400-point gap corresponds to 10:1 win odds. Ratings are updated with a
//! fixed K-factor toward observed results.

use serde::Serialize;
use tracing::debug;

use super::{InMemoryRatings, RatingStore};
use crate::types::Event;

/// Logistic scale: a gap of this many points is a factor of 10 in odds.
const ELO_SCALE: f64 = 400.0;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Elo model parameters.
#[derive(Debug, Clone, Copy)]
pub struct EloParams {
    /// Learning rate applied to `actual - expected`.
    pub k_factor: f64,
    /// Additive bonus (rating points) for the home side.
    pub home_advantage: f64,
    /// Rating assumed for unseen participants.
    pub default_rating: f64,
}

impl Default for EloParams {
    fn default() -> Self {
        Self {
            k_factor: 20.0,
            home_advantage: 60.0,
            default_rating: 1500.0,
        }
    }
}

/// Model output for one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventProbability {
    pub event_id: String,
    pub p_home: f64,
    pub p_away: f64,
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Elo model over an injected rating store.
#[derive(Debug, Clone)]
pub struct EloModel<S: RatingStore = InMemoryRatings> {
    store: S,
    params: EloParams,
}

impl Default for EloModel<InMemoryRatings> {
    fn default() -> Self {
        Self::new(InMemoryRatings::new(), EloParams::default())
    }
}

impl<S: RatingStore> EloModel<S> {
    pub fn new(store: S, params: EloParams) -> Self {
        Self { store, params }
    }

    pub fn params(&self) -> &EloParams {
        &self.params
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give the store back (e.g. to persist after training).
    pub fn into_store(self) -> S {
        self.store
    }

    /// Stored rating, or the baseline for unseen participants.
    pub fn get_rating(&self, domain: &str, participant: &str) -> f64 {
        self.store
            .get(domain, participant)
            .unwrap_or(self.params.default_rating)
    }

    /// Probability that the home side wins. Always in (0, 1) for finite ratings.
    pub fn p_home_win(&self, event: &Event) -> f64 {
        let home = self.get_rating(&event.sport_key, &event.home_team) + self.params.home_advantage;
        let away = self.get_rating(&event.sport_key, &event.away_team);
        logistic_base10((home - away) / ELO_SCALE)
    }

    /// Home/away probabilities for every event, in input order.
    pub fn estimate_probabilities(&self, events: &[Event]) -> Vec<EventProbability> {
        events
            .iter()
            .map(|e| {
                let p_home = self.p_home_win(e);
                EventProbability {
                    event_id: e.id.clone(),
                    p_home,
                    p_away: 1.0 - p_home,
                }
            })
            .collect()
    }

    /// Apply one observed result. `home_result` is 1.0 / 0.5 / 0.0.
    ///
    /// No deduplication: calling twice applies the update twice.
    pub fn update_from_result(&mut self, event: &Event, home_result: f64) {
        let expected = self.p_home_win(event);
        let home = self.get_rating(&event.sport_key, &event.home_team);
        let away = self.get_rating(&event.sport_key, &event.away_team);
        let k = self.params.k_factor;

        let new_home = home + k * (home_result - expected);
        let new_away = away + k * ((1.0 - home_result) - (1.0 - expected));

        self.store.set(&event.sport_key, &event.home_team, new_home);
        self.store.set(&event.sport_key, &event.away_team, new_away);

        debug!(
            sport_key = %event.sport_key,
            home = %event.home_team,
            away = %event.away_team,
            expected = format!("{expected:.3}"),
            home_result,
            new_home = format!("{new_home:.1}"),
            new_away = format!("{new_away:.1}"),
            "Ratings updated"
        );
    }
}

/// `1 / (1 + 10^-x)`.
fn logistic_base10(x: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf(-x))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
