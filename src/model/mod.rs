//! Rating model.
//!
//! Defines the `RatingStore` trait, an injectable (domain, participant)
//! → strength mapping, and the Elo win-probability estimator built on it.

pub mod elo;

use std::collections::HashMap;

pub use elo::{EloModel, EloParams, EventProbability};

/// Key of a rating: (domain/sport key, participant name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RatingKey {
    pub domain: String,
    pub participant: String,
}

impl RatingKey {
    pub fn new(domain: &str, participant: &str) -> Self {
        Self {
            domain: domain.to_string(),
            participant: participant.to_string(),
        }
    }
}

/// Abstraction over rating storage.
///
/// The model never reaches for global state; callers hand it a store.
pub trait RatingStore {
    /// Stored rating, `None` when the participant has never been rated.
    fn get(&self, domain: &str, participant: &str) -> Option<f64>;

    /// Insert or overwrite a rating.
    fn set(&mut self, domain: &str, participant: &str, rating: f64);

    /// Every stored rating, in unspecified order.
    fn iter(&self) -> Box<dyn Iterator<Item = (&RatingKey, f64)> + '_>;

    /// Number of stored ratings.
    fn len(&self) -> usize {
        self.iter().count()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hash-map backed rating store. Used as the per-run snapshot.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRatings {
    ratings: HashMap<RatingKey, f64>,
}

impl InMemoryRatings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FromIterator<(RatingKey, f64)> for InMemoryRatings {
    fn from_iter<I: IntoIterator<Item = (RatingKey, f64)>>(iter: I) -> Self {
        Self {
            ratings: iter.into_iter().collect(),
        }
    }
}

impl RatingStore for InMemoryRatings {
    fn get(&self, domain: &str, participant: &str) -> Option<f64> {
        self.ratings
            .get(&RatingKey::new(domain, participant))
            .copied()
    }

    fn set(&mut self, domain: &str, participant: &str, rating: f64) {
        self.ratings.insert(RatingKey::new(domain, participant), rating);
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&RatingKey, f64)> + '_> {
        Box::new(self.ratings.iter().map(|(k, v)| (k, *v)))
    }

    fn len(&self) -> usize {
        self.ratings.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
