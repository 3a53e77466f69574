//! Scripted odds provider for integration testing.
//!
//! Returns a fixed slate per sport key, counts calls, and can be told to
//! fail for a given sport key. All in-memory.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use valuebot::providers::OddsProvider;
use valuebot::types::{Event, MarketOdd, MARKET_H2H, SELECTION_AWAY, SELECTION_HOME};

pub struct ScriptedProvider {
    slates: HashMap<String, (Vec<Event>, Vec<MarketOdd>)>,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            slates: HashMap::new(),
            failing: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Add a game with h2h prices for both sides.
    pub fn with_game(
        mut self,
        sport_key: &str,
        id: &str,
        home: &str,
        away: &str,
        home_odds: f64,
        away_odds: f64,
    ) -> Self {
        let event = Event {
            id: id.to_string(),
            sport_key: sport_key.to_string(),
            commence_time: Utc::now() + Duration::hours(6),
            home_team: home.to_string(),
            away_team: away.to_string(),
            league: Some("TEST".to_string()),
        };
        let slate = self.slates.entry(sport_key.to_string()).or_default();
        for (selection, price) in [(SELECTION_HOME, home_odds), (SELECTION_AWAY, away_odds)] {
            slate.1.push(MarketOdd {
                event_id: id.to_string(),
                market: MARKET_H2H.to_string(),
                selection: selection.to_string(),
                odds: price,
                bookmaker: "scripted".to_string(),
                last_update: Utc::now(),
            });
        }
        slate.0.push(event);
        self
    }

    pub fn fail_for(&self, sport_key: &str) {
        self.failing.lock().unwrap().insert(sport_key.to_string());
    }

    pub fn recover(&self, sport_key: &str) {
        self.failing.lock().unwrap().remove(sport_key);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OddsProvider for ScriptedProvider {
    async fn fetch_upcoming(
        &self,
        sport_key: &str,
        _date: NaiveDate,
    ) -> Result<(Vec<Event>, Vec<MarketOdd>)> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(sport_key) {
            return Err(anyhow!("scripted failure for {sport_key}"));
        }
        Ok(self.slates.get(sport_key).cloned().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
