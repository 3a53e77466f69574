//! Demo odds provider.
//!
//! Generates a deterministic five-game slate per (sport key, date) so the
//! whole pipeline can run offline. Same inputs, same slate.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::OddsProvider;
use crate::types::{Event, MarketOdd, MARKET_H2H, SELECTION_AWAY, SELECTION_HOME};

pub const PROVIDER_NAME: &str = "demo";

const TEAM_COUNT: usize = 20;
const EVENT_COUNT: usize = 5;
const FIRST_START_HOUR: i64 = 18;
const ODDS_OBSERVED_HOUR: i64 = 9;

#[derive(Debug, Clone, Default)]
pub struct DemoProvider;

impl DemoProvider {
    pub fn new() -> Self {
        Self
    }

    /// Stable seed for a (sport key, date) pair (FNV-1a).
    fn seed(sport_key: &str, date: NaiveDate) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in sport_key.bytes().chain(date.to_string().bytes()) {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        hash
    }

    fn slate(sport_key: &str, date: NaiveDate) -> (Vec<Event>, Vec<MarketOdd>) {
        let mut rng = StdRng::seed_from_u64(Self::seed(sport_key, date));
        let midnight = date.and_time(NaiveTime::MIN).and_utc();
        let observed = midnight + Duration::hours(ODDS_OBSERVED_HOUR);

        let mut teams: Vec<String> = (1..=TEAM_COUNT).map(|i| format!("Uni Team {i}")).collect();
        teams.shuffle(&mut rng);

        let mut events = Vec::with_capacity(EVENT_COUNT);
        let mut odds = Vec::with_capacity(EVENT_COUNT * 2);

        for n in 0..EVENT_COUNT {
            let event = Event {
                id: format!("demo_{sport_key}_{date}_{n}"),
                sport_key: sport_key.to_string(),
                commence_time: midnight + Duration::hours(FIRST_START_HOUR + 2 * n as i64),
                home_team: teams[2 * n].clone(),
                away_team: teams[2 * n + 1].clone(),
                league: Some("DEMO".to_string()),
            };

            let p_home: f64 = rng.gen_range(0.40..0.70);
            let home_odds = (1.0 / p_home * rng.gen_range(1.02..1.08)).clamp(1.2, 4.0);
            let away_odds = (1.0 / (1.0 - p_home) * rng.gen_range(1.02..1.08)).clamp(1.2, 4.5);

            for (selection, price) in [(SELECTION_HOME, home_odds), (SELECTION_AWAY, away_odds)] {
                odds.push(MarketOdd {
                    event_id: event.id.clone(),
                    market: MARKET_H2H.to_string(),
                    selection: selection.to_string(),
                    odds: round2(price),
                    bookmaker: PROVIDER_NAME.to_string(),
                    last_update: observed,
                });
            }
            events.push(event);
        }

        (events, odds)
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[async_trait]
impl OddsProvider for DemoProvider {
    async fn fetch_upcoming(
        &self,
        sport_key: &str,
        date: NaiveDate,
    ) -> Result<(Vec<Event>, Vec<MarketOdd>)> {
        let (events, odds) = Self::slate(sport_key, date);
        debug!(
            sport_key,
            %date,
            events = events.len(),
            odds = odds.len(),
            "Demo slate generated"
        );
        Ok((events, odds))
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
