//! Daily run orchestration.
//!
//! One run for one (sport key, date):
//! 1. Fetch events and odds from the provider and persist them
//! 2. Snapshot ratings from storage into the model
//! 3. Build candidates and persist the predictions
//! 4. Select picks and persist them
//!
//! The returned report is what the CLI prints and the dashboard serves.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

use crate::model::{EloModel, EloParams};
use crate::providers::OddsProvider;
use crate::storage::Storage;
use crate::strategy::{build_candidates, select_picks, SelectionConfig};
use crate::types::Candidate;

/// Outcome of one daily run.
#[derive(Debug, Clone, Serialize)]
pub struct DailyReport {
    pub run_date: NaiveDate,
    pub sport_key: String,
    pub provider: String,
    pub ts: DateTime<Utc>,
    pub events: usize,
    pub odds: usize,
    pub selection: SelectionConfig,
    /// Every scored candidate, in build order.
    pub candidates: Vec<Candidate>,
    /// Selected plays, EV descending.
    pub picks: Vec<Candidate>,
}

impl DailyReport {
    pub fn sum_odds(&self) -> f64 {
        self.picks.iter().map(|c| c.odds).sum()
    }

    pub fn total_ev(&self) -> f64 {
        self.picks.iter().map(Candidate::ev).sum()
    }

    /// Top `n` candidates by EV, ties in build order.
    pub fn top_candidates(&self, n: usize) -> Vec<&Candidate> {
        let mut sorted: Vec<&Candidate> = self.candidates.iter().collect();
        sorted.sort_by(|a, b| b.ev().total_cmp(&a.ev()));
        sorted.truncate(n);
        sorted
    }
}

/// Run the daily pipeline for `sport_key` on `date`.
pub async fn run_daily(
    provider: &dyn OddsProvider,
    storage: &Storage,
    params: EloParams,
    sport_key: &str,
    date: NaiveDate,
    selection: &SelectionConfig,
) -> Result<DailyReport> {
    selection.validate()?;

    let (events, odds) = provider
        .fetch_upcoming(sport_key, date)
        .await
        .with_context(|| format!("Provider {} failed for {sport_key} on {date}", provider.name()))?;

    storage.upsert_events(&events).await?;
    storage.insert_odds(&odds).await?;

    let ratings = storage.load_ratings().await?;
    let model = EloModel::new(ratings, params);

    let ts = Utc::now();
    let candidates = build_candidates(&events, &odds, &model);
    storage.insert_predictions(ts, &candidates).await?;

    let picks = select_picks(&candidates, selection);
    storage.save_picks(date, ts, &picks).await?;

    let report = DailyReport {
        run_date: date,
        sport_key: sport_key.to_string(),
        provider: provider.name().to_string(),
        ts,
        events: events.len(),
        odds: odds.len(),
        selection: *selection,
        candidates,
        picks,
    };

    info!(
        sport_key,
        %date,
        provider = provider.name(),
        events = report.events,
        candidates = report.candidates.len(),
        picks = report.picks.len(),
        sum_odds = format!("{:.2}", report.sum_odds()),
        total_ev = format!("{:.4}", report.total_ev()),
        "Daily run complete"
    );

    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
