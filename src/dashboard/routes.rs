//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::engine::DailyReport;
use crate::types::Candidate;

/// Maximum candidates returned by `/api/candidates`.
const CANDIDATE_LIMIT: usize = 50;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    /// Latest report per sport key, in configured order.
    pub reports: RwLock<Vec<DailyReport>>,
    /// Refresh failures from the most recent cycle, by sport key.
    pub errors: RwLock<Vec<RefreshError>>,
    pub started_at: DateTime<Utc>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self {
            reports: RwLock::new(Vec::new()),
            errors: RwLock::new(Vec::new()),
            started_at: Utc::now(),
        }
    }

    /// Replace the stored report for the report's sport key.
    pub async fn record(&self, report: DailyReport) {
        let mut reports = self.reports.write().await;
        match reports.iter_mut().find(|r| r.sport_key == report.sport_key) {
            Some(slot) => *slot = report,
            None => reports.push(report),
        }
    }

    pub async fn set_errors(&self, errors: Vec<RefreshError>) {
        *self.errors.write().await = errors;
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RefreshError {
    pub sport_key: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportResponse {
    pub uptime_secs: i64,
    pub runs: Vec<RunSummary>,
    pub errors: Vec<RefreshError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub sport_key: String,
    pub run_date: NaiveDate,
    pub provider: String,
    pub ts: DateTime<Utc>,
    pub events: usize,
    pub odds: usize,
    pub candidates: usize,
    pub picks: usize,
    pub sum_odds: f64,
    pub total_ev: f64,
    pub max_plays: usize,
    pub edge_min: f64,
    pub odds_sum_cap: f64,
}

impl From<&DailyReport> for RunSummary {
    fn from(r: &DailyReport) -> Self {
        Self {
            sport_key: r.sport_key.clone(),
            run_date: r.run_date,
            provider: r.provider.clone(),
            ts: r.ts,
            events: r.events,
            odds: r.odds,
            candidates: r.candidates.len(),
            picks: r.picks.len(),
            sum_odds: r.sum_odds(),
            total_ev: r.total_ev(),
            max_plays: r.selection.max_plays,
            edge_min: r.selection.edge_min,
            odds_sum_cap: r.selection.odds_sum_cap,
        }
    }
}

/// Flat view of a candidate for tables.
#[derive(Debug, Clone, Serialize)]
pub struct PlayView {
    pub sport_key: String,
    pub event_id: String,
    pub matchup: String,
    pub commence_time: DateTime<Utc>,
    pub market: String,
    pub selection: String,
    pub bookmaker: String,
    pub odds: f64,
    pub p_model: f64,
    pub ev: f64,
}

impl From<&Candidate> for PlayView {
    fn from(c: &Candidate) -> Self {
        Self {
            sport_key: c.event.sport_key.clone(),
            event_id: c.event.id.clone(),
            matchup: c.event.to_string(),
            commence_time: c.event.commence_time,
            market: c.market.clone(),
            selection: c.selection.clone(),
            bookmaker: c.bookmaker.clone(),
            odds: c.odds,
            p_model: c.p_model,
            ev: c.ev(),
        }
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

pub type AppState = Arc<DashboardState>;

/// GET /api/report
pub async fn get_report(State(state): State<AppState>) -> Json<ReportResponse> {
    let reports = state.reports.read().await;
    let errors = state.errors.read().await;
    Json(ReportResponse {
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        runs: reports.iter().map(RunSummary::from).collect(),
        errors: errors.clone(),
    })
}

/// GET /api/picks
pub async fn get_picks(State(state): State<AppState>) -> Json<Vec<PlayView>> {
    let reports = state.reports.read().await;
    Json(
        reports
            .iter()
            .flat_map(|r| r.picks.iter().map(PlayView::from))
            .collect(),
    )
}

/// GET /api/candidates
pub async fn get_candidates(State(state): State<AppState>) -> Json<Vec<PlayView>> {
    let reports = state.reports.read().await;
    let mut all: Vec<&Candidate> = reports.iter().flat_map(|r| r.candidates.iter()).collect();
    all.sort_by(|a, b| b.ev().total_cmp(&a.ev()));
    all.truncate(CANDIDATE_LIMIT);
    Json(all.into_iter().map(PlayView::from).collect())
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
