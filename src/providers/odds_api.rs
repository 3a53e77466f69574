//! The Odds API v4 integration.
//!
//! API docs: https://the-odds-api.com/liveapi/guides/v4/
//! Endpoint: GET /v4/sports/{sport_key}/odds
//! Auth: `apiKey` query parameter.
//!
//! The endpoint has no date filter; it returns every upcoming event for
//! the sport key, so the requested UTC date is applied client-side.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Mutex;
use tracing::{debug, info, warn};

use super::OddsProvider;
use crate::config::OddsApiConfig;
use crate::types::{Event, MarketOdd, ValueBotError, MARKET_H2H, SELECTION_AWAY, SELECTION_HOME};

pub const PROVIDER_NAME: &str = "oddsapi";

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiEvent {
    id: String,
    #[serde(default)]
    sport_title: Option<String>,
    #[serde(default)]
    commence_time: Option<String>,
    #[serde(default)]
    home_team: Option<String>,
    #[serde(default)]
    away_team: Option<String>,
    #[serde(default)]
    bookmakers: Vec<ApiBookmaker>,
}

#[derive(Debug, Deserialize)]
struct ApiBookmaker {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    last_update: Option<String>,
    #[serde(default)]
    markets: Vec<ApiMarket>,
}

#[derive(Debug, Deserialize)]
struct ApiMarket {
    key: String,
    #[serde(default)]
    outcomes: Vec<ApiOutcome>,
}

#[derive(Debug, Deserialize)]
struct ApiOutcome {
    name: String,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    point: Option<f64>,
}

/// Request quota reported in response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiQuota {
    pub requests_used: u64,
    pub requests_remaining: u64,
}

/// Parse a quota header that may be an integer or float (e.g. "14527.0").
fn parse_quota_header(headers: &reqwest::header::HeaderMap, name: &str) -> u64 {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<f64>().ok())
        .map(|v| v as u64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct OddsApiProvider {
    http: Client,
    api_key: SecretString,
    base_url: String,
    regions: String,
    markets: String,
    odds_format: String,
    last_quota: Mutex<Option<ApiQuota>>,
}

impl OddsApiProvider {
    pub fn new(api_key: SecretString, cfg: &OddsApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("VALUEBOT/0.1.0 (value-play-selector)")
            .build()
            .context("Failed to build HTTP client for The Odds API")?;

        Ok(Self {
            http,
            api_key,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            regions: cfg.regions.clone(),
            markets: cfg.markets.clone(),
            odds_format: cfg.odds_format.clone(),
            last_quota: Mutex::new(None),
        })
    }

    /// Quota observed on the most recent response, if any.
    pub fn last_quota(&self) -> Option<ApiQuota> {
        self.last_quota.lock().ok().and_then(|q| *q)
    }

    fn provider_error(message: impl Into<String>) -> ValueBotError {
        ValueBotError::Provider {
            provider: PROVIDER_NAME.to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl OddsProvider for OddsApiProvider {
    async fn fetch_upcoming(
        &self,
        sport_key: &str,
        date: NaiveDate,
    ) -> Result<(Vec<Event>, Vec<MarketOdd>)> {
        let url = format!(
            "{}/v4/sports/{}/odds",
            self.base_url,
            urlencoding::encode(sport_key),
        );

        debug!(sport_key, %date, "Fetching odds from The Odds API");

        // reqwest errors embed the request URL, key included: strip it.
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.expose_secret().as_str()),
                ("regions", self.regions.as_str()),
                ("markets", self.markets.as_str()),
                ("oddsFormat", self.odds_format.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Self::provider_error(format!("request failed: {}", e.without_url())))?;

        let quota = ApiQuota {
            requests_used: parse_quota_header(resp.headers(), "x-requests-used"),
            requests_remaining: parse_quota_header(resp.headers(), "x-requests-remaining"),
        };
        if let Ok(mut slot) = self.last_quota.lock() {
            *slot = Some(quota);
        }

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::provider_error(format!("{sport_key} ({status}): {body}")).into());
        }

        let body: Vec<ApiEvent> = resp
            .json()
            .await
            .map_err(|e| Self::provider_error(format!("malformed response: {}", e.without_url())))?;

        let (events, odds) = normalize(sport_key, date, body);

        if quota.requests_remaining == 0 && quota.requests_used > 0 {
            warn!(used = quota.requests_used, "The Odds API quota exhausted");
        }
        info!(
            sport_key,
            %date,
            events = events.len(),
            odds = odds.len(),
            quota_remaining = quota.requests_remaining,
            "Odds fetched"
        );

        Ok((events, odds))
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Convert raw API events into domain events and odds, keeping only events
/// whose start falls on `date` (UTC).
///
/// h2h outcomes naming the home or away team become `HOME` / `AWAY`; any
/// other h2h outcome (e.g. "Draw") keeps its name. Outcomes on other markets
/// carry their point as `"{name} {point}"`. Outcomes without a price are
/// dropped.
fn normalize(sport_key: &str, date: NaiveDate, body: Vec<ApiEvent>) -> (Vec<Event>, Vec<MarketOdd>) {
    let mut events = Vec::new();
    let mut odds = Vec::new();

    for item in body {
        let Some(commence_time) = item.commence_time.as_deref().and_then(parse_timestamp) else {
            continue;
        };
        if commence_time.date_naive() != date {
            continue;
        }

        let event = Event {
            id: item.id,
            sport_key: sport_key.to_string(),
            commence_time,
            home_team: item.home_team.unwrap_or_else(|| SELECTION_HOME.to_string()),
            away_team: item.away_team.unwrap_or_else(|| SELECTION_AWAY.to_string()),
            league: item.sport_title,
        };

        for bookmaker in item.bookmakers {
            let name = bookmaker.title.unwrap_or_else(|| "bookmaker".to_string());
            let last_update = bookmaker
                .last_update
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or_else(Utc::now);

            for market in bookmaker.markets {
                for outcome in market.outcomes {
                    let Some(price) = outcome.price else {
                        continue;
                    };
                    odds.push(MarketOdd {
                        event_id: event.id.clone(),
                        market: market.key.clone(),
                        selection: selection_label(&event, &market.key, &outcome),
                        odds: price,
                        bookmaker: name.clone(),
                        last_update,
                    });
                }
            }
        }

        events.push(event);
    }

    (events, odds)
}

fn selection_label(event: &Event, market: &str, outcome: &ApiOutcome) -> String {
    if market == MARKET_H2H {
        if outcome.name == event.home_team {
            SELECTION_HOME.to_string()
        } else if outcome.name == event.away_team {
            SELECTION_AWAY.to_string()
        } else {
            outcome.name.clone()
        }
    } else {
        match outcome.point {
            Some(point) => format!("{} {}", outcome.name, point),
            None => outcome.name.clone(),
        }
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
