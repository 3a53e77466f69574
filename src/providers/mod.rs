//! Odds providers.
//!
//! Defines the `OddsProvider` trait and provides implementations for:
//! - Demo: deterministic synthetic slate, no network
//! - The Odds API v4: live bookmaker prices

pub mod demo;
pub mod odds_api;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::config::AppConfig;
use crate::types::{Event, MarketOdd, ValueBotError};

pub use demo::DemoProvider;
pub use odds_api::OddsApiProvider;

/// Abstraction over odds data sources.
///
/// Implementors return the events scheduled on a UTC date for one sport key
/// together with every price they observed for those events. The core never
/// knows which variant supplied its input.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OddsProvider: Send + Sync {
    /// Fetch events and odds for `sport_key` on `date` (UTC).
    async fn fetch_upcoming(
        &self,
        sport_key: &str,
        date: NaiveDate,
    ) -> Result<(Vec<Event>, Vec<MarketOdd>)>;

    /// Provider name for logging and identification.
    fn name(&self) -> &'static str;
}

/// Build a provider by name ("demo" or "oddsapi").
pub fn build_provider(name: &str, cfg: &AppConfig) -> Result<Box<dyn OddsProvider>> {
    match name {
        demo::PROVIDER_NAME => Ok(Box::new(DemoProvider::new())),
        odds_api::PROVIDER_NAME => {
            let api = &cfg.providers.odds_api;
            let key = api.api_key()?;
            Ok(Box::new(OddsApiProvider::new(key, api)?))
        }
        other => Err(ValueBotError::UnknownProvider(other.to_string()).into()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_demo_provider() {
        let p = build_provider("demo", &AppConfig::default()).unwrap();
        assert_eq!(p.name(), "demo");
    }

    #[test]
    fn test_build_unknown_provider() {
        let err = build_provider("bet365", &AppConfig::default()).err().unwrap();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn test_build_oddsapi_without_key_fails() {
        let mut cfg = AppConfig::default();
        cfg.providers.odds_api.api_key_env = "VALUEBOT_TEST_KEY_NEVER_SET".into();
        let err = build_provider("oddsapi", &cfg).err().unwrap();
        assert!(err.to_string().contains("Missing Odds API key"));
    }
}
