//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section is optional. Secrets (API keys) are referenced by env-var
//! name in the config and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::model::EloParams;
use crate::strategy::SelectionConfig;
use crate::types::ValueBotError;

/// Placeholder shipped in sample configs; treated as "no key".
const API_KEY_PLACEHOLDER: &str = "PUT_YOUR_KEY_HERE";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: GeneralConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeneralConfig {
    pub db_path: String,
    /// Provider used when none is given on the command line.
    pub default_provider: String,
    /// Sport keys refreshed by `serve`; the first is the `run` default.
    pub sport_keys: Vec<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            db_path: "valuebot.sqlite".to_string(),
            default_provider: "demo".to_string(),
            sport_keys: vec!["basketball_ncaab".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    pub k_factor: f64,
    pub home_advantage: f64,
    pub default_rating: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let p = EloParams::default();
        Self {
            k_factor: p.k_factor,
            home_advantage: p.home_advantage,
            default_rating: p.default_rating,
        }
    }
}

impl ModelConfig {
    pub fn params(&self) -> EloParams {
        EloParams {
            k_factor: self.k_factor,
            home_advantage: self.home_advantage,
            default_rating: self.default_rating,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub odds_api: OddsApiConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OddsApiConfig {
    pub api_key_env: String,
    pub base_url: String,
    pub regions: String,
    pub markets: String,
    pub odds_format: String,
}

impl Default for OddsApiConfig {
    fn default() -> Self {
        Self {
            api_key_env: "ODDS_API_KEY".to_string(),
            base_url: "https://api.the-odds-api.com".to_string(),
            regions: "us,eu".to_string(),
            markets: "h2h".to_string(),
            odds_format: "decimal".to_string(),
        }
    }
}

impl OddsApiConfig {
    /// Resolve the API key, rejecting empty and placeholder values.
    pub fn api_key(&self) -> Result<SecretString, ValueBotError> {
        let key = std::env::var(&self.api_key_env).map_err(|_| {
            ValueBotError::Config(format!(
                "Missing Odds API key: set the {} environment variable",
                self.api_key_env
            ))
        })?;
        let key = key.trim();
        if key.is_empty() || key == API_KEY_PLACEHOLDER {
            return Err(ValueBotError::Config(format!(
                "Odds API key in {} is empty or a placeholder",
                self.api_key_env
            )));
        }
        Ok(SecretString::new(key.to_string()))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub port: u16,
    pub refresh_interval_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            refresh_interval_secs: 900,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse and validate configuration text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.selection.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            info!(path, "No config file found, using defaults");
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_load_config() {
        // config.toml ships at the crate root, the working directory of tests.
        let cfg = AppConfig::load("config.toml").unwrap();
        assert!(!cfg.app.db_path.is_empty());
        assert!(!cfg.app.sport_keys.is_empty());
        assert!(cfg.selection.max_plays >= 1);
        assert!(cfg.selection.odds_sum_cap > 1.0);
        assert!(cfg.model.k_factor > 0.0);
    }

    #[test]
    fn test_single_field_sections_fill_in_defaults() {
        let cfg = AppConfig::from_toml(
            r#"
            [app]
            db_path = "/tmp/only.sqlite"

            [selection]
            max_plays = 2

            [model]
            k_factor = 32.0

            [providers.odds_api]
            regions = "uk"

            [dashboard]
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.app.db_path, "/tmp/only.sqlite");
        assert_eq!(cfg.app.default_provider, "demo");
        assert_eq!(cfg.app.sport_keys, vec!["basketball_ncaab"]);
        assert_eq!(cfg.selection.max_plays, 2);
        assert_eq!(cfg.selection.edge_min, 0.02);
        assert_eq!(cfg.selection.odds_sum_cap, 10.0);
        assert_eq!(cfg.model.k_factor, 32.0);
        assert_eq!(cfg.model.home_advantage, 60.0);
        assert_eq!(cfg.providers.odds_api.regions, "uk");
        assert_eq!(cfg.providers.odds_api.api_key_env, "ODDS_API_KEY");
        assert_eq!(cfg.dashboard.port, 9000);
        assert_eq!(cfg.dashboard.refresh_interval_secs, 900);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let cfg = AppConfig::load_or_default("/nonexistent/valuebot.toml").unwrap();
        assert_eq!(cfg.app.sport_keys, vec!["basketball_ncaab"]);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = AppConfig::from_toml("").unwrap();
        assert_eq!(cfg.app.db_path, "valuebot.sqlite");
        assert_eq!(cfg.app.default_provider, "demo");
        assert_eq!(cfg.selection, SelectionConfig::default());
        assert_eq!(cfg.model.k_factor, 20.0);
        assert_eq!(cfg.model.home_advantage, 60.0);
        assert_eq!(cfg.model.default_rating, 1500.0);
        assert_eq!(cfg.providers.odds_api.odds_format, "decimal");
        assert_eq!(cfg.dashboard.port, 8080);
    }

    #[test]
    fn test_partial_sections() {
        let cfg = AppConfig::from_toml(
            r#"
            [app]
            db_path = "/tmp/vb.sqlite"
            default_provider = "oddsapi"
            sport_keys = ["soccer_epl", "icehockey_nhl"]

            [selection]
            max_plays = 2
            edge_min = 0.05
            odds_sum_cap = 6.5
            one_per_event = true

            [model]
            k_factor = 32.0
            home_advantage = 45.0
            default_rating = 1500.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.app.sport_keys, vec!["soccer_epl", "icehockey_nhl"]);
        assert_eq!(cfg.selection.min_plays, 0);
        assert_eq!(cfg.selection.max_plays, 2);
        assert!(cfg.selection.one_per_event);
        assert_eq!(cfg.model.params().k_factor, 32.0);
        assert_eq!(cfg.model.params().home_advantage, 45.0);
    }

    #[test]
    fn test_invalid_selection_rejected() {
        let result = AppConfig::from_toml(
            r#"
            [selection]
            max_plays = 0
            edge_min = 0.02
            odds_sum_cap = 10.0
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_api_key_resolution() {
        let env = format!("VALUEBOT_TEST_KEY_{}", uuid::Uuid::new_v4().simple());
        let cfg = OddsApiConfig {
            api_key_env: env.clone(),
            ..OddsApiConfig::default()
        };
        assert!(cfg.api_key().is_err());

        std::env::set_var(&env, API_KEY_PLACEHOLDER);
        assert!(matches!(cfg.api_key(), Err(ValueBotError::Config(_))));

        std::env::set_var(&env, "abc123");
        assert_eq!(cfg.api_key().unwrap().expose_secret(), "abc123");
        std::env::remove_var(&env);
    }
}
