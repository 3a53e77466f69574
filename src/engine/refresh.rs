//! Dashboard refresh: one daily run per configured sport key.

use chrono::NaiveDate;
use tracing::{error, info};

use super::daily::run_daily;
use crate::config::AppConfig;
use crate::dashboard::{DashboardState, RefreshError};
use crate::providers::OddsProvider;
use crate::storage::Storage;

/// Run `date` for every configured sport key concurrently and publish the
/// results. A failing key is logged and recorded as a refresh error; the
/// other keys still update. The error list is replaced on every call.
pub async fn refresh_all(
    cfg: &AppConfig,
    provider: &dyn OddsProvider,
    storage: &Storage,
    state: &DashboardState,
    date: NaiveDate,
) {
    let runs = cfg.app.sport_keys.iter().map(|sport_key| async move {
        let result = run_daily(
            provider,
            storage,
            cfg.model.params(),
            sport_key,
            date,
            &cfg.selection,
        )
        .await;
        (sport_key, result)
    });

    let mut refreshed = 0usize;
    let mut errors = Vec::new();
    for (sport_key, result) in futures::future::join_all(runs).await {
        match result {
            Ok(report) => {
                state.record(report).await;
                refreshed += 1;
            }
            Err(e) => {
                let message = format!("{e:#}");
                error!(sport_key = %sport_key, error = %message, "Refresh failed, continuing");
                errors.push(RefreshError {
                    sport_key: sport_key.clone(),
                    message,
                });
            }
        }
    }

    info!(%date, refreshed, failed = errors.len(), "Refresh cycle complete");
    state.set_errors(errors).await;
}
