//! VALUEBOT: daily sports value-play selector.
//!
//! Entry point. Initialises structured logging, loads configuration and
//! dispatches to one of three commands:
//! - `run`   one fetch → score → select pass for a date, printed to stdout
//! - `train` replay finished results into the stored Elo ratings
//! - `serve` refresh today's picks on an interval behind the dashboard

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use valuebot::config::AppConfig;
use valuebot::dashboard::{self, DashboardState};
use valuebot::engine::{self, DailyReport};
use valuebot::providers;
use valuebot::storage::Storage;

const DEFAULT_SPORT_KEY: &str = "basketball_ncaab";

#[derive(Parser)]
#[command(name = "valuebot", version, about = "Daily sports value-play selector")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch odds for a date, score them and select the day's plays.
    Run {
        /// UTC date, YYYY-MM-DD.
        #[arg(long)]
        date: NaiveDate,
        /// Odds provider: demo or oddsapi.
        #[arg(long)]
        provider: Option<String>,
        /// Provider sport key (e.g. basketball_ncaab).
        #[arg(long)]
        sport_key: Option<String>,
        #[arg(long)]
        max_plays: Option<usize>,
        #[arg(long)]
        min_plays: Option<usize>,
        #[arg(long)]
        edge_min: Option<f64>,
        #[arg(long)]
        odds_sum_cap: Option<f64>,
        /// Never pick two selections of the same event.
        #[arg(long)]
        one_per_event: bool,
    },
    /// Update ratings from a JSON file of finished matches.
    Train {
        #[arg(long)]
        results: String,
    },
    /// Refresh today's picks on an interval and serve the dashboard.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let cli = Cli::parse();
    let mut cfg = AppConfig::load_or_default(&cli.config)?;

    match cli.command {
        Command::Run {
            date,
            provider,
            sport_key,
            max_plays,
            min_plays,
            edge_min,
            odds_sum_cap,
            one_per_event,
        } => {
            if let Some(v) = max_plays {
                cfg.selection.max_plays = v;
            }
            if let Some(v) = min_plays {
                cfg.selection.min_plays = v;
            }
            if let Some(v) = edge_min {
                cfg.selection.edge_min = v;
            }
            if let Some(v) = odds_sum_cap {
                cfg.selection.odds_sum_cap = v;
            }
            cfg.selection.one_per_event |= one_per_event;

            let provider_name = provider.unwrap_or_else(|| cfg.app.default_provider.clone());
            let sport_key = sport_key
                .or_else(|| cfg.app.sport_keys.first().cloned())
                .unwrap_or_else(|| DEFAULT_SPORT_KEY.to_string());

            run_once(&cfg, &provider_name, &sport_key, date).await
        }
        Command::Train { results } => train(&cfg, &results).await,
        Command::Serve => serve(&cfg).await,
    }
}

async fn run_once(cfg: &AppConfig, provider_name: &str, sport_key: &str, date: NaiveDate) -> Result<()> {
    let provider = providers::build_provider(provider_name, cfg)?;
    let storage = Storage::connect(&cfg.app.db_path).await?;

    let report = engine::run_daily(
        provider.as_ref(),
        &storage,
        cfg.model.params(),
        sport_key,
        date,
        &cfg.selection,
    )
    .await?;

    print_report(&report);
    Ok(())
}

async fn train(cfg: &AppConfig, results_path: &str) -> Result<()> {
    let results = engine::load_results(results_path)?;
    let storage = Storage::connect(&cfg.app.db_path).await?;
    let summary = engine::train_ratings(&storage, cfg.model.params(), &results).await?;
    println!(
        "Applied {} results | {} ratings stored in {}",
        summary.results_applied, summary.ratings_stored, cfg.app.db_path
    );
    Ok(())
}

async fn serve(cfg: &AppConfig) -> Result<()> {
    cfg.selection.validate()?;
    if cfg.app.sport_keys.is_empty() {
        warn!("No sport keys configured; the dashboard will stay empty");
    }

    let provider = providers::build_provider(&cfg.app.default_provider, cfg)?;
    let storage = Storage::connect(&cfg.app.db_path).await?;
    let state = Arc::new(DashboardState::new());

    dashboard::spawn_dashboard(state.clone(), cfg.dashboard.port)
        .await
        .context("Failed to start dashboard")?;

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.dashboard.refresh_interval_secs.max(1)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        provider = provider.name(),
        sport_keys = ?cfg.app.sport_keys,
        interval_secs = cfg.dashboard.refresh_interval_secs,
        "Entering refresh loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                engine::refresh_all(cfg, provider.as_ref(), &storage, &state, Utc::now().date_naive()).await;
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!("VALUEBOT shut down cleanly.");
    Ok(())
}

fn print_report(report: &DailyReport) {
    println!(
        "Date: {} | sport_key={} | provider={}",
        report.run_date, report.sport_key, report.provider
    );
    println!(
        "Candidates: {} | Picks: {} | odds_sum_cap={}",
        report.candidates.len(),
        report.picks.len(),
        report.selection.odds_sum_cap
    );
    println!("{}", "-".repeat(72));
    for c in &report.picks {
        println!(
            "{} vs {} | {} {} | odds={:.2} | p={:.3} | EV={:.3}%",
            c.event.home_team,
            c.event.away_team,
            c.market,
            c.selection,
            c.odds,
            c.p_model,
            c.ev() * 100.0
        );
    }
    println!("{}", "-".repeat(72));
    println!("Sum odds: {:.2}", report.sum_odds());
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("valuebot=info"));

    let json_logging = std::env::var("VALUEBOT_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
