//! Daily pipeline, training and dashboard wired together.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use std::sync::Arc;
use tower::ServiceExt;

use valuebot::config::AppConfig;
use valuebot::dashboard::{build_router, DashboardState};
use valuebot::engine::{refresh_all, run_daily, train_ratings};
use valuebot::model::{EloParams, RatingStore};
use valuebot::providers::build_provider;
use valuebot::storage::{Storage, Table};
use valuebot::strategy::SelectionConfig;
use valuebot::types::MatchResult;

use crate::mock_provider::ScriptedProvider;

const NCAAB: &str = "basketball_ncaab";

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
}

fn temp_db() -> String {
    let mut p = std::env::temp_dir();
    p.push(format!("valuebot_it_{}.sqlite", uuid::Uuid::new_v4()));
    p.to_string_lossy().into_owned()
}

/// Equal ratings: p_home = 0.5855, p_away = 0.4145.
/// Positive-edge selections: g1 HOME (EV 0.171), g3 AWAY (0.078),
/// g2 HOME (0.054), g2 AWAY (0.036).
fn three_game_slate() -> ScriptedProvider {
    ScriptedProvider::new()
        .with_game(NCAAB, "g1", "Duke", "UNC", 2.0, 2.3)
        .with_game(NCAAB, "g2", "Kansas", "Baylor", 1.8, 2.5)
        .with_game(NCAAB, "g3", "Gonzaga", "Purdue", 1.5, 2.6)
}

fn ids(picks: &[valuebot::types::Candidate]) -> Vec<(String, String)> {
    picks
        .iter()
        .map(|c| (c.event.id.clone(), c.selection.clone()))
        .collect()
}

#[tokio::test]
async fn test_daily_run_end_to_end() {
    let path = temp_db();
    let storage = Storage::connect(&path).await.unwrap();
    let provider = three_game_slate();

    let report = run_daily(
        &provider,
        &storage,
        EloParams::default(),
        NCAAB,
        date(),
        &SelectionConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(provider.calls(), 1);
    assert_eq!(report.candidates.len(), 6);
    assert_eq!(
        ids(&report.picks),
        vec![
            ("g1".to_string(), "HOME".to_string()),
            ("g3".to_string(), "AWAY".to_string()),
            ("g2".to_string(), "HOME".to_string()),
        ]
    );
    assert!((report.sum_odds() - 6.4).abs() < 1e-9);

    // Picks survive a reopen of the database.
    drop(storage);
    let storage = Storage::connect(&path).await.unwrap();
    let stored = storage.load_picks(date()).await.unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[0].event_id, "g1");
    assert_eq!(storage.count(Table::Predictions).await.unwrap(), 6);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_tight_cap_changes_selection() {
    let storage = Storage::in_memory().await.unwrap();
    let selection = SelectionConfig {
        odds_sum_cap: 5.0,
        ..SelectionConfig::default()
    };

    let report = run_daily(&three_game_slate(), &storage, EloParams::default(), NCAAB, date(), &selection)
        .await
        .unwrap();

    // No triple fits under 5.0; the best pair is g1 HOME + g3 AWAY (4.6).
    assert_eq!(
        ids(&report.picks),
        vec![
            ("g1".to_string(), "HOME".to_string()),
            ("g3".to_string(), "AWAY".to_string()),
        ]
    );
    assert!(report.sum_odds() <= 5.0);
}

#[tokio::test]
async fn test_training_feeds_next_run() {
    let storage = Storage::in_memory().await.unwrap();
    let provider = three_game_slate();

    let before = run_daily(&provider, &storage, EloParams::default(), NCAAB, date(), &SelectionConfig::default())
        .await
        .unwrap();
    let p_before = before.candidates[0].p_model;

    let results: Vec<MatchResult> = (0..10)
        .map(|_| MatchResult {
            sport_key: NCAAB.into(),
            home_team: "Duke".into(),
            away_team: "UNC".into(),
            home_result: 0.0,
        })
        .collect();
    train_ratings(&storage, EloParams::default(), &results).await.unwrap();

    let ratings = storage.load_ratings().await.unwrap();
    assert!(ratings.get(NCAAB, "Duke").unwrap() < 1500.0);
    assert!(ratings.get(NCAAB, "UNC").unwrap() > 1500.0);

    let after = run_daily(&provider, &storage, EloParams::default(), NCAAB, date(), &SelectionConfig::default())
        .await
        .unwrap();
    let p_after = after.candidates[0].p_model;
    assert_eq!(after.candidates[0].event.id, "g1");
    assert!(p_after < p_before, "Duke home probability should drop");
    assert!(!ids(&after.picks).contains(&("g1".to_string(), "HOME".to_string())));
}

async fn report_json(state: Arc<DashboardState>) -> serde_json::Value {
    let resp = build_router(state)
        .oneshot(Request::builder().uri("/api/report").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_refresh_with_failing_sport_key() {
    let storage = Storage::in_memory().await.unwrap();
    let provider = three_game_slate().with_game("soccer_epl", "e1", "Arsenal", "Chelsea", 2.2, 3.4);
    provider.fail_for("soccer_epl");

    let mut cfg = AppConfig::default();
    cfg.app.sport_keys = vec![NCAAB.to_string(), "soccer_epl".to_string()];

    let state = Arc::new(DashboardState::new());
    refresh_all(&cfg, &provider, &storage, &state, date()).await;
    assert_eq!(provider.calls(), 2);

    let json = report_json(state.clone()).await;
    assert_eq!(json["runs"].as_array().unwrap().len(), 1);
    assert_eq!(json["runs"][0]["sport_key"], NCAAB);
    assert_eq!(json["runs"][0]["picks"], 3);
    assert_eq!(json["errors"].as_array().unwrap().len(), 1);
    assert_eq!(json["errors"][0]["sport_key"], "soccer_epl");
    assert!(json["errors"][0]["message"].as_str().unwrap().contains("scripted failure"));

    // Next cycle succeeds for both keys and clears the stale error.
    provider.recover("soccer_epl");
    refresh_all(&cfg, &provider, &storage, &state, date()).await;
    assert_eq!(provider.calls(), 4);

    let json = report_json(state).await;
    assert_eq!(json["runs"].as_array().unwrap().len(), 2);
    assert_eq!(json["runs"][1]["sport_key"], "soccer_epl");
    assert!(json["errors"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_demo_provider_from_config() {
    let cfg = AppConfig::from_toml(
        r#"
        [app]
        db_path = ":unused:"
        default_provider = "demo"
        sport_keys = ["basketball_ncaab"]

        [selection]
        max_plays = 2
        edge_min = 0.0
        odds_sum_cap = 8.0
        one_per_event = true
        "#,
    )
    .unwrap();

    let provider = build_provider(&cfg.app.default_provider, &cfg).unwrap();
    let storage = Storage::in_memory().await.unwrap();

    let first = run_daily(provider.as_ref(), &storage, cfg.model.params(), NCAAB, date(), &cfg.selection)
        .await
        .unwrap();
    let second = run_daily(provider.as_ref(), &storage, cfg.model.params(), NCAAB, date(), &cfg.selection)
        .await
        .unwrap();

    assert_eq!(first.candidates, second.candidates);
    assert_eq!(ids(&first.picks), ids(&second.picks));
    assert!(first.picks.len() <= 2);
    assert!(first.sum_odds() <= 8.0);
    if first.picks.len() == 2 {
        assert_ne!(first.picks[0].event.id, first.picks[1].event.id);
    }
    // Re-running the date replaces rather than duplicates picks.
    assert_eq!(storage.load_picks(date()).await.unwrap().len(), first.picks.len());
}
