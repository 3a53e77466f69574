//! Persistence layer.
//!
//! SQLite via `sqlx`. Stores fetched events and odds, model predictions,
//! the picks of each daily run, and the rating table the model reads its
//! snapshot from. Timestamps are stored as RFC 3339 text.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

use crate::model::{InMemoryRatings, RatingKey, RatingStore};
use crate::types::{Candidate, Event, MarketOdd, ValueBotError};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS events(
      event_id TEXT PRIMARY KEY,
      sport_key TEXT NOT NULL,
      commence_time TEXT NOT NULL,
      home_team TEXT NOT NULL,
      away_team TEXT NOT NULL,
      league TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS odds(
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      event_id TEXT NOT NULL,
      ts TEXT NOT NULL,
      bookmaker TEXT NOT NULL,
      market TEXT NOT NULL,
      selection TEXT NOT NULL,
      odds REAL NOT NULL,
      UNIQUE(event_id, ts, bookmaker, market, selection)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS predictions(
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      event_id TEXT NOT NULL,
      ts TEXT NOT NULL,
      market TEXT NOT NULL,
      selection TEXT NOT NULL,
      p_model REAL NOT NULL,
      ev REAL NOT NULL,
      UNIQUE(event_id, ts, market, selection)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS picks(
      run_date TEXT NOT NULL,
      ts TEXT NOT NULL,
      event_id TEXT NOT NULL,
      market TEXT NOT NULL,
      selection TEXT NOT NULL,
      odds REAL NOT NULL,
      p_model REAL NOT NULL,
      ev REAL NOT NULL,
      PRIMARY KEY(run_date, event_id, market, selection)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ratings(
      sport_key TEXT NOT NULL,
      team TEXT NOT NULL,
      rating REAL NOT NULL,
      updated_at TEXT NOT NULL,
      PRIMARY KEY(sport_key, team)
    )
    "#,
];

/// A persisted pick row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredPick {
    pub run_date: NaiveDate,
    pub ts: DateTime<Utc>,
    pub event_id: String,
    pub market: String,
    pub selection: String,
    pub odds: f64,
    pub p_model: f64,
    pub ev: f64,
}

/// SQLite-backed store.
#[derive(Debug, Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Open (creating if missing) the database at `path` and apply the schema.
    pub async fn connect(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database: {path}"))?;

        let storage = Self { pool };
        storage.migrate().await?;
        info!(path, "Database ready");
        Ok(storage)
    }

    /// Private in-memory database. A single connection that never expires,
    /// so the data lives as long as the pool.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;

        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to apply database schema")?;
        }
        Ok(())
    }

    // -- Writes ----------------------------------------------------------

    /// Insert or update events by id.
    pub async fn upsert_events(&self, events: &[Event]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for e in events {
            sqlx::query(
                r#"
                INSERT INTO events(event_id, sport_key, commence_time, home_team, away_team, league)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(event_id) DO UPDATE SET
                  sport_key = excluded.sport_key,
                  commence_time = excluded.commence_time,
                  home_team = excluded.home_team,
                  away_team = excluded.away_team,
                  league = excluded.league
                "#,
            )
            .bind(&e.id)
            .bind(&e.sport_key)
            .bind(e.commence_time.to_rfc3339())
            .bind(&e.home_team)
            .bind(&e.away_team)
            .bind(&e.league)
            .execute(&mut *tx)
            .await
            .context("Failed to upsert event")?;
        }
        tx.commit().await?;
        debug!(count = events.len(), "Events upserted");
        Ok(())
    }

    /// Record odds observations; duplicates of an observation are ignored.
    pub async fn insert_odds(&self, odds: &[MarketOdd]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for o in odds {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO odds(event_id, ts, bookmaker, market, selection, odds)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&o.event_id)
            .bind(o.last_update.to_rfc3339())
            .bind(&o.bookmaker)
            .bind(&o.market)
            .bind(&o.selection)
            .bind(o.odds)
            .execute(&mut *tx)
            .await
            .context("Failed to insert odds")?;
        }
        tx.commit().await?;
        debug!(count = odds.len(), "Odds inserted");
        Ok(())
    }

    /// Record the model's view of every candidate at run time `ts`.
    pub async fn insert_predictions(&self, ts: DateTime<Utc>, candidates: &[Candidate]) -> Result<()> {
        let ts = ts.to_rfc3339();
        let mut tx = self.pool.begin().await?;
        for c in candidates {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO predictions(event_id, ts, market, selection, p_model, ev)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&c.event.id)
            .bind(&ts)
            .bind(&c.market)
            .bind(&c.selection)
            .bind(c.p_model)
            .bind(c.ev())
            .execute(&mut *tx)
            .await
            .context("Failed to insert prediction")?;
        }
        tx.commit().await?;
        debug!(count = candidates.len(), "Predictions inserted");
        Ok(())
    }

    /// Store the picks of a run. Re-running a date replaces matching rows.
    pub async fn save_picks(
        &self,
        run_date: NaiveDate,
        ts: DateTime<Utc>,
        picks: &[Candidate],
    ) -> Result<()> {
        let run_date = run_date.to_string();
        let ts = ts.to_rfc3339();
        let mut tx = self.pool.begin().await?;
        for c in picks {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO picks(run_date, ts, event_id, market, selection, odds, p_model, ev)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&run_date)
            .bind(&ts)
            .bind(&c.event.id)
            .bind(&c.market)
            .bind(&c.selection)
            .bind(c.odds)
            .bind(c.p_model)
            .bind(c.ev())
            .execute(&mut *tx)
            .await
            .context("Failed to save pick")?;
        }
        tx.commit().await?;
        info!(%run_date, count = picks.len(), "Picks saved");
        Ok(())
    }

    /// Write every rating in `store` back to the ratings table.
    pub async fn save_ratings<S: RatingStore>(&self, store: &S) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        for (key, rating) in store.iter() {
            sqlx::query(
                r#"
                INSERT INTO ratings(sport_key, team, rating, updated_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(sport_key, team) DO UPDATE SET
                  rating = excluded.rating,
                  updated_at = excluded.updated_at
                "#,
            )
            .bind(&key.domain)
            .bind(&key.participant)
            .bind(rating)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .context("Failed to save rating")?;
        }
        tx.commit().await?;
        debug!(count = store.len(), "Ratings saved");
        Ok(())
    }

    // -- Reads -----------------------------------------------------------

    /// Snapshot of every stored rating.
    pub async fn load_ratings(&self) -> Result<InMemoryRatings> {
        let rows = sqlx::query("SELECT sport_key, team, rating FROM ratings")
            .fetch_all(&self.pool)
            .await
            .context("Failed to load ratings")?;

        let ratings: InMemoryRatings = rows
            .iter()
            .map(|row| {
                let sport_key: String = row.get("sport_key");
                let team: String = row.get("team");
                let rating: f64 = row.get("rating");
                (RatingKey::new(&sport_key, &team), rating)
            })
            .collect();

        debug!(count = ratings.len(), "Ratings loaded");
        Ok(ratings)
    }

    /// Picks stored for `run_date`, best EV first.
    pub async fn load_picks(&self, run_date: NaiveDate) -> Result<Vec<StoredPick>> {
        let rows = sqlx::query(
            r#"
            SELECT run_date, ts, event_id, market, selection, odds, p_model, ev
            FROM picks
            WHERE run_date = ?
            ORDER BY ev DESC, event_id ASC
            "#,
        )
        .bind(run_date.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to load picks")?;

        rows.iter()
            .map(|row| -> Result<StoredPick> {
                let ts: String = row.get("ts");
                let ts = DateTime::parse_from_rfc3339(&ts)
                    .map_err(|e| ValueBotError::Storage(format!("bad pick timestamp {ts}: {e}")))?
                    .with_timezone(&Utc);
                Ok(StoredPick {
                    run_date,
                    ts,
                    event_id: row.get("event_id"),
                    market: row.get("market"),
                    selection: row.get("selection"),
                    odds: row.get("odds"),
                    p_model: row.get("p_model"),
                    ev: row.get("ev"),
                })
            })
            .collect()
    }

    /// Row count of a table. Used by diagnostics and tests.
    pub async fn count(&self, table: Table) -> Result<i64> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {}", table.as_str()))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}

/// Tables that can be counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Events,
    Odds,
    Predictions,
    Picks,
    Ratings,
}

impl Table {
    fn as_str(self) -> &'static str {
        match self {
            Table::Events => "events",
            Table::Odds => "odds",
            Table::Predictions => "predictions",
            Table::Picks => "picks",
            Table::Ratings => "ratings",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MARKET_H2H, SELECTION_AWAY, SELECTION_HOME};

    fn temp_path() -> String {
        let mut p = std::env::temp_dir();
        p.push(format!("valuebot_test_{}.sqlite", uuid::Uuid::new_v4()));
        p.to_string_lossy().into_owned()
    }

    fn candidate(event: &Event, selection: &str, odds: f64, p: f64) -> Candidate {
        Candidate {
            event: event.clone(),
            market: MARKET_H2H.into(),
            selection: selection.into(),
            odds,
            p_model: p,
            bookmaker: "bk".into(),
        }
    }

    fn odd(event_id: &str, selection: &str, price: f64, ts: DateTime<Utc>) -> MarketOdd {
        MarketOdd {
            event_id: event_id.into(),
            market: MARKET_H2H.into(),
            selection: selection.into(),
            odds: price,
            bookmaker: "bk".into(),
            last_update: ts,
        }
    }

    #[tokio::test]
    async fn test_connect_creates_file() {
        let path = temp_path();
        {
            let store = Storage::connect(&path).await.unwrap();
            assert_eq!(store.count(Table::Events).await.unwrap(), 0);
        }
        assert!(std::path::Path::new(&path).exists());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_upsert_events_replaces() {
        let store = Storage::in_memory().await.unwrap();
        let mut e = Event::sample("e1", "A", "B");
        store.upsert_events(&[e.clone()]).await.unwrap();
        e.league = Some("NCAA".into());
        store.upsert_events(&[e]).await.unwrap();
        assert_eq!(store.count(Table::Events).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_odds_ignores_duplicates() {
        let store = Storage::in_memory().await.unwrap();
        let ts = Utc::now();
        let odds = vec![odd("e1", SELECTION_HOME, 1.9, ts), odd("e1", SELECTION_AWAY, 2.0, ts)];
        store.insert_odds(&odds).await.unwrap();
        store.insert_odds(&odds).await.unwrap();
        assert_eq!(store.count(Table::Odds).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_predictions_and_picks_round_trip() {
        let store = Storage::in_memory().await.unwrap();
        let e1 = Event::sample("e1", "A", "B");
        let e2 = Event::sample("e2", "C", "D");
        let cands = vec![
            candidate(&e1, SELECTION_HOME, 2.0, 0.55),
            candidate(&e2, SELECTION_AWAY, 3.0, 0.40),
        ];
        let ts = Utc::now();
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();

        store.insert_predictions(ts, &cands).await.unwrap();
        assert_eq!(store.count(Table::Predictions).await.unwrap(), 2);

        store.save_picks(date, ts, &cands).await.unwrap();
        store.save_picks(date, ts, &cands).await.unwrap();
        let picks = store.load_picks(date).await.unwrap();
        assert_eq!(picks.len(), 2);
        // e2 EV 0.20 before e1 EV 0.10
        assert_eq!(picks[0].event_id, "e2");
        assert!((picks[0].ev - 0.20).abs() < 1e-12);
        assert_eq!(picks[1].selection, "HOME");
        assert_eq!(picks[1].run_date, date);

        let other = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        assert!(store.load_picks(other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ratings_round_trip() {
        let path = temp_path();
        {
            let store = Storage::connect(&path).await.unwrap();
            let mut ratings = InMemoryRatings::new();
            ratings.set("basketball_ncaab", "Duke", 1620.0);
            ratings.set("basketball_ncaab", "UNC", 1580.5);
            store.save_ratings(&ratings).await.unwrap();

            ratings.set("basketball_ncaab", "Duke", 1630.0);
            store.save_ratings(&ratings).await.unwrap();
        }

        let store = Storage::connect(&path).await.unwrap();
        let loaded = store.load_ratings().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("basketball_ncaab", "Duke"), Some(1630.0));
        assert_eq!(loaded.get("basketball_ncaab", "UNC"), Some(1580.5));
        assert_eq!(loaded.get("soccer_epl", "Duke"), None);
        let _ = std::fs::remove_file(&path);
    }
}
