//! Candidate building.
//!
//! Joins raw market odds to their events and prices each qualifying
//! selection with the rating model.

use std::collections::HashMap;

use tracing::debug;

use crate::model::{EloModel, RatingStore};
use crate::types::{
    Candidate, Event, MarketOdd, MARKET_H2H, SELECTION_AWAY, SELECTION_HOME,
};

/// Build one scored candidate per qualifying odd, in input order.
///
/// Odds whose event is unknown are orphans and are dropped. Only h2h
/// HOME/AWAY selections are in scope; everything else is passed over.
/// No deduplication across bookmakers.
pub fn build_candidates<S: RatingStore>(
    events: &[Event],
    odds: &[MarketOdd],
    model: &EloModel<S>,
) -> Vec<Candidate> {
    let by_id: HashMap<&str, &Event> = events.iter().map(|e| (e.id.as_str(), e)).collect();

    let mut out = Vec::with_capacity(odds.len());
    let mut orphaned = 0usize;
    let mut out_of_scope = 0usize;

    for odd in odds {
        let Some(event) = by_id.get(odd.event_id.as_str()) else {
            orphaned += 1;
            continue;
        };

        if odd.market != MARKET_H2H {
            out_of_scope += 1;
            continue;
        }

        let p_home = model.p_home_win(event);
        let p_model = match odd.selection.as_str() {
            SELECTION_HOME => p_home,
            SELECTION_AWAY => 1.0 - p_home,
            _ => {
                out_of_scope += 1;
                continue;
            }
        };

        out.push(Candidate {
            event: (*event).clone(),
            market: odd.market.clone(),
            selection: odd.selection.clone(),
            odds: odd.odds,
            p_model,
            bookmaker: odd.bookmaker.clone(),
        });
    }

    debug!(
        events = events.len(),
        odds = odds.len(),
        candidates = out.len(),
        orphaned,
        out_of_scope,
        "Candidates built"
    );

    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
