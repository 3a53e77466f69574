//! Pick selection.
//!
//! Chooses the subset of candidates with the highest total EV such that
//! every member clears `edge_min`, the set has at most `max_plays` members,
//! and the summed decimal odds stay at or below `odds_sum_cap`.
//!
//! Two searches produce the same answer:
//!
//! - **Exhaustive**: every k-combination for k = 1..=max_plays, in
//!   lexicographic input order. `O(sum C(n, k))`, so it is only used while
//!   `max_plays <= EXHAUSTIVE_MAX_PLAYS` and the filtered set has at most
//!   `EXHAUSTIVE_MAX_CANDIDATES` members.
//! - **Branch and bound**: depth-first over the same lexicographic order,
//!   pruning on the odds cap and on an optimistic EV bound. Used beyond
//!   either limit.
//!
//! Ties on total EV go to the smaller set, then to the lexicographically
//! first set by input position.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::types::{Candidate, ValueBotError};

/// Largest `max_plays` searched exhaustively.
pub const EXHAUSTIVE_MAX_PLAYS: usize = 5;

/// Largest filtered candidate count searched exhaustively.
pub const EXHAUSTIVE_MAX_CANDIDATES: usize = 40;

/// Slack on the EV bound so float reordering never prunes an optimum.
const BOUND_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Selection constraints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Advisory floor on the pick count. Never enforced; a shorter result
    /// is logged and returned as is.
    pub min_plays: usize,
    pub max_plays: usize,
    /// Minimum EV for a candidate to enter the search.
    pub edge_min: f64,
    /// Upper bound on the summed decimal odds of the pick set.
    pub odds_sum_cap: f64,
    /// Forbid two picks from the same event.
    pub one_per_event: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_plays: 0,
            max_plays: 3,
            edge_min: 0.02,
            odds_sum_cap: 10.0,
            one_per_event: false,
        }
    }
}

impl SelectionConfig {
    /// Reject contract violations at the boundary.
    pub fn validate(&self) -> Result<(), ValueBotError> {
        if self.max_plays < 1 {
            return Err(ValueBotError::InvalidSelection(
                "max_plays must be at least 1".into(),
            ));
        }
        if self.min_plays > self.max_plays {
            return Err(ValueBotError::InvalidSelection(format!(
                "min_plays ({}) exceeds max_plays ({})",
                self.min_plays, self.max_plays
            )));
        }
        if !self.edge_min.is_finite() {
            return Err(ValueBotError::InvalidSelection("edge_min must be finite".into()));
        }
        if !self.odds_sum_cap.is_finite() {
            return Err(ValueBotError::InvalidSelection(
                "odds_sum_cap must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// Which search to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    Exhaustive,
    BranchAndBound,
}

impl SearchStrategy {
    /// Exhaustive while both size bounds hold.
    pub fn for_size(candidates: usize, max_plays: usize) -> Self {
        if max_plays <= EXHAUSTIVE_MAX_PLAYS && candidates <= EXHAUSTIVE_MAX_CANDIDATES {
            SearchStrategy::Exhaustive
        } else {
            SearchStrategy::BranchAndBound
        }
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Select the EV-maximising pick set, sorted by EV descending.
///
/// Pure and infallible: degenerate inputs give an empty list.
pub fn select_picks(candidates: &[Candidate], config: &SelectionConfig) -> Vec<Candidate> {
    let filtered = filter_candidates(candidates, config.edge_min);
    let strategy = SearchStrategy::for_size(filtered.len(), config.max_plays);
    run_selection(candidates.len(), &filtered, config, strategy)
}

/// Same as [`select_picks`] with an explicit search.
pub fn select_picks_with(
    candidates: &[Candidate],
    config: &SelectionConfig,
    strategy: SearchStrategy,
) -> Vec<Candidate> {
    let filtered = filter_candidates(candidates, config.edge_min);
    run_selection(candidates.len(), &filtered, config, strategy)
}

/// Drop malformed candidates and those below the edge threshold.
fn filter_candidates(candidates: &[Candidate], edge_min: f64) -> Vec<&Candidate> {
    candidates
        .iter()
        .filter(|c| c.is_well_formed() && c.ev() >= edge_min)
        .collect()
}

fn run_selection(
    total: usize,
    filtered: &[&Candidate],
    config: &SelectionConfig,
    strategy: SearchStrategy,
) -> Vec<Candidate> {
    if filtered.is_empty() {
        debug!(candidates = total, "No candidates cleared the edge filter");
        warn_below_min(0, config);
        return Vec::new();
    }

    let items: Vec<Item> = filtered.iter().map(|c| Item::from_candidate(c)).collect();
    let (best, evaluated) = match strategy {
        SearchStrategy::Exhaustive => exhaustive(&items, config),
        SearchStrategy::BranchAndBound => branch_and_bound(&items, config),
    };

    let mut picks: Vec<Candidate> = best
        .map(|b| b.members.iter().map(|&i| filtered[i].clone()).collect())
        .unwrap_or_default();
    picks.sort_by(|a, b| b.ev().partial_cmp(&a.ev()).unwrap_or(Ordering::Equal));

    info!(
        candidates = total,
        filtered = filtered.len(),
        strategy = ?strategy,
        evaluated,
        picks = picks.len(),
        odds_sum = format!("{:.2}", picks.iter().map(|c| c.odds).sum::<f64>()),
        total_ev = format!("{:.4}", picks.iter().map(|c| c.ev()).sum::<f64>()),
        "Selection complete"
    );

    warn_below_min(picks.len(), config);
    picks
}

fn warn_below_min(count: usize, config: &SelectionConfig) {
    if count < config.min_plays {
        warn!(
            picks = count,
            min_plays = config.min_plays,
            "Fewer picks than min_plays; returning the best feasible set"
        );
    }
}

// ---------------------------------------------------------------------------
// Search internals
// ---------------------------------------------------------------------------

/// The numbers the search needs from one candidate.
struct Item<'a> {
    odds: f64,
    ev: f64,
    event_id: &'a str,
}

impl<'a> Item<'a> {
    fn from_candidate(c: &'a Candidate) -> Self {
        Self {
            odds: c.odds,
            ev: c.ev(),
            event_id: &c.event.id,
        }
    }
}

/// Incumbent best set, as positions into the filtered list.
struct Best {
    members: Vec<usize>,
    score: f64,
}

impl Best {
    /// Whether a set with this score and size replaces the incumbent.
    ///
    /// Sets arrive in lexicographic order, so an equal-size tie never wins.
    fn beaten_by(best: &Option<Best>, score: f64, size: usize) -> bool {
        match best {
            None => true,
            Some(b) => score > b.score || (score == b.score && size < b.members.len()),
        }
    }
}

fn shares_event(items: &[Item], members: &[usize], candidate: usize) -> bool {
    members
        .iter()
        .any(|&m| items[m].event_id == items[candidate].event_id)
}

/// Every k-combination for ascending k. Returns the winner and the number of
/// combinations evaluated.
fn exhaustive(items: &[Item], config: &SelectionConfig) -> (Option<Best>, usize) {
    let n = items.len();
    let mut best: Option<Best> = None;
    let mut evaluated = 0usize;

    for k in 1..=config.max_plays.min(n) {
        let mut idx: Vec<usize> = (0..k).collect();
        loop {
            evaluated += 1;
            let distinct = !config.one_per_event
                || idx
                    .iter()
                    .enumerate()
                    .all(|(pos, &i)| !shares_event(items, &idx[..pos], i));

            if distinct {
                let odds_sum: f64 = idx.iter().map(|&i| items[i].odds).sum();
                if odds_sum <= config.odds_sum_cap {
                    let score: f64 = idx.iter().map(|&i| items[i].ev).sum();
                    // Strictly greater: ascending k means a later tie is never smaller
                    if best.as_ref().map_or(true, |b| score > b.score) {
                        best = Some(Best {
                            members: idx.clone(),
                            score,
                        });
                    }
                }
            }

            if !next_combination(&mut idx, n) {
                break;
            }
        }
    }

    (best, evaluated)
}

/// Advance `idx` to the next k-combination of `0..n` in lexicographic order.
fn next_combination(idx: &mut [usize], n: usize) -> bool {
    let k = idx.len();
    for i in (0..k).rev() {
        if idx[i] < n - k + i {
            idx[i] += 1;
            for j in i + 1..k {
                idx[j] = idx[j - 1] + 1;
            }
            return true;
        }
    }
    false
}

/// Depth-first search in lexicographic order with pruning.
fn branch_and_bound(items: &[Item], config: &SelectionConfig) -> (Option<Best>, usize) {
    let slots = config.max_plays.min(items.len());
    let bounds = SuffixBounds::new(items, slots);
    let mut search = Search {
        items,
        config,
        bounds,
        best: None,
        evaluated: 0,
        members: Vec::with_capacity(slots),
        slots,
    };
    search.descend(0, 0.0, 0.0);
    (search.best, search.evaluated)
}

struct Search<'a, 'b> {
    items: &'a [Item<'b>],
    config: &'a SelectionConfig,
    bounds: SuffixBounds,
    best: Option<Best>,
    evaluated: usize,
    members: Vec<usize>,
    slots: usize,
}

impl Search<'_, '_> {
    fn descend(&mut self, start: usize, odds_sum: f64, score: f64) {
        let remaining = self.slots - self.members.len();
        if remaining == 0 {
            return;
        }

        for j in start..self.items.len() {
            // Optimistic: current prefix plus the best EVs still reachable
            if let Some(b) = &self.best {
                let bound = score + self.bounds.top_sum(j, remaining);
                if bound + BOUND_EPSILON < b.score {
                    return;
                }
            }

            let item = &self.items[j];
            let next_odds = if self.members.is_empty() { item.odds } else { odds_sum + item.odds };
            if next_odds > self.config.odds_sum_cap {
                continue;
            }
            if self.config.one_per_event && shares_event(self.items, &self.members, j) {
                continue;
            }

            let next_score = if self.members.is_empty() { item.ev } else { score + item.ev };
            self.members.push(j);
            self.evaluated += 1;

            if Best::beaten_by(&self.best, next_score, self.members.len()) {
                self.best = Some(Best {
                    members: self.members.clone(),
                    score: next_score,
                });
            }

            self.descend(j + 1, next_odds, next_score);
            self.members.pop();
        }
    }
}

/// For each suffix `j..n`, prefix sums of its largest positive EVs
/// (at most `slots` of them).
struct SuffixBounds {
    sums: Vec<Vec<f64>>,
}

impl SuffixBounds {
    fn new(items: &[Item], slots: usize) -> Self {
        let n = items.len();
        let mut sums = vec![Vec::new(); n + 1];
        let mut top: Vec<f64> = Vec::with_capacity(slots + 1);

        for j in (0..n).rev() {
            let ev = items[j].ev;
            if ev > 0.0 {
                let pos = top.iter().position(|&t| ev > t).unwrap_or(top.len());
                top.insert(pos, ev);
                top.truncate(slots);
            }
            let mut acc = 0.0;
            sums[j] = top
                .iter()
                .map(|&t| {
                    acc += t;
                    acc
                })
                .collect();
        }

        Self { sums }
    }

    /// Largest EV gain from adding up to `count` items drawn from `j..n`.
    fn top_sum(&self, j: usize, count: usize) -> f64 {
        let s = &self.sums[j];
        match s.len().min(count) {
            0 => 0.0,
            m => s[m - 1],
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
