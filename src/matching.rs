//! Cross-platform market matching.
//!
//! Titles are normalized, scored with the Ratcliff/Obershelp ratio, and
//! paired by greedy one-to-one assignment. Tie-break on equal scores:
//! lower Polymarket id first, then lower Kalshi id. Deterministic for
//! identical snapshots and threshold.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::MarketQuote;

/// A Polymarket/Kalshi pair whose titles scored at or above the threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedPair {
    pub polymarket: MarketQuote,
    pub kalshi: MarketQuote,
    pub similarity: f64,
}

/// Normalize a market title for comparison: lowercase, trim, strip the
/// punctuation that differs between venue styles.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .trim()
        .chars()
        .filter(|c| !matches!(c, '?' | '!' | '.' | ','))
        .collect()
}

/// Longest matching block between `a` and `b`, as (start_a, start_b, len).
/// On equal lengths the earliest block in `a`, then in `b`, wins.
fn longest_match(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut run_ending_at: HashMap<usize, usize> = HashMap::new();

    for (i, ca) in a.iter().enumerate() {
        let mut next_runs = HashMap::new();
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                let len = if j > 0 {
                    run_ending_at.get(&(j - 1)).copied().unwrap_or(0) + 1
                } else {
                    1
                };
                next_runs.insert(j, len);
                if len > best.2 {
                    best = (i + 1 - len, j + 1 - len, len);
                }
            }
        }
        run_ending_at = next_runs;
    }

    best
}

/// Ratcliff/Obershelp similarity: `2 * M / (len_a + len_b)` where M is the
/// total length of matched characters over recursive longest-common-block
/// decomposition. Identical strings score exactly 1.0.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let mut matched = 0usize;
    let mut regions = vec![(0, a.len(), 0, b.len())];

    while let Some((a_lo, a_hi, b_lo, b_hi)) = regions.pop() {
        let (i, j, len) = longest_match(&a[a_lo..a_hi], &b[b_lo..b_hi]);
        if len == 0 {
            continue;
        }
        matched += len;
        regions.push((a_lo, a_lo + i, b_lo, b_lo + j));
        regions.push((a_lo + i + len, a_hi, b_lo + j + len, b_hi));
    }

    2.0 * matched as f64 / total as f64
}

/// Pair markets across platforms by title similarity.
///
/// Every cross-platform pair is scored; pairs at or above `threshold` are
/// sorted by score descending (ties: Polymarket id, then Kalshi id
/// ascending) and assigned greedily so each market is used at most once.
pub fn match_markets(
    polymarket: &[MarketQuote],
    kalshi: &[MarketQuote],
    threshold: f64,
) -> Vec<MatchedPair> {
    struct ScoredPair {
        poly_idx: usize,
        kalshi_idx: usize,
        score: f64,
    }

    let poly_titles: Vec<String> = polymarket.iter().map(|q| normalize_title(&q.title)).collect();
    let kalshi_titles: Vec<String> = kalshi.iter().map(|q| normalize_title(&q.title)).collect();

    let mut scored = Vec::new();
    for (pi, poly_title) in poly_titles.iter().enumerate() {
        if poly_title.is_empty() {
            continue;
        }
        for (ki, kalshi_title) in kalshi_titles.iter().enumerate() {
            if kalshi_title.is_empty() {
                continue;
            }
            let score = sequence_ratio(poly_title, kalshi_title);
            if score >= threshold {
                scored.push(ScoredPair {
                    poly_idx: pi,
                    kalshi_idx: ki,
                    score,
                });
            }
        }
    }

    scored.sort_by(|x, y| {
        y.score
            .partial_cmp(&x.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                polymarket[x.poly_idx]
                    .market_id
                    .cmp(&polymarket[y.poly_idx].market_id)
            })
            .then_with(|| kalshi[x.kalshi_idx].market_id.cmp(&kalshi[y.kalshi_idx].market_id))
    });

    let mut used_poly = HashSet::new();
    let mut used_kalshi = HashSet::new();
    let mut pairs = Vec::new();

    for sp in scored {
        if used_poly.contains(&sp.poly_idx) || used_kalshi.contains(&sp.kalshi_idx) {
            continue;
        }
        used_poly.insert(sp.poly_idx);
        used_kalshi.insert(sp.kalshi_idx);
        debug!(
            polymarket = %polymarket[sp.poly_idx].market_id,
            kalshi = %kalshi[sp.kalshi_idx].market_id,
            score = sp.score,
            "Matched markets"
        );
        pairs.push(MatchedPair {
            polymarket: polymarket[sp.poly_idx].clone(),
            kalshi: kalshi[sp.kalshi_idx].clone(),
            similarity: sp.score,
        });
    }

    pairs
}
