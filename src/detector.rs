//! Discrepancy detection over matched market pairs.
//!
//! This is a scouting tool, not an execution engine: spreads are headline
//! numbers net of flat per-venue fees, with no slippage or depth modeling.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::matching::MatchedPair;

/// Flat per-venue fee rates applied to candidate spreads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Polymarket taker fee (2%)
    pub polymarket: f64,
    /// Kalshi trading fee (1%)
    pub kalshi: f64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            polymarket: 0.02,
            kalshi: 0.01,
        }
    }
}

/// How a candidate discrepancy would theoretically be played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Buy Polymarket YES + buy Kalshi NO; both legs cost < $1 combined.
    BuyPolymarketYesKalshiNo,
    /// Buy Polymarket NO + buy Kalshi YES; both legs cost < $1 combined.
    BuyPolymarketNoKalshiYes,
    /// YES is cheaper on Polymarket than on Kalshi.
    BuyPolymarketYesSpread,
    /// YES is cheaper on Kalshi than on Polymarket.
    BuyKalshiYesSpread,
}

impl Strategy {
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::BuyPolymarketYesKalshiNo => "Buy Polymarket YES + Buy Kalshi NO",
            Strategy::BuyPolymarketNoKalshiYes => "Buy Polymarket NO + Buy Kalshi YES",
            Strategy::BuyPolymarketYesSpread => "Buy Polymarket YES vs Kalshi YES (spread)",
            Strategy::BuyKalshiYesSpread => "Buy Kalshi YES vs Polymarket YES (spread)",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Buy Polymarket YES + Buy Kalshi NO" => Some(Strategy::BuyPolymarketYesKalshiNo),
            "Buy Polymarket NO + Buy Kalshi YES" => Some(Strategy::BuyPolymarketNoKalshiYes),
            "Buy Polymarket YES vs Kalshi YES (spread)" => Some(Strategy::BuyPolymarketYesSpread),
            "Buy Kalshi YES vs Polymarket YES (spread)" => Some(Strategy::BuyKalshiYesSpread),
            _ => None,
        }
    }
}

impl Serialize for Strategy {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Strategy {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Strategy::from_label(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown strategy '{s}'")))
    }
}

/// A ranked candidate discrepancy, written once to CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrageCandidate {
    pub rank: usize,
    pub event: String,
    pub strategy: Strategy,
    pub similarity: f64,
    pub polymarket_yes: f64,
    pub polymarket_no: f64,
    pub kalshi_yes: f64,
    pub kalshi_no: f64,
    /// Headline spread before fees
    pub raw_spread: f64,
    /// Headline spread net of flat per-venue fees; always <= raw_spread
    pub fee_adjusted_spread: f64,
    pub polymarket_fee: f64,
    pub kalshi_fee: f64,
}

/// Evaluate one matched pair against all strategies.
///
/// Pairs with any of the four prices missing or outside (0.0, 1.0] dollars
/// are skipped entirely. Each emitted candidate has a strictly positive
/// fee-adjusted spread.
fn evaluate_pair(pair: &MatchedPair, fees: &FeeSchedule) -> Vec<ArbitrageCandidate> {
    let poly_yes = pair.polymarket.yes_price;
    let poly_no = pair.polymarket.no_price;
    let kalshi_yes = pair.kalshi.yes_price;
    let kalshi_no = pair.kalshi.no_price;

    let usable = |p: f64| p > 0.0 && p <= 1.0;
    if !(usable(poly_yes) && usable(poly_no) && usable(kalshi_yes) && usable(kalshi_no)) {
        debug!(event = %pair.polymarket.title, "Prices missing or out of range, skipping pair");
        return Vec::new();
    }

    let candidate = |strategy: Strategy, raw_spread: f64, fee_adjusted_spread: f64| {
        ArbitrageCandidate {
            rank: 0,
            event: pair.polymarket.title.clone(),
            strategy,
            similarity: pair.similarity,
            polymarket_yes: poly_yes,
            polymarket_no: poly_no,
            kalshi_yes,
            kalshi_no,
            raw_spread,
            fee_adjusted_spread,
            polymarket_fee: fees.polymarket,
            kalshi_fee: fees.kalshi,
        }
    };

    let mut out = Vec::new();

    // Cross-outcome "sum to $1" checks: both legs pay $1 at settlement
    // whichever way the market resolves, so a combined cost under $1 is a
    // theoretical lock.
    let cost_a = poly_yes * (1.0 + fees.polymarket) + kalshi_no * (1.0 + fees.kalshi);
    if cost_a > 0.0 && cost_a < 1.0 {
        out.push(candidate(
            Strategy::BuyPolymarketYesKalshiNo,
            1.0 - (poly_yes + kalshi_no),
            1.0 - cost_a,
        ));
    }

    let cost_b = poly_no * (1.0 + fees.polymarket) + kalshi_yes * (1.0 + fees.kalshi);
    if cost_b > 0.0 && cost_b < 1.0 {
        out.push(candidate(
            Strategy::BuyPolymarketNoKalshiYes,
            1.0 - (poly_no + kalshi_yes),
            1.0 - cost_b,
        ));
    }

    // Same-outcome YES spread: buy on the cheap venue, offset on the
    // expensive one. Assumes the offset is actually fillable, which the
    // report flags as a risk.
    let raw_spread = (poly_yes - kalshi_yes).abs();
    let (buy, sell, strategy) = if poly_yes < kalshi_yes {
        (poly_yes, kalshi_yes, Strategy::BuyPolymarketYesSpread)
    } else {
        (kalshi_yes, poly_yes, Strategy::BuyKalshiYesSpread)
    };
    let (buy_fee, sell_fee) = match strategy {
        Strategy::BuyPolymarketYesSpread => (fees.polymarket, fees.kalshi),
        _ => (fees.kalshi, fees.polymarket),
    };
    let fee_adjusted = raw_spread - buy * buy_fee - sell * sell_fee;
    if fee_adjusted > 0.0 {
        out.push(candidate(strategy, raw_spread, fee_adjusted));
    }

    out
}

/// Detect and rank candidate discrepancies across all matched pairs.
///
/// Ranked by raw headline spread descending; ties broken by fee-adjusted
/// spread descending, then event title. Empty input yields an empty list.
pub fn detect(pairs: &[MatchedPair], fees: &FeeSchedule) -> Vec<ArbitrageCandidate> {
    let mut candidates: Vec<ArbitrageCandidate> = pairs
        .iter()
        .flat_map(|pair| evaluate_pair(pair, fees))
        .collect();

    candidates.sort_by(|a, b| {
        b.raw_spread
            .partial_cmp(&a.raw_spread)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.fee_adjusted_spread
                    .partial_cmp(&a.fee_adjusted_spread)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.event.cmp(&b.event))
    });

    for (i, candidate) in candidates.iter_mut().enumerate() {
        candidate.rank = i + 1;
    }

    info!(
        "Detected {} candidate discrepancies from {} matched pairs",
        candidates.len(),
        pairs.len()
    );
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MarketQuote, Platform};
    use chrono::Utc;

    fn pair(poly_yes: f64, poly_no: f64, kalshi_yes: f64, kalshi_no: f64) -> MatchedPair {
        let quote = |platform, id: &str, yes, no| MarketQuote {
            platform,
            market_id: id.to_string(),
            title: "Will the Fed cut rates?".to_string(),
            yes_price: yes,
            no_price: no,
            volume: 0.0,
            book: None,
            fetched_at: Utc::now(),
        };
        MatchedPair {
            polymarket: quote(Platform::Polymarket, "0xabc", poly_yes, poly_no),
            kalshi: quote(Platform::Kalshi, "FED-24DEC", kalshi_yes, kalshi_no),
            similarity: 1.0,
        }
    }

    #[test]
    fn empty_input_yields_no_candidates() {
        assert!(detect(&[], &FeeSchedule::default()).is_empty());
    }

    #[test]
    fn missing_prices_skip_the_pair() {
        let candidates = detect(&[pair(0.6, 0.0, 0.5, 0.5)], &FeeSchedule::default());
        assert!(candidates.is_empty());
    }

    #[test]
    fn out_of_range_prices_skip_the_pair() {
        // A drifted upstream value must not fabricate a $1+ spread on a
        // binary contract.
        let candidates = detect(&[pair(1.5, 0.40, 0.55, 0.45)], &FeeSchedule::default());
        assert!(candidates.is_empty());

        let candidates = detect(&[pair(0.40, 0.60, 0.55, 1.2)], &FeeSchedule::default());
        assert!(candidates.is_empty());
    }

    #[test]
    fn sum_to_one_lock_is_detected() {
        // Poly YES 0.40 + Kalshi NO 0.45 = 0.85 before fees, still < 1 after.
        let candidates = detect(&[pair(0.40, 0.60, 0.55, 0.45)], &FeeSchedule::default());

        let lock = candidates
            .iter()
            .find(|c| c.strategy == Strategy::BuyPolymarketYesKalshiNo)
            .expect("expected sum-to-one candidate");

        assert!((lock.raw_spread - 0.15).abs() < 1e-9);
        assert!(lock.fee_adjusted_spread < lock.raw_spread);
        assert!(lock.fee_adjusted_spread > 0.0);
    }

    #[test]
    fn yes_spread_direction_follows_cheaper_venue() {
        let candidates = detect(&[pair(0.50, 0.50, 0.62, 0.38)], &FeeSchedule::default());

        let spread = candidates
            .iter()
            .find(|c| c.strategy == Strategy::BuyPolymarketYesSpread)
            .expect("expected YES spread candidate");

        assert!((spread.raw_spread - 0.12).abs() < 1e-9);
        // 0.12 - 0.50 * 0.02 - 0.62 * 0.01
        assert!((spread.fee_adjusted_spread - 0.1038).abs() < 1e-9);
    }

    #[test]
    fn spreads_inside_the_fee_band_are_dropped() {
        // 1 cent apart: fees eat the whole spread.
        let candidates = detect(&[pair(0.50, 0.50, 0.51, 0.49)], &FeeSchedule::default());
        assert!(candidates
            .iter()
            .all(|c| !matches!(
                c.strategy,
                Strategy::BuyPolymarketYesSpread | Strategy::BuyKalshiYesSpread
            )));
    }

    #[test]
    fn fee_adjusted_never_exceeds_raw() {
        let inputs = [
            pair(0.40, 0.60, 0.55, 0.45),
            pair(0.50, 0.50, 0.62, 0.38),
            pair(0.30, 0.70, 0.45, 0.55),
            pair(0.80, 0.20, 0.60, 0.40),
        ];
        for candidate in detect(&inputs, &FeeSchedule::default()) {
            assert!(
                candidate.fee_adjusted_spread <= candidate.raw_spread,
                "{:?}",
                candidate
            );
        }
    }

    #[test]
    fn candidates_rank_by_raw_spread_descending() {
        let candidates = detect(
            &[pair(0.50, 0.50, 0.62, 0.38), pair(0.30, 0.70, 0.60, 0.40)],
            &FeeSchedule::default(),
        );

        assert!(!candidates.is_empty());
        for window in candidates.windows(2) {
            assert!(window[0].raw_spread >= window[1].raw_spread);
        }
        for (i, candidate) in candidates.iter().enumerate() {
            assert_eq!(candidate.rank, i + 1);
        }
    }

    #[test]
    fn strategy_labels_round_trip() {
        for strategy in [
            Strategy::BuyPolymarketYesKalshiNo,
            Strategy::BuyPolymarketNoKalshiYes,
            Strategy::BuyPolymarketYesSpread,
            Strategy::BuyKalshiYesSpread,
        ] {
            assert_eq!(Strategy::from_label(strategy.label()), Some(strategy));
        }
    }
}
