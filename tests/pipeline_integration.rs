//! End-to-end pipeline test over synthetic snapshots.
//!
//! Exercises snapshot load, matching, detection, CSV output and report
//! generation without touching the network.

use std::path::PathBuf;

use chrono::Utc;
use tempfile::TempDir;

use arb_scout::detector::{detect, FeeSchedule};
use arb_scout::matching::match_markets;
use arb_scout::models::{MarketQuote, Platform, QuoteBook, Snapshot};
use arb_scout::report::{generate_report, read_csv, write_csv};

fn polymarket_quote(id: &str, title: &str, yes: f64, no: f64) -> MarketQuote {
    MarketQuote {
        platform: Platform::Polymarket,
        market_id: id.to_string(),
        title: title.to_string(),
        yes_price: yes,
        no_price: no,
        volume: 25000.0,
        book: None,
        fetched_at: Utc::now(),
    }
}

fn kalshi_quote(id: &str, title: &str, yes: f64, no: f64) -> MarketQuote {
    MarketQuote {
        platform: Platform::Kalshi,
        market_id: id.to_string(),
        title: title.to_string(),
        yes_price: yes,
        no_price: no,
        volume: 18000.0,
        book: Some(QuoteBook {
            yes_bid: yes - 0.01,
            yes_ask: yes + 0.01,
            no_bid: no - 0.01,
            no_ask: no + 0.01,
        }),
        fetched_at: Utc::now(),
    }
}

fn save_snapshots(dir: &TempDir) -> (PathBuf, PathBuf) {
    let poly_path = dir.path().join("polymarket_data.json");
    let kalshi_path = dir.path().join("kalshi_data.json");

    let polymarket = Snapshot::new(
        Platform::Polymarket,
        vec![
            polymarket_quote("0x1", "Will the Fed cut rates in December?", 0.40, 0.60),
            polymarket_quote("0x2", "Bitcoin above 100k by March?", 0.55, 0.45),
            polymarket_quote("0x3", "Completely unrelated market title", 0.50, 0.50),
        ],
    );
    let kalshi = Snapshot::new(
        Platform::Kalshi,
        vec![
            kalshi_quote("FED-24DEC", "Will the Fed cut rates in December?", 0.55, 0.45),
            kalshi_quote("BTC-100K", "Bitcoin above 100k by March?", 0.56, 0.44),
        ],
    );

    polymarket.save(&poly_path).unwrap();
    kalshi.save(&kalshi_path).unwrap();
    (poly_path, kalshi_path)
}

#[test]
fn full_pipeline_produces_csv_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let (poly_path, kalshi_path) = save_snapshots(&dir);
    let csv_path = dir.path().join("arbitrage_opportunities.csv");
    let report_path = dir.path().join("arbitrage_report.md");

    let polymarket = Snapshot::load(&poly_path).unwrap();
    let kalshi = Snapshot::load(&kalshi_path).unwrap();

    let pairs = match_markets(&polymarket.quotes, &kalshi.quotes, 0.70);
    assert_eq!(pairs.len(), 2, "both shared markets should pair up");
    assert!(pairs.iter().all(|p| p.similarity >= 0.70));

    let candidates = detect(&pairs, &FeeSchedule::default());
    assert!(!candidates.is_empty());

    // The 15-cent Fed discrepancy must outrank the 1-cent Bitcoin one.
    assert!(candidates[0].event.contains("Fed"));
    for window in candidates.windows(2) {
        assert!(window[0].raw_spread >= window[1].raw_spread);
    }
    for candidate in &candidates {
        assert!(candidate.fee_adjusted_spread <= candidate.raw_spread);
        assert!(candidate.fee_adjusted_spread > 0.0);
    }

    write_csv(&candidates, &csv_path).unwrap();
    let reloaded = read_csv(&csv_path).unwrap();
    assert_eq!(reloaded.len(), candidates.len());
    assert_eq!(reloaded[0].rank, 1);

    let report = generate_report(&csv_path, &report_path).unwrap().unwrap();
    assert!(report.contains("Candidate Arbitrage Opportunities Report"));
    assert!(report.contains(&format!("**Total Candidates Found**: {}", candidates.len())));
    assert!(report_path.exists());
}

#[test]
fn empty_snapshot_side_yields_empty_csv_without_error() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("arbitrage_opportunities.csv");

    let polymarket = Snapshot::new(
        Platform::Polymarket,
        vec![polymarket_quote("0x1", "Will it rain tomorrow?", 0.40, 0.60)],
    );
    let kalshi = Snapshot::new(Platform::Kalshi, vec![]);

    let pairs = match_markets(&polymarket.quotes, &kalshi.quotes, 0.70);
    assert!(pairs.is_empty());

    let candidates = detect(&pairs, &FeeSchedule::default());
    assert!(candidates.is_empty());

    write_csv(&candidates, &csv_path).unwrap();
    assert!(read_csv(&csv_path).unwrap().is_empty());
}

#[test]
fn detection_is_deterministic_for_identical_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let (poly_path, kalshi_path) = save_snapshots(&dir);

    let polymarket = Snapshot::load(&poly_path).unwrap();
    let kalshi = Snapshot::load(&kalshi_path).unwrap();

    let run = || {
        let pairs = match_markets(&polymarket.quotes, &kalshi.quotes, 0.70);
        detect(&pairs, &FeeSchedule::default())
    };

    let first = run();
    let second = run();

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.rank, b.rank);
        assert_eq!(a.event, b.event);
        assert_eq!(a.strategy, b.strategy);
        assert_eq!(a.raw_spread, b.raw_spread);
    }
}
