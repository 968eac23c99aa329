use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trading venues covered by the scout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Polymarket,
    Kalshi,
}

impl Platform {
    pub fn as_str(&self) -> &str {
        match self {
            Platform::Polymarket => "Polymarket",
            Platform::Kalshi => "Kalshi",
        }
    }
}

/// Bid/ask levels for both contract sides, in dollars.
///
/// Only Kalshi exposes a quote ladder through the public markets listing;
/// Polymarket quotes carry `None` here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteBook {
    pub yes_bid: f64,
    pub yes_ask: f64,
    pub no_bid: f64,
    pub no_ask: f64,
}

/// A single market price observation, immutable once fetched.
///
/// Prices are dollars in [0.0, 1.0]. A side with no usable quote is 0.0 and
/// the detector skips the market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketQuote {
    pub platform: Platform,
    pub market_id: String,
    pub title: String,
    pub yes_price: f64,
    pub no_price: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book: Option<QuoteBook>,
    pub fetched_at: DateTime<Utc>,
}

/// One platform's quotes for a single run, serialized to a flat JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub platform: Platform,
    pub fetched_at: DateTime<Utc>,
    pub quotes: Vec<MarketQuote>,
}

impl Snapshot {
    pub fn new(platform: Platform, quotes: Vec<MarketQuote>) -> Self {
        Self {
            platform,
            fetched_at: Utc::now(),
            quotes,
        }
    }

    /// Write the snapshot as pretty JSON, overwriting any previous run.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serialize snapshot")?;
        std::fs::write(path, json)
            .with_context(|| format!("write snapshot to {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read snapshot from {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("parse snapshot {}", path.display()))
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub polymarket_base_url: String,
    pub kalshi_base_url: String,
    pub polymarket_fetch_limit: usize,
    pub kalshi_fetch_limit: usize,
    pub match_threshold: f64,
    pub polymarket_fee: f64,
    pub kalshi_fee: f64,
    pub polymarket_snapshot: String,
    pub kalshi_snapshot: String,
    pub candidates_csv: String,
    pub report_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let polymarket_base_url = std::env::var("POLYMARKET_BASE_URL")
            .unwrap_or_else(|_| "https://clob.polymarket.com".to_string())
            .trim_end_matches('/')
            .to_string();

        let kalshi_base_url = std::env::var("KALSHI_BASE_URL")
            .unwrap_or_else(|_| "https://api.elections.kalshi.com/trade-api/v2".to_string())
            .trim_end_matches('/')
            .to_string();

        let polymarket_fetch_limit = std::env::var("POLYMARKET_FETCH_LIMIT")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);

        let kalshi_fetch_limit = std::env::var("KALSHI_FETCH_LIMIT")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);

        let match_threshold = std::env::var("MATCH_THRESHOLD")
            .unwrap_or_else(|_| "0.70".to_string())
            .parse()
            .unwrap_or(0.70);

        let polymarket_fee = std::env::var("POLYMARKET_FEE")
            .unwrap_or_else(|_| "0.02".to_string())
            .parse()
            .unwrap_or(0.02);

        let kalshi_fee = std::env::var("KALSHI_FEE")
            .unwrap_or_else(|_| "0.01".to_string())
            .parse()
            .unwrap_or(0.01);

        let polymarket_snapshot = std::env::var("POLYMARKET_SNAPSHOT")
            .unwrap_or_else(|_| "polymarket_data.json".to_string());

        let kalshi_snapshot =
            std::env::var("KALSHI_SNAPSHOT").unwrap_or_else(|_| "kalshi_data.json".to_string());

        let candidates_csv = std::env::var("CANDIDATES_CSV")
            .unwrap_or_else(|_| "arbitrage_opportunities.csv".to_string());

        let report_path =
            std::env::var("REPORT_PATH").unwrap_or_else(|_| "arbitrage_report.md".to_string());

        Ok(Self {
            polymarket_base_url,
            kalshi_base_url,
            polymarket_fetch_limit,
            kalshi_fetch_limit,
            match_threshold,
            polymarket_fee,
            kalshi_fee,
            polymarket_snapshot,
            kalshi_snapshot,
            candidates_csv,
            report_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");

        let snapshot = Snapshot::new(
            Platform::Kalshi,
            vec![MarketQuote {
                platform: Platform::Kalshi,
                market_id: "FED-24DEC".to_string(),
                title: "Will the Fed cut rates in December?".to_string(),
                yes_price: 0.62,
                no_price: 0.39,
                volume: 12000.0,
                book: Some(QuoteBook {
                    yes_bid: 0.61,
                    yes_ask: 0.63,
                    no_bid: 0.38,
                    no_ask: 0.40,
                }),
                fetched_at: Utc::now(),
            }],
        );

        snapshot.save(&path).unwrap();
        let loaded = Snapshot::load(&path).unwrap();

        assert_eq!(loaded.platform, Platform::Kalshi);
        assert_eq!(loaded.quotes.len(), 1);
        assert_eq!(loaded.quotes[0].market_id, "FED-24DEC");
        assert!((loaded.quotes[0].yes_price - 0.62).abs() < 1e-9);
        assert!(loaded.quotes[0].book.is_some());
    }

    #[test]
    fn platform_labels_match_venue_names() {
        assert_eq!(Platform::Polymarket.as_str(), "Polymarket");
        assert_eq!(Platform::Kalshi.as_str(), "Kalshi");
    }

    #[test]
    fn missing_snapshot_is_an_error() {
        assert!(Snapshot::load(Path::new("/nonexistent/snap.json")).is_err());
    }
}
