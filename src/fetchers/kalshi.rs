//! Kalshi Trade API v2 market data fetcher (public endpoints).
//!
//! Kalshi quotes arrive in integer cents [0, 100] and are normalized to
//! dollars. A mid price is only derived when both bid and ask are nonzero;
//! otherwise that side is 0.0 and the detector skips the market.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

use crate::fetchers::ApiClient;
use crate::models::{MarketQuote, Platform, QuoteBook, Snapshot};

/// Kalshi rate limits aggressively; stay well under the documented budget
const REQUESTS_PER_10S: u32 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct KalshiMarket {
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub yes_bid: Option<i64>,
    #[serde(default)]
    pub yes_ask: Option<i64>,
    #[serde(default)]
    pub no_bid: Option<i64>,
    #[serde(default)]
    pub no_ask: Option<i64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub open_interest: Option<f64>,
    #[serde(default)]
    pub close_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MarketsResponse {
    #[serde(default)]
    markets: Vec<KalshiMarket>,
}

/// Convert a cents quote to dollars, rejecting values outside [0, 100].
fn cents_to_dollars(cents: Option<i64>, ticker: &str, field: &str) -> Result<f64> {
    let cents = cents.unwrap_or(0);
    if !(0..=100).contains(&cents) {
        bail!("{ticker}: {field} = {cents} outside valid cents range [0, 100]");
    }
    Ok(cents as f64 / 100.0)
}

/// Mid price, only when both sides of the book are quoted.
fn mid(bid: f64, ask: f64) -> f64 {
    if bid > 0.0 && ask > 0.0 {
        (bid + ask) / 2.0
    } else {
        0.0
    }
}

pub struct KalshiFetcher {
    client: ApiClient,
    base_url: String,
}

impl KalshiFetcher {
    pub fn new(base_url: String) -> Result<Self> {
        Ok(Self {
            client: ApiClient::new(REQUESTS_PER_10S)?,
            base_url,
        })
    }

    /// Fetch open markets from the public listing endpoint.
    pub async fn fetch_markets(&mut self, limit: usize) -> Result<Vec<KalshiMarket>> {
        let url = format!("{}/markets", self.base_url);
        let response = self
            .client
            .get_with_retry(
                &url,
                &[
                    ("status", "open".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await
            .context("fetch Kalshi markets")?;

        let payload: MarketsResponse = response
            .json()
            .await
            .context("parse Kalshi markets response")?;

        info!("Fetched {} markets from Kalshi", payload.markets.len());
        Ok(payload.markets)
    }

    /// Fetch and normalize a full snapshot. Out-of-range cents abort the run.
    pub async fn fetch_snapshot(&mut self, limit: usize) -> Result<Snapshot> {
        let markets = self.fetch_markets(limit).await?;
        let fetched_at = Utc::now();
        let mut quotes = Vec::new();

        for market in markets {
            let Some(ticker) = market.ticker.clone() else {
                debug!("Skipping market without ticker");
                continue;
            };

            let quote = normalize_market(&market, &ticker, fetched_at)?;
            quotes.push(quote);
        }

        info!("Normalized {} Kalshi quotes", quotes.len());
        Ok(Snapshot::new(Platform::Kalshi, quotes))
    }
}

fn normalize_market(
    market: &KalshiMarket,
    ticker: &str,
    fetched_at: chrono::DateTime<Utc>,
) -> Result<MarketQuote> {
    let yes_bid = cents_to_dollars(market.yes_bid, ticker, "yes_bid")?;
    let yes_ask = cents_to_dollars(market.yes_ask, ticker, "yes_ask")?;
    let no_bid = cents_to_dollars(market.no_bid, ticker, "no_bid")?;
    let no_ask = cents_to_dollars(market.no_ask, ticker, "no_ask")?;

    Ok(MarketQuote {
        platform: Platform::Kalshi,
        market_id: ticker.to_string(),
        title: market.title.clone().unwrap_or_else(|| "Unknown".to_string()),
        yes_price: mid(yes_bid, yes_ask),
        no_price: mid(no_bid, no_ask),
        volume: market.volume.unwrap_or(0.0),
        book: Some(QuoteBook {
            yes_bid,
            yes_ask,
            no_bid,
            no_ask,
        }),
        fetched_at,
    })
}
