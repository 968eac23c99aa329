//! Polymarket CLOB market data fetcher (public endpoints).
//!
//! Endpoint shapes drift; deserialization is deliberately tolerant and the
//! listing payload may be either a bare array or `{"markets": [...]}`.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::Deserializer;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::fetchers::ApiClient;
use crate::models::{MarketQuote, Platform, Snapshot};

/// Conservative share of the CLOB budget (750/10s documented)
const REQUESTS_PER_10S: u32 = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct ClobMarket {
    #[serde(rename = "conditionId", alias = "condition_id", default)]
    pub condition_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default, deserialize_with = "de_f64_opt")]
    pub volume: Option<f64>,
}

/// Some deployments return `{"markets": [...]}`, others a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MarketsPayload {
    Wrapped { markets: Vec<ClobMarket> },
    Bare(Vec<ClobMarket>),
}

impl MarketsPayload {
    fn into_markets(self) -> Vec<ClobMarket> {
        match self {
            MarketsPayload::Wrapped { markets } => markets,
            MarketsPayload::Bare(markets) => markets,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PricesPayload {
    #[serde(default, deserialize_with = "de_f64_opt")]
    yes: Option<f64>,
    #[serde(default, deserialize_with = "de_f64_opt")]
    no: Option<f64>,
}

/// Numbers sometimes arrive as JSON strings (e.g. "0.62").
fn de_f64_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    match v {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) => {
            if s.is_empty() {
                Ok(None)
            } else {
                s.parse::<f64>().map(Some).map_err(serde::de::Error::custom)
            }
        }
        _ => Ok(None),
    }
}

/// Validate a dollar price against the binary contract range [0.0, 1.0].
fn validate_price(value: f64, condition_id: &str, field: &str) -> Result<f64> {
    if !(0.0..=1.0).contains(&value) {
        bail!("{condition_id}: {field} = {value} outside valid price range [0.0, 1.0]");
    }
    Ok(value)
}

fn normalize_market(
    market: &ClobMarket,
    condition_id: &str,
    yes: f64,
    no: f64,
    fetched_at: DateTime<Utc>,
) -> Result<MarketQuote> {
    Ok(MarketQuote {
        platform: Platform::Polymarket,
        market_id: condition_id.to_string(),
        title: market
            .question
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        yes_price: validate_price(yes, condition_id, "yes")?,
        no_price: validate_price(no, condition_id, "no")?,
        volume: market.volume.unwrap_or(0.0),
        book: None,
        fetched_at,
    })
}

pub struct PolymarketFetcher {
    client: ApiClient,
    base_url: String,
}

impl PolymarketFetcher {
    pub fn new(base_url: String) -> Result<Self> {
        Ok(Self {
            client: ApiClient::new(REQUESTS_PER_10S)?,
            base_url,
        })
    }

    /// Fetch active markets from the CLOB listing endpoint.
    pub async fn fetch_markets(&mut self, limit: usize) -> Result<Vec<ClobMarket>> {
        let url = format!("{}/markets", self.base_url);
        let response = self
            .client
            .get_with_retry(&url, &[("active", "true".to_string())])
            .await
            .context("fetch Polymarket markets")?;

        let payload: MarketsPayload = response
            .json()
            .await
            .context("parse Polymarket markets response")?;

        let mut markets = payload.into_markets();
        markets.truncate(limit);
        info!("Fetched {} markets from Polymarket", markets.len());
        Ok(markets)
    }

    /// Fetch current YES/NO prices for one market/condition.
    pub async fn fetch_prices(&mut self, condition_id: &str) -> Result<Option<(f64, f64)>> {
        let url = format!("{}/prices", self.base_url);
        let response = self
            .client
            .get_with_retry(&url, &[("market", condition_id.to_string())])
            .await
            .with_context(|| format!("fetch Polymarket prices for {condition_id}"))?;

        let payload: PricesPayload = response
            .json()
            .await
            .with_context(|| format!("parse Polymarket prices for {condition_id}"))?;

        match (payload.yes, payload.no) {
            (Some(yes), Some(no)) => Ok(Some((yes, no))),
            _ => Ok(None),
        }
    }

    /// Fetch and normalize a full snapshot.
    ///
    /// The listing request is fatal on failure; a single market whose price
    /// lookup fails or comes back incomplete is skipped with a warning.
    /// A price outside [0.0, 1.0] dollars aborts the run.
    pub async fn fetch_snapshot(&mut self, limit: usize) -> Result<Snapshot> {
        let markets = self.fetch_markets(limit).await?;
        let fetched_at = Utc::now();
        let mut quotes = Vec::new();

        for market in markets {
            let Some(condition_id) = market.condition_id.clone().or_else(|| market.id.clone())
            else {
                debug!("Skipping market without condition id");
                continue;
            };

            let prices = match self.fetch_prices(&condition_id).await {
                Ok(Some(prices)) => prices,
                Ok(None) => {
                    debug!(market = %condition_id, "No usable prices, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(market = %condition_id, "Price lookup failed: {e:#}");
                    continue;
                }
            };

            quotes.push(normalize_market(
                &market,
                &condition_id,
                prices.0,
                prices.1,
                fetched_at,
            )?);
        }

        info!("Normalized {} Polymarket quotes", quotes.len());
        Ok(Snapshot::new(Platform::Polymarket, quotes))
    }
}
