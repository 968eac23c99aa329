//! arb-scout CLI: four sequential pipeline stages, each independently
//! invocable, plus a `run` command chaining all of them.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arb_scout::detector::{detect, FeeSchedule};
use arb_scout::fetchers::{kalshi::KalshiFetcher, polymarket::PolymarketFetcher};
use arb_scout::matching::match_markets;
use arb_scout::models::{Config, Snapshot};
use arb_scout::report::{generate_report, write_csv};

#[derive(Parser, Debug)]
#[command(name = "arb-scout")]
#[command(about = "Scout candidate price discrepancies between Polymarket and Kalshi")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch active Polymarket markets and write a price snapshot
    FetchPolymarket {
        /// Maximum number of markets to snapshot
        #[arg(long)]
        limit: Option<usize>,
        /// Snapshot output path
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Fetch open Kalshi markets and write a price snapshot
    FetchKalshi {
        /// Maximum number of markets to snapshot
        #[arg(long)]
        limit: Option<usize>,
        /// Snapshot output path
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Match snapshots and rank candidate discrepancies into a CSV
    Detect {
        /// Title similarity threshold (0.0 - 1.0)
        #[arg(long)]
        threshold: Option<f64>,
        /// Polymarket snapshot path
        #[arg(long)]
        polymarket_in: Option<PathBuf>,
        /// Kalshi snapshot path
        #[arg(long)]
        kalshi_in: Option<PathBuf>,
        /// Candidates CSV output path
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Render the markdown report from the candidates CSV
    Report {
        /// Candidates CSV path
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Report output path
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run all four stages in order
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    match Cli::parse().command {
        Command::FetchPolymarket { limit, out } => {
            let limit = limit.unwrap_or(config.polymarket_fetch_limit);
            let out = out.unwrap_or_else(|| PathBuf::from(&config.polymarket_snapshot));
            fetch_polymarket(&config, limit, &out).await?;
        }
        Command::FetchKalshi { limit, out } => {
            let limit = limit.unwrap_or(config.kalshi_fetch_limit);
            let out = out.unwrap_or_else(|| PathBuf::from(&config.kalshi_snapshot));
            fetch_kalshi(&config, limit, &out).await?;
        }
        Command::Detect {
            threshold,
            polymarket_in,
            kalshi_in,
            out,
        } => {
            let threshold = threshold.unwrap_or(config.match_threshold);
            let polymarket_in =
                polymarket_in.unwrap_or_else(|| PathBuf::from(&config.polymarket_snapshot));
            let kalshi_in = kalshi_in.unwrap_or_else(|| PathBuf::from(&config.kalshi_snapshot));
            let out = out.unwrap_or_else(|| PathBuf::from(&config.candidates_csv));
            detect_candidates(&config, threshold, &polymarket_in, &kalshi_in, &out)?;
        }
        Command::Report { csv, out } => {
            let csv = csv.unwrap_or_else(|| PathBuf::from(&config.candidates_csv));
            let out = out.unwrap_or_else(|| PathBuf::from(&config.report_path));
            generate_report(&csv, &out)?;
        }
        Command::Run => {
            let polymarket_snapshot = PathBuf::from(&config.polymarket_snapshot);
            let kalshi_snapshot = PathBuf::from(&config.kalshi_snapshot);
            let csv = PathBuf::from(&config.candidates_csv);
            let report = PathBuf::from(&config.report_path);

            fetch_polymarket(&config, config.polymarket_fetch_limit, &polymarket_snapshot)
                .await?;
            fetch_kalshi(&config, config.kalshi_fetch_limit, &kalshi_snapshot).await?;
            detect_candidates(
                &config,
                config.match_threshold,
                &polymarket_snapshot,
                &kalshi_snapshot,
                &csv,
            )?;
            generate_report(&csv, &report)?;
        }
    }

    Ok(())
}

async fn fetch_polymarket(config: &Config, limit: usize, out: &Path) -> Result<()> {
    info!(
        "Fetching Polymarket data from {} (limit={})",
        config.polymarket_base_url, limit
    );
    let mut fetcher = PolymarketFetcher::new(config.polymarket_base_url.clone())?;
    let snapshot = fetcher.fetch_snapshot(limit).await?;
    snapshot.save(out)?;
    info!(
        "Saved {} {} markets to {}",
        snapshot.quotes.len(),
        snapshot.platform.as_str(),
        out.display()
    );
    Ok(())
}

async fn fetch_kalshi(config: &Config, limit: usize, out: &Path) -> Result<()> {
    info!(
        "Fetching Kalshi data from {} (limit={})",
        config.kalshi_base_url, limit
    );
    let mut fetcher = KalshiFetcher::new(config.kalshi_base_url.clone())?;
    let snapshot = fetcher.fetch_snapshot(limit).await?;
    snapshot.save(out)?;
    info!(
        "Saved {} {} markets to {}",
        snapshot.quotes.len(),
        snapshot.platform.as_str(),
        out.display()
    );
    Ok(())
}

fn detect_candidates(
    config: &Config,
    threshold: f64,
    polymarket_in: &Path,
    kalshi_in: &Path,
    out: &Path,
) -> Result<()> {
    info!("Analyzing candidate discrepancies (threshold={threshold:.2})");

    let polymarket = Snapshot::load(polymarket_in)?;
    let kalshi = Snapshot::load(kalshi_in)?;

    let pairs = match_markets(&polymarket.quotes, &kalshi.quotes, threshold);
    let fees = FeeSchedule {
        polymarket: config.polymarket_fee,
        kalshi: config.kalshi_fee,
    };
    let candidates = detect(&pairs, &fees);

    if candidates.is_empty() {
        info!("No candidate opportunities found.");
    }
    write_csv(&candidates, out)?;

    for candidate in candidates.iter().take(5) {
        info!(
            rank = candidate.rank,
            event = %candidate.event,
            strategy = candidate.strategy.label(),
            raw_spread = %format!("{:.4}", candidate.raw_spread),
            fee_adjusted = %format!("{:.4}", candidate.fee_adjusted_spread),
            similarity = %format!("{:.2}", candidate.similarity),
            "Top candidate"
        );
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arb_scout=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
