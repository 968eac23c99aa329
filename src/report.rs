//! Candidate output: CSV rows plus a human-readable markdown report.
//!
//! Reported numbers are theoretical. A missing or empty CSV means there is
//! nothing to report, not an error.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::detector::ArbitrageCandidate;

/// Write the ranked candidates as CSV, overwriting any previous run.
pub fn write_csv(candidates: &[ArbitrageCandidate], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("create CSV at {}", path.display()))?;

    for candidate in candidates {
        writer
            .serialize(candidate)
            .context("serialize candidate row")?;
    }

    writer.flush().context("flush CSV")?;
    info!("Wrote {} candidates to {}", candidates.len(), path.display());
    Ok(())
}

/// Read candidates back from a CSV produced by [`write_csv`].
pub fn read_csv(path: &Path) -> Result<Vec<ArbitrageCandidate>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("open CSV at {}", path.display()))?;

    let mut candidates = Vec::new();
    for row in reader.deserialize() {
        let candidate: ArbitrageCandidate = row.context("parse candidate row")?;
        candidates.push(candidate);
    }
    Ok(candidates)
}

/// Render the markdown report from the candidates CSV.
///
/// Returns `Ok(None)` when the CSV is missing or empty.
pub fn generate_report(csv_path: &Path, out_path: &Path) -> Result<Option<String>> {
    if !csv_path.exists() {
        warn!("No {} found. Run detection first.", csv_path.display());
        return Ok(None);
    }

    let candidates = read_csv(csv_path)?;
    if candidates.is_empty() {
        warn!("{} is empty. No candidates to report.", csv_path.display());
        return Ok(None);
    }

    let report = render_report(&candidates);
    std::fs::write(out_path, &report)
        .with_context(|| format!("write report to {}", out_path.display()))?;

    info!("Report saved to {}", out_path.display());
    Ok(Some(report))
}

fn render_report(candidates: &[ArbitrageCandidate]) -> String {
    let best_edge = candidates
        .iter()
        .map(|c| c.fee_adjusted_spread)
        .fold(f64::MIN, f64::max);
    let avg_edge = candidates
        .iter()
        .map(|c| c.fee_adjusted_spread)
        .sum::<f64>()
        / candidates.len() as f64;

    let mut report = format!(
        "# Candidate Arbitrage Opportunities Report\n\n\
         **Generated**: {}\n\
         **Markets Compared**: Polymarket vs Kalshi\n\n\
         ## Summary\n\n\
         - **Total Candidates Found**: {}\n\
         - **Best Fee-Adjusted Spread**: ${:.4} ({:.2}%)\n\
         - **Average Fee-Adjusted Spread**: ${:.4} ({:.2}%)\n\n\
         ## Top Candidates\n\n\
         | Rank | Event | Strategy | Raw Spread | Fee-Adjusted | Similarity |\n\
         |------|-------|----------|------------|--------------|------------|\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S"),
        candidates.len(),
        best_edge,
        best_edge * 100.0,
        avg_edge,
        avg_edge * 100.0,
    );

    for candidate in candidates.iter().take(10) {
        let event = if candidate.event.chars().count() > 40 {
            format!("{}...", truncate_chars(&candidate.event, 40))
        } else {
            candidate.event.clone()
        };
        report.push_str(&format!(
            "| {} | {} | {} | ${:.4} | ${:.4} | {:.2} |\n",
            candidate.rank,
            event,
            candidate.strategy.label(),
            candidate.raw_spread,
            candidate.fee_adjusted_spread,
            candidate.similarity,
        ));
    }

    report.push_str(
        "\n## Risk Warnings\n\n\
         1. **Execution Risk**: Prices may change before any action is taken\n\
         2. **Liquidity Risk**: You may not be able to fill size at quoted prices\n\
         3. **Rule Risk**: Settlement rules may differ between platforms for seemingly similar markets\n\
         4. **Fee Risk**: Fees, spreads, and effective costs can change without notice\n\
         5. **Match Risk**: Fuzzy matching can produce false positives\n\n\
         ## Recommended Actions\n\n\
         1. Verify the match and settlement rules manually before acting\n\
         2. Confirm orderbook depth and spreads (especially on the execution venue)\n\
         3. Start with small size and record fill quality vs quoted prices\n\
         4. Track lead/lag behavior over time, not just point-in-time discrepancies\n\n\
         ---\n\
         *This report is informational only and reflects theoretical calculations, not guaranteed outcomes.*\n",
    );

    report
}

fn truncate_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
