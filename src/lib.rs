//! arb-scout — cross-platform prediction market discrepancy scout.
//!
//! Batch pipeline: snapshot Polymarket and Kalshi prices, fuzzy-match
//! equivalent markets, rank candidate spreads net of fees, and render a
//! CSV plus a markdown report. Scouting only; nothing here executes trades.

pub mod detector;
pub mod fetchers;
pub mod matching;
pub mod models;
pub mod report;
