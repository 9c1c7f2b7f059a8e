//! Watchlist scan: fetch each instrument, take its trend reading.
//!
//! Instruments are independent and scanned in parallel. A failure on one
//! becomes an error row; it never aborts the scan or touches other rows.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use subsonic_core::bias::TrendReading;
use subsonic_core::data::DataProvider;
use thiserror::Error;
use tracing::{error, info};

use crate::config::ScanConfig;
use crate::fetch::{fetch_with_retries, FetchError, RetryPolicy};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("no close price available for {symbol}")]
    NoClose { symbol: String },
}

/// Outcome for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    Reading(TrendReading),
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRow {
    pub run_time: DateTime<Utc>,
    /// Display name.
    pub ticker: String,
    /// Provider symbol.
    pub symbol: String,
    pub outcome: ScanOutcome,
}

impl ScanRow {
    pub fn reading(&self) -> Option<&TrendReading> {
        match &self.outcome {
            ScanOutcome::Reading(r) => Some(r),
            ScanOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, ScanOutcome::Failed { .. })
    }
}

/// All rows of one run, in watchlist order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub run_time: DateTime<Utc>,
    pub rows: Vec<ScanRow>,
}

impl ScanReport {
    pub fn failed(&self) -> usize {
        self.rows.iter().filter(|r| r.is_failed()).count()
    }

    /// Every instrument failed. An empty report does not count.
    pub fn all_failed(&self) -> bool {
        !self.rows.is_empty() && self.failed() == self.rows.len()
    }

    /// Rows whose bias and momentum agree on a direction.
    pub fn aligned(&self) -> impl Iterator<Item = &ScanRow> {
        self.rows
            .iter()
            .filter(|r| r.reading().map_or(false, |t| t.score > 0))
    }
}

/// Scan one instrument.
pub fn scan_symbol(
    provider: &dyn DataProvider,
    symbol: &str,
    config: &ScanConfig,
    policy: &RetryPolicy,
    run_time: DateTime<Utc>,
) -> Result<TrendReading, ScanError> {
    let bars = fetch_with_retries(provider, symbol, &config.request(run_time), policy)?;
    TrendReading::from_bars(&bars).ok_or_else(|| ScanError::NoClose {
        symbol: symbol.to_string(),
    })
}

/// Scan the whole watchlist in parallel.
pub fn scan_watchlist(
    provider: &dyn DataProvider,
    config: &ScanConfig,
    policy: &RetryPolicy,
    run_time: DateTime<Utc>,
) -> ScanReport {
    info!(
        instruments = config.watchlist.len(),
        provider = provider.name(),
        interval = %config.interval,
        "starting scan"
    );

    let rows: Vec<ScanRow> = config
        .watchlist
        .par_iter()
        .map(|symbol| {
            let ticker = config.display_name(symbol).to_string();
            let outcome = match scan_symbol(provider, symbol, config, policy, run_time) {
                Ok(reading) => {
                    info!(
                        symbol = %symbol,
                        close = reading.last_close,
                        ema34 = ?reading.ema34,
                        ema200 = ?reading.ema200,
                        bias = %reading.bias,
                        momentum = %reading.momentum,
                        cross = reading.recent_cross,
                        "scanned"
                    );
                    ScanOutcome::Reading(reading)
                }
                Err(e) => {
                    error!(symbol = %symbol, error = %e, "failed to process instrument");
                    ScanOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            ScanRow {
                run_time,
                ticker,
                symbol: symbol.clone(),
                outcome,
            }
        })
        .collect();

    ScanReport { run_time, rows }
}
