//! Download with retries and exponential backoff.
//!
//! An attempt fails when the provider errors or returns no bars. Between
//! attempts the fetcher sleeps `unit * base^(attempt-1)`; with the default
//! one-second unit and base 2 that is 1s, 2s, 4s, ...

use std::time::Duration;

use subsonic_core::data::{DataError, DataProvider, FetchRequest};
use subsonic_core::Bar;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ScanConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("download failed for {symbol} after {attempts} attempt(s): {source}")]
    Exhausted {
        symbol: String,
        attempts: u32,
        #[source]
        source: DataError,
    },

    #[error("download failed for {symbol}: {source}")]
    Fatal {
        symbol: String,
        #[source]
        source: DataError,
    },
}

/// Attempt count and sleep schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff_base: u64,
    /// Duration of one backoff step. Zero disables sleeping.
    pub unit: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff_base: u64) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff_base,
            unit: Duration::from_secs(1),
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.retries, config.backoff_base_secs)
    }

    /// Same attempt count, no sleeping between attempts.
    pub fn without_delay(mut self) -> Self {
        self.unit = Duration::ZERO;
        self
    }

    /// Sleep after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let steps = self
            .backoff_base
            .checked_pow(attempt.saturating_sub(1))
            .and_then(|s| u32::try_from(s).ok())
            .unwrap_or(u32::MAX);
        self.unit.saturating_mul(steps)
    }
}

/// Fetch bars for `symbol`, retrying transient failures and empty results.
///
/// Errors the provider marks as permanent (unknown symbol, blocked,
/// format change) end the loop early.
pub fn fetch_with_retries(
    provider: &dyn DataProvider,
    symbol: &str,
    request: &FetchRequest,
    policy: &RetryPolicy,
) -> Result<Vec<Bar>, FetchError> {
    let mut last_err = DataError::NoData {
        symbol: symbol.to_string(),
    };

    for attempt in 1..=policy.attempts {
        info!(
            symbol,
            attempt,
            attempts = policy.attempts,
            provider = provider.name(),
            "downloading"
        );
        match provider.fetch(symbol, request) {
            Ok(bars) if !bars.is_empty() => {
                info!(symbol, rows = bars.len(), "downloaded");
                return Ok(bars);
            }
            Ok(_) => {
                warn!(symbol, attempt, "no data returned");
                last_err = DataError::NoData {
                    symbol: symbol.to_string(),
                };
            }
            Err(e) if !e.is_retryable() => {
                warn!(symbol, attempt, error = %e, "permanent download error");
                return Err(FetchError::Fatal {
                    symbol: symbol.to_string(),
                    source: e,
                });
            }
            Err(e) => {
                warn!(symbol, attempt, error = %e, "download error");
                last_err = e;
            }
        }

        if attempt < policy.attempts {
            let delay = policy.delay_after(attempt);
            if !delay.is_zero() {
                info!(symbol, secs = delay.as_secs_f64(), "sleeping before retry");
                std::thread::sleep(delay);
            }
        }
    }

    Err(FetchError::Exhausted {
        symbol: symbol.to_string(),
        attempts: policy.attempts,
        source: last_err,
    })
}
