//! Data provider trait and structured error types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Bar;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("provider refused requests (HTTP 403)")]
    Blocked,

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no data returned for {symbol}")]
    NoData { symbol: String },

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DataError::NetworkUnreachable(_)
                | DataError::RateLimited { .. }
                | DataError::NoData { .. }
                | DataError::Other(_)
        )
    }
}

/// What to fetch: bar interval and how far back from `end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Provider interval string, e.g. "4h", "1h", "15m".
    pub interval: String,
    pub lookback_days: u32,
    pub end: DateTime<Utc>,
}

impl FetchRequest {
    pub fn new(interval: impl Into<String>, lookback_days: u32, end: DateTime<Utc>) -> Self {
        Self {
            interval: interval.into(),
            lookback_days,
            end,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.end - Duration::days(i64::from(self.lookback_days))
    }

    /// Whether `ts` falls in (start, end].
    pub fn covers(&self, ts: DateTime<Utc>) -> bool {
        ts > self.start() && ts <= self.end
    }
}

/// Trait for market-data providers (Yahoo Finance, CSV files, test doubles).
///
/// Implementations return bars in chronological order.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    fn fetch(&self, symbol: &str, request: &FetchRequest) -> Result<Vec<Bar>, DataError>;
}
