//! Intraday bars from the Yahoo v8 chart endpoint.
//!
//! One request per call; retry and backoff policy belongs to the caller.
//! The endpoint is unofficial and its payload shape can change without
//! notice, so every structural surprise maps to `ResponseFormatChanged`.
//! `CsvProvider` is the offline fallback.

use super::provider::{DataError, DataProvider, FetchRequest};
use crate::domain::Bar;
use chrono::DateTime;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart/";

/// Top level of the chart payload.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Blocking chart-endpoint client.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the provider at another host (mirrors, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Chart API URL for a symbol, appended as a single path segment.
    fn chart_url(&self, symbol: &str, request: &FetchRequest) -> Result<Url, DataError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| DataError::Other(format!("bad base url {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| DataError::Other(format!("base url cannot hold a path: {}", self.base_url)))?
            .pop_if_empty()
            .push(symbol);
        url.query_pairs_mut()
            .append_pair("period1", &request.start().timestamp().to_string())
            .append_pair("period2", &request.end.timestamp().to_string())
            .append_pair("interval", &request.interval);
        Ok(url)
    }
}

/// Parse the chart API response into bars.
///
/// Rows missing any of open/high/low/close are dropped (Yahoo emits null rows
/// for closed sessions). Missing volume becomes 0.
fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<Bar>, DataError> {
    let result = match (resp.chart.result, resp.chart.error) {
        (Some(result), _) => result,
        (None, Some(err)) if err.code == "Not Found" => {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
        }
        (None, Some(err)) => {
            return Err(DataError::ResponseFormatChanged(format!(
                "chart error {}: {}",
                err.code, err.description
            )))
        }
        (None, None) => {
            return Err(DataError::ResponseFormatChanged(
                "chart payload has neither result nor error".into(),
            ))
        }
    };

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged(format!("{symbol}: empty result list")))?;

    // Yahoo omits `timestamp` entirely when the range holds no bars.
    let Some(timestamps) = data.timestamp else {
        return Err(DataError::NoData {
            symbol: symbol.to_string(),
        });
    };

    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged(format!("{symbol}: quote block missing")))?;

    let mut bars = Vec::with_capacity(timestamps.len());

    for (i, &secs) in timestamps.iter().enumerate() {
        let timestamp = DateTime::from_timestamp(secs, 0).ok_or_else(|| {
            DataError::ResponseFormatChanged(format!("{symbol}: timestamp {secs} out of range"))
        })?;

        let field = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
        let (Some(open), Some(high), Some(low), Some(close)) = (
            field(&quote.open),
            field(&quote.high),
            field(&quote.low),
            field(&quote.close),
        ) else {
            continue;
        };
        let volume = field(&quote.volume).unwrap_or(0.0);

        bars.push(Bar::new(timestamp, open, high, low, close, volume));
    }

    if bars.is_empty() {
        return Err(DataError::NoData {
            symbol: symbol.to_string(),
        });
    }

    Ok(bars)
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(&self, symbol: &str, request: &FetchRequest) -> Result<Vec<Bar>, DataError> {
        let url = self.chart_url(symbol, request)?;

        let resp = self.client.get(url).send().map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                DataError::NetworkUnreachable(e.to_string())
            } else {
                DataError::Other(e.to_string())
            }
        })?;

        let status = resp.status();
        match status {
            StatusCode::FORBIDDEN => return Err(DataError::Blocked),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_secs = resp
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(DataError::RateLimited { retry_after_secs });
            }
            StatusCode::UNAUTHORIZED => {
                return Err(DataError::AuthenticationRequired(format!(
                    "chart endpoint refused {symbol} without credentials"
                )))
            }
            StatusCode::NOT_FOUND => {
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                })
            }
            s if !s.is_success() => {
                return Err(DataError::Other(format!("HTTP {s} for {symbol}")))
            }
            _ => {}
        }

        let chart: ChartResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;

        parse_response(symbol, chart)
    }
}
