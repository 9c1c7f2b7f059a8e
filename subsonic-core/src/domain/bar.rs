//! Bar — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{require_finite, InputError};

/// One OHLCV observation plus whatever upstream analysis has attached to it.
///
/// The indicator fields (`ema34`, `ema200`) are filled by the bias engine
/// (`bias::annotate_emas`). The market-structure fields (`liquidity_sweep`,
/// `retest_confirmed`, `can_reach_tp`, `sl_zone`) come from an external
/// detector and are consumed as given. Bars are never mutated once observed;
/// enrichment produces new copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open time. Session checks read the UTC time-of-day.
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,

    #[serde(default)]
    pub ema34: Option<f64>,
    #[serde(default)]
    pub ema200: Option<f64>,

    #[serde(default)]
    pub liquidity_sweep: bool,
    #[serde(default)]
    pub retest_confirmed: bool,
    /// `None` means the detector expressed no opinion; treated as reachable.
    #[serde(default)]
    pub can_reach_tp: Option<bool>,
    #[serde(default)]
    pub sl_zone: Option<f64>,
    /// Planned entry. Falls back to `close` when absent.
    #[serde(default)]
    pub entry_price: Option<f64>,
    #[serde(default)]
    pub setup_score: Option<f64>,
}

impl Bar {
    /// Plain OHLCV bar with no indicators or structure flags.
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            ema34: None,
            ema200: None,
            liquidity_sweep: false,
            retest_confirmed: false,
            can_reach_tp: None,
            sl_zone: None,
            entry_price: None,
            setup_score: None,
        }
    }

    /// Absolute candle body, |close - open|.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Entry price used for stop/target math.
    pub fn entry(&self) -> f64 {
        self.entry_price.unwrap_or(self.close)
    }

    pub fn score(&self) -> f64 {
        self.setup_score.unwrap_or(0.0)
    }

    /// Shape check: finite OHLC and high >= low.
    pub fn validate(&self) -> Result<(), InputError> {
        require_finite("open", self.open)?;
        require_finite("high", self.high)?;
        require_finite("low", self.low)?;
        require_finite("close", self.close)?;
        if self.high < self.low {
            return Err(InputError::InvertedRange {
                high: self.high,
                low: self.low,
            });
        }
        Ok(())
    }
}
