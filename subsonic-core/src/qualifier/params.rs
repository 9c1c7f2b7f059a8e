//! Per-run setup parameters.

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::Side;
use crate::error::InputError;
use crate::sizers::SizingPolicy;

/// Bars the confirmation-candle average is taken over.
pub const DEFAULT_BODY_LOOKBACK: usize = 14;

/// Fraction of the average body allowed as adverse wick when no explicit cap is set.
pub const DEFAULT_WICK_FRACTION: f64 = 0.1;

/// Time-of-day window (UTC), inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl SessionWindow {
    /// London morning, 07:00–11:00 UTC.
    pub fn london() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
        }
    }

    /// Whether the UTC time-of-day of `ts` falls in the window.
    ///
    /// A window with `start > end` wraps midnight. Sub-second precision
    /// counts: 11:00:00.5 is after an 11:00 end.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        let t = ts.time();
        if self.start <= self.end {
            self.start <= t && t <= self.end
        } else {
            t >= self.start || t <= self.end
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "{:02}:{:02}-{:02}:{:02} UTC",
            self.start.hour(),
            self.start.minute(),
            self.end.hour(),
            self.end.minute()
        )
    }
}

impl Default for SessionWindow {
    fn default() -> Self {
        Self::london()
    }
}

/// Thresholds and policies for one qualification run.
///
/// Stop distances are in price units (a 20-pip EURUSD stop is `0.0020`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupParams {
    pub side: Side,
    pub min_sl_pips: f64,
    pub max_sl_pips: f64,
    /// Target distance as a multiple of the stop distance.
    pub rr_target: f64,
    /// Maximum adverse wick. Defaults to 10% of the average body.
    #[serde(default)]
    pub max_entry_wick: Option<f64>,
    #[serde(default)]
    pub sizing: SizingPolicy,
    #[serde(default)]
    pub session: SessionWindow,
    #[serde(default = "default_body_lookback")]
    pub body_lookback: usize,
}

fn default_body_lookback() -> usize {
    DEFAULT_BODY_LOOKBACK
}

impl SetupParams {
    pub fn new(side: Side, min_sl_pips: f64, max_sl_pips: f64, rr_target: f64) -> Self {
        Self {
            side,
            min_sl_pips,
            max_sl_pips,
            rr_target,
            max_entry_wick: None,
            sizing: SizingPolicy::default(),
            session: SessionWindow::default(),
            body_lookback: DEFAULT_BODY_LOOKBACK,
        }
    }

    pub fn with_fixed_lot(mut self, lot: f64) -> Self {
        self.sizing = SizingPolicy::Fixed { lot };
        self
    }

    pub fn with_max_entry_wick(mut self, wick: f64) -> Self {
        self.max_entry_wick = Some(wick);
        self
    }

    pub fn with_sizing(mut self, sizing: SizingPolicy) -> Self {
        self.sizing = sizing;
        self
    }

    pub fn with_session(mut self, session: SessionWindow) -> Self {
        self.session = session;
        self
    }

    /// Wick cap for a given average body.
    pub fn wick_limit(&self, avg_body: f64) -> f64 {
        self.max_entry_wick.unwrap_or(DEFAULT_WICK_FRACTION * avg_body)
    }

    /// Check the record's invariants.
    pub fn validate(&self) -> Result<(), InputError> {
        let invalid = |msg: String| Err(InputError::InvalidParams(msg));

        for (name, v) in [
            ("min_sl_pips", self.min_sl_pips),
            ("max_sl_pips", self.max_sl_pips),
            ("rr_target", self.rr_target),
        ] {
            if !v.is_finite() {
                return invalid(format!("{name} must be finite, got {v}"));
            }
        }
        if self.min_sl_pips < 0.0 {
            return invalid(format!("min_sl_pips must be >= 0, got {}", self.min_sl_pips));
        }
        if self.min_sl_pips > self.max_sl_pips {
            return invalid(format!(
                "min_sl_pips ({}) must not exceed max_sl_pips ({})",
                self.min_sl_pips, self.max_sl_pips
            ));
        }
        if self.rr_target <= 0.0 {
            return invalid(format!("rr_target must be > 0, got {}", self.rr_target));
        }
        if let Some(w) = self.max_entry_wick {
            if !w.is_finite() || w < 0.0 {
                return invalid(format!("max_entry_wick must be a finite value >= 0, got {w}"));
            }
        }
        if self.body_lookback == 0 {
            return invalid("body_lookback must be >= 1".into());
        }
        Ok(())
    }

    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, InputError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            InputError::InvalidParams(format!("read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parse from TOML and validate.
    pub fn from_toml(content: &str) -> Result<Self, InputError> {
        let params: Self = toml::from_str(content)
            .map_err(|e| InputError::InvalidParams(format!("parse params TOML: {e}")))?;
        params.validate()?;
        Ok(params)
    }
}
