//! Exponential Moving Average (EMA), "adjust=false" form.
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (span + 1)
//! Seed: EMA[0] = close[0] (no SMA warmup), so every position has a value.

use super::Indicator;
use crate::domain::Bar;

/// Short (momentum) span.
pub const SHORT_SPAN: usize = 34;
/// Long (trend) span.
pub const LONG_SPAN: usize = 200;

#[derive(Debug, Clone)]
pub struct Ema {
    span: usize,
    name: String,
}

impl Ema {
    /// A span of 0 is accepted and computes to an all-NaN series.
    pub fn new(span: usize) -> Self {
        Self {
            span,
            name: format!("ema_{span}"),
        }
    }

    /// Smoothing factor 2 / (span + 1).
    pub fn alpha(&self) -> f64 {
        alpha(self.span)
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        ema_of_series(&closes, self.span)
    }
}

fn alpha(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Compute raw EMA values from a pre-extracted f64 slice.
///
/// Output has the same length as `values`; empty in, empty out.
/// Non-finite inputs yield NaN at their position without disturbing the
/// recursion, which continues from the last finite EMA. Leading non-finite
/// values stay NaN until the first finite value seeds the series.
pub fn ema_of_series(values: &[f64], span: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    if span == 0 {
        return result;
    }

    let alpha = alpha(span);
    let mut prev: Option<f64> = None;

    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            continue;
        }
        let ema = match prev {
            None => v,
            Some(p) => alpha * v + (1.0 - alpha) * p,
        };
        result[i] = ema;
        prev = Some(ema);
    }

    result
}

/// EMA34 and EMA200 of a close series.
pub fn compute_emas(closes: &[f64]) -> (Vec<f64>, Vec<f64>) {
    (
        ema_of_series(closes, SHORT_SPAN),
        ema_of_series(closes, LONG_SPAN),
    )
}
