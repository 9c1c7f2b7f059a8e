//! Trend/bias engine — directional classification from EMA34 / EMA200.
//!
//! Bias compares the latest close to EMA200, momentum compares it to EMA34.
//! Both degrade to `Neutral` when the reference is missing; nothing here
//! returns an error.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Bar;
use crate::indicators::{compute_emas, Ema, Indicator, LONG_SPAN, SHORT_SPAN};

/// Number of trailing finite diffs inspected by `detect_recent_cross`.
pub const CROSS_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bias {
    Bull,
    Bear,
    Neutral,
}

impl Bias {
    pub fn as_str(self) -> &'static str {
        match self {
            Bias::Bull => "bull",
            Bias::Bear => "bear",
            Bias::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a close against a reference level.
pub fn classify(last_close: f64, reference: Option<f64>) -> Bias {
    match reference {
        Some(r) if r.is_finite() && last_close.is_finite() => {
            if last_close > r {
                Bias::Bull
            } else if last_close < r {
                Bias::Bear
            } else {
                Bias::Neutral
            }
        }
        _ => Bias::Neutral,
    }
}

/// Trend bias: latest close vs latest EMA200.
pub fn classify_bias(last_close: f64, last_ema200: Option<f64>) -> Bias {
    classify(last_close, last_ema200)
}

/// Momentum: latest close vs latest EMA34.
pub fn classify_momentum(last_close: f64, last_ema34: Option<f64>) -> Bias {
    classify(last_close, last_ema34)
}

/// One point when bias and momentum agree on a direction. Neutral never scores.
pub fn alignment_score(bias: Bias, momentum: Bias) -> u8 {
    if bias == momentum && bias != Bias::Neutral {
        1
    } else {
        0
    }
}

/// True when the oldest and newest of the last three diffs have opposite signs.
///
/// Fewer than three diffs never flags a cross. A cross that resolves and
/// re-crosses inside the window is invisible to this check.
pub fn detect_cross_in_diffs(diffs: &[f64]) -> bool {
    if diffs.len() < CROSS_WINDOW {
        return false;
    }
    let window = &diffs[diffs.len() - CROSS_WINDOW..];
    window[0] * window[CROSS_WINDOW - 1] < 0.0
}

/// Windowed recent-cross heuristic over `ema34 - ema200`, ignoring non-finite diffs.
pub fn detect_recent_cross(ema34: &[f64], ema200: &[f64]) -> bool {
    let diffs: Vec<f64> = ema34
        .iter()
        .zip(ema200)
        .map(|(s, l)| s - l)
        .filter(|d| d.is_finite())
        .collect();
    detect_cross_in_diffs(&diffs)
}

/// Incremental tracker for the index of the most recent EMA cross.
///
/// A cross is recorded at bar `i` when the sign of `ema34 - ema200` differs
/// from the sign of the previous signed diff. Zero and non-finite diffs carry
/// no sign and are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossTracker {
    last_positive: Option<bool>,
    last_cross: Option<usize>,
}

impl CrossTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bar `index`; returns the latest cross index after the update.
    pub fn update(&mut self, index: usize, ema34: Option<f64>, ema200: Option<f64>) -> Option<usize> {
        if let (Some(s), Some(l)) = (ema34, ema200) {
            let diff = s - l;
            if diff.is_finite() && diff != 0.0 {
                let positive = diff > 0.0;
                if let Some(prev) = self.last_positive {
                    if prev != positive {
                        self.last_cross = Some(index);
                    }
                }
                self.last_positive = Some(positive);
            }
        }
        self.last_cross
    }

    pub fn last_cross(&self) -> Option<usize> {
        self.last_cross
    }
}

/// Index of the most recent sign flip of `ema34 - ema200`, if any.
pub fn last_cross_index(ema34: &[f64], ema200: &[f64]) -> Option<usize> {
    let mut tracker = CrossTracker::new();
    for (i, (&s, &l)) in ema34.iter().zip(ema200).enumerate() {
        tracker.update(i, Some(s), Some(l));
    }
    tracker.last_cross()
}

/// Latest trend snapshot for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReading {
    pub last_close: f64,
    pub ema34: Option<f64>,
    pub ema200: Option<f64>,
    pub bias: Bias,
    pub momentum: Bias,
    pub recent_cross: bool,
    pub score: u8,
}

impl TrendReading {
    /// Build the snapshot from a close series. `None` when no close is finite.
    pub fn from_closes(closes: &[f64]) -> Option<Self> {
        let last_close = last_finite(closes)?;
        let (ema34, ema200) = compute_emas(closes);
        let last_ema34 = last_finite(&ema34);
        let last_ema200 = last_finite(&ema200);

        let bias = classify_bias(last_close, last_ema200);
        let momentum = classify_momentum(last_close, last_ema34);

        Some(Self {
            last_close,
            ema34: last_ema34,
            ema200: last_ema200,
            bias,
            momentum,
            recent_cross: detect_recent_cross(&ema34, &ema200),
            score: alignment_score(bias, momentum),
        })
    }

    pub fn from_bars(bars: &[Bar]) -> Option<Self> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        Self::from_closes(&closes)
    }
}

fn last_finite(values: &[f64]) -> Option<f64> {
    values.iter().rev().copied().find(|v| v.is_finite())
}

/// Copy `bars`, filling absent `ema34` / `ema200` from the full-history computation.
///
/// Values already present on a bar (precomputed upstream) are kept.
pub fn annotate_emas(bars: &[Bar]) -> Vec<Bar> {
    let short = Ema::new(SHORT_SPAN).compute(bars);
    let long = Ema::new(LONG_SPAN).compute(bars);
    bars.iter()
        .zip(short.into_iter().zip(long))
        .map(|(bar, (s, l))| Bar {
            ema34: bar.ema34.or(Some(s).filter(|v| v.is_finite())),
            ema200: bar.ema200.or(Some(l).filter(|v| v.is_finite())),
            ..bar.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn classify_directions() {
        assert_eq!(classify_bias(1.21, Some(1.20)), Bias::Bull);
        assert_eq!(classify_bias(1.19, Some(1.20)), Bias::Bear);
        assert_eq!(classify_bias(1.20, Some(1.20)), Bias::Neutral);
        assert_eq!(classify_bias(1.20, None), Bias::Neutral);
        assert_eq!(classify_momentum(1.20, Some(f64::NAN)), Bias::Neutral);
    }

    #[test]
    fn neutral_never_scores() {
        assert_eq!(alignment_score(Bias::Bull, Bias::Bull), 1);
        assert_eq!(alignment_score(Bias::Bear, Bias::Bear), 1);
        assert_eq!(alignment_score(Bias::Neutral, Bias::Neutral), 0);
        assert_eq!(alignment_score(Bias::Bull, Bias::Bear), 0);
    }

    #[test]
    fn cross_needs_three_diffs() {
        assert!(!detect_cross_in_diffs(&[]));
        assert!(!detect_cross_in_diffs(&[-1.0, 1.0]));
    }

    #[test]
    fn cross_window_examples() {
        assert!(detect_cross_in_diffs(&[-1.0, 0.5, 2.0]));
        assert!(!detect_cross_in_diffs(&[1.0, 2.0, 3.0]));
        // only the last three count
        assert!(!detect_cross_in_diffs(&[-5.0, 1.0, 2.0, 3.0]));
        // re-cross inside the window is missed
        assert!(!detect_cross_in_diffs(&[1.0, -1.0, 1.0]));
    }

    #[test]
    fn recent_cross_skips_nan_diffs() {
        let ema34 = [-1.0, f64::NAN, 0.5, 2.0];
        let ema200 = [0.0, 0.0, 0.0, 0.0];
        assert!(detect_recent_cross(&ema34, &ema200));
        let ema34 = [f64::NAN, 0.5, 2.0];
        assert!(!detect_recent_cross(&ema34, &ema200[..3]));
    }

    #[test]
    fn last_cross_index_finds_latest_flip() {
        let ema34 = [1.0, 2.0, 0.5, 0.5, 3.0, 3.0];
        let ema200 = [2.0, 1.0, 1.0, 0.5, 1.0, 1.0];
        // diffs: -1, +1, -0.5, 0, +2, +2 -> flips at 1, 2, 4
        assert_eq!(last_cross_index(&ema34, &ema200), Some(4));
        assert_eq!(last_cross_index(&ema34[..2], &ema200[..2]), Some(1));
        assert_eq!(last_cross_index(&[1.0, 2.0], &[0.0, 0.0]), None);
    }

    #[test]
    fn tracker_matches_batch() {
        let ema34 = [1.0, 2.0, 0.5, 0.5, 3.0];
        let ema200 = [2.0, 1.0, 1.0, 0.5, 1.0];
        let mut tracker = CrossTracker::new();
        let seen: Vec<Option<usize>> = ema34
            .iter()
            .zip(&ema200)
            .enumerate()
            .map(|(i, (&s, &l))| tracker.update(i, Some(s), Some(l)))
            .collect();
        assert_eq!(seen, vec![None, Some(1), Some(2), Some(2), Some(4)]);
    }

    #[test]
    fn reading_on_rising_series_is_bullish() {
        let closes: Vec<f64> = (0..250).map(|i| 100.0 + i as f64 * 0.5).collect();
        let reading = TrendReading::from_closes(&closes).unwrap();
        assert_eq!(reading.bias, Bias::Bull);
        assert_eq!(reading.momentum, Bias::Bull);
        assert_eq!(reading.score, 1);
        assert!(!reading.recent_cross);
        assert_eq!(reading.last_close, 224.5);
    }

    #[test]
    fn reading_on_single_close_is_neutral() {
        // EMA seeded from the only close equals it.
        let reading = TrendReading::from_closes(&[1.25]).unwrap();
        assert_eq!(reading.bias, Bias::Neutral);
        assert_eq!(reading.momentum, Bias::Neutral);
        assert_eq!(reading.score, 0);
    }

    #[test]
    fn reading_without_finite_close_is_none() {
        assert!(TrendReading::from_closes(&[]).is_none());
        assert!(TrendReading::from_closes(&[f64::NAN]).is_none());
    }

    #[test]
    fn annotate_fills_both_emas() {
        let bars = make_bars(&[10.0, 11.0, 12.0]);
        let annotated = annotate_emas(&bars);
        assert_eq!(annotated.len(), 3);
        assert_eq!(annotated[0].ema34, Some(10.0));
        assert_eq!(annotated[0].ema200, Some(10.0));
        assert!(annotated[2].ema34.unwrap() > annotated[2].ema200.unwrap());
        // source bars untouched
        assert_eq!(bars[2].ema34, None);
    }

    #[test]
    fn annotate_keeps_precomputed_values() {
        let mut bars = make_bars(&[10.0, 11.0]);
        bars[1].ema200 = Some(42.0);
        let annotated = annotate_emas(&bars);
        assert_eq!(annotated[1].ema200, Some(42.0));
        assert!(annotated[1].ema34.is_some());
    }
}
