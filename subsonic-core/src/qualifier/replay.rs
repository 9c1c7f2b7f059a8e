//! Walk a full bar series through the qualifier.
//!
//! EMAs are computed once over the whole series, the cross index is tracked
//! incrementally, and bar `i` is evaluated with `bars[..i]` as history. No
//! value at bar `i` depends on bars after it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::{RejectReason, SetupQualifier, Verdict};
use crate::bias::{annotate_emas, CrossTracker};
use crate::domain::Bar;
use crate::error::InputError;

/// Verdict for one bar of a replayed series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarVerdict {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub last_cross: Option<usize>,
    pub verdict: Verdict,
}

pub fn replay(bars: &[Bar], qualifier: &SetupQualifier) -> Result<Vec<BarVerdict>, InputError> {
    let annotated = annotate_emas(bars);
    let mut tracker = CrossTracker::new();
    let mut out = Vec::with_capacity(annotated.len());

    for (i, bar) in annotated.iter().enumerate() {
        let last_cross = tracker.update(i, bar.ema34, bar.ema200);
        let verdict = qualifier.evaluate(bar, last_cross, i, &annotated[..i])?;
        match &verdict {
            Verdict::Accepted { candidate } => debug!(
                index = i,
                entry = candidate.entry,
                stop = candidate.stop,
                target = candidate.target,
                "setup accepted"
            ),
            Verdict::Rejected { reason } => debug!(index = i, %reason, "setup rejected"),
        }
        out.push(BarVerdict {
            index: i,
            timestamp: bar.timestamp,
            last_cross,
            verdict,
        });
    }

    Ok(out)
}

/// Counts over a replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub bars: usize,
    pub accepted: usize,
    pub rejections: BTreeMap<RejectReason, usize>,
}

impl ReplaySummary {
    pub fn from_verdicts(verdicts: &[BarVerdict]) -> Self {
        let mut summary = Self {
            bars: verdicts.len(),
            ..Self::default()
        };
        for v in verdicts {
            match v.verdict.reason() {
                Some(reason) => *summary.rejections.entry(reason).or_insert(0) += 1,
                None => summary.accepted += 1,
            }
        }
        summary
    }

    pub fn rejected(&self) -> usize {
        self.bars - self.accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;
    use crate::qualifier::SetupParams;
    use chrono::{Duration, TimeZone};

    /// Falling then rising closes on 10-minute bars starting 07:00 UTC, so the
    /// EMA34/EMA200 diff flips sign partway through.
    fn v_shaped_bars(n: usize) -> Vec<Bar> {
        let base = Utc.with_ymd_and_hms(2024, 3, 4, 7, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let close = if i < n / 2 {
                    100.0 - i as f64
                } else {
                    100.0 - (n / 2) as f64 + 3.0 * (i - n / 2) as f64
                };
                let mut bar = Bar::new(
                    base + Duration::minutes(10 * i as i64),
                    close - 0.5,
                    close + 0.5,
                    close - 1.0,
                    close,
                    100.0,
                );
                bar.liquidity_sweep = true;
                bar.retest_confirmed = true;
                bar.sl_zone = Some(close - 2.0);
                bar
            })
            .collect()
    }

    #[test]
    fn replay_covers_every_bar_in_order() {
        let bars = v_shaped_bars(16);
        let q = SetupQualifier::new(SetupParams::new(Side::Long, 1.0, 3.0, 2.0)).unwrap();
        let verdicts = replay(&bars, &q).unwrap();
        assert_eq!(verdicts.len(), 16);
        assert!(verdicts.iter().enumerate().all(|(i, v)| v.index == i));
        // no cross yet on the first bar
        assert_eq!(verdicts[0].verdict.reason(), Some(RejectReason::BeforeCross));
    }

    #[test]
    fn cross_bar_and_next_bar_are_blocked() {
        let bars = v_shaped_bars(20);
        let q = SetupQualifier::new(SetupParams::new(Side::Long, 1.0, 3.0, 2.0)).unwrap();
        let verdicts = replay(&bars, &q).unwrap();

        let cross = verdicts
            .iter()
            .find_map(|v| v.last_cross)
            .expect("the series crosses");
        assert_eq!(cross, 18);
        assert_eq!(verdicts[cross].verdict.reason(), Some(RejectReason::BeforeCross));
        assert_eq!(
            verdicts[cross + 1].verdict.reason(),
            Some(RejectReason::FirstSessionAfterCross)
        );
    }

    #[test]
    fn summary_counts_add_up() {
        let bars = v_shaped_bars(40);
        let q = SetupQualifier::new(SetupParams::new(Side::Long, 1.0, 3.0, 2.0)).unwrap();
        let verdicts = replay(&bars, &q).unwrap();
        let summary = ReplaySummary::from_verdicts(&verdicts);
        assert_eq!(summary.bars, 40);
        let rejected: usize = summary.rejections.values().sum();
        assert_eq!(rejected, summary.rejected());
        assert_eq!(summary.accepted + rejected, 40);
        // bars after 11:00 UTC
        assert!(summary.rejections[&RejectReason::NotLondonSession] > 0);
    }

    #[test]
    fn malformed_bar_aborts_replay() {
        let mut bars = v_shaped_bars(5);
        bars[2].high = f64::NAN;
        let q = SetupQualifier::new(SetupParams::new(Side::Long, 1.0, 3.0, 2.0)).unwrap();
        assert!(replay(&bars, &q).is_err());
    }
}
