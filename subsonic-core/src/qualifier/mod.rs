//! Setup qualifier — ordered filter pipeline over one bar.
//!
//! Stages run strictly in order and the first failing stage decides the
//! rejection reason:
//!
//! 1. session window
//! 2. cross recency (no entries on or one bar after an EMA cross)
//! 3. bias alignment (close and EMA34 on the trade side of EMA200)
//! 4. liquidity sweep
//! 5. confirmation candle (body vs average body, adverse wick)
//! 6. retest
//! 7. stop/target feasibility
//! 8. position sizing
//!
//! Rule failures are `Verdict::Rejected` values. Only malformed input
//! (non-finite prices, missing EMAs, invalid parameters) is an `Err`.

pub mod params;
pub mod replay;
pub mod verdict;

pub use params::{SessionWindow, SetupParams, DEFAULT_BODY_LOOKBACK, DEFAULT_WICK_FRACTION};
pub use replay::{replay, BarVerdict, ReplaySummary};
pub use verdict::{RejectReason, TradeCandidate, Verdict};

use crate::domain::{Bar, Side};
use crate::error::{require_finite, require_present, InputError};
use crate::market_structure::{BarFlags, MarketStructureAnalyzer};
use crate::sizers::{LotSizer, SizingContext};

/// Configured qualifier: parameters plus the injected analyzer and sizer.
pub struct SetupQualifier {
    params: SetupParams,
    analyzer: Box<dyn MarketStructureAnalyzer>,
    sizer: Box<dyn LotSizer>,
}

impl std::fmt::Debug for SetupQualifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupQualifier")
            .field("params", &self.params)
            .field("analyzer", &self.analyzer.name())
            .field("sizer", &self.sizer.name())
            .finish()
    }
}

impl SetupQualifier {
    /// Validate `params` and build a qualifier reading structure flags from
    /// the bar, sized by `params.sizing`.
    pub fn new(params: SetupParams) -> Result<Self, InputError> {
        params.validate()?;
        let sizer = params.sizing.build();
        Ok(Self {
            params,
            analyzer: Box::new(BarFlags),
            sizer,
        })
    }

    pub fn with_analyzer(mut self, analyzer: impl MarketStructureAnalyzer + 'static) -> Self {
        self.analyzer = Box::new(analyzer);
        self
    }

    pub fn with_sizer(mut self, sizer: impl LotSizer + 'static) -> Self {
        self.sizer = Box::new(sizer);
        self
    }

    pub fn params(&self) -> &SetupParams {
        &self.params
    }

    /// Evaluate `bar` at `current_index`.
    ///
    /// `last_cross` is the index of the most recent EMA cross; `None` means no
    /// cross has been seen and the bar is treated as before it. `history` holds
    /// the bars preceding `bar`, oldest first.
    pub fn evaluate(
        &self,
        bar: &Bar,
        last_cross: Option<usize>,
        current_index: usize,
        history: &[Bar],
    ) -> Result<Verdict, InputError> {
        use RejectReason::*;

        bar.validate()?;
        let p = &self.params;

        // 1. Session
        if !p.session.contains(bar.timestamp) {
            return Ok(Verdict::rejected(NotLondonSession));
        }

        // 2. Cross recency
        match last_cross {
            None => return Ok(Verdict::rejected(BeforeCross)),
            Some(cross) if current_index <= cross => return Ok(Verdict::rejected(BeforeCross)),
            Some(cross) if current_index - cross == 1 => {
                return Ok(Verdict::rejected(FirstSessionAfterCross))
            }
            Some(_) => {}
        }

        // 3. Bias alignment
        let ema34 = require_present("ema34", bar.ema34)?;
        let ema200 = require_present("ema200", bar.ema200)?;
        let aligned = match p.side {
            Side::Long => bar.close > ema200 && ema34 > ema200,
            Side::Short => bar.close < ema200 && ema34 < ema200,
        };
        if !aligned {
            return Ok(Verdict::rejected(BiasNotAligned));
        }

        // 4. Liquidity sweep
        let signals = self.analyzer.analyze(bar, history);
        if !signals.liquidity_sweep {
            return Ok(Verdict::rejected(NoLiquiditySweep));
        }

        // 5. Confirmation candle
        let Some(avg_body) = average_body(history, p.body_lookback)? else {
            return Ok(Verdict::rejected(InsufficientHistory));
        };
        if bar.body() < avg_body {
            return Ok(Verdict::rejected(BodyTooSmall));
        }
        let wick = match p.side {
            Side::Long => bar.high - bar.close,
            Side::Short => bar.close - bar.low,
        };
        if wick > p.wick_limit(avg_body) + price_tolerance(bar.close) {
            return Ok(Verdict::rejected(WickTooLarge));
        }

        // 6. Retest
        if !signals.retest_confirmed {
            return Ok(Verdict::rejected(NoRetest));
        }

        // 7. Stop / target feasibility
        let Some(sl_zone) = signals.sl_zone else {
            return Ok(Verdict::rejected(NoStopZone));
        };
        let sl_zone = require_finite("sl_zone", sl_zone)?;
        let entry = require_finite("entry_price", bar.entry())?;
        let sl_distance = (entry - sl_zone).abs();
        let eps = price_tolerance(entry);
        if sl_distance < p.min_sl_pips - eps {
            return Ok(Verdict::rejected(StopTooTight));
        }
        if sl_distance > p.max_sl_pips + eps {
            return Ok(Verdict::rejected(StopTooWide));
        }
        let tp_distance = p.rr_target * sl_distance;
        if !signals.can_reach_tp {
            return Ok(Verdict::rejected(TargetNotFeasible));
        }

        // 8. Sizing
        let lot_size = self.sizer.lot_size(&SizingContext {
            side: p.side,
            entry,
            stop: sl_zone,
            sl_distance,
        });
        if !(lot_size.is_finite() && lot_size > 0.0) {
            return Ok(Verdict::rejected(InvalidLotSize));
        }

        // 9. Accept
        Ok(Verdict::Accepted {
            candidate: TradeCandidate {
                side: p.side,
                entry,
                stop: sl_zone,
                target: entry + p.side.sign() * tp_distance,
                score: bar.score(),
                lot_size,
            },
        })
    }
}

/// Slack for bound checks on differences of quoted prices, so a distance
/// that is exactly on a bound in decimal (1.2050 - 1.2000) is not lost to
/// rounding.
fn price_tolerance(price: f64) -> f64 {
    1e-9 * price.abs().max(1.0)
}

/// Mean body of the last `lookback` bars of `history`; `None` when too short.
fn average_body(history: &[Bar], lookback: usize) -> Result<Option<f64>, InputError> {
    if history.len() < lookback || lookback == 0 {
        return Ok(None);
    }
    let recent = &history[history.len() - lookback..];
    let mut sum = 0.0;
    for b in recent {
        require_finite("open", b.open)?;
        require_finite("close", b.close)?;
        sum += b.body();
    }
    Ok(Some(sum / lookback as f64))
}

/// One-shot evaluation with the default analyzer (bar flags) and the sizer
/// from `params.sizing`.
pub fn evaluate_setup(
    bar: &Bar,
    last_cross: Option<usize>,
    current_index: usize,
    history: &[Bar],
    params: &SetupParams,
) -> Result<Verdict, InputError> {
    SetupQualifier::new(params.clone())?.evaluate(bar, last_cross, current_index, history)
}
