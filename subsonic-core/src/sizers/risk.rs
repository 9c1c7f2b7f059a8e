//! Risk-based lot sizer
//!
//! Classic risk management: lose at most `risk_pct` of the balance if the
//! stop is hit.

use super::{LotSizer, SizingContext};

/// # Formula
/// ```text
/// risk_money = balance * risk_pct
/// stop_pips  = sl_distance / pip_size
/// lots       = risk_money / (stop_pips * pip_value_per_lot)
/// ```
/// floored to a multiple of `lot_step`.
///
/// # Example
/// - Balance 10,000, risk 1% (100)
/// - Stop 20 pips on EURUSD (pip 0.0001, 10 per pip per standard lot)
/// - Lots: 100 / (20 * 10) = 0.50
#[derive(Debug, Clone, PartialEq)]
pub struct RiskBasedLot {
    pub balance: f64,
    /// Fraction of balance at risk (0.01 = 1%)
    pub risk_pct: f64,
    pub pip_size: f64,
    pub pip_value_per_lot: f64,
    pub lot_step: f64,
}

impl LotSizer for RiskBasedLot {
    fn lot_size(&self, ctx: &SizingContext) -> f64 {
        let inputs = [
            self.balance,
            self.risk_pct,
            self.pip_size,
            self.pip_value_per_lot,
            ctx.sl_distance,
        ];
        if inputs.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return 0.0;
        }

        let risk_money = self.balance * self.risk_pct;
        let stop_pips = ctx.sl_distance / self.pip_size;
        let raw = risk_money / (stop_pips * self.pip_value_per_lot);

        if self.lot_step > 0.0 && self.lot_step.is_finite() {
            // small epsilon so 0.5 / 0.01 = 49.999... still lands on 50 steps
            (raw / self.lot_step + 1e-9).floor() * self.lot_step
        } else {
            raw
        }
    }

    fn name(&self) -> &str {
        "risk_based_lot"
    }
}
