//! Lot sizers — determine position size for an accepted setup.
//!
//! Sizers turn a stop distance into a lot size. They never decide whether a
//! setup qualifies; a non-positive size is turned into a rejection by the
//! qualifier.

pub mod fixed;
pub mod risk;

pub use fixed::FixedLot;
pub use risk::RiskBasedLot;

use serde::{Deserialize, Serialize};

use crate::domain::Side;

/// Everything a sizer may look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingContext {
    pub side: Side,
    pub entry: f64,
    pub stop: f64,
    /// |entry - stop|, in price units.
    pub sl_distance: f64,
}

/// Position sizing logic
///
/// # Returns
/// Lot size to trade. Zero or negative means "cannot size this trade".
pub trait LotSizer: Send + Sync {
    fn lot_size(&self, ctx: &SizingContext) -> f64;

    /// Sizer name for logging
    fn name(&self) -> &str;
}

/// Serializable sizing policy, as it appears in parameter files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SizingPolicy {
    /// Constant lot per trade.
    Fixed { lot: f64 },

    /// Risk a fraction of the account balance between entry and stop.
    RiskBased {
        balance: f64,
        risk_pct: f64,
        pip_size: f64,
        pip_value_per_lot: f64,
        #[serde(default = "default_lot_step")]
        lot_step: f64,
    },
}

fn default_lot_step() -> f64 {
    0.01
}

impl Default for SizingPolicy {
    fn default() -> Self {
        Self::Fixed { lot: 1.0 }
    }
}

impl SizingPolicy {
    pub fn build(&self) -> Box<dyn LotSizer> {
        match *self {
            Self::Fixed { lot } => Box::new(FixedLot::new(lot)),
            Self::RiskBased {
                balance,
                risk_pct,
                pip_size,
                pip_value_per_lot,
                lot_step,
            } => Box::new(RiskBasedLot {
                balance,
                risk_pct,
                pip_size,
                pip_value_per_lot,
                lot_step,
            }),
        }
    }
}
