//! Market-structure seam.
//!
//! Liquidity sweeps, retests, target reachability and the stop zone are
//! produced by a detector outside this crate. The qualifier only consumes
//! them through `MarketStructureAnalyzer`.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

/// Signals the qualifier needs from market-structure analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructureSignals {
    pub liquidity_sweep: bool,
    pub retest_confirmed: bool,
    pub can_reach_tp: bool,
    pub sl_zone: Option<f64>,
}

pub trait MarketStructureAnalyzer: Send + Sync {
    fn name(&self) -> &str;

    /// Signals for `bar`, given the bars that precede it.
    fn analyze(&self, bar: &Bar, history: &[Bar]) -> StructureSignals;
}

/// Reads the flags already attached to the bar by an upstream detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct BarFlags;

impl MarketStructureAnalyzer for BarFlags {
    fn name(&self) -> &str {
        "bar_flags"
    }

    fn analyze(&self, bar: &Bar, _history: &[Bar]) -> StructureSignals {
        StructureSignals {
            liquidity_sweep: bar.liquidity_sweep,
            retest_confirmed: bar.retest_confirmed,
            can_reach_tp: bar.can_reach_tp.unwrap_or(true),
            sl_zone: bar.sl_zone,
        }
    }
}
