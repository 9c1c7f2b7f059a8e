//! Qualification outcome: a typed rejection or an immutable trade candidate.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Side;

/// Why a bar did not qualify. Exactly one reason is reported per evaluation:
/// the one from the earliest failing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NotLondonSession,
    BeforeCross,
    FirstSessionAfterCross,
    BiasNotAligned,
    NoLiquiditySweep,
    InsufficientHistory,
    BodyTooSmall,
    WickTooLarge,
    NoRetest,
    NoStopZone,
    StopTooTight,
    StopTooWide,
    TargetNotFeasible,
    InvalidLotSize,
}

impl RejectReason {
    pub const ALL: [RejectReason; 14] = [
        RejectReason::NotLondonSession,
        RejectReason::BeforeCross,
        RejectReason::FirstSessionAfterCross,
        RejectReason::BiasNotAligned,
        RejectReason::NoLiquiditySweep,
        RejectReason::InsufficientHistory,
        RejectReason::BodyTooSmall,
        RejectReason::WickTooLarge,
        RejectReason::NoRetest,
        RejectReason::NoStopZone,
        RejectReason::StopTooTight,
        RejectReason::StopTooWide,
        RejectReason::TargetNotFeasible,
        RejectReason::InvalidLotSize,
    ];

    /// Pipeline stage (1-based) that produces this reason.
    pub fn stage(self) -> u8 {
        match self {
            Self::NotLondonSession => 1,
            Self::BeforeCross | Self::FirstSessionAfterCross => 2,
            Self::BiasNotAligned => 3,
            Self::NoLiquiditySweep => 4,
            Self::InsufficientHistory | Self::BodyTooSmall | Self::WickTooLarge => 5,
            Self::NoRetest => 6,
            Self::NoStopZone | Self::StopTooTight | Self::StopTooWide | Self::TargetNotFeasible => 7,
            Self::InvalidLotSize => 8,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::NotLondonSession => "not in London session",
            Self::BeforeCross => "before EMA cross",
            Self::FirstSessionAfterCross => "first session after EMA cross",
            Self::BiasNotAligned => "bias not aligned with side",
            Self::NoLiquiditySweep => "no liquidity sweep",
            Self::InsufficientHistory => "not enough candles for average body",
            Self::BodyTooSmall => "body not big enough",
            Self::WickTooLarge => "wick too large in entry direction",
            Self::NoRetest => "no retest",
            Self::NoStopZone => "no stop zone",
            Self::StopTooTight => "stop too tight",
            Self::StopTooWide => "stop too wide",
            Self::TargetNotFeasible => "RR target not feasible",
            Self::InvalidLotSize => "invalid lot size",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A qualified setup. Built once from the bar and parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeCandidate {
    pub side: Side,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    pub score: f64,
    pub lot_size: f64,
}

impl TradeCandidate {
    pub fn risk(&self) -> f64 {
        (self.entry - self.stop).abs()
    }

    pub fn reward(&self) -> f64 {
        (self.target - self.entry).abs()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Rejected { reason: RejectReason },
    Accepted { candidate: TradeCandidate },
}

impl Verdict {
    pub fn rejected(reason: RejectReason) -> Self {
        Self::Rejected { reason }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            Self::Rejected { reason } => Some(*reason),
            Self::Accepted { .. } => None,
        }
    }

    pub fn candidate(&self) -> Option<&TradeCandidate> {
        match self {
            Self::Accepted { candidate } => Some(candidate),
            Self::Rejected { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_are_monotonic_in_declaration_order() {
        let stages: Vec<u8> = RejectReason::ALL.iter().map(|r| r.stage()).collect();
        assert!(stages.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(stages.first(), Some(&1));
        assert_eq!(stages.last(), Some(&8));
    }

    #[test]
    fn verdict_accessors() {
        let v = Verdict::rejected(RejectReason::NoRetest);
        assert!(!v.is_accepted());
        assert_eq!(v.reason(), Some(RejectReason::NoRetest));
        assert!(v.candidate().is_none());

        let c = TradeCandidate {
            side: Side::Short,
            entry: 1.3000,
            stop: 1.3020,
            target: 1.2960,
            score: 0.0,
            lot_size: 1.0,
        };
        let v = Verdict::Accepted { candidate: c };
        assert!(v.is_accepted());
        assert_eq!(v.reason(), None);
        let c = v.candidate().unwrap();
        assert!((c.reward() - 2.0 * c.risk()).abs() < 1e-12);
    }

    #[test]
    fn verdict_json_is_tagged() {
        let json = serde_json::to_string(&Verdict::rejected(RejectReason::StopTooWide)).unwrap();
        assert_eq!(json, r#"{"verdict":"rejected","reason":"stop_too_wide"}"#);
    }

    #[test]
    fn display_reads_like_a_log_line() {
        assert_eq!(RejectReason::NotLondonSession.to_string(), "not in London session");
    }
}
