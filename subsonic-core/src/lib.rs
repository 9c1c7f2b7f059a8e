//! Subsonic Core — trend/bias engine, setup qualifier, lot sizers, data seam.
//!
//! This crate contains:
//! - Domain types (bars, sides)
//! - EMA indicators and the bias/momentum classifier with cross detection
//! - The staged setup qualifier and bar-by-bar replay
//! - Market-structure and lot-sizing seams
//! - Market-data providers (Yahoo chart API, CSV files)

pub mod bias;
pub mod data;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod market_structure;
pub mod qualifier;
pub mod sizers;

pub use bias::{classify_bias, classify_momentum, detect_recent_cross, Bias, TrendReading};
pub use domain::{Bar, Side};
pub use error::InputError;
pub use indicators::compute_emas;
pub use qualifier::{evaluate_setup, SetupParams, SetupQualifier, Verdict};
