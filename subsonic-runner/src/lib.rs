//! Subsonic Runner — watchlist scans over the core bias engine.
//!
//! This crate builds on `subsonic-core` to provide:
//! - TOML scan configuration with the default instrument watchlist
//! - Downloads with retries and exponential backoff
//! - Parallel per-instrument trend readings with isolated failures
//! - CSV/JSON export of scan rows and replay verdicts

pub mod config;
pub mod export;
pub mod fetch;
pub mod scan;

pub use config::{ConfigError, ScanConfig};
pub use export::{
    export_scan_csv, export_verdicts_csv, export_verdicts_json, write_scan_csv,
    write_verdicts_csv,
};
pub use fetch::{fetch_with_retries, FetchError, RetryPolicy};
pub use scan::{scan_symbol, scan_watchlist, ScanError, ScanOutcome, ScanReport, ScanRow};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn scan_types_are_send_sync() {
        assert_send::<ScanConfig>();
        assert_sync::<ScanConfig>();
        assert_send::<ScanRow>();
        assert_sync::<ScanRow>();
        assert_send::<ScanError>();
        assert_sync::<ScanError>();
    }
}
