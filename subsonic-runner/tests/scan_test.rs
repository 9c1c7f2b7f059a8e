//! Scan end-to-end against in-memory and CSV-file providers.

use chrono::{Duration, TimeZone, Utc};
use std::collections::HashMap;
use subsonic_core::bias::Bias;
use subsonic_core::data::{CsvProvider, DataError, DataProvider, FetchRequest};
use subsonic_core::Bar;
use subsonic_runner::{
    export_scan_csv, fetch_with_retries, scan_watchlist, write_scan_csv, FetchError, RetryPolicy,
    ScanConfig, ScanOutcome,
};

/// Serves fixed bar series; unknown symbols are rate limited.
struct InMemory {
    series: HashMap<String, Vec<Bar>>,
}

impl DataProvider for InMemory {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn fetch(&self, symbol: &str, _request: &FetchRequest) -> Result<Vec<Bar>, DataError> {
        self.series
            .get(symbol)
            .cloned()
            .ok_or(DataError::RateLimited { retry_after_secs: 1 })
    }
}

fn series(closes: impl Iterator<Item = f64>) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .enumerate()
        .map(|(i, c)| Bar::new(base + Duration::hours(4 * i as i64), c, c + 0.5, c - 0.5, c, 0.0))
        .collect()
}

fn config(watchlist: &[&str]) -> ScanConfig {
    ScanConfig {
        watchlist: watchlist.iter().map(|s| s.to_string()).collect(),
        ..ScanConfig::default()
    }
}

fn run_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()
}

#[test]
fn one_failure_does_not_affect_other_rows() {
    let mut map = HashMap::new();
    map.insert("EURUSD=X".to_string(), series((0..300).map(|i| 100.0 + i as f64)));
    map.insert("USDJPY=X".to_string(), series((0..300).map(|i| 400.0 - i as f64)));
    let provider = InMemory { series: map };

    let cfg = config(&["EURUSD=X", "^GDAXI", "USDJPY=X"]);
    let policy = RetryPolicy::from_config(&cfg).without_delay();
    let report = scan_watchlist(&provider, &cfg, &policy, run_time());

    assert_eq!(report.rows.len(), 3);
    assert_eq!(report.failed(), 1);
    assert!(!report.all_failed());

    let symbols: Vec<&str> = report.rows.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols, ["EURUSD=X", "^GDAXI", "USDJPY=X"]);

    let up = report.rows[0].reading().unwrap();
    assert_eq!(up.bias, Bias::Bull);
    assert_eq!(up.momentum, Bias::Bull);
    assert_eq!(up.score, 1);

    assert_eq!(report.rows[1].ticker, "DAX40");
    assert!(matches!(report.rows[1].outcome, ScanOutcome::Failed { .. }));

    let down = report.rows[2].reading().unwrap();
    assert_eq!(down.bias, Bias::Bear);
    assert_eq!(down.score, 1);

    let csv = export_scan_csv(&report).unwrap();
    assert!(csv.contains(",DAX40,^GDAXI,,,,error,error,,,download error:"));
}

#[test]
fn all_failed_when_nothing_downloads() {
    let provider = InMemory { series: HashMap::new() };
    let cfg = config(&["A", "B"]);
    let policy = RetryPolicy::from_config(&cfg).without_delay();
    let report = scan_watchlist(&provider, &cfg, &policy, run_time());
    assert!(report.all_failed());
}

#[test]
fn offline_scan_from_csv_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut body = String::from("timestamp,open,high,low,close\n");
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    for i in 0..60 {
        let c = 1.10 + 0.001 * i as f64;
        let ts = (base + Duration::hours(4 * i)).to_rfc3339();
        body.push_str(&format!("{ts},{c},{},{},{c}\n", c + 0.0005, c - 0.0005));
    }
    std::fs::write(dir.path().join("EURUSD=X.csv"), body).unwrap();

    let provider = CsvProvider::new(dir.path());
    let mut cfg = config(&["EURUSD=X", "GBPUSD=X"]);
    cfg.output_csv = dir.path().join("scan_results.csv");
    let policy = RetryPolicy::from_config(&cfg).without_delay();
    let report = scan_watchlist(&provider, &cfg, &policy, run_time());

    assert_eq!(report.failed(), 1);
    let reading = report.rows[0].reading().unwrap();
    assert!((reading.last_close - 1.159).abs() < 1e-12);
    assert_eq!(reading.bias, Bias::Bull);

    write_scan_csv(&report, &cfg.output_csv).unwrap();
    let mut rdr = csv::Reader::from_path(&cfg.output_csv).unwrap();
    let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 2);
    assert_eq!(&records[0][2], "EURUSD=X");
    assert_eq!(&records[1][6], "error");
}

#[test]
fn stale_csv_fails_without_retrying() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("EURUSD=X.csv"),
        "timestamp,open,high,low,close
2023-01-02T00:00:00Z,1.07,1.08,1.06,1.075
",
    )
    .unwrap();
    let provider = CsvProvider::new(dir.path());
    let request = FetchRequest::new("4h", 90, run_time());
    // Real delays: a retry here would sleep for seconds.
    let policy = RetryPolicy::from_config(&config(&["EURUSD=X"]));

    let started = std::time::Instant::now();
    let err = fetch_with_retries(&provider, "EURUSD=X", &request, &policy).unwrap_err();
    assert!(matches!(
        err,
        FetchError::Fatal { source: DataError::ValidationError(_), .. }
    ));
    assert!(started.elapsed() < std::time::Duration::from_millis(500));
}
