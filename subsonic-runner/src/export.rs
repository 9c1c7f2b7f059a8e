//! Export — scan rows and replay verdicts as CSV, verdicts as JSON.
//!
//! CSV files are overwritten on every run. Empty cells stand for values the
//! run could not produce (no EMA yet, failed instrument, rejected setup).

use std::path::Path;

use anyhow::{Context, Result};
use subsonic_core::qualifier::{BarVerdict, Verdict};

use crate::scan::{ScanOutcome, ScanReport};

/// Scan CSV header, one row per instrument.
pub const SCAN_COLUMNS: [&str; 11] = [
    "run_time",
    "ticker",
    "symbol",
    "last_close",
    "ema34",
    "ema200",
    "bias",
    "momentum",
    "ema_cross_recent",
    "score",
    "notes",
];

/// Verdict CSV header, one row per replayed bar.
pub const VERDICT_COLUMNS: [&str; 10] = [
    "index",
    "timestamp",
    "verdict",
    "reason",
    "side",
    "entry",
    "stop",
    "target",
    "lot_size",
    "score",
];

fn opt(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

// ─── Scan CSV ───────────────────────────────────────────────────────

/// Render a scan report as CSV.
///
/// Failed instruments carry `error` in both bias and momentum and the
/// failure message in `notes`.
pub fn export_scan_csv(report: &ScanReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(SCAN_COLUMNS)?;

    let run_time = report.run_time.to_rfc3339();
    for row in &report.rows {
        match &row.outcome {
            ScanOutcome::Reading(t) => wtr.write_record([
                run_time.clone(),
                row.ticker.clone(),
                row.symbol.clone(),
                t.last_close.to_string(),
                opt(t.ema34),
                opt(t.ema200),
                t.bias.to_string(),
                t.momentum.to_string(),
                t.recent_cross.to_string(),
                t.score.to_string(),
                String::new(),
            ])?,
            ScanOutcome::Failed { error } => wtr.write_record([
                run_time.clone(),
                row.ticker.clone(),
                row.symbol.clone(),
                String::new(),
                String::new(),
                String::new(),
                "error".to_string(),
                "error".to_string(),
                String::new(),
                String::new(),
                format!("download error: {error}"),
            ])?,
        }
    }

    let bytes = wtr.into_inner().context("failed to flush scan CSV")?;
    String::from_utf8(bytes).context("scan CSV is not valid UTF-8")
}

/// Write the scan CSV to `path`, replacing any previous run.
pub fn write_scan_csv(report: &ScanReport, path: &Path) -> Result<()> {
    let csv = export_scan_csv(report)?;
    std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Verdict CSV / JSON ─────────────────────────────────────────────

pub fn export_verdicts_csv(verdicts: &[BarVerdict]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(VERDICT_COLUMNS)?;

    for v in verdicts {
        let index = v.index.to_string();
        let timestamp = v.timestamp.to_rfc3339();
        match &v.verdict {
            Verdict::Accepted { candidate: c } => wtr.write_record([
                index,
                timestamp,
                "accepted".to_string(),
                String::new(),
                c.side.to_string(),
                c.entry.to_string(),
                c.stop.to_string(),
                c.target.to_string(),
                c.lot_size.to_string(),
                c.score.to_string(),
            ])?,
            Verdict::Rejected { reason } => wtr.write_record([
                index,
                timestamp,
                "rejected".to_string(),
                reason.to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            ])?,
        }
    }

    let bytes = wtr.into_inner().context("failed to flush verdict CSV")?;
    String::from_utf8(bytes).context("verdict CSV is not valid UTF-8")
}

pub fn write_verdicts_csv(verdicts: &[BarVerdict], path: &Path) -> Result<()> {
    let csv = export_verdicts_csv(verdicts)?;
    std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}

pub fn export_verdicts_json(verdicts: &[BarVerdict]) -> Result<String> {
    serde_json::to_string_pretty(verdicts).context("failed to serialize verdicts to JSON")
}
