//! Subsonic CLI — watchlist scan and setup qualification commands.
//!
//! Commands:
//! - `scan` — download the watchlist, classify bias/momentum per instrument, write CSV
//! - `qualify` — replay a bar file through the setup qualifier

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use subsonic_core::data::{read_bars, CsvProvider, DataProvider, YahooProvider};
use subsonic_core::qualifier::{replay, ReplaySummary, SetupParams, SetupQualifier, Verdict};
use subsonic_runner::{
    export_verdicts_json, scan_watchlist, write_scan_csv, write_verdicts_csv, RetryPolicy,
    ScanConfig, ScanOutcome, ScanReport,
};
use tracing::{error, info};

/// Exit code when every instrument in the watchlist failed.
const EXIT_ALL_FAILED: i32 = 2;

#[derive(Parser)]
#[command(
    name = "subsonic",
    about = "Subsonic — HTF bias scanner and London-session setup qualifier"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the watchlist and write one CSV row per instrument.
    Scan {
        /// Path to a TOML scan config. Defaults to the built-in watchlist.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output CSV. Overrides `output_csv` from the config.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Read `<data-dir>/<symbol>.csv` instead of downloading.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Bar directory for offline mode.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
    /// Replay a bar CSV through the setup qualifier.
    Qualify {
        /// Bar CSV (timestamp, OHLC, optional EMA and structure columns).
        #[arg(long)]
        bars: PathBuf,

        /// Setup parameters TOML.
        #[arg(long)]
        params: PathBuf,

        /// Write every bar's verdict to this CSV.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print verdicts as JSON instead of the text summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("subsonic_runner=info".parse()?)
                .add_directive("subsonic=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            config,
            output,
            offline,
            data_dir,
        } => run_scan(config.as_deref(), output, offline, data_dir),
        Commands::Qualify {
            bars,
            params,
            output,
            json,
        } => run_qualify(&bars, &params, output.as_deref(), json),
    }
}

fn run_scan(
    config_path: Option<&Path>,
    output: Option<PathBuf>,
    offline: bool,
    data_dir: PathBuf,
) -> Result<()> {
    let config = match config_path {
        Some(path) => ScanConfig::from_file(path)?,
        None => ScanConfig::default(),
    };
    let output = output.unwrap_or_else(|| config.output_csv.clone());

    let provider: Box<dyn DataProvider> = if offline {
        Box::new(CsvProvider::new(data_dir))
    } else {
        Box::new(YahooProvider::new().context("failed to build HTTP client")?)
    };

    let policy = RetryPolicy::from_config(&config);
    let report = scan_watchlist(provider.as_ref(), &config, &policy, Utc::now());

    write_scan_csv(&report, &output)?;
    print_scan_summary(&report);

    if report.all_failed() {
        error!("all downloads failed");
        std::process::exit(EXIT_ALL_FAILED);
    }

    info!(rows = report.rows.len(), output = %output.display(), "scan complete");
    Ok(())
}

fn print_scan_summary(report: &ScanReport) {
    println!(
        "{:<10} {:<10} {:>12} {:>12} {:>12} {:<8} {:<8} {:<6} {:>5}",
        "ticker", "symbol", "close", "ema34", "ema200", "bias", "momentum", "cross", "score"
    );
    for row in &report.rows {
        match &row.outcome {
            ScanOutcome::Reading(t) => println!(
                "{:<10} {:<10} {:>12.5} {:>12} {:>12} {:<8} {:<8} {:<6} {:>5}",
                row.ticker,
                row.symbol,
                t.last_close,
                fmt_opt(t.ema34),
                fmt_opt(t.ema200),
                t.bias,
                t.momentum,
                t.recent_cross,
                t.score
            ),
            ScanOutcome::Failed { error } => {
                println!("{:<10} {:<10} error: {error}", row.ticker, row.symbol)
            }
        }
    }
    println!(
        "\n{} instruments, {} aligned, {} failed",
        report.rows.len(),
        report.aligned().count(),
        report.failed()
    );
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.5}")).unwrap_or_else(|| "-".into())
}

fn run_qualify(bars_path: &Path, params_path: &Path, output: Option<&Path>, json: bool) -> Result<()> {
    let bars = read_bars(bars_path)
        .with_context(|| format!("failed to load bars from {}", bars_path.display()))?;
    let params = SetupParams::from_file(params_path)?;
    let qualifier = SetupQualifier::new(params)?;

    info!(bars = bars.len(), side = %qualifier.params().side, "replaying");
    let verdicts = replay(&bars, &qualifier)?;

    if let Some(path) = output {
        write_verdicts_csv(&verdicts, path)?;
        info!(output = %path.display(), "verdicts written");
    }

    if json {
        println!("{}", export_verdicts_json(&verdicts)?);
        return Ok(());
    }

    let summary = ReplaySummary::from_verdicts(&verdicts);
    let params = qualifier.params();
    println!(
        "Side: {}  Session: {}  RR: {}",
        params.side,
        params.session.describe(),
        params.rr_target
    );
    println!(
        "Bars: {}  Accepted: {}  Rejected: {}",
        summary.bars,
        summary.accepted,
        summary.rejected()
    );
    for (reason, count) in &summary.rejections {
        println!("  [{}] {:<28} {count}", reason.stage(), reason.description());
    }

    for v in &verdicts {
        if let Verdict::Accepted { candidate: c } = &v.verdict {
            println!(
                "  #{:<5} {}  {} entry={} stop={} target={} lot={} score={}",
                v.index,
                v.timestamp.format("%Y-%m-%d %H:%M"),
                c.side,
                c.entry,
                c.stop,
                c.target,
                c.lot_size,
                c.score
            );
        }
    }

    Ok(())
}
