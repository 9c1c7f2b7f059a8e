//! CSV bar files.
//!
//! One file per symbol, header row required. Columns follow `Bar` field
//! names; only `timestamp,open,high,low,close` are mandatory, the indicator
//! and market-structure columns may be omitted or left empty.
//!
//! ```text
//! timestamp,open,high,low,close,volume,liquidity_sweep,retest_confirmed,sl_zone
//! 2024-03-04T08:00:00Z,1.2650,1.2670,1.2640,1.2660,0,false,false,
//! ```

use std::path::{Path, PathBuf};

use super::provider::{DataError, DataProvider, FetchRequest};
use crate::domain::Bar;

/// Read every bar in `path`, enforcing strictly increasing timestamps.
pub fn read_bars(path: &Path) -> Result<Vec<Bar>, DataError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| DataError::Io(format!("open {}: {e}", path.display())))?;

    let mut bars: Vec<Bar> = Vec::new();
    for (row, record) in reader.deserialize::<Bar>().enumerate() {
        let bar = record.map_err(|e| {
            DataError::ValidationError(format!("{} row {}: {e}", path.display(), row + 1))
        })?;
        if let Some(prev) = bars.last() {
            if bar.timestamp <= prev.timestamp {
                return Err(DataError::ValidationError(format!(
                    "{} row {}: timestamp {} is not after {}",
                    path.display(),
                    row + 1,
                    bar.timestamp,
                    prev.timestamp
                )));
            }
        }
        bars.push(bar);
    }
    Ok(bars)
}

/// Serves `<dir>/<symbol>.csv`, restricted to the request window.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_file"
    }

    fn fetch(&self, symbol: &str, request: &FetchRequest) -> Result<Vec<Bar>, DataError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        let bars: Vec<Bar> = read_bars(&path)?
            .into_iter()
            .filter(|b| request.covers(b.timestamp))
            .collect();
        // A stale file will not gain rows on retry.
        if bars.is_empty() {
            return Err(DataError::ValidationError(format!(
                "{}: no bars between {} and {}",
                path.display(),
                request.start(),
                request.end
            )));
        }
        Ok(bars)
    }
}
