//! Scan configuration, loaded from TOML.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use subsonic_core::data::FetchRequest;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Watchlist and download settings for one scan run.
///
/// Every field has a default, so a config file only needs the keys it
/// overrides:
///
/// ```toml
/// watchlist = ["EURUSD=X", "GBPUSD=X", "^GDAXI"]
/// interval = "1h"
///
/// [aliases]
/// "^GDAXI" = "DAX40"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Provider symbols, scanned in this order.
    pub watchlist: Vec<String>,

    /// Display names for symbols whose provider code is unfriendly.
    pub aliases: BTreeMap<String, String>,

    /// Bar interval passed to the provider.
    pub interval: String,

    pub lookback_days: u32,

    /// Download attempts per instrument, including the first.
    pub retries: u32,

    /// Exponential backoff base: attempt `n` waits `base^(n-1)` seconds.
    pub backoff_base_secs: u64,

    pub output_csv: PathBuf,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let watchlist = [
            "GBPUSD=X", "EURUSD=X", "EURGBP=X", "GBPJPY=X", "EURJPY=X",
            "XAUUSD=X", "^GDAXI", "^FTSE", "USDCAD=X", "USDJPY=X",
            "AUDUSD=X", "NZDUSD=X", "AUDJPY=X", "NZDJPY=X", "AUDCAD=X",
            "EURCAD=X", "GBPCAD=X", "XAGUSD=X", "USDCHF=X", "BZ=F",
        ];
        let aliases = [("^GDAXI", "DAX40"), ("^FTSE", "FTSE100"), ("BZ=F", "UKOIL")];

        Self {
            watchlist: watchlist.iter().map(|s| s.to_string()).collect(),
            aliases: aliases
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            interval: "4h".into(),
            lookback_days: 90,
            retries: 3,
            backoff_base_secs: 2,
            output_csv: PathBuf::from("scan_results.csv"),
        }
    }
}

impl ScanConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string and validate it.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watchlist.is_empty() {
            return Err(ConfigError::Invalid("watchlist is empty".into()));
        }
        if self.watchlist.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid("watchlist contains a blank symbol".into()));
        }
        if self.interval.trim().is_empty() {
            return Err(ConfigError::Invalid("interval is empty".into()));
        }
        if self.lookback_days == 0 {
            return Err(ConfigError::Invalid("lookback_days must be >= 1".into()));
        }
        if self.retries == 0 {
            return Err(ConfigError::Invalid("retries must be >= 1".into()));
        }
        Ok(())
    }

    /// Friendly name for `symbol`, falling back to the symbol itself.
    pub fn display_name<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.aliases.get(symbol).map(String::as_str).unwrap_or(symbol)
    }

    /// Provider request for a scan ending at `end`.
    pub fn request(&self, end: DateTime<Utc>) -> FetchRequest {
        FetchRequest::new(self.interval.clone(), self.lookback_days, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_full_watchlist() {
        let config = ScanConfig::default();
        assert_eq!(config.watchlist.len(), 20);
        assert_eq!(config.interval, "4h");
        assert_eq!(config.lookback_days, 90);
        assert_eq!(config.retries, 3);
        assert_eq!(config.backoff_base_secs, 2);
        assert_eq!(config.output_csv, PathBuf::from("scan_results.csv"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn display_name_uses_aliases() {
        let config = ScanConfig::default();
        assert_eq!(config.display_name("^GDAXI"), "DAX40");
        assert_eq!(config.display_name("BZ=F"), "UKOIL");
        assert_eq!(config.display_name("EURUSD=X"), "EURUSD=X");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ScanConfig::from_toml(
            r#"
watchlist = ["EURUSD=X", "^FTSE"]
interval = "1h"
"#,
        )
        .unwrap();
        assert_eq!(config.watchlist, vec!["EURUSD=X", "^FTSE"]);
        assert_eq!(config.interval, "1h");
        assert_eq!(config.retries, 3);
        assert_eq!(config.display_name("^FTSE"), "FTSE100");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            ScanConfig::from_toml("watchlist = []"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ScanConfig::from_toml("retries = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ScanConfig::from_toml("retries = \"three\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = ScanConfig::from_file(Path::new("/nonexistent/scan.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
