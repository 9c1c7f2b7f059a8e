//! Market-data seam: the provider trait plus Yahoo and CSV-file implementations.
//!
//! Nothing in the bias engine or qualifier depends on this module; it only
//! supplies ordered bar sequences.

pub mod csv_file;
pub mod provider;
pub mod yahoo;

pub use csv_file::{read_bars, CsvProvider};
pub use provider::{DataError, DataProvider, FetchRequest};
pub use yahoo::YahooProvider;
