//! Data module - CSV loading and normalized series types

mod loader;
mod series;

pub use loader::{CsvLoader, LoadDiagnostics, LoadError, LoadedSeries, HEADER_SCAN_LIMIT};
pub use series::{DuplicatePolicy, Series, SeriesError, TimeSeriesPoint};
