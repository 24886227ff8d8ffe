//! CSV Data Loader Module
//! Handles Date,Value CSV ingestion and normalization using Polars.
//!
//! Real-world rate exports often carry a couple of metadata banner lines
//! before the actual `Date,Value` header, so the loader scans a bounded
//! window of leading lines for the header before handing the rest to the
//! CSV parser. Rows that fail to parse are discarded and counted, not fatal.

use std::io::Cursor;
use std::path::Path;

use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;

use super::series::{DuplicatePolicy, Series, SeriesError, TimeSeriesPoint};

/// How many leading lines are scanned for the `Date,Value` header.
pub const HEADER_SCAN_LIMIT: usize = 10;

/// Accepted date formats, tried in order. ISO 8601 wins ties.
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%d-%b-%Y"];

#[derive(Error, Debug)]
pub enum LoadError {
    #[error(
        "No header containing Date and Value found in the first {HEADER_SCAN_LIMIT} lines. \
         Provide a CSV with a `Date,Value` header row."
    )]
    HeaderNotFound,
    #[error("Missing '{0}' column")]
    MissingColumn(&'static str),
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("File is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] PolarsError),
    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// Aggregate outcome of a row-tolerant load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadDiagnostics {
    /// Data rows seen below the header.
    pub rows_read: usize,
    /// Rows dropped because the date or the value did not parse.
    pub rows_discarded: usize,
}

/// A normalized series together with its load diagnostics.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub series: Series,
    pub diagnostics: LoadDiagnostics,
}

/// Handles CSV loading, normalization and re-export.
pub struct CsvLoader;

impl CsvLoader {
    pub fn load_path(path: &Path, policy: DuplicatePolicy) -> Result<LoadedSeries, LoadError> {
        let bytes = std::fs::read(path)?;
        Self::load_bytes(&bytes, policy)
    }

    /// Load a complete CSV byte buffer (bundled file or upload).
    pub fn load_bytes(bytes: &[u8], policy: DuplicatePolicy) -> Result<LoadedSeries, LoadError> {
        let text = std::str::from_utf8(bytes)?;

        let header_idx = Self::find_header_line(text).ok_or(LoadError::HeaderNotFound)?;
        let body: String = text
            .lines()
            .skip(header_idx)
            .collect::<Vec<&str>>()
            .join("\n");

        // Read every column as a string; date and value coercion is done
        // manually below so that one bad row never poisons the load.
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_ignore_errors(true)
            .into_reader_with_file_handle(Cursor::new(body))
            .finish()?;

        let date_name = Self::find_column(&df, "date").ok_or(LoadError::MissingColumn("Date"))?;
        let value_name =
            Self::find_column(&df, "value").ok_or(LoadError::MissingColumn("Value"))?;

        let dates = df.column(&date_name)?.as_materialized_series().str()?;
        let values = df.column(&value_name)?.as_materialized_series().str()?;

        let mut points: Vec<TimeSeriesPoint> = Vec::with_capacity(df.height());
        let mut diagnostics = LoadDiagnostics::default();

        for i in 0..df.height() {
            diagnostics.rows_read += 1;
            let parsed = match (dates.get(i), values.get(i)) {
                (Some(d), Some(v)) => Self::parse_date(d).zip(Self::parse_value(v)),
                _ => None,
            };
            match parsed {
                Some((date, value)) => points.push(TimeSeriesPoint::new(date, value)),
                None => diagnostics.rows_discarded += 1,
            }
        }

        let series = Series::from_points(points, policy)?;
        Ok(LoadedSeries {
            series,
            diagnostics,
        })
    }

    /// Serialize a series back to the `Date,Value` shape it was loaded from.
    pub fn to_csv(series: &Series) -> Result<String, LoadError> {
        let dates: Vec<String> = series
            .points()
            .iter()
            .map(|p| p.date.format("%Y-%m-%d").to_string())
            .collect();
        let values: Vec<f64> = series.values();

        let mut df = DataFrame::new(vec![
            Column::new("Date".into(), dates),
            Column::new("Value".into(), values),
        ])?;

        let mut buf: Vec<u8> = Vec::new();
        CsvWriter::new(&mut buf)
            .include_header(true)
            .finish(&mut df)?;

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Scan the leading lines for one containing both expected column
    /// names (case-insensitive). Returns its line index.
    fn find_header_line(text: &str) -> Option<usize> {
        text.lines().take(HEADER_SCAN_LIMIT).position(|line| {
            let mut has_date = false;
            let mut has_value = false;
            for field in line.split(',') {
                let field = field.trim();
                has_date |= field.eq_ignore_ascii_case("date");
                has_value |= field.eq_ignore_ascii_case("value");
            }
            has_date && has_value
        })
    }

    /// Case-insensitive column lookup; other columns are ignored.
    fn find_column(df: &DataFrame, wanted: &str) -> Option<String> {
        df.get_column_names()
            .iter()
            .map(|n| n.to_string())
            .find(|n| n.trim().eq_ignore_ascii_case(wanted))
    }

    fn parse_date(field: &str) -> Option<NaiveDate> {
        let field = field.trim();
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(field, fmt).ok())
    }

    /// Parse a numeric field, tolerating thousands separators ("1,234.5").
    fn parse_value(field: &str) -> Option<f64> {
        let cleaned = field.trim().replace(',', "");
        cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN_CSV: &str = "Date,Value\n2020-01-01,100\n2020-02-01,200\n2020-03-01,300\n";

    fn load(text: &str) -> LoadedSeries {
        CsvLoader::load_bytes(text.as_bytes(), DuplicatePolicy::KeepLast).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn loads_clean_csv() {
        let loaded = load(CLEAN_CSV);
        assert_eq!(loaded.series.len(), 3);
        assert_eq!(loaded.diagnostics.rows_read, 3);
        assert_eq!(loaded.diagnostics.rows_discarded, 0);
        assert_eq!(loaded.series.points()[0].date, d(2020, 1, 1));
        assert_eq!(loaded.series.points()[0].value, 100.0);
    }

    #[test]
    fn skips_leading_metadata_lines() {
        let text = format!("Some Bank PLC\nExported 2020-06-01,,\n\n{CLEAN_CSV}");
        let loaded = load(&text);
        assert_eq!(loaded.series.len(), 3);
        assert_eq!(loaded.diagnostics.rows_discarded, 0);
    }

    #[test]
    fn header_match_is_case_insensitive_and_ignores_extra_columns() {
        let text = "Notes\nDATE,Region,VALUE\n2020-01-01,EU,1.5\n";
        let loaded = load(text);
        assert_eq!(loaded.series.len(), 1);
        assert_eq!(loaded.series.points()[0].value, 1.5);
    }

    #[test]
    fn missing_header_within_scan_window_is_fatal() {
        let mut text = String::new();
        for i in 0..HEADER_SCAN_LIMIT + 2 {
            text.push_str(&format!("metadata line {i}\n"));
        }
        text.push_str(CLEAN_CSV);

        let err = CsvLoader::load_bytes(text.as_bytes(), DuplicatePolicy::KeepLast).unwrap_err();
        assert!(matches!(err, LoadError::HeaderNotFound));
    }

    #[test]
    fn bad_date_row_is_discarded_and_counted() {
        let text = "Date,Value\nnot-a-date,50\n2020-01-01,100\n";
        let loaded = load(text);
        assert_eq!(loaded.series.len(), 1);
        assert_eq!(loaded.diagnostics.rows_read, 2);
        assert_eq!(loaded.diagnostics.rows_discarded, 1);
    }

    #[test]
    fn bad_value_row_is_discarded_and_counted() {
        let text = "Date,Value\n2020-01-01,n/a\n2020-01-02,2\n";
        let loaded = load(text);
        assert_eq!(loaded.series.len(), 1);
        assert_eq!(loaded.diagnostics.rows_discarded, 1);
    }

    #[test]
    fn tolerates_thousands_separators() {
        let text = "Date,Value\n2020-01-01,\"1,234.5\"\n";
        let loaded = load(text);
        assert_eq!(loaded.series.points()[0].value, 1234.5);
    }

    #[test]
    fn accepts_locale_date_variants() {
        let text = "Date,Value\n01/31/2020,1\n31/12/2020,2\n2020/06/15,3\n15-Mar-2020,4\n";
        let loaded = load(text);
        assert_eq!(loaded.diagnostics.rows_discarded, 0);
        let dates: Vec<NaiveDate> = loaded.series.points().iter().map(|p| p.date).collect();
        assert_eq!(
            dates,
            vec![d(2020, 1, 31), d(2020, 3, 15), d(2020, 6, 15), d(2020, 12, 31)]
        );
    }

    #[test]
    fn output_is_sorted_for_unsorted_input() {
        let text = "Date,Value\n2020-03-01,3\n2020-01-01,1\n2020-02-01,2\n";
        let loaded = load(text);
        let dates: Vec<NaiveDate> = loaded.series.points().iter().map(|p| p.date).collect();
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn csv_round_trip_preserves_the_series() {
        let text = "Date,Value\n2020-01-01,100.25\n2020-02-01,200\n2020-03-01,0.125\n";
        let loaded = load(text);

        let exported = CsvLoader::to_csv(&loaded.series).unwrap();
        let reloaded = load(&exported);

        assert_eq!(loaded.series, reloaded.series);
    }
}
