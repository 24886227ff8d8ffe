//! Series Model Module
//! Normalized time-series types shared by the loader, the aggregator and the GUI.

use chrono::NaiveDate;
use thiserror::Error;

/// A single observation: one calendar date, one finite value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// How to resolve two input rows carrying the same date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum DuplicatePolicy {
    KeepFirst,
    #[default]
    KeepLast,
    Average,
    Reject,
}

impl DuplicatePolicy {
    pub const ALL: [DuplicatePolicy; 4] = [
        DuplicatePolicy::KeepFirst,
        DuplicatePolicy::KeepLast,
        DuplicatePolicy::Average,
        DuplicatePolicy::Reject,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DuplicatePolicy::KeepFirst => "Keep first",
            DuplicatePolicy::KeepLast => "Keep last",
            DuplicatePolicy::Average => "Average",
            DuplicatePolicy::Reject => "Reject",
        }
    }
}

#[derive(Error, Debug)]
pub enum SeriesError {
    #[error("Duplicate timestamp {0} (duplicate policy is Reject)")]
    DuplicateTimestamp(NaiveDate),
    #[error("No data points in range {start} to {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },
}

/// Normalized, immutable time series: sorted ascending, dates strictly
/// increasing, all values finite. Construct through [`Series::from_points`];
/// a reload produces a new `Series` rather than mutating an old one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    points: Vec<TimeSeriesPoint>,
}

impl Series {
    /// Normalize raw points: sort by date (stable, so input order breaks
    /// ties) and collapse duplicate dates per `policy`.
    pub fn from_points(
        mut points: Vec<TimeSeriesPoint>,
        policy: DuplicatePolicy,
    ) -> Result<Self, SeriesError> {
        points.sort_by_key(|p| p.date);

        let mut out: Vec<TimeSeriesPoint> = Vec::with_capacity(points.len());
        let mut run_len = 0usize; // length of the duplicate run ending at out.last()

        for p in points {
            match out.last_mut() {
                Some(last) if last.date == p.date => match policy {
                    DuplicatePolicy::KeepFirst => {}
                    DuplicatePolicy::KeepLast => last.value = p.value,
                    DuplicatePolicy::Average => {
                        let n = run_len as f64;
                        last.value = (last.value * n + p.value) / (n + 1.0);
                        run_len += 1;
                    }
                    DuplicatePolicy::Reject => {
                        return Err(SeriesError::DuplicateTimestamp(p.date));
                    }
                },
                _ => {
                    out.push(p);
                    run_len = 1;
                }
            }
        }

        Ok(Self { points: out })
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Inclusive date-range slice. An empty result is an error so the GUI
    /// can keep the previous valid view.
    pub fn filter_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Series, SeriesError> {
        let points: Vec<TimeSeriesPoint> = self
            .points
            .iter()
            .copied()
            .filter(|p| p.date >= start && p.date <= end)
            .collect();

        if points.is_empty() {
            return Err(SeriesError::EmptyRange { start, end });
        }
        Ok(Series { points })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn pt(y: i32, m: u32, day: u32, v: f64) -> TimeSeriesPoint {
        TimeSeriesPoint::new(d(y, m, day), v)
    }

    #[test]
    fn from_points_sorts_regardless_of_input_order() {
        let series = Series::from_points(
            vec![pt(2020, 3, 1, 3.0), pt(2020, 1, 1, 1.0), pt(2020, 2, 1, 2.0)],
            DuplicatePolicy::KeepLast,
        )
        .unwrap();

        let dates: Vec<NaiveDate> = series.points().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![d(2020, 1, 1), d(2020, 2, 1), d(2020, 3, 1)]);
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn duplicate_keep_last_takes_later_row() {
        let series = Series::from_points(
            vec![pt(2020, 1, 1, 1.0), pt(2020, 1, 1, 9.0)],
            DuplicatePolicy::KeepLast,
        )
        .unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.points()[0].value, 9.0);
    }

    #[test]
    fn duplicate_keep_first_takes_earlier_row() {
        let series = Series::from_points(
            vec![pt(2020, 1, 1, 1.0), pt(2020, 1, 1, 9.0)],
            DuplicatePolicy::KeepFirst,
        )
        .unwrap();
        assert_eq!(series.points()[0].value, 1.0);
    }

    #[test]
    fn duplicate_average_means_the_run() {
        let series = Series::from_points(
            vec![pt(2020, 1, 1, 1.0), pt(2020, 1, 1, 2.0), pt(2020, 1, 1, 6.0)],
            DuplicatePolicy::Average,
        )
        .unwrap();
        assert_eq!(series.len(), 1);
        assert!((series.points()[0].value - 3.0).abs() < 1e-12);
    }

    #[test]
    fn duplicate_reject_errors() {
        let err = Series::from_points(
            vec![pt(2020, 1, 1, 1.0), pt(2020, 1, 1, 9.0)],
            DuplicatePolicy::Reject,
        )
        .unwrap_err();
        assert!(matches!(err, SeriesError::DuplicateTimestamp(date) if date == d(2020, 1, 1)));
    }

    #[test]
    fn filter_range_is_inclusive() {
        let series = Series::from_points(
            vec![pt(2020, 1, 1, 1.0), pt(2020, 2, 1, 2.0), pt(2020, 3, 1, 3.0)],
            DuplicatePolicy::KeepLast,
        )
        .unwrap();

        let filtered = series.filter_range(d(2020, 1, 1), d(2020, 2, 1)).unwrap();
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn filter_range_with_no_rows_is_empty_range_error() {
        let series =
            Series::from_points(vec![pt(2020, 1, 1, 1.0)], DuplicatePolicy::KeepLast).unwrap();
        let err = series
            .filter_range(d(2021, 1, 1), d(2021, 12, 31))
            .unwrap_err();
        assert!(matches!(err, SeriesError::EmptyRange { .. }));
    }
}
