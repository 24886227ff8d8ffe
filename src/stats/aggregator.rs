//! Aggregation Module
//! Resampling, rolling means, monthly groupings and descriptive statistics
//! over a normalized series.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use statrs::statistics::Statistics;
use thiserror::Error;

use crate::data::{Series, TimeSeriesPoint};

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("No data points in the requested range")]
    EmptyRange,
    #[error("Rolling window must be at least 1 (got {0})")]
    InvalidWindow(usize),
    #[error("Histogram needs at least 1 bin (got {0})")]
    InvalidBinCount(usize),
}

/// Calendar resampling frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum ResampleFreq {
    #[default]
    None,
    Weekly,
    Monthly,
    Quarterly,
}

impl ResampleFreq {
    pub const ALL: [ResampleFreq; 4] = [
        ResampleFreq::None,
        ResampleFreq::Weekly,
        ResampleFreq::Monthly,
        ResampleFreq::Quarterly,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ResampleFreq::None => "None",
            ResampleFreq::Weekly => "Weekly",
            ResampleFreq::Monthly => "Monthly",
            ResampleFreq::Quarterly => "Quarterly",
        }
    }

    /// Start of the calendar period containing `date`. Weeks start Monday.
    pub fn period_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            ResampleFreq::None => date,
            ResampleFreq::Weekly => {
                date - Duration::days(date.weekday().num_days_from_monday() as i64)
            }
            ResampleFreq::Monthly => date.with_day(1).unwrap_or(date),
            ResampleFreq::Quarterly => {
                let month = (date.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
            }
        }
    }
}

/// Per-period averages, ordered by period start. Derived data only;
/// recomputed on every parameter change.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledSeries {
    pub freq: ResampleFreq,
    pub points: Vec<TimeSeriesPoint>,
}

/// Raw values observed in one calendar month, for the boxplot.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthGroup {
    pub year: i32,
    pub month: u32,
    pub values: Vec<f64>,
}

impl MonthGroup {
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

/// One equal-width histogram bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

impl HistogramBin {
    pub fn center(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }
}

/// Descriptive statistics bundle for a series slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Handles all derived-view computations over a normalized series.
pub struct Aggregator;

impl Aggregator {
    /// Group points by calendar period start and average each group.
    /// Periods with no points are omitted, never interpolated.
    /// `ResampleFreq::None` returns the input unchanged.
    pub fn resample(points: &[TimeSeriesPoint], freq: ResampleFreq) -> ResampledSeries {
        if freq == ResampleFreq::None {
            return ResampledSeries {
                freq,
                points: points.to_vec(),
            };
        }

        let mut groups: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
        for p in points {
            let entry = groups.entry(freq.period_start(p.date)).or_insert((0.0, 0));
            entry.0 += p.value;
            entry.1 += 1;
        }

        let points = groups
            .into_iter()
            .map(|(date, (sum, n))| TimeSeriesPoint::new(date, sum / n as f64))
            .collect();

        ResampledSeries { freq, points }
    }

    /// Trailing moving average. The first `window - 1` points have no
    /// defined value and are omitted from the output, not zero-filled.
    pub fn rolling_mean(
        points: &[TimeSeriesPoint],
        window: usize,
    ) -> Result<Vec<TimeSeriesPoint>, StatsError> {
        if window == 0 {
            return Err(StatsError::InvalidWindow(window));
        }

        let mut out = Vec::with_capacity(points.len().saturating_sub(window - 1));
        let mut sum = 0.0;
        for (i, p) in points.iter().enumerate() {
            sum += p.value;
            if i + 1 > window {
                sum -= points[i - window].value;
            }
            if i + 1 >= window {
                out.push(TimeSeriesPoint::new(p.date, sum / window as f64));
            }
        }
        Ok(out)
    }

    /// Partition the raw (not resampled) series by calendar month.
    pub fn monthly_groups(points: &[TimeSeriesPoint]) -> Vec<MonthGroup> {
        let mut groups: BTreeMap<(i32, u32), Vec<f64>> = BTreeMap::new();
        for p in points {
            groups
                .entry((p.date.year(), p.date.month()))
                .or_default()
                .push(p.value);
        }
        groups
            .into_iter()
            .map(|((year, month), values)| MonthGroup {
                year,
                month,
                values,
            })
            .collect()
    }

    /// Equal-width histogram over the value distribution.
    pub fn histogram(values: &[f64], bins: usize) -> Result<Vec<HistogramBin>, StatsError> {
        if bins == 0 {
            return Err(StatsError::InvalidBinCount(bins));
        }
        if values.is_empty() {
            return Err(StatsError::EmptyRange);
        }

        let min = Statistics::min(values);
        let max = Statistics::max(values);
        let width = (max - min) / bins as f64;

        // Degenerate distribution: every value identical.
        if width == 0.0 {
            return Ok(vec![HistogramBin {
                lower: min,
                upper: max,
                count: values.len(),
            }]);
        }

        let mut counts = vec![0usize; bins];
        for &v in values {
            let idx = (((v - min) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Ok(counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                lower: min + i as f64 * width,
                upper: min + (i + 1) as f64 * width,
                count,
            })
            .collect())
    }

    /// Descriptive statistics over the full series or a date-filtered slice.
    pub fn summary_stats(
        series: &Series,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<SummaryStats, StatsError> {
        let values: Vec<f64> = match range {
            Some((start, end)) => series
                .points()
                .iter()
                .filter(|p| p.date >= start && p.date <= end)
                .map(|p| p.value)
                .collect(),
            None => series.values(),
        };
        Self::describe(&values)
    }

    /// Compute the stats bundle for a plain value slice.
    pub fn describe(values: &[f64]) -> Result<SummaryStats, StatsError> {
        if values.is_empty() {
            return Err(StatsError::EmptyRange);
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let std = if values.len() > 1 {
            Statistics::std_dev(values)
        } else {
            0.0
        };

        Ok(SummaryStats {
            count: values.len(),
            mean: Statistics::mean(values),
            std,
            min: sorted[0],
            q25: Self::percentile(&sorted, 25.0),
            median: Self::percentile(&sorted, 50.0),
            q75: Self::percentile(&sorted, 75.0),
            max: sorted[sorted.len() - 1],
        })
    }

    /// Percentile with linear interpolation (NumPy compatible).
    pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DuplicatePolicy;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn pt(y: i32, m: u32, day: u32, v: f64) -> TimeSeriesPoint {
        TimeSeriesPoint::new(d(y, m, day), v)
    }

    fn quarterly_scenario() -> Vec<TimeSeriesPoint> {
        vec![
            pt(2020, 1, 1, 100.0),
            pt(2020, 2, 1, 200.0),
            pt(2020, 3, 1, 300.0),
        ]
    }

    #[test]
    fn period_start_boundaries() {
        // 2020-06-18 was a Thursday.
        assert_eq!(
            ResampleFreq::Weekly.period_start(d(2020, 6, 18)),
            d(2020, 6, 15)
        );
        assert_eq!(
            ResampleFreq::Monthly.period_start(d(2020, 6, 18)),
            d(2020, 6, 1)
        );
        assert_eq!(
            ResampleFreq::Quarterly.period_start(d(2020, 6, 18)),
            d(2020, 4, 1)
        );
        assert_eq!(
            ResampleFreq::None.period_start(d(2020, 6, 18)),
            d(2020, 6, 18)
        );
    }

    #[test]
    fn monthly_resample_keeps_single_point_periods() {
        let resampled = Aggregator::resample(&quarterly_scenario(), ResampleFreq::Monthly);
        assert_eq!(resampled.points.len(), 3);
        assert_eq!(
            resampled.points,
            vec![
                pt(2020, 1, 1, 100.0),
                pt(2020, 2, 1, 200.0),
                pt(2020, 3, 1, 300.0),
            ]
        );
    }

    #[test]
    fn quarterly_resample_averages_the_quarter() {
        let resampled = Aggregator::resample(&quarterly_scenario(), ResampleFreq::Quarterly);
        assert_eq!(resampled.points, vec![pt(2020, 1, 1, 200.0)]);
    }

    #[test]
    fn resample_averages_within_a_period_and_omits_empty_ones() {
        let points = vec![
            pt(2020, 1, 10, 10.0),
            pt(2020, 1, 20, 30.0),
            // February has no data: no period emitted for it.
            pt(2020, 3, 5, 7.0),
        ];
        let resampled = Aggregator::resample(&points, ResampleFreq::Monthly);
        assert_eq!(
            resampled.points,
            vec![pt(2020, 1, 1, 20.0), pt(2020, 3, 1, 7.0)]
        );
    }

    #[test]
    fn monthly_resample_is_idempotent() {
        let points = vec![
            pt(2020, 1, 3, 1.0),
            pt(2020, 1, 17, 3.0),
            pt(2020, 2, 9, 5.0),
        ];
        let once = Aggregator::resample(&points, ResampleFreq::Monthly);
        let twice = Aggregator::resample(&once.points, ResampleFreq::Monthly);
        assert_eq!(once, twice);
    }

    #[test]
    fn rolling_mean_window_one_is_identity() {
        let points = quarterly_scenario();
        let rolled = Aggregator::rolling_mean(&points, 1).unwrap();
        assert_eq!(rolled, points);
    }

    #[test]
    fn rolling_mean_omits_warmup_points() {
        let points = vec![
            pt(2020, 1, 1, 1.0),
            pt(2020, 1, 2, 2.0),
            pt(2020, 1, 3, 3.0),
            pt(2020, 1, 4, 6.0),
        ];
        let rolled = Aggregator::rolling_mean(&points, 3).unwrap();
        assert_eq!(
            rolled,
            vec![pt(2020, 1, 3, 2.0), pt(2020, 1, 4, 11.0 / 3.0)]
        );
    }

    #[test]
    fn rolling_mean_rejects_zero_window() {
        let err = Aggregator::rolling_mean(&quarterly_scenario(), 0).unwrap_err();
        assert!(matches!(err, StatsError::InvalidWindow(0)));
    }

    #[test]
    fn monthly_groups_partition_raw_values_in_order() {
        let points = vec![
            pt(2020, 2, 1, 4.0),
            pt(2020, 1, 5, 1.0),
            pt(2020, 1, 20, 2.0),
        ];
        let groups = Aggregator::monthly_groups(&points);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label(), "2020-01");
        assert_eq!(groups[0].values, vec![1.0, 2.0]);
        assert_eq!(groups[1].label(), "2020-02");
        assert_eq!(groups[1].values, vec![4.0]);
    }

    #[test]
    fn histogram_counts_every_value() {
        let values = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 5.0];
        let bins = Aggregator::histogram(&values, 5).unwrap();
        assert_eq!(bins.len(), 5);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), values.len());
        // Max value lands in the last bin.
        assert_eq!(bins[4].count, 3);
    }

    #[test]
    fn histogram_of_constant_values_is_a_single_bin() {
        let bins = Aggregator::histogram(&[2.5, 2.5, 2.5], 30).unwrap();
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 3);
    }

    #[test]
    fn histogram_rejects_zero_bins() {
        let err = Aggregator::histogram(&[1.0], 0).unwrap_err();
        assert!(matches!(err, StatsError::InvalidBinCount(0)));
    }

    #[test]
    fn describe_matches_known_values() {
        let stats = Aggregator::describe(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(stats.count, 5);
        assert!((stats.mean - 3.0).abs() < 1e-12);
        assert!((stats.std - 2.5f64.sqrt()).abs() < 1e-12);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.q25, 2.0);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.q75, 4.0);
        assert_eq!(stats.max, 5.0);
    }

    #[test]
    fn summary_stats_over_empty_range_is_an_error() {
        let series = Series::from_points(quarterly_scenario(), DuplicatePolicy::KeepLast).unwrap();
        let err = Aggregator::summary_stats(&series, Some((d(2021, 1, 1), d(2021, 12, 31))))
            .unwrap_err();
        assert!(matches!(err, StatsError::EmptyRange));
    }

    #[test]
    fn summary_stats_respects_the_date_filter() {
        let series = Series::from_points(quarterly_scenario(), DuplicatePolicy::KeepLast).unwrap();
        let stats = Aggregator::summary_stats(&series, Some((d(2020, 1, 1), d(2020, 2, 28))))
            .unwrap();
        assert_eq!(stats.count, 2);
        assert!((stats.mean - 150.0).abs() < 1e-12);
    }
}
