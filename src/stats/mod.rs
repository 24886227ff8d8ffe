//! Stats module - resampling and descriptive statistics

mod aggregator;

pub use aggregator::{
    Aggregator, HistogramBin, MonthGroup, ResampleFreq, ResampledSeries, StatsError, SummaryStats,
};
