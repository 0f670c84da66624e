//! Immutable histogram statistics

use serde::Serialize;

/// Estimated value at a percentile; `None` when the window is empty
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueAtPercentile {
    pub percentile: f64,
    pub value: Option<f64>,
}

/// Cumulative count of observations not exceeding `bucket`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CountAtBucket {
    pub bucket: f64,
    pub count: u64,
}

/// Point-in-time statistics of a timer, summary or long task timer.
///
/// `count` and `total` cover the meter's whole lifetime. Everything else,
/// `window_count` and `window_total` included, covers the trailing window
/// only, so an idle meter whose windows have all expired reports zeros there.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub total: f64,
    pub window_count: u64,
    pub window_total: f64,
    pub max: f64,
    pub percentile_values: Vec<ValueAtPercentile>,
    pub histogram_counts: Vec<CountAtBucket>,
}

impl HistogramSnapshot {
    /// Snapshot with no observations
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }

    /// Value recorded for a configured percentile
    pub fn percentile(&self, percentile: f64) -> Option<f64> {
        self.percentile_values
            .iter()
            .find(|v| v.percentile == percentile)
            .and_then(|v| v.value)
    }

    /// Cumulative count for a configured boundary
    pub fn count_at(&self, bucket: f64) -> Option<u64> {
        self.histogram_counts
            .iter()
            .find(|c| c.bucket == bucket)
            .map(|c| c.count)
    }

    /// Copy with every value divided by `divisor`; counts are untouched
    pub(crate) fn scaled_down(&self, divisor: f64) -> Self {
        Self {
            count: self.count,
            total: self.total / divisor,
            window_count: self.window_count,
            window_total: self.window_total / divisor,
            max: self.max / divisor,
            percentile_values: self
                .percentile_values
                .iter()
                .map(|v| ValueAtPercentile {
                    percentile: v.percentile,
                    value: v.value.map(|value| value / divisor),
                })
                .collect(),
            histogram_counts: self
                .histogram_counts
                .iter()
                .map(|c| CountAtBucket {
                    bucket: c.bucket / divisor,
                    count: c.count,
                })
                .collect(),
        }
    }
}
