//! Per-meter distribution statistics configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::buckets::percentile_histogram_buckets;
use crate::config::RegistryConfig;

/// Distribution statistics configuration for timers, summaries and long task timers.
///
/// Every field is optional so configs can be layered: builder settings first,
/// then whatever filters contribute, then registry defaults. Values are in the
/// meter's recording unit (nanoseconds for timers).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Publish fixed buckets suitable for server-side percentile aggregation
    pub percentile_histogram: Option<bool>,
    /// Percentiles (0.0..=1.0) to estimate client-side
    pub percentiles: Option<Vec<f64>>,
    /// Resolution of the client-side sketch
    pub percentile_precision: Option<u32>,
    /// SLA boundaries that always get a cumulative count
    pub service_level_objectives: Option<Vec<f64>>,
    /// Lower clamp for generated buckets and sketch range
    pub minimum_expected_value: Option<f64>,
    /// Upper clamp for generated buckets and sketch range
    pub maximum_expected_value: Option<f64>,
    /// Trailing window covered by decaying statistics
    #[serde(with = "humantime_serde")]
    pub expiry: Option<Duration>,
    /// Number of ring buckets in the trailing window
    pub buffer_length: Option<usize>,
}

impl DistributionConfig {
    /// Defaults for timers, in nanoseconds: 1ms..30s expected range
    pub fn timer_defaults(registry: &RegistryConfig) -> Self {
        Self {
            minimum_expected_value: Some(Duration::from_millis(1).as_nanos() as f64),
            maximum_expected_value: Some(Duration::from_secs(30).as_nanos() as f64),
            ..Self::registry_defaults(registry)
        }
    }

    /// Defaults for distribution summaries: 1..u64::MAX expected range
    pub fn summary_defaults(registry: &RegistryConfig) -> Self {
        Self {
            minimum_expected_value: Some(1.0),
            maximum_expected_value: Some(u64::MAX as f64),
            ..Self::registry_defaults(registry)
        }
    }

    fn registry_defaults(registry: &RegistryConfig) -> Self {
        Self {
            percentile_histogram: Some(false),
            percentiles: Some(Vec::new()),
            percentile_precision: Some(registry.percentile_precision),
            service_level_objectives: Some(Vec::new()),
            minimum_expected_value: None,
            maximum_expected_value: None,
            expiry: Some(registry.histogram_expiry),
            buffer_length: Some(registry.histogram_buffer_length),
        }
    }

    /// Fill every unset field from `parent`
    pub fn merge(self, parent: &DistributionConfig) -> Self {
        Self {
            percentile_histogram: self.percentile_histogram.or(parent.percentile_histogram),
            percentiles: self.percentiles.or_else(|| parent.percentiles.clone()),
            percentile_precision: self.percentile_precision.or(parent.percentile_precision),
            service_level_objectives: self
                .service_level_objectives
                .or_else(|| parent.service_level_objectives.clone()),
            minimum_expected_value: self.minimum_expected_value.or(parent.minimum_expected_value),
            maximum_expected_value: self.maximum_expected_value.or(parent.maximum_expected_value),
            expiry: self.expiry.or(parent.expiry),
            buffer_length: self.buffer_length.or(parent.buffer_length),
        }
    }

    pub fn with_percentile_histogram(mut self, enabled: bool) -> Self {
        self.percentile_histogram = Some(enabled);
        self
    }

    pub fn with_percentiles(mut self, percentiles: impl Into<Vec<f64>>) -> Self {
        self.percentiles = Some(percentiles.into());
        self
    }

    pub fn with_percentile_precision(mut self, precision: u32) -> Self {
        self.percentile_precision = Some(precision);
        self
    }

    pub fn with_service_level_objectives(mut self, boundaries: impl Into<Vec<f64>>) -> Self {
        self.service_level_objectives = Some(boundaries.into());
        self
    }

    pub fn with_minimum_expected_value(mut self, value: f64) -> Self {
        self.minimum_expected_value = Some(value);
        self
    }

    pub fn with_maximum_expected_value(mut self, value: f64) -> Self {
        self.maximum_expected_value = Some(value);
        self
    }

    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn with_buffer_length(mut self, length: usize) -> Self {
        self.buffer_length = Some(length);
        self
    }

    /// Requested percentiles that fall inside 0.0..=1.0
    pub fn valid_percentiles(&self) -> Vec<f64> {
        let mut percentiles: Vec<f64> = self
            .percentiles
            .iter()
            .flatten()
            .copied()
            .filter(|p| (0.0..=1.0).contains(p))
            .collect();
        percentiles.sort_by(f64::total_cmp);
        percentiles.dedup();
        percentiles
    }

    pub fn is_publishing_percentiles(&self) -> bool {
        !self.valid_percentiles().is_empty()
    }

    pub fn is_publishing_histogram(&self) -> bool {
        self.percentile_histogram.unwrap_or(false)
            || self
                .service_level_objectives
                .as_ref()
                .is_some_and(|slo| !slo.is_empty())
    }

    /// Sorted, de-duplicated fixed boundaries: SLAs plus generated percentile buckets
    pub fn histogram_boundaries(&self) -> Vec<f64> {
        let mut boundaries: Vec<f64> = self
            .service_level_objectives
            .iter()
            .flatten()
            .copied()
            .filter(|b| b.is_finite() && *b >= 0.0)
            .collect();

        if self.percentile_histogram.unwrap_or(false) {
            let min = self.minimum_expected_value.unwrap_or(1.0);
            let max = self.maximum_expected_value.unwrap_or(u64::MAX as f64);
            boundaries.extend(percentile_histogram_buckets(min, max));
        }

        boundaries.sort_by(f64::total_cmp);
        boundaries.dedup();
        boundaries
    }
}
