//! Registry-wide configuration

use crate::error::{TallyError, TallyResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding [`RegistryConfig::histogram_expiry`]
pub const ENV_HISTOGRAM_EXPIRY: &str = "TALLY_HISTOGRAM_EXPIRY";
/// Environment variable overriding [`RegistryConfig::histogram_buffer_length`]
pub const ENV_HISTOGRAM_BUFFER_LENGTH: &str = "TALLY_HISTOGRAM_BUFFER_LENGTH";
/// Environment variable overriding [`RegistryConfig::percentile_precision`]
pub const ENV_PERCENTILE_PRECISION: &str = "TALLY_PERCENTILE_PRECISION";
/// Environment variable overriding [`RegistryConfig::publish_step`]
pub const ENV_PUBLISH_STEP: &str = "TALLY_PUBLISH_STEP";

const MAX_PERCENTILE_PRECISION: u32 = 5;

/// Configuration for a [`MeterRegistry`](crate::registry::MeterRegistry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Trailing window covered by decaying histograms and maxima
    #[serde(with = "humantime_serde")]
    pub histogram_expiry: Duration,
    /// Number of ring buckets the trailing window is split into
    pub histogram_buffer_length: usize,
    /// Resolution of client-side percentile sketches (0..=5)
    pub percentile_precision: u32,
    /// Interval between publish cycles
    #[serde(with = "humantime_serde")]
    pub publish_step: Duration,
    /// Tags added to every meter registered with the registry
    pub common_tags: BTreeMap<String, String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            histogram_expiry: Duration::from_secs(120),
            histogram_buffer_length: 3,
            percentile_precision: 1,
            publish_step: Duration::from_secs(60),
            common_tags: BTreeMap::new(),
        }
    }
}

impl RegistryConfig {
    /// Parse a TOML document; missing keys fall back to defaults
    pub fn from_toml_str(content: &str) -> TallyResult<Self> {
        let config: RegistryConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> TallyResult<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading registry config from file: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(self) -> TallyResult<Self> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_from<F>(mut self, lookup: F) -> TallyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_HISTOGRAM_EXPIRY) {
            self.histogram_expiry = parse_duration(ENV_HISTOGRAM_EXPIRY, &value)?;
        }
        if let Some(value) = lookup(ENV_HISTOGRAM_BUFFER_LENGTH) {
            self.histogram_buffer_length = value.trim().parse().map_err(|_| {
                TallyError::config(format!("{ENV_HISTOGRAM_BUFFER_LENGTH}: not a number: {value}"))
            })?;
        }
        if let Some(value) = lookup(ENV_PERCENTILE_PRECISION) {
            self.percentile_precision = value.trim().parse().map_err(|_| {
                TallyError::config(format!("{ENV_PERCENTILE_PRECISION}: not a number: {value}"))
            })?;
        }
        if let Some(value) = lookup(ENV_PUBLISH_STEP) {
            self.publish_step = parse_duration(ENV_PUBLISH_STEP, &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate value ranges
    pub fn validate(&self) -> TallyResult<()> {
        if self.histogram_expiry.is_zero() {
            return Err(TallyError::config("histogram_expiry must be greater than zero"));
        }
        if self.histogram_buffer_length == 0 {
            return Err(TallyError::config(
                "histogram_buffer_length must be at least 1",
            ));
        }
        if self.percentile_precision > MAX_PERCENTILE_PRECISION {
            return Err(TallyError::config(format!(
                "percentile_precision must be at most {MAX_PERCENTILE_PRECISION}"
            )));
        }
        if self.publish_step.is_zero() {
            return Err(TallyError::config("publish_step must be greater than zero"));
        }
        Ok(())
    }

    /// Set the histogram expiry
    pub fn with_histogram_expiry(mut self, expiry: Duration) -> Self {
        self.histogram_expiry = expiry;
        self
    }

    /// Set the histogram buffer length
    pub fn with_histogram_buffer_length(mut self, length: usize) -> Self {
        self.histogram_buffer_length = length;
        self
    }

    /// Add a common tag
    pub fn with_common_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.common_tags.insert(key.into(), value.into());
        self
    }
}

fn parse_duration(key: &str, value: &str) -> TallyResult<Duration> {
    humantime_serde::re::humantime::parse_duration(value.trim())
        .map_err(|e| TallyError::config(format!("{key}: {e}")))
}
