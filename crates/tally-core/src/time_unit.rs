//! Time units used to express timer values

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Unit in which a time value is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Number of nanoseconds in one of this unit
    pub fn nanos_per_unit(self) -> f64 {
        match self {
            Self::Nanoseconds => 1.0,
            Self::Microseconds => 1e3,
            Self::Milliseconds => 1e6,
            Self::Seconds => 1e9,
            Self::Minutes => 60e9,
            Self::Hours => 3_600e9,
            Self::Days => 86_400e9,
        }
    }

    /// Convert `value` expressed in `from` into this unit.
    pub fn convert(self, value: f64, from: TimeUnit) -> f64 {
        if from == self {
            return value;
        }
        value * from.nanos_per_unit() / self.nanos_per_unit()
    }

    pub fn to_nanos(self, value: f64) -> f64 {
        value * self.nanos_per_unit()
    }

    pub fn from_nanos(self, nanos: f64) -> f64 {
        nanos / self.nanos_per_unit()
    }

    /// Express a `Duration` in this unit.
    pub fn from_duration(self, duration: Duration) -> f64 {
        self.from_nanos(duration.as_nanos() as f64)
    }

    /// Short name used as an export hint
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nanoseconds => "nanoseconds",
            Self::Microseconds => "microseconds",
            Self::Milliseconds => "milliseconds",
            Self::Seconds => "seconds",
            Self::Minutes => "minutes",
            Self::Hours => "hours",
            Self::Days => "days",
        }
    }
}

impl Default for TimeUnit {
    fn default() -> Self {
        Self::Seconds
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
