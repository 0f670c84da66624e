//! Serializable point-in-time views of meters

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::MeterId;
use crate::histogram::HistogramSnapshot;
use crate::instrument::{LongTaskTimerSnapshot, TimerSnapshot};

/// Kind of a flat measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Count,
    Total,
    TotalTime,
    Max,
    Value,
    ActiveTasks,
    Duration,
}

impl Statistic {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Total => "total",
            Self::TotalTime => "total_time",
            Self::Max => "max",
            Self::Value => "value",
            Self::ActiveTasks => "active_tasks",
            Self::Duration => "duration",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One statistic of a meter at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    pub statistic: Statistic,
    pub value: f64,
}

impl Measurement {
    pub fn new(statistic: Statistic, value: f64) -> Self {
        Self { statistic, value }
    }
}

/// Kind-specific meter state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MeterValue {
    Counter { count: f64 },
    Gauge { value: Option<f64> },
    Timer(TimerSnapshot),
    DistributionSummary(HistogramSnapshot),
    LongTaskTimer(LongTaskTimerSnapshot),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeterSnapshot {
    pub id: MeterId,
    pub value: MeterValue,
}

/// Every meter of a registry, captured at `timestamp`
#[derive(Debug, Clone, Serialize)]
pub struct RegistrySnapshot {
    pub timestamp: DateTime<Utc>,
    pub meters: Vec<MeterSnapshot>,
}

impl RegistrySnapshot {
    pub fn len(&self) -> usize {
        self.meters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meters.is_empty()
    }

    /// First meter with the given name
    pub fn find(&self, name: &str) -> Option<&MeterSnapshot> {
        self.meters.iter().find(|m| m.id.name() == name)
    }

    /// Render as pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
