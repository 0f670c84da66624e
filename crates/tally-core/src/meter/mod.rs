//! Meter identity and the type-erased meter stored by the registry

mod id;
mod snapshot;

pub use id::{MeterId, MeterKind, Tag, Tags};
pub use snapshot::{Measurement, MeterSnapshot, MeterValue, RegistrySnapshot, Statistic};

use crate::instrument::{Counter, DistributionSummary, Gauge, LongTaskTimer, Timer};
use crate::time_unit::TimeUnit;

/// Any registered meter
#[derive(Debug, Clone)]
pub enum Meter {
    Counter(Counter),
    Gauge(Gauge),
    Timer(Timer),
    DistributionSummary(DistributionSummary),
    LongTaskTimer(LongTaskTimer),
}

impl Meter {
    pub fn id(&self) -> &MeterId {
        match self {
            Self::Counter(m) => m.id(),
            Self::Gauge(m) => m.id(),
            Self::Timer(m) => m.id(),
            Self::DistributionSummary(m) => m.id(),
            Self::LongTaskTimer(m) => m.id(),
        }
    }

    pub fn kind(&self) -> MeterKind {
        match self {
            Self::Counter(_) => MeterKind::Counter,
            Self::Gauge(_) => MeterKind::Gauge,
            Self::Timer(_) => MeterKind::Timer,
            Self::DistributionSummary(_) => MeterKind::DistributionSummary,
            Self::LongTaskTimer(_) => MeterKind::LongTaskTimer,
        }
    }

    pub fn is_noop(&self) -> bool {
        match self {
            Self::Counter(m) => m.is_noop(),
            Self::Gauge(m) => m.is_noop(),
            Self::Timer(m) => m.is_noop(),
            Self::DistributionSummary(m) => m.is_noop(),
            Self::LongTaskTimer(m) => m.is_noop(),
        }
    }

    pub fn as_counter(&self) -> Option<&Counter> {
        match self {
            Self::Counter(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_gauge(&self) -> Option<&Gauge> {
        match self {
            Self::Gauge(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_timer(&self) -> Option<&Timer> {
        match self {
            Self::Timer(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_summary(&self) -> Option<&DistributionSummary> {
        match self {
            Self::DistributionSummary(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_long_task_timer(&self) -> Option<&LongTaskTimer> {
        match self {
            Self::LongTaskTimer(m) => Some(m),
            _ => None,
        }
    }

    /// Whether both meters share the same underlying instrument
    pub fn ptr_eq(&self, other: &Meter) -> bool {
        match (self, other) {
            (Self::Counter(a), Self::Counter(b)) => a.ptr_eq(b),
            (Self::Gauge(a), Self::Gauge(b)) => a.ptr_eq(b),
            (Self::Timer(a), Self::Timer(b)) => a.ptr_eq(b),
            (Self::DistributionSummary(a), Self::DistributionSummary(b)) => a.ptr_eq(b),
            (Self::LongTaskTimer(a), Self::LongTaskTimer(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn snapshot(&self) -> MeterSnapshot {
        let value = match self {
            Self::Counter(m) => MeterValue::Counter { count: m.count() },
            Self::Gauge(m) => MeterValue::Gauge { value: m.value() },
            Self::Timer(m) => MeterValue::Timer(m.snapshot()),
            Self::DistributionSummary(m) => MeterValue::DistributionSummary(m.snapshot()),
            Self::LongTaskTimer(m) => MeterValue::LongTaskTimer(m.snapshot()),
        };
        MeterSnapshot {
            id: self.id().clone(),
            value,
        }
    }

    /// Flat statistics; time values are in the meter's base unit
    pub fn measure(&self) -> Vec<Measurement> {
        match self {
            Self::Counter(m) => vec![Measurement::new(Statistic::Count, m.count())],
            Self::Gauge(m) => m
                .value()
                .map(|v| Measurement::new(Statistic::Value, v))
                .into_iter()
                .collect(),
            Self::Timer(m) => {
                let unit = m.base_unit();
                vec![
                    Measurement::new(Statistic::Count, m.count() as f64),
                    Measurement::new(Statistic::TotalTime, m.total_time(unit)),
                    Measurement::new(Statistic::Max, m.max(unit)),
                ]
            }
            Self::DistributionSummary(m) => vec![
                Measurement::new(Statistic::Count, m.count() as f64),
                Measurement::new(Statistic::Total, m.total_amount()),
                Measurement::new(Statistic::Max, m.max()),
            ],
            Self::LongTaskTimer(m) => {
                let unit: TimeUnit = m.base_unit();
                vec![
                    Measurement::new(Statistic::ActiveTasks, m.active_tasks() as f64),
                    Measurement::new(Statistic::Duration, unit.from_duration(m.active_duration())),
                ]
            }
        }
    }
}

impl From<Counter> for Meter {
    fn from(m: Counter) -> Self {
        Self::Counter(m)
    }
}

impl From<Gauge> for Meter {
    fn from(m: Gauge) -> Self {
        Self::Gauge(m)
    }
}

impl From<Timer> for Meter {
    fn from(m: Timer) -> Self {
        Self::Timer(m)
    }
}

impl From<DistributionSummary> for Meter {
    fn from(m: DistributionSummary) -> Self {
        Self::DistributionSummary(m)
    }
}

impl From<LongTaskTimer> for Meter {
    fn from(m: LongTaskTimer) -> Self {
        Self::LongTaskTimer(m)
    }
}
