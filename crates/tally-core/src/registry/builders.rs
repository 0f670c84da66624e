//! Fluent builders that register meters

use std::sync::Arc;
use std::time::Duration;

use super::MeterRegistry;
use crate::error::{TallyError, TallyResult};
use crate::histogram::DistributionConfig;
use crate::instrument::{Counter, DistributionSummary, Gauge, GaugeFn, LongTaskTimer, Timer};
use crate::meter::{Meter, MeterId, MeterKind, Tag, Tags};
use crate::time_unit::TimeUnit;

/// Identity fields shared by every builder
#[derive(Debug, Clone)]
struct IdParts {
    name: String,
    tags: Tags,
    description: Option<String>,
    base_unit: Option<String>,
}

impl IdParts {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: Tags::empty(),
            description: None,
            base_unit: None,
        }
    }

    fn build(self, kind: MeterKind) -> TallyResult<MeterId> {
        let mut id = MeterId::new(self.name, kind, self.tags)?;
        if let Some(description) = self.description {
            id = id.with_description(description);
        }
        if let Some(base_unit) = self.base_unit {
            id = id.with_base_unit(base_unit);
        }
        Ok(id)
    }
}

macro_rules! id_setters {
    () => {
        pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
            self.id.tags.insert(Tag::new(key, value));
            self
        }

        pub fn tags<I, T>(mut self, tags: I) -> Self
        where
            I: IntoIterator<Item = T>,
            T: Into<Tag>,
        {
            self.id.tags = self.id.tags.and(tags.into_iter().map(Into::into));
            self
        }

        /// Documentation only; not part of the identity
        pub fn description(mut self, description: impl Into<String>) -> Self {
            self.id.description = Some(description.into());
            self
        }
    };
}

macro_rules! distribution_setters {
    () => {
        /// Publish buckets for server-side percentile aggregation
        pub fn publish_percentile_histogram(mut self, enabled: bool) -> Self {
            self.distribution = self.distribution.with_percentile_histogram(enabled);
            self
        }

        /// Percentiles (0.0..=1.0) estimated client-side
        pub fn publish_percentiles(mut self, percentiles: impl Into<Vec<f64>>) -> Self {
            self.distribution = self.distribution.with_percentiles(percentiles);
            self
        }

        pub fn percentile_precision(mut self, precision: u32) -> Self {
            self.distribution = self.distribution.with_percentile_precision(precision);
            self
        }

        /// Trailing window covered by max and percentiles
        pub fn distribution_statistic_expiry(mut self, expiry: Duration) -> Self {
            self.distribution = self.distribution.with_expiry(expiry);
            self
        }

        pub fn distribution_statistic_buffer_length(mut self, length: usize) -> Self {
            self.distribution = self.distribution.with_buffer_length(length);
            self
        }
    };
}

fn nanos(duration: Duration) -> f64 {
    duration.as_nanos() as f64
}

/// Builder for [`Counter`]
#[derive(Debug, Clone)]
pub struct CounterBuilder {
    id: IdParts,
}

impl Counter {
    pub fn builder(name: impl Into<String>) -> CounterBuilder {
        CounterBuilder {
            id: IdParts::new(name),
        }
    }
}

impl CounterBuilder {
    id_setters!();

    pub fn base_unit(mut self, unit: impl Into<String>) -> Self {
        self.id.base_unit = Some(unit.into());
        self
    }

    /// Register or fetch the counter; a denied counter is a noop
    pub fn register(self, registry: &MeterRegistry) -> TallyResult<Counter> {
        let id = self.id.build(MeterKind::Counter)?;
        let meter = registry.register_or_get(id.clone(), DistributionConfig::default(), |id, _| {
            Meter::Counter(Counter::new(id))
        });
        Ok(match meter {
            Some(Meter::Counter(counter)) => counter,
            _ => Counter::noop(id),
        })
    }
}

/// Builder for [`Gauge`]
pub struct GaugeBuilder {
    id: IdParts,
    source: GaugeFn,
}

impl Gauge {
    /// Gauge observing `owner` without keeping it alive
    pub fn builder<O, F>(name: impl Into<String>, owner: &Arc<O>, value_fn: F) -> GaugeBuilder
    where
        O: Send + Sync + 'static,
        F: Fn(&O) -> f64 + Send + Sync + 'static,
    {
        GaugeBuilder {
            id: IdParts::new(name),
            source: Gauge::weak_source(owner, value_fn),
        }
    }

    /// Gauge over a free-standing function
    pub fn builder_fn<F>(name: impl Into<String>, value_fn: F) -> GaugeBuilder
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        GaugeBuilder {
            id: IdParts::new(name),
            source: Gauge::fn_source(value_fn),
        }
    }
}

impl GaugeBuilder {
    id_setters!();

    pub fn base_unit(mut self, unit: impl Into<String>) -> Self {
        self.id.base_unit = Some(unit.into());
        self
    }

    /// Register or fetch the gauge; an existing gauge keeps its original source
    pub fn register(self, registry: &MeterRegistry) -> TallyResult<Gauge> {
        let id = self.id.build(MeterKind::Gauge)?;
        let source = self.source;
        let meter = registry.register_or_get(id.clone(), DistributionConfig::default(), |id, _| {
            Meter::Gauge(Gauge::new(id, source))
        });
        Ok(match meter {
            Some(Meter::Gauge(gauge)) => gauge,
            _ => Gauge::noop(id),
        })
    }
}

/// Builder for [`Timer`]
#[derive(Debug, Clone)]
pub struct TimerBuilder {
    id: IdParts,
    unit: TimeUnit,
    distribution: DistributionConfig,
}

impl Timer {
    pub fn builder(name: impl Into<String>) -> TimerBuilder {
        TimerBuilder {
            id: IdParts::new(name),
            unit: TimeUnit::default(),
            distribution: DistributionConfig::default(),
        }
    }
}

impl TimerBuilder {
    id_setters!();
    distribution_setters!();

    /// Unit readings are reported in; also exported as the base unit hint
    pub fn base_unit(mut self, unit: TimeUnit) -> Self {
        self.unit = unit;
        self
    }

    /// SLA boundaries that get a cumulative count
    pub fn service_level_objectives(mut self, boundaries: &[Duration]) -> Self {
        let nanos: Vec<f64> = boundaries.iter().copied().map(nanos).collect();
        self.distribution = self.distribution.with_service_level_objectives(nanos);
        self
    }

    pub fn minimum_expected_value(mut self, min: Duration) -> Self {
        self.distribution = self.distribution.with_minimum_expected_value(nanos(min));
        self
    }

    pub fn maximum_expected_value(mut self, max: Duration) -> Self {
        self.distribution = self.distribution.with_maximum_expected_value(nanos(max));
        self
    }

    /// Register or fetch the timer; a denied timer is a noop
    pub fn register(mut self, registry: &MeterRegistry) -> TallyResult<Timer> {
        self.id.base_unit = Some(self.unit.as_str().to_string());
        let id = self.id.build(MeterKind::Timer)?;
        let unit = self.unit;
        let clock = registry.clock().clone();
        let meter = registry.register_or_get(id.clone(), self.distribution, |id, config| {
            Meter::Timer(Timer::new(id, unit, &config, clock))
        });
        Ok(match meter {
            Some(Meter::Timer(timer)) => timer,
            _ => Timer::noop(id),
        })
    }
}

/// Builder for [`DistributionSummary`]
#[derive(Debug, Clone)]
pub struct DistributionSummaryBuilder {
    id: IdParts,
    scale: f64,
    distribution: DistributionConfig,
}

impl DistributionSummary {
    pub fn builder(name: impl Into<String>) -> DistributionSummaryBuilder {
        DistributionSummaryBuilder {
            id: IdParts::new(name),
            scale: 1.0,
            distribution: DistributionConfig::default(),
        }
    }
}

impl DistributionSummaryBuilder {
    id_setters!();
    distribution_setters!();

    pub fn base_unit(mut self, unit: impl Into<String>) -> Self {
        self.id.base_unit = Some(unit.into());
        self
    }

    /// Multiply every recorded amount by `scale`; must be finite and positive
    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn service_level_objectives(mut self, boundaries: impl Into<Vec<f64>>) -> Self {
        self.distribution = self.distribution.with_service_level_objectives(boundaries);
        self
    }

    pub fn minimum_expected_value(mut self, min: f64) -> Self {
        self.distribution = self.distribution.with_minimum_expected_value(min);
        self
    }

    pub fn maximum_expected_value(mut self, max: f64) -> Self {
        self.distribution = self.distribution.with_maximum_expected_value(max);
        self
    }

    /// Register or fetch the summary; a denied summary is a noop
    pub fn register(self, registry: &MeterRegistry) -> TallyResult<DistributionSummary> {
        let id = self.id.build(MeterKind::DistributionSummary)?;
        let scale = self.scale;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(TallyError::config(format!(
                "summary {} scale must be finite and positive, got {scale}",
                id.name()
            )));
        }
        let clock = registry.clock().clone();
        let meter = registry.register_or_get(id.clone(), self.distribution, |id, config| {
            Meter::DistributionSummary(DistributionSummary::new(id, scale, &config, clock))
        });
        Ok(match meter {
            Some(Meter::DistributionSummary(summary)) => summary,
            _ => DistributionSummary::noop(id),
        })
    }
}

/// Builder for [`LongTaskTimer`]
#[derive(Debug, Clone)]
pub struct LongTaskTimerBuilder {
    id: IdParts,
    unit: TimeUnit,
    distribution: DistributionConfig,
}

impl LongTaskTimer {
    pub fn builder(name: impl Into<String>) -> LongTaskTimerBuilder {
        LongTaskTimerBuilder {
            id: IdParts::new(name),
            unit: TimeUnit::default(),
            distribution: DistributionConfig::default(),
        }
    }
}

impl LongTaskTimerBuilder {
    id_setters!();
    distribution_setters!();

    pub fn base_unit(mut self, unit: TimeUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn service_level_objectives(mut self, boundaries: &[Duration]) -> Self {
        let nanos: Vec<f64> = boundaries.iter().copied().map(nanos).collect();
        self.distribution = self.distribution.with_service_level_objectives(nanos);
        self
    }

    pub fn maximum_expected_value(mut self, max: Duration) -> Self {
        self.distribution = self.distribution.with_maximum_expected_value(nanos(max));
        self
    }

    /// Register or fetch the long task timer; a denied one is a noop
    pub fn register(mut self, registry: &MeterRegistry) -> TallyResult<LongTaskTimer> {
        self.id.base_unit = Some(self.unit.as_str().to_string());
        let id = self.id.build(MeterKind::LongTaskTimer)?;
        let unit = self.unit;
        let clock = registry.clock().clone();
        let meter = registry.register_or_get(id.clone(), self.distribution, |id, config| {
            Meter::LongTaskTimer(LongTaskTimer::new(id, unit, &config, clock))
        });
        Ok(match meter {
            Some(Meter::LongTaskTimer(timer)) => timer,
            _ => LongTaskTimer::noop(id),
        })
    }
}
