//! Meter registry
//!
//! The registry owns the identity to meter mapping. Creation is
//! create-if-absent: concurrent registrations of an equal identity all
//! receive the one instance that won the race, and only that instance is
//! ever constructed.

mod builders;
mod global;
mod search;


pub use builders::{
    CounterBuilder, DistributionSummaryBuilder, GaugeBuilder, LongTaskTimerBuilder, TimerBuilder,
};
pub use global::global_registry;
pub use search::Search;

use chrono::{TimeZone, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::clock::{Clock, SystemClock};
use crate::config::RegistryConfig;
use crate::error::TallyResult;
use crate::filter::{FilterOutcome, MeterFilter, MeterFilters, apply_filters};
use crate::histogram::DistributionConfig;
use crate::instrument::{Counter, DistributionSummary, Gauge, LongTaskTimer, Timer, TimerSample};
use crate::meter::{Meter, MeterId, MeterKind, MeterSnapshot, RegistrySnapshot, Tag};

/// Registry of meters keyed by identity
pub struct MeterRegistry {
    meters: DashMap<MeterId, Meter>,
    // Identity as requested -> identity after filters
    id_cache: DashMap<MeterId, MeterId>,
    filters: RwLock<Vec<Arc<dyn MeterFilter>>>,
    clock: Arc<dyn Clock>,
    config: RegistryConfig,
    closed: AtomicBool,
}

impl MeterRegistry {
    /// Create a registry with default config and the system clock
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with custom config
    pub fn with_config(config: RegistryConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a registry with custom config and time source
    pub fn with_clock(config: RegistryConfig, clock: Arc<dyn Clock>) -> Self {
        let mut filters: Vec<Arc<dyn MeterFilter>> = Vec::new();
        if !config.common_tags.is_empty() {
            filters.push(MeterFilters::common_tags(config.common_tags.clone()));
        }
        Self {
            meters: DashMap::new(),
            id_cache: DashMap::new(),
            filters: RwLock::new(filters),
            clock,
            config,
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Append a filter; it only affects meters registered from now on
    pub fn add_filter(&self, filter: Arc<dyn MeterFilter>) {
        self.filters.write().push(filter);
    }

    /// Return the meter registered under `id`, creating it with `factory` if absent.
    ///
    /// Returns `None` when a filter denies the identity, when filters map it
    /// to an invalid identity, or when the registry is closed. `factory`
    /// receives the filtered identity and the fully merged distribution
    /// config, and runs at most once per identity.
    pub fn register_or_get<F>(
        &self,
        id: MeterId,
        config: DistributionConfig,
        factory: F,
    ) -> Option<Meter>
    where
        F: FnOnce(MeterId, DistributionConfig) -> Meter,
    {
        if let Some(meter) = self.get(&id) {
            return Some(meter);
        }
        if self.is_closed() {
            tracing::debug!(meter = %id, "registry closed; returning noop meter");
            return None;
        }

        let filters = self.filters.read().clone();
        let (mapped, config) = match apply_filters(&filters, id.clone(), config) {
            FilterOutcome::Registered(mapped, config) => (mapped, config),
            FilterOutcome::Denied(mapped) => {
                tracing::debug!(meter = %mapped, "meter denied by filter");
                return None;
            }
            FilterOutcome::Invalid(mapped) => {
                tracing::warn!(
                    meter = %id,
                    mapped = %mapped,
                    "filters produced an invalid meter identity"
                );
                return None;
            }
        };
        let config = config.merge(&self.defaults_for(mapped.kind()));

        let meter = self
            .meters
            .entry(mapped.clone())
            .or_insert_with(|| {
                tracing::debug!(meter = %mapped, kind = %mapped.kind(), "created meter");
                factory(mapped.clone(), config)
            })
            .clone();
        self.id_cache.insert(id, mapped);
        Some(meter)
    }

    fn defaults_for(&self, kind: MeterKind) -> DistributionConfig {
        match kind {
            MeterKind::Timer | MeterKind::LongTaskTimer => {
                DistributionConfig::timer_defaults(&self.config)
            }
            _ => DistributionConfig::summary_defaults(&self.config),
        }
    }

    /// Look up a meter without creating it.
    ///
    /// Accepts either the identity as originally requested or the identity
    /// after filtering.
    pub fn get(&self, id: &MeterId) -> Option<Meter> {
        let mapped = self.id_cache.get(id).map(|entry| entry.value().clone());
        let key = mapped.as_ref().unwrap_or(id);
        self.meters.get(key).map(|entry| entry.value().clone())
    }

    /// Search meters by name
    pub fn find(&self, name: impl Into<String>) -> Search<'_> {
        Search::new(self, name.into())
    }

    /// Detach a meter; a later registration creates a fresh instance
    pub fn remove(&self, id: &MeterId) -> Option<Meter> {
        let mapped = self
            .id_cache
            .get(id)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| id.clone());
        self.remove_mapped(&mapped)
    }

    /// Remove every meter called `name`; returns how many were removed
    pub fn remove_by_name(&self, name: &str) -> usize {
        let ids: Vec<MeterId> = self
            .meters
            .iter()
            .filter(|entry| entry.key().name() == name)
            .map(|entry| entry.key().clone())
            .collect();
        ids.iter()
            .filter(|id| self.remove_mapped(id).is_some())
            .count()
    }

    fn remove_mapped(&self, mapped: &MeterId) -> Option<Meter> {
        let (removed_id, meter) = self.meters.remove(mapped)?;
        self.id_cache.retain(|_, target| *target != removed_id);
        tracing::debug!(meter = %removed_id, "removed meter");
        Some(meter)
    }

    /// Lazily iterate over registered meters.
    ///
    /// The iterator holds map shard locks; do not register or remove meters while it is alive.
    pub fn iter(&self) -> impl Iterator<Item = Meter> + '_ {
        self.meters.iter().map(|entry| entry.value().clone())
    }

    /// All registered meters
    pub fn meters(&self) -> Vec<Meter> {
        self.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.meters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meters.is_empty()
    }

    /// Remove every meter
    pub fn clear(&self) {
        self.meters.clear();
        self.id_cache.clear();
    }

    /// Snapshot every meter, ordered by name.
    ///
    /// Meters are collected before any of them is read, so gauge sources run
    /// without map locks held and may themselves register meters.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let mut meters: Vec<MeterSnapshot> =
            self.meters().iter().map(Meter::snapshot).collect();
        meters.sort_by(|a, b| {
            a.id.name()
                .cmp(b.id.name())
                .then_with(|| a.id.kind().cmp(&b.id.kind()))
                .then_with(|| a.id.to_string().cmp(&b.id.to_string()))
        });
        let timestamp = Utc
            .timestamp_millis_opt(self.clock.wall_time_millis() as i64)
            .single()
            .unwrap_or_else(Utc::now);
        RegistrySnapshot { timestamp, meters }
    }

    /// Stop accepting new meters; existing meters keep working
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!(meters = self.len(), "meter registry closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Start a timing sample on the registry clock
    pub fn start_sample(&self) -> TimerSample {
        TimerSample::start(self.clock.clone())
    }

    pub fn counter<I, T>(&self, name: &str, tags: I) -> TallyResult<Counter>
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        Counter::builder(name).tags(tags).register(self)
    }

    pub fn timer<I, T>(&self, name: &str, tags: I) -> TallyResult<Timer>
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        Timer::builder(name).tags(tags).register(self)
    }

    pub fn summary<I, T>(&self, name: &str, tags: I) -> TallyResult<DistributionSummary>
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        DistributionSummary::builder(name).tags(tags).register(self)
    }

    pub fn long_task_timer<I, T>(&self, name: &str, tags: I) -> TallyResult<LongTaskTimer>
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        LongTaskTimer::builder(name).tags(tags).register(self)
    }

    /// Gauge observing `owner` through a weak reference.
    ///
    /// If a gauge with this identity already exists, it is returned and
    /// `value_fn` is discarded.
    pub fn gauge<I, T, O, F>(
        &self,
        name: &str,
        tags: I,
        owner: &Arc<O>,
        value_fn: F,
    ) -> TallyResult<Gauge>
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
        O: Send + Sync + 'static,
        F: Fn(&O) -> f64 + Send + Sync + 'static,
    {
        Gauge::builder(name, owner, value_fn).tags(tags).register(self)
    }
}

impl Default for MeterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MeterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeterRegistry")
            .field("meters", &self.len())
            .field("filters", &self.filters.read().len())
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .finish()
    }
}
