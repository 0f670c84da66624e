//! Lookup of registered meters by name, tags and kind

use super::MeterRegistry;
use crate::instrument::{Counter, DistributionSummary, Gauge, LongTaskTimer, Timer};
use crate::meter::{Meter, MeterKind, Tag};

/// Query over a registry's current meters; never creates anything
pub struct Search<'a> {
    registry: &'a MeterRegistry,
    name: String,
    tags: Vec<Tag>,
    tag_keys: Vec<String>,
    kind: Option<MeterKind>,
}

impl<'a> Search<'a> {
    pub(crate) fn new(registry: &'a MeterRegistry, name: String) -> Self {
        Self {
            registry,
            name,
            tags: Vec::new(),
            tag_keys: Vec::new(),
            kind: None,
        }
    }

    /// Require a tag with this exact value
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push(Tag::new(key, value));
        self
    }

    pub fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Require a tag key with any value
    pub fn tag_key(mut self, key: impl Into<String>) -> Self {
        self.tag_keys.push(key.into());
        self
    }

    pub fn kind(mut self, kind: MeterKind) -> Self {
        self.kind = Some(kind);
        self
    }

    fn matches(&self, meter: &Meter) -> bool {
        let id = meter.id();
        id.name() == self.name
            && self.kind.is_none_or(|kind| kind == id.kind())
            && self.tags.iter().all(|tag| id.tags().contains(tag))
            && self.tag_keys.iter().all(|key| id.tag(key).is_some())
    }

    /// Every matching meter
    pub fn meters(&self) -> Vec<Meter> {
        self.registry
            .iter()
            .filter(|meter| self.matches(meter))
            .collect()
    }

    /// Any one matching meter
    pub fn meter(&self) -> Option<Meter> {
        self.registry.iter().find(|meter| self.matches(meter))
    }

    pub fn counter(&self) -> Option<Counter> {
        self.counters().into_iter().next()
    }

    pub fn counters(&self) -> Vec<Counter> {
        self.meters()
            .iter()
            .filter_map(|m| m.as_counter().cloned())
            .collect()
    }

    pub fn gauge(&self) -> Option<Gauge> {
        self.gauges().into_iter().next()
    }

    pub fn gauges(&self) -> Vec<Gauge> {
        self.meters()
            .iter()
            .filter_map(|m| m.as_gauge().cloned())
            .collect()
    }

    pub fn timer(&self) -> Option<Timer> {
        self.timers().into_iter().next()
    }

    pub fn timers(&self) -> Vec<Timer> {
        self.meters()
            .iter()
            .filter_map(|m| m.as_timer().cloned())
            .collect()
    }

    pub fn summary(&self) -> Option<DistributionSummary> {
        self.summaries().into_iter().next()
    }

    pub fn summaries(&self) -> Vec<DistributionSummary> {
        self.meters()
            .iter()
            .filter_map(|m| m.as_summary().cloned())
            .collect()
    }

    pub fn long_task_timer(&self) -> Option<LongTaskTimer> {
        self.meters()
            .iter()
            .find_map(|m| m.as_long_task_timer().cloned())
    }
}
