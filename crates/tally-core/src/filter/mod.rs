//! Registration-time meter filters
//!
//! Filters see a meter's identity and distribution config once, when the
//! meter is first registered. A filter can:
//! - rewrite the identity (`map`): rename, add, drop or rewrite tags
//! - veto registration (`accept`): the caller then receives a noop meter
//! - adjust histogram settings (`configure`)
//!
//! Evaluation runs every `map` in order, then `accept` in order (the first
//! non-neutral reply decides), then every `configure` in order.

#[cfg(test)]
mod tests;

use regex::Regex;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{TallyError, TallyResult};
use crate::histogram::DistributionConfig;
use crate::meter::{MeterId, MeterKind, Tag, Tags};

/// Reply of [`MeterFilter::accept`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterFilterReply {
    /// Register the meter, skipping later filters
    Accept,
    /// Do not register the meter
    Deny,
    /// Let later filters decide; accepted if every filter is neutral
    Neutral,
}

/// Transformation or veto applied to a meter at registration
pub trait MeterFilter: Send + Sync {
    fn accept(&self, _id: &MeterId) -> MeterFilterReply {
        MeterFilterReply::Neutral
    }

    fn map(&self, id: MeterId) -> MeterId {
        id
    }

    /// Settings returned here override whatever the builder asked for
    fn configure(&self, _id: &MeterId, config: DistributionConfig) -> DistributionConfig {
        config
    }
}

/// Outcome of running a filter chain
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FilterOutcome {
    Registered(MeterId, DistributionConfig),
    Denied(MeterId),
    Invalid(MeterId),
}

/// Run `id` and `config` through `filters`
pub(crate) fn apply_filters(
    filters: &[Arc<dyn MeterFilter>],
    id: MeterId,
    config: DistributionConfig,
) -> FilterOutcome {
    let kind = id.kind();
    let mapped = filters.iter().fold(id, |id, filter| filter.map(id));
    if mapped.kind() != kind || mapped.validate().is_err() {
        return FilterOutcome::Invalid(mapped);
    }

    let reply = filters
        .iter()
        .map(|filter| filter.accept(&mapped))
        .find(|reply| *reply != MeterFilterReply::Neutral);
    if reply == Some(MeterFilterReply::Deny) {
        return FilterOutcome::Denied(mapped);
    }

    let config = filters
        .iter()
        .fold(config, |config, filter| filter.configure(&mapped, config));
    FilterOutcome::Registered(mapped, config)
}

struct MapFilter<F>(F);

impl<F> MeterFilter for MapFilter<F>
where
    F: Fn(MeterId) -> MeterId + Send + Sync,
{
    fn map(&self, id: MeterId) -> MeterId {
        (self.0)(id)
    }
}

struct AcceptFilter<F>(F);

impl<F> MeterFilter for AcceptFilter<F>
where
    F: Fn(&MeterId) -> MeterFilterReply + Send + Sync,
{
    fn accept(&self, id: &MeterId) -> MeterFilterReply {
        (self.0)(id)
    }
}

struct ConfigureFilter<F>(F);

impl<F> MeterFilter for ConfigureFilter<F>
where
    F: Fn(&MeterId, DistributionConfig) -> DistributionConfig + Send + Sync,
{
    fn configure(&self, id: &MeterId, config: DistributionConfig) -> DistributionConfig {
        (self.0)(id, config)
    }
}

fn is_distribution(kind: MeterKind) -> bool {
    matches!(
        kind,
        MeterKind::Timer | MeterKind::DistributionSummary | MeterKind::LongTaskTimer
    )
}

fn is_timed(kind: MeterKind) -> bool {
    matches!(kind, MeterKind::Timer | MeterKind::LongTaskTimer)
}

/// Built-in filters
pub struct MeterFilters;

impl MeterFilters {
    /// Add tags to every meter; tags the meter already has win
    pub fn common_tags<I, T>(tags: I) -> Arc<dyn MeterFilter>
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        let common = Tags::of(tags);
        Arc::new(MapFilter(move |mut id: MeterId| {
            for tag in common.iter() {
                if id.tag(tag.key()).is_none() {
                    id = id.with_tag(tag.clone());
                }
            }
            id
        }))
    }

    /// Rename meters called exactly `from`
    pub fn rename(from: impl Into<String>, to: impl Into<String>) -> Arc<dyn MeterFilter> {
        let from = from.into();
        let to = to.into();
        Arc::new(MapFilter(move |id: MeterId| {
            if id.name() == from {
                id.with_name(to.clone())
            } else {
                id
            }
        }))
    }

    /// Rename tag key `from` to `to` on meters whose name starts with `prefix`
    pub fn rename_tag(
        prefix: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Arc<dyn MeterFilter> {
        let prefix = prefix.into();
        let from = from.into();
        let to = to.into();
        Arc::new(MapFilter(move |mut id: MeterId| {
            if !id.name().starts_with(&prefix) {
                return id;
            }
            if let Some(tag) = id.tags_mut().remove(&from) {
                id = id.with_tag(Tag::new(to.clone(), tag.value));
            }
            id
        }))
    }

    /// Drop the given tag keys from every meter
    pub fn ignore_tags<I, S>(keys: I) -> Arc<dyn MeterFilter>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        Arc::new(MapFilter(move |mut id: MeterId| {
            id.tags_mut().retain(|tag| !keys.contains(&tag.key));
            id
        }))
    }

    /// Rewrite values of tag `key`, leaving values listed in `exceptions` untouched.
    ///
    /// Typically used to collapse high-cardinality values, e.g. `"/user/42"` to `"/user/{id}"`.
    pub fn replace_tag_values<F, I, S>(
        key: impl Into<String>,
        replacement: F,
        exceptions: I,
    ) -> Arc<dyn MeterFilter>
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let key = key.into();
        let exceptions: Vec<String> = exceptions.into_iter().map(Into::into).collect();
        Arc::new(MapFilter(move |mut id: MeterId| {
            for tag in id.tags_mut().iter_mut() {
                if tag.key == key && !exceptions.contains(&tag.value) {
                    tag.value = replacement(&tag.value);
                }
            }
            id
        }))
    }

    /// Deny meters matching `predicate`
    pub fn deny<F>(predicate: F) -> Arc<dyn MeterFilter>
    where
        F: Fn(&MeterId) -> bool + Send + Sync + 'static,
    {
        Arc::new(AcceptFilter(move |id: &MeterId| {
            if predicate(id) {
                MeterFilterReply::Deny
            } else {
                MeterFilterReply::Neutral
            }
        }))
    }

    /// Accept meters matching `predicate`, short-circuiting later filters
    pub fn accept<F>(predicate: F) -> Arc<dyn MeterFilter>
    where
        F: Fn(&MeterId) -> bool + Send + Sync + 'static,
    {
        Arc::new(AcceptFilter(move |id: &MeterId| {
            if predicate(id) {
                MeterFilterReply::Accept
            } else {
                MeterFilterReply::Neutral
            }
        }))
    }

    /// Deny every meter not matching `predicate`
    pub fn deny_unless<F>(predicate: F) -> Arc<dyn MeterFilter>
    where
        F: Fn(&MeterId) -> bool + Send + Sync + 'static,
    {
        Arc::new(AcceptFilter(move |id: &MeterId| {
            if predicate(id) {
                MeterFilterReply::Neutral
            } else {
                MeterFilterReply::Deny
            }
        }))
    }

    pub fn deny_name_starts_with(prefix: impl Into<String>) -> Arc<dyn MeterFilter> {
        let prefix = prefix.into();
        Self::deny(move |id| id.name().starts_with(&prefix))
    }

    pub fn accept_name_starts_with(prefix: impl Into<String>) -> Arc<dyn MeterFilter> {
        let prefix = prefix.into();
        Self::accept(move |id| id.name().starts_with(&prefix))
    }

    /// Deny meters whose whole name matches `pattern`
    pub fn deny_name_matching(pattern: &str) -> TallyResult<Arc<dyn MeterFilter>> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))
            .map_err(|e| TallyError::config(format!("invalid meter name pattern: {e}")))?;
        Ok(Self::deny(move |id| regex.is_match(id.name())))
    }

    /// Cap the expected value of summaries whose name starts with `prefix`
    pub fn max_expected(prefix: impl Into<String>, value: f64) -> Arc<dyn MeterFilter> {
        let prefix = prefix.into();
        Arc::new(ConfigureFilter(move |id: &MeterId, config: DistributionConfig| {
            if id.kind() == MeterKind::DistributionSummary && id.name().starts_with(&prefix) {
                config.with_maximum_expected_value(value)
            } else {
                config
            }
        }))
    }

    /// Floor the expected value of summaries whose name starts with `prefix`
    pub fn min_expected(prefix: impl Into<String>, value: f64) -> Arc<dyn MeterFilter> {
        let prefix = prefix.into();
        Arc::new(ConfigureFilter(move |id: &MeterId, config: DistributionConfig| {
            if id.kind() == MeterKind::DistributionSummary && id.name().starts_with(&prefix) {
                config.with_minimum_expected_value(value)
            } else {
                config
            }
        }))
    }

    /// Cap the expected duration of timers whose name starts with `prefix`
    pub fn max_expected_duration(prefix: impl Into<String>, max: Duration) -> Arc<dyn MeterFilter> {
        let prefix = prefix.into();
        Arc::new(ConfigureFilter(move |id: &MeterId, config: DistributionConfig| {
            if is_timed(id.kind()) && id.name().starts_with(&prefix) {
                config.with_maximum_expected_value(max.as_nanos() as f64)
            } else {
                config
            }
        }))
    }

    /// Floor the expected duration of timers whose name starts with `prefix`
    pub fn min_expected_duration(prefix: impl Into<String>, min: Duration) -> Arc<dyn MeterFilter> {
        let prefix = prefix.into();
        Arc::new(ConfigureFilter(move |id: &MeterId, config: DistributionConfig| {
            if is_timed(id.kind()) && id.name().starts_with(&prefix) {
                config.with_minimum_expected_value(min.as_nanos() as f64)
            } else {
                config
            }
        }))
    }

    /// Publish percentile histogram buckets for meters whose name starts with `prefix`
    pub fn enable_percentile_histogram(prefix: impl Into<String>) -> Arc<dyn MeterFilter> {
        let prefix = prefix.into();
        Arc::new(ConfigureFilter(move |id: &MeterId, config: DistributionConfig| {
            if is_distribution(id.kind()) && id.name().starts_with(&prefix) {
                config.with_percentile_histogram(true)
            } else {
                config
            }
        }))
    }

    /// Estimate `percentiles` client-side for meters whose name starts with `prefix`
    pub fn percentiles(prefix: impl Into<String>, percentiles: impl Into<Vec<f64>>) -> Arc<dyn MeterFilter> {
        let prefix = prefix.into();
        let percentiles = percentiles.into();
        Arc::new(ConfigureFilter(move |id: &MeterId, config: DistributionConfig| {
            if is_distribution(id.kind()) && id.name().starts_with(&prefix) {
                config.with_percentiles(percentiles.clone())
            } else {
                config
            }
        }))
    }
}
