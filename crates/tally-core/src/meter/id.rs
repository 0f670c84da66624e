//! Meter identity: name, tag set and kind

use crate::error::{TallyError, TallyResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Kind of meter an identity refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeterKind {
    /// Monotonically increasing total
    Counter,
    /// Value sampled from an external source on read
    Gauge,
    /// Durations of completed operations
    Timer,
    /// Dimensionless recorded values
    DistributionSummary,
    /// Durations of operations still in flight
    LongTaskTimer,
}

impl MeterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Timer => "timer",
            Self::DistributionSummary => "distribution_summary",
            Self::LongTaskTimer => "long_task_timer",
        }
    }
}

impl fmt::Display for MeterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single dimension: key/value pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl<K: Into<String>, V: Into<String>> From<(K, V)> for Tag {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

/// Set of tags with unique keys, kept sorted by key.
///
/// Adding a tag whose key is already present replaces the previous value, so
/// equality does not depend on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Tags {
    tags: Vec<Tag>,
}

impl Tags {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of<I, T>(tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        let mut result = Self::empty();
        for tag in tags {
            result.insert(tag.into());
        }
        result
    }

    /// Insert or replace a tag
    pub fn insert(&mut self, tag: Tag) {
        match self.tags.binary_search_by(|t| t.key.cmp(&tag.key)) {
            Ok(idx) => self.tags[idx] = tag,
            Err(idx) => self.tags.insert(idx, tag),
        }
    }

    /// Remove the tag with `key`, returning it if present
    pub fn remove(&mut self, key: &str) -> Option<Tag> {
        self.tags
            .binary_search_by(|t| t.key.as_str().cmp(key))
            .ok()
            .map(|idx| self.tags.remove(idx))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags
            .binary_search_by(|t| t.key.as_str().cmp(key))
            .ok()
            .map(|idx| self.tags[idx].value.as_str())
    }

    pub fn contains(&self, tag: &Tag) -> bool {
        self.get(&tag.key) == Some(tag.value.as_str())
    }

    /// Merge `other` into this set; tags from `other` win on key collisions
    pub fn and(mut self, other: impl IntoIterator<Item = Tag>) -> Self {
        for tag in other {
            self.insert(tag);
        }
        self
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub(crate) fn retain(&mut self, f: impl FnMut(&Tag) -> bool) {
        self.tags.retain(f);
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Tag> {
        self.tags.iter_mut()
    }
}

impl IntoIterator for Tags {
    type Item = Tag;
    type IntoIter = std::vec::IntoIter<Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.into_iter()
    }
}

impl<'a> IntoIterator for &'a Tags {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}

impl<T: Into<Tag>> FromIterator<T> for Tags {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::of(iter)
    }
}

/// Identity of a meter.
///
/// Equality and hashing cover name, kind and tags only; `description` and
/// `base_unit` are export hints carried alongside.
#[derive(Debug, Clone, Serialize)]
pub struct MeterId {
    name: String,
    kind: MeterKind,
    tags: Tags,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_unit: Option<String>,
}

impl MeterId {
    /// Create a new identity; fails fast on an empty name or tag key
    pub fn new(name: impl Into<String>, kind: MeterKind, tags: Tags) -> TallyResult<Self> {
        let id = Self {
            name: name.into(),
            kind,
            tags,
            description: None,
            base_unit: None,
        };
        id.validate()?;
        Ok(id)
    }

    /// Check the invariants filters must preserve
    pub fn validate(&self) -> TallyResult<()> {
        if self.name.trim().is_empty() {
            return Err(TallyError::invalid_name(self.name.clone()));
        }
        if self.tags.iter().any(|t| t.key.trim().is_empty()) {
            return Err(TallyError::invalid_tag(self.name.clone()));
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MeterKind {
        self.kind
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key)
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn base_unit(&self) -> Option<&str> {
        self.base_unit.as_deref()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<Tag>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags = self.tags.and(tags);
        self
    }

    pub fn without_tag(mut self, key: &str) -> Self {
        self.tags.remove(key);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_base_unit(mut self, base_unit: impl Into<String>) -> Self {
        self.base_unit = Some(base_unit.into());
        self
    }

    pub(crate) fn tags_mut(&mut self) -> &mut Tags {
        &mut self.tags
    }
}

impl PartialEq for MeterId {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name == other.name && self.tags == other.tags
    }
}

impl Eq for MeterId {}

impl Hash for MeterId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.kind.hash(state);
        self.tags.hash(state);
    }
}

impl fmt::Display for MeterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.tags.is_empty() {
            let rendered: Vec<String> = self
                .tags
                .iter()
                .map(|t| format!("{}={}", t.key, t.value))
                .collect();
            write!(f, "{{{}}}", rendered.join(","))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tags_order_independent() {
        let a = Tags::of([("region", "eu"), ("service", "checkout")]);
        let b = Tags::of([("service", "checkout"), ("region", "eu")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_tags_duplicate_key_last_wins() {
        let tags = Tags::of([("status", "200"), ("status", "500")]);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.get("status"), Some("500"));
    }

    #[test]
    fn test_id_equality_ignores_metadata() {
        let a = MeterId::new("requests", MeterKind::Counter, Tags::empty())
            .unwrap()
            .with_description("all requests");
        let b = MeterId::new("requests", MeterKind::Counter, Tags::empty()).unwrap();
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_id_kind_is_part_of_identity() {
        let counter = MeterId::new("jobs", MeterKind::Counter, Tags::empty()).unwrap();
        let timer = MeterId::new("jobs", MeterKind::Timer, Tags::empty()).unwrap();
        assert_ne!(counter, timer);
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = MeterId::new("  ", MeterKind::Gauge, Tags::empty()).unwrap_err();
        assert!(err.is_misuse());

        let err = MeterId::new("ok", MeterKind::Gauge, Tags::of([("", "x")])).unwrap_err();
        assert!(matches!(err, TallyError::InvalidTag { .. }));
    }

    #[test]
    fn test_display() {
        let id = MeterId::new(
            "http.requests",
            MeterKind::Timer,
            Tags::of([("uri", "/a"), ("method", "GET")]),
        )
        .unwrap();
        assert_eq!(id.to_string(), "http.requests{method=GET,uri=/a}");
    }

    #[test]
    fn test_without_tag() {
        let id = MeterId::new("x", MeterKind::Counter, Tags::of([("a", "1"), ("b", "2")]))
            .unwrap()
            .without_tag("a");
        assert_eq!(id.tag("a"), None);
        assert_eq!(id.tag("b"), Some("2"));
    }
}
