//! Tests for the filter pipeline

use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::meter::{MeterId, MeterKind, Tags};

fn timer_id(name: &str) -> MeterId {
    MeterId::new(name, MeterKind::Timer, Tags::of([("uri", "/users/42")])).unwrap()
}

fn run(filters: &[Arc<dyn MeterFilter>], id: MeterId) -> FilterOutcome {
    apply_filters(filters, id, DistributionConfig::default())
}

fn registered(outcome: FilterOutcome) -> (MeterId, DistributionConfig) {
    match outcome {
        FilterOutcome::Registered(id, config) => (id, config),
        other => panic!("expected registration, got {other:?}"),
    }
}

#[test]
fn test_no_filters_passes_through() {
    let id = timer_id("http.requests");
    let (mapped, config) = registered(run(&[], id.clone()));
    assert_eq!(mapped, id);
    assert_eq!(config, DistributionConfig::default());
}

#[test]
fn test_common_tags_do_not_override_meter_tags() {
    let filters = [MeterFilters::common_tags([("uri", "ignored"), ("region", "eu")])];
    let (mapped, _) = registered(run(&filters, timer_id("http.requests")));
    assert_eq!(mapped.tag("uri"), Some("/users/42"));
    assert_eq!(mapped.tag("region"), Some("eu"));
}

#[test]
fn test_rename_and_rename_tag() {
    let filters = [
        MeterFilters::rename("http.requests", "http.server.requests"),
        MeterFilters::rename_tag("http.server", "uri", "route"),
    ];
    let (mapped, _) = registered(run(&filters, timer_id("http.requests")));
    assert_eq!(mapped.name(), "http.server.requests");
    assert_eq!(mapped.tag("uri"), None);
    assert_eq!(mapped.tag("route"), Some("/users/42"));
}

#[test]
fn test_ignore_tags() {
    let filters = [MeterFilters::ignore_tags(["uri"])];
    let (mapped, _) = registered(run(&filters, timer_id("http.requests")));
    assert!(mapped.tags().is_empty());
}

#[test]
fn test_replace_tag_values_respects_exceptions() {
    let filter = MeterFilters::replace_tag_values(
        "uri",
        |value| {
            if value.starts_with("/users/") {
                "/users/{id}".to_string()
            } else {
                value.to_string()
            }
        },
        ["/users/admin"],
    );
    let filters = [filter];

    let (mapped, _) = registered(run(&filters, timer_id("http.requests")));
    assert_eq!(mapped.tag("uri"), Some("/users/{id}"));

    let admin = MeterId::new(
        "http.requests",
        MeterKind::Timer,
        Tags::of([("uri", "/users/admin")]),
    )
    .unwrap();
    let (mapped, _) = registered(run(&filters, admin));
    assert_eq!(mapped.tag("uri"), Some("/users/admin"));
}

#[test]
fn test_deny_name_starts_with() {
    let filters = [MeterFilters::deny_name_starts_with("debug.")];
    assert!(matches!(
        run(&filters, timer_id("debug.internal")),
        FilterOutcome::Denied(_)
    ));
    assert!(matches!(
        run(&filters, timer_id("http.requests")),
        FilterOutcome::Registered(..)
    ));
}

#[test]
fn test_first_non_neutral_reply_wins() {
    let filters = [
        MeterFilters::accept_name_starts_with("debug.keep"),
        MeterFilters::deny_name_starts_with("debug."),
    ];
    assert!(matches!(
        run(&filters, timer_id("debug.keep.me")),
        FilterOutcome::Registered(..)
    ));
    assert!(matches!(
        run(&filters, timer_id("debug.drop")),
        FilterOutcome::Denied(_)
    ));
}

#[test]
fn test_deny_unless() {
    let filters = [MeterFilters::deny_unless(|id| id.name().starts_with("app."))];
    assert!(matches!(
        run(&filters, timer_id("jvm.memory")),
        FilterOutcome::Denied(_)
    ));
    assert!(matches!(
        run(&filters, timer_id("app.requests")),
        FilterOutcome::Registered(..)
    ));
}

#[test]
fn test_deny_name_matching_is_anchored() {
    let filters = [MeterFilters::deny_name_matching(r"debug\..*").unwrap()];
    assert!(matches!(
        run(&filters, timer_id("debug.internal")),
        FilterOutcome::Denied(_)
    ));
    assert!(matches!(
        run(&filters, timer_id("app.debug.internal")),
        FilterOutcome::Registered(..)
    ));
}

#[test]
fn test_invalid_pattern_is_config_error() {
    let err = MeterFilters::deny_name_matching("(").err().unwrap();
    assert!(matches!(err, crate::error::TallyError::Config(_)));
}

#[test]
fn test_accept_runs_against_mapped_id() {
    let filters = [
        MeterFilters::rename("legacy.requests", "debug.requests"),
        MeterFilters::deny_name_starts_with("debug."),
    ];
    match run(&filters, timer_id("legacy.requests")) {
        FilterOutcome::Denied(id) => assert_eq!(id.name(), "debug.requests"),
        other => panic!("expected denial, got {other:?}"),
    }
}

#[test]
fn test_mapping_to_blank_name_is_invalid() {
    let filters = [MeterFilters::rename("http.requests", " ")];
    assert!(matches!(
        run(&filters, timer_id("http.requests")),
        FilterOutcome::Invalid(_)
    ));
}

#[test]
fn test_configure_filters_override_builder_settings() {
    let filters = [
        MeterFilters::percentiles("http", vec![0.5, 0.99]),
        MeterFilters::enable_percentile_histogram("http"),
        MeterFilters::max_expected_duration("http", Duration::from_secs(5)),
    ];
    let builder = DistributionConfig::default().with_percentiles([0.75]);
    let (_, config) = registered(apply_filters(&filters, timer_id("http.requests"), builder));

    assert_eq!(config.percentiles, Some(vec![0.5, 0.99]));
    assert_eq!(config.percentile_histogram, Some(true));
    assert_eq!(config.maximum_expected_value, Some(5e9));
}

#[test]
fn test_configure_filters_respect_kind() {
    let filters = [
        MeterFilters::max_expected("payload", 1024.0),
        MeterFilters::min_expected_duration("payload", Duration::from_millis(1)),
    ];
    let summary = MeterId::new("payload.size", MeterKind::DistributionSummary, Tags::empty()).unwrap();
    let (_, config) = registered(run(&filters, summary));
    assert_eq!(config.maximum_expected_value, Some(1024.0));
    assert_eq!(config.minimum_expected_value, None);

    let counter = MeterId::new("payload.count", MeterKind::Counter, Tags::empty()).unwrap();
    let (_, config) = registered(run(&[MeterFilters::enable_percentile_histogram("payload")], counter));
    assert_eq!(config.percentile_histogram, None);
}

#[test]
fn test_custom_filter_trait_object() {
    struct Uppercase;

    impl MeterFilter for Uppercase {
        fn map(&self, id: MeterId) -> MeterId {
            let name = id.name().to_uppercase();
            id.with_name(name)
        }
    }

    let filters: [Arc<dyn MeterFilter>; 1] = [Arc::new(Uppercase)];
    let (mapped, _) = registered(run(&filters, timer_id("http.requests")));
    assert_eq!(mapped.name(), "HTTP.REQUESTS");
}
