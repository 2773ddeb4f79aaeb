//! Tests for routing map evaluation order, dedup, and builder validation

use crate::{RoutingMap, RoutingMapBuilder};

fn map(rules: &[(&str, &[&str])]) -> RoutingMap {
    let mut builder = RoutingMapBuilder::new();
    for (pattern, sinks) in rules {
        builder
            .add_rule(pattern, sinks.iter().map(|s| s.to_string()).collect())
            .unwrap();
    }
    builder.build()
}

#[test]
fn test_empty_map_routes_nothing() {
    let map = RoutingMap::default();
    assert!(map.is_empty());
    assert!(map.targets("anything").is_empty());
    assert!(!map.has_route("anything"));
}

#[test]
fn test_exact_match() {
    let map = map(&[("error.db", &["broker_main"])]);
    assert_eq!(map.targets("error.db"), vec!["broker_main"]);
    assert!(map.targets("error.db2").is_empty());
}

#[test]
fn test_prefix_and_catch_all_union() {
    // The fan-out scenario: error.* hits the broker, * hits the audit file
    let map = map(&[("error.*", &["broker_main"]), ("*", &["audit_file"])]);

    assert_eq!(map.targets("error.db"), vec!["broker_main", "audit_file"]);
    assert_eq!(map.targets("app.request"), vec!["audit_file"]);
}

#[test]
fn test_dedup_across_rules() {
    // Two rules naming the same sink deliver once
    let map = map(&[("error.*", &["shared", "broker"]), ("*", &["shared"])]);

    assert_eq!(map.targets("error.db"), vec!["shared", "broker"]);
}

#[test]
fn test_rule_order_determines_target_order() {
    let map = map(&[("*", &["first"]), ("key", &["second"])]);
    assert_eq!(map.targets("key"), vec!["first", "second"]);
}

#[test]
fn test_no_route() {
    let map = map(&[("error.*", &["broker"])]);
    assert!(map.targets("app.request").is_empty());
    assert!(!map.has_route("app.request"));
    assert!(map.has_route("error.net"));
}

#[test]
fn test_referenced_sinks() {
    let map = map(&[
        ("error.*", &["broker", "audit"]),
        ("metrics.*", &["broker"]),
        ("*", &["devnull"]),
    ]);

    assert_eq!(map.referenced_sinks(), vec!["broker", "audit", "devnull"]);
}

#[test]
fn test_builder_rejects_empty_sinks() {
    let mut builder = RoutingMapBuilder::new();
    assert!(builder.add_rule("error.*", vec![]).is_err());
    assert_eq!(builder.rule_count(), 0);
}

#[test]
fn test_builder_rejects_bad_pattern() {
    let mut builder = RoutingMapBuilder::new();
    assert!(builder.add_rule("a*b", vec!["sink".into()]).is_err());
}

#[test]
fn test_identical_maps_make_identical_decisions() {
    // Swap idempotence: rebuilding from the same rules yields the same
    // routing decisions for every key
    let rules: &[(&str, &[&str])] = &[("error.*", &["broker"]), ("*", &["file"])];
    let a = map(rules);
    let b = map(rules);

    for key in ["error.db", "error.", "app.request", "", "error"] {
        assert_eq!(a.targets(key), b.targets(key), "diverged on key {key:?}");
    }
}
