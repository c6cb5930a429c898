//! Tests for configuration validation

use std::collections::HashMap;

use slot_dispatch::config::{DispatcherConfig, FaultPolicy};

#[test]
fn test_dispatcher_config_validation() {
    let valid = DispatcherConfig::new()
        .with_max_concurrency(4)
        .with_resource_count(2);
    assert!(valid.validate().is_ok());
}

#[test]
fn test_dispatcher_config_invalid_concurrency() {
    let invalid = DispatcherConfig::new().with_max_concurrency(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_dispatcher_config_invalid_resource_count() {
    let invalid = DispatcherConfig::new().with_resource_count(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_dispatcher_config_invalid_dispatch_limit() {
    let invalid = DispatcherConfig::new().with_max_dispatches(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_dispatcher_config_from_json() {
    let json = r#"{
        "max_concurrency": 6,
        "resource_count": 3,
        "worker_duration_ms": 250,
        "contention_backoff_ms": 50,
        "fault_policy": "retain_claim",
        "max_dispatches": 100
    }"#;

    let config = DispatcherConfig::from_json_str(json).unwrap();
    assert_eq!(config.max_concurrency, 6);
    assert_eq!(config.resource_count, 3);
    assert_eq!(config.worker_duration_ms, 250);
    assert_eq!(config.contention_backoff_ms, 50);
    assert_eq!(config.fault_policy, FaultPolicy::RetainClaim);
    assert_eq!(config.max_dispatches, Some(100));
}

#[test]
fn test_dispatcher_config_json_defaults() {
    let config = DispatcherConfig::from_json_str("{}").unwrap();
    assert_eq!(config, DispatcherConfig::default());
}

#[test]
fn test_dispatcher_config_json_rejects_invalid() {
    assert!(DispatcherConfig::from_json_str(r#"{"resource_count": 0}"#).is_err());
    assert!(DispatcherConfig::from_json_str("not json").is_err());
}

#[test]
fn test_dispatcher_config_from_lookup() {
    let vars: HashMap<&str, &str> = [
        ("SLOT_DISPATCH_MAX_CONCURRENCY", "3"),
        ("SLOT_DISPATCH_WORKER_DURATION_MS", " 20 "),
        ("SLOT_DISPATCH_FAULT_POLICY", "retain"),
    ]
    .into_iter()
    .collect();

    let config =
        DispatcherConfig::from_lookup(|name| vars.get(name).map(|v| (*v).to_string())).unwrap();
    assert_eq!(config.max_concurrency, 3);
    assert_eq!(config.worker_duration_ms, 20);
    assert_eq!(config.fault_policy, FaultPolicy::RetainClaim);
    assert_eq!(config.resource_count, 2);
    assert_eq!(config.contention_backoff_ms, 1000);
}

#[test]
fn test_dispatcher_config_from_lookup_reports_bad_value() {
    let err = DispatcherConfig::from_lookup(|name| {
        (name == "SLOT_DISPATCH_RESOURCE_COUNT").then(|| "two".to_string())
    })
    .unwrap_err();
    assert!(err.starts_with("SLOT_DISPATCH_RESOURCE_COUNT: invalid value `two`"));
}
