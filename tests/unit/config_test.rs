//! Tests for configuration validation

use std::collections::HashMap;
use std::time::Duration;

use event_scheduler::config::{OverflowPolicy, SchedulerConfig};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn test_scheduler_config_validation() {
    let valid = SchedulerConfig::new()
        .with_pool_size(5)
        .with_queue_capacity(64)
        .with_overflow_policy(OverflowPolicy::DropNewest);
    assert!(valid.validate().is_ok());
}

#[test]
fn test_scheduler_config_invalid_pool_size() {
    let invalid = SchedulerConfig::new().with_pool_size(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_invalid_queue_capacity() {
    let invalid = SchedulerConfig::new().with_queue_capacity(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_invalid_prefix() {
    let invalid = SchedulerConfig::new().with_thread_name_prefix("");
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_invalid_stack_size() {
    let invalid = SchedulerConfig::new().with_thread_stack_size(1024);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_await_termination_round_trip() {
    let cfg = SchedulerConfig::new().with_await_termination(Duration::from_secs(3));
    assert_eq!(cfg.await_termination_ms, 3_000);
    assert_eq!(cfg.await_termination(), Duration::from_secs(3));
}

#[test]
fn test_scheduler_config_from_json() {
    let json = r#"{
        "pool_size": 8,
        "thread_name_prefix": "jobs-",
        "queue_capacity": 16,
        "overflow_policy": "block"
    }"#;

    let config = SchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(config.pool_size, 8);
    assert_eq!(config.thread_name_prefix, "jobs-");
    assert_eq!(config.queue_capacity, 16);
    assert_eq!(config.overflow_policy, OverflowPolicy::Block);
    assert_eq!(config.await_termination_ms, 2_000);
}

#[test]
fn test_scheduler_config_from_empty_json_uses_defaults() {
    let config = SchedulerConfig::from_json_str("{}").unwrap();
    assert_eq!(config, SchedulerConfig::default());
}

#[test]
fn test_scheduler_config_from_json_rejects_negative_pool() {
    assert!(SchedulerConfig::from_json_str(r#"{"pool_size": -1}"#).is_err());
    assert!(SchedulerConfig::from_json_str(r#"{"pool_size": 0}"#).is_err());
}

#[test]
fn test_scheduler_config_from_lookup() {
    let config = SchedulerConfig::from_lookup(lookup(&[
        ("EVENT_SCHEDULER_POOL_SIZE", "3"),
        ("EVENT_SCHEDULER_THREAD_NAME_PREFIX", "env-"),
        ("EVENT_SCHEDULER_OVERFLOW_POLICY", "drop-newest"),
        ("EVENT_SCHEDULER_AWAIT_TERMINATION_MS", "250"),
    ]))
    .unwrap();

    assert_eq!(config.pool_size, 3);
    assert_eq!(config.thread_name_prefix, "env-");
    assert_eq!(config.overflow_policy, OverflowPolicy::DropNewest);
    assert_eq!(config.await_termination_ms, 250);
    assert_eq!(config.queue_capacity, 1024);
}

#[test]
fn test_scheduler_config_from_lookup_rejects_bad_values() {
    let negative = SchedulerConfig::from_lookup(lookup(&[("EVENT_SCHEDULER_POOL_SIZE", "-2")]));
    assert!(negative.unwrap_err().contains("EVENT_SCHEDULER_POOL_SIZE"));

    let zero = SchedulerConfig::from_lookup(lookup(&[("EVENT_SCHEDULER_POOL_SIZE", "0")]));
    assert!(zero.is_err());

    let policy =
        SchedulerConfig::from_lookup(lookup(&[("EVENT_SCHEDULER_OVERFLOW_POLICY", "spill")]));
    assert!(policy.is_err());
}
