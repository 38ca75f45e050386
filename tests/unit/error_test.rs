//! Tests for error types

use event_scheduler::core::{SchedulerError, TaskExecutionError};

#[test]
fn test_config_error() {
    let err = SchedulerError::Config("pool_size must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: pool_size must be greater than 0"
    );
}

#[test]
fn test_invalid_trigger_error() {
    let err = SchedulerError::InvalidTrigger("fixed delay must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid trigger: fixed delay must be greater than 0"
    );
}

#[test]
fn test_shutdown_error() {
    let err = SchedulerError::Shutdown;
    assert_eq!(format!("{}", err), "scheduler has been shut down");
}

#[test]
fn test_spawn_error() {
    let err = SchedulerError::Spawn("event-scheduler-1: out of threads".to_string());
    assert_eq!(
        format!("{}", err),
        "failed to spawn thread: event-scheduler-1: out of threads"
    );
}

#[test]
fn test_task_failed_error() {
    let err = TaskExecutionError::Failed {
        task_id: 12,
        task_name: "refresh-cache".to_string(),
        error: anyhow::anyhow!("timeout"),
    };
    assert_eq!(err.task_id(), 12);
    assert_eq!(err.task_name(), "refresh-cache");
    assert_eq!(
        format!("{}", err),
        "task `refresh-cache` (id 12) failed: timeout"
    );
}
