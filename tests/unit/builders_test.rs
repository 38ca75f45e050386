//! Tests for builder modules

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use event_scheduler::builders::SchedulerBuilder;
use event_scheduler::config::{OverflowPolicy, SchedulerConfig};
use event_scheduler::core::{Scheduler, SchedulerError, TaskExecutionError, Trigger};
use event_scheduler::util::scheduler_dispatch;

#[test]
fn test_builder_defaults() {
    let builder = SchedulerBuilder::new();
    assert_eq!(builder.config(), &SchedulerConfig::default());
}

#[test]
fn test_builder_from_config() {
    let config = SchedulerConfig::new()
        .with_pool_size(2)
        .with_overflow_policy(OverflowPolicy::DropNewest);
    let builder = SchedulerBuilder::from_config(config.clone());
    assert_eq!(builder.config(), &config);
}

#[test]
fn test_builder_rejects_zero_pool() {
    let result = Scheduler::builder().pool_size(0).build();
    assert!(matches!(result, Err(SchedulerError::Config(_))));
}

#[test]
fn test_builder_with_explicit_collaborators() {
    let handled = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&handled);

    let scheduler = Scheduler::builder()
        .pool_size(1)
        .thread_name_prefix("builder-")
        .dispatch(scheduler_dispatch("event_scheduler=debug"))
        .error_handler(move |_err: &TaskExecutionError| {
            handler_flag.store(true, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    scheduler
        .schedule_fn(|| anyhow::bail!("fail once"), Trigger::once(Duration::ZERO))
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    while !handled.load(Ordering::SeqCst) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(handled.load(Ordering::SeqCst));
    assert_eq!(scheduler.worker_names(), ["builder-1"]);
    scheduler.shutdown();
}
