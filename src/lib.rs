//! # Event Scheduler
//!
//! A fixed-size worker-pool task scheduler with centralized error containment.
//!
//! Tasks are registered with a trigger (fixed delay, fixed rate, cron
//! expression, or one-shot) and run on a pool of named OS threads. A task
//! that fails, by returning an error or by panicking, is reported to a
//! registered error handler and keeps its schedule; the pool and every other
//! task carry on unaffected.
//!
//! ## Key Features
//!
//! - **Bounded Concurrency**: exactly `pool_size` worker threads, named `{prefix}{ordinal}`
//! - **No Self-Overlap**: a task's next firing is armed only after its current run ends
//! - **Failure Isolation**: errors and panics stop at the worker boundary
//! - **Bounded Queueing**: a fixed-capacity ready queue with an explicit overflow policy
//! - **Cooperative Cancellation**: cancelling stops future firings, never interrupts a run
//! - **Async Task Bodies**: each worker drives tasks on its own single-threaded tokio runtime
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use event_scheduler::config::SchedulerConfig;
//! use event_scheduler::core::{Scheduler, TaskExecutionError, Trigger};
//!
//! let scheduler = Scheduler::builder()
//!     .pool_size(5)
//!     .thread_name_prefix("event-scheduler-")
//!     .error_handler(|err: &TaskExecutionError| eprintln!("{err}"))
//!     .build()?;
//!
//! let heartbeat = scheduler.schedule_fn(
//!     || Ok(()),
//!     Trigger::fixed_rate(Duration::from_secs(30))?,
//! )?;
//! let nightly = scheduler.schedule_fn(|| Ok(()), Trigger::cron("0 3 * * *")?)?;
//!
//! heartbeat.cancel();
//! scheduler.shutdown();
//! ```
//!
//! For complete examples, see:
//! - `tests/scheduler_test.rs` - Full integration tests

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: tasks, triggers, errors, and the scheduler.
pub mod core;
/// Configuration models for the scheduler.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Shared utilities.
pub mod util;
