//! Task scheduler backed by a fixed pool of named worker threads.
//!
//! A single dispatcher thread keeps a timer heap ordered by deadline and
//! sleeps on a condition variable until the earliest one is due. Due firings
//! go onto a bounded ready queue; the first idle worker picks them up.
//!
//! # Key Properties
//!
//! - **No self-overlap**: a task's next firing is computed only after its
//!   current execution completes
//! - **Failure isolation**: errors and panics are caught at the worker,
//!   reported to the [`ErrorHandler`], and the task stays scheduled
//! - **Bounded queueing**: the ready queue has a fixed capacity and an
//!   explicit [`OverflowPolicy`](crate::config::OverflowPolicy)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use event_scheduler::core::{LoggingErrorHandler, Scheduler, Trigger};
//!
//! let scheduler = Scheduler::new(5, "event-scheduler-", LoggingErrorHandler)?;
//! let handle = scheduler.schedule_fn(
//!     || {
//!         println!("tick");
//!         Ok(())
//!     },
//!     Trigger::fixed_rate(Duration::from_secs(1))?,
//! )?;
//!
//! handle.cancel();
//! scheduler.shutdown();
//! ```

mod dispatcher;
mod worker;

use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::bounded;
use parking_lot::{Condvar, Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::builders::SchedulerBuilder;
use crate::config::SchedulerConfig;
use crate::core::task::TaskEntry;
use crate::core::{
    ErrorHandler, FnTask, SchedulerError, Task, TaskHandle, TaskId, Trigger, TriggerContext,
};
use crate::util::clock::{FireTime, Now};

use dispatcher::{Firing, TimerEntry};

/// Lifecycle state of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Accepting tasks and firing triggers.
    Running,
    /// Shut down; no further firings.
    Stopped,
}

/// Snapshot of scheduler activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Tasks registered and not yet cancelled or exhausted.
    pub scheduled_tasks: usize,
    /// Executions currently running on a worker.
    pub active_executions: u64,
    /// Firings waiting in the ready queue.
    pub queued_firings: u64,
    /// Executions that finished successfully.
    pub completed_executions: u64,
    /// Executions that returned an error or panicked.
    pub failed_executions: u64,
    /// Firings discarded because the ready queue was full.
    pub dropped_firings: u64,
}

/// Lock-free counters behind [`SchedulerStats`].
#[derive(Debug, Default)]
pub(crate) struct SchedulerCounters {
    pub active_executions: AtomicU64,
    pub queued_firings: AtomicU64,
    pub completed_executions: AtomicU64,
    pub failed_executions: AtomicU64,
    pub dropped_firings: AtomicU64,
}

impl SchedulerCounters {
    pub fn snapshot(&self, worker_count: usize, scheduled_tasks: usize) -> SchedulerStats {
        SchedulerStats {
            worker_count,
            scheduled_tasks,
            active_executions: self.active_executions.load(Ordering::Relaxed),
            queued_firings: self.queued_firings.load(Ordering::Relaxed),
            completed_executions: self.completed_executions.load(Ordering::Relaxed),
            failed_executions: self.failed_executions.load(Ordering::Relaxed),
            dropped_firings: self.dropped_firings.load(Ordering::Relaxed),
        }
    }
}

/// State shared by the scheduler, its threads, and task handles.
pub(crate) struct Shared {
    pub(crate) config: SchedulerConfig,
    timers: Mutex<BinaryHeap<TimerEntry>>,
    wakeup: Condvar,
    tasks: RwLock<HashMap<TaskId, Arc<TaskEntry>>>,
    shutdown: AtomicBool,
    pub(crate) counters: SchedulerCounters,
    pub(crate) error_handler: Arc<dyn ErrorHandler>,
    next_task_id: AtomicU64,
    next_seq: AtomicU64,
}

impl Shared {
    fn new(config: SchedulerConfig, error_handler: Arc<dyn ErrorHandler>) -> Self {
        Self {
            config,
            timers: Mutex::new(BinaryHeap::new()),
            wakeup: Condvar::new(),
            tasks: RwLock::new(HashMap::new()),
            shutdown: AtomicBool::new(false),
            counters: SchedulerCounters::default(),
            error_handler,
            next_task_id: AtomicU64::new(1),
            next_seq: AtomicU64::new(0),
        }
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Flip to shutdown and wake the dispatcher. Returns true on the first call.
    fn begin_shutdown(&self) -> bool {
        let _timers = self.timers.lock();
        let first = !self.shutdown.swap(true, Ordering::AcqRel);
        self.wakeup.notify_all();
        first
    }

    /// Drop a task from the registry.
    pub(crate) fn forget(&self, id: TaskId) {
        self.tasks.write().remove(&id);
    }

    /// Put a task on the timer heap. Returns false once shutdown has begun.
    #[must_use]
    fn arm(&self, task: Arc<TaskEntry>, fire: FireTime) -> bool {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut timers = self.timers.lock();
        if self.is_shutdown() {
            return false;
        }
        timers.push(TimerEntry { fire, seq, task });
        self.wakeup.notify_all();
        true
    }

    /// Arm the next firing after an execution, or retire the task when its
    /// trigger is exhausted.
    pub(crate) fn reschedule(&self, task: &Arc<TaskEntry>, ctx: &TriggerContext) {
        if self.is_shutdown() || task.is_cancelled() {
            self.forget(task.id);
            return;
        }
        match task.trigger.next_fire(ctx, &Now::capture()) {
            Some(fire) => {
                if !self.arm(Arc::clone(task), fire) {
                    self.forget(task.id);
                }
            }
            None => {
                task.mark_done();
                self.forget(task.id);
                debug!(task_id = task.id, task = %task.name, "Trigger exhausted, task retired");
            }
        }
    }

    /// Reschedule a firing that was dropped without running. The next slot is
    /// measured from now so an overloaded queue cannot re-arm it as already due.
    pub(crate) fn skip(&self, firing: &Firing) {
        let now = Now::capture();
        let ctx = TriggerContext {
            scheduled: FireTime {
                at: now.instant,
                wall: now.wall.max(firing.scheduled.wall),
            },
            started: now.instant,
            completed: now.instant,
        };
        self.reschedule(&firing.task, &ctx);
    }
}

/// Fixed-size thread-pool task scheduler.
///
/// `Scheduler` is `Send + Sync`; share it behind an `Arc` to schedule from
/// several threads.
pub struct Scheduler {
    shared: Arc<Shared>,
    worker_names: Vec<String>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a scheduler with `pool_size` workers named
    /// `{name_prefix}1..={pool_size}` and default settings otherwise.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::Config` if `pool_size` is 0 or the prefix is empty
    /// - `SchedulerError::Spawn` if a thread cannot be started
    pub fn new(
        pool_size: usize,
        name_prefix: impl Into<String>,
        on_error: impl ErrorHandler,
    ) -> Result<Self, SchedulerError> {
        SchedulerBuilder::new()
            .pool_size(pool_size)
            .thread_name_prefix(name_prefix)
            .error_handler(on_error)
            .build()
    }

    /// Create a scheduler from a full configuration.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_config(
        config: SchedulerConfig,
        on_error: impl ErrorHandler,
    ) -> Result<Self, SchedulerError> {
        SchedulerBuilder::from_config(config)
            .error_handler(on_error)
            .build()
    }

    /// Builder for full control over configuration and collaborators.
    #[must_use]
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    /// Spawn the worker and dispatcher threads.
    pub(crate) fn start(
        config: SchedulerConfig,
        error_handler: Arc<dyn ErrorHandler>,
        dispatch: tracing::Dispatch,
    ) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::Config)?;

        let (ready_tx, ready_rx) = bounded::<Firing>(config.queue_capacity);
        let shared = Arc::new(Shared::new(config, error_handler));
        let cfg = &shared.config;

        let mut worker_names = Vec::with_capacity(cfg.pool_size);
        let mut workers = Vec::with_capacity(cfg.pool_size);
        for ordinal in 1..=cfg.pool_size {
            let name = format!("{}{ordinal}", cfg.thread_name_prefix);
            let spawned = worker::spawn_worker(
                name.clone(),
                ready_rx.clone(),
                Arc::clone(&shared),
                dispatch.clone(),
            );
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Dropping `ready_tx` on return releases the workers already started.
                    shared.begin_shutdown();
                    return Err(e);
                }
            }
            worker_names.push(name);
        }

        let dispatcher = match dispatcher::spawn_dispatcher(
            format!("{}dispatcher", cfg.thread_name_prefix),
            ready_tx,
            ready_rx,
            Arc::clone(&shared),
            dispatch,
        ) {
            Ok(handle) => handle,
            Err(e) => {
                shared.begin_shutdown();
                return Err(e);
            }
        };

        info!(
            pool_size = cfg.pool_size,
            thread_name_prefix = %cfg.thread_name_prefix,
            queue_capacity = cfg.queue_capacity,
            overflow_policy = %cfg.overflow_policy,
            "Scheduler started"
        );

        Ok(Self {
            shared,
            worker_names,
            workers: Mutex::new(workers),
            dispatcher: Mutex::new(Some(dispatcher)),
        })
    }

    /// Register a task under an automatically assigned name.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Shutdown` if the scheduler has been shut down.
    pub fn schedule<T: Task>(
        &self,
        task: T,
        trigger: Trigger,
    ) -> Result<TaskHandle, SchedulerError> {
        self.register(None, Box::new(task), trigger)
    }

    /// Register a task with a name used in logs and error reports.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Shutdown` if the scheduler has been shut down.
    pub fn schedule_named<T: Task>(
        &self,
        name: impl Into<String>,
        task: T,
        trigger: Trigger,
    ) -> Result<TaskHandle, SchedulerError> {
        self.register(Some(name.into()), Box::new(task), trigger)
    }

    /// Register a synchronous closure.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Shutdown` if the scheduler has been shut down.
    pub fn schedule_fn<F>(&self, f: F, trigger: Trigger) -> Result<TaskHandle, SchedulerError>
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.schedule(FnTask::new(f), trigger)
    }

    fn register(
        &self,
        name: Option<String>,
        body: Box<dyn Task>,
        trigger: Trigger,
    ) -> Result<TaskHandle, SchedulerError> {
        if self.shared.is_shutdown() {
            return Err(SchedulerError::Shutdown);
        }

        let id = self.shared.next_task_id.fetch_add(1, Ordering::Relaxed);
        let name = name.unwrap_or_else(|| format!("task-{id}"));
        let entry = Arc::new(TaskEntry::new(id, name, trigger, body));
        let handle = TaskHandle::new(Arc::clone(&entry), Arc::downgrade(&self.shared));

        let Some(first) = entry.trigger.first_fire(&Now::capture()) else {
            entry.mark_done();
            debug!(task_id = id, task = %entry.name, "Trigger has no firing time, task not armed");
            return Ok(handle);
        };

        self.shared.tasks.write().insert(id, Arc::clone(&entry));
        if !self.shared.arm(Arc::clone(&entry), first) {
            // Shutdown began after the check above.
            self.shared.forget(id);
            return Err(SchedulerError::Shutdown);
        }
        debug!(task_id = id, task = %entry.name, trigger = ?entry.trigger, "Task scheduled");
        Ok(handle)
    }

    /// Stop all future firings of a task; see [`TaskHandle::cancel`].
    pub fn cancel(&self, handle: &TaskHandle) -> bool {
        handle.cancel()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        if self.shared.is_shutdown() {
            SchedulerState::Stopped
        } else {
            SchedulerState::Running
        }
    }

    /// Names of the worker threads, in ordinal order.
    #[must_use]
    pub fn worker_names(&self) -> &[String] {
        &self.worker_names
    }

    /// Number of worker threads.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.worker_names.len()
    }

    /// Configuration the scheduler was built with.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Current activity counters.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        let scheduled = self.shared.tasks.read().len();
        self.shared.counters.snapshot(self.worker_names.len(), scheduled)
    }

    /// Shut down: stop firing triggers, discard queued firings, let running
    /// executions finish, and join the threads within the configured
    /// grace period. Threads still busy after it are detached.
    pub fn shutdown(&self) {
        if !self.shared.begin_shutdown() {
            return;
        }
        info!("Shutting down scheduler");

        let deadline = Instant::now() + self.shared.config.await_termination();

        if let Some(handle) = self.dispatcher.lock().take() {
            join_until(handle, "dispatcher", deadline);
        }

        let mut workers = self.workers.lock();
        let worker_count = workers.len();
        for (handle, name) in workers.drain(..).zip(&self.worker_names) {
            join_until(handle, name, deadline);
        }

        self.shared.tasks.write().clear();
        info!(worker_count = worker_count, "Scheduler shut down complete");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // Signal only; joining here could block on a long-running task.
        if self.shared.begin_shutdown() {
            debug!("Scheduler dropped without explicit shutdown - threads will be detached");
        }
    }
}

/// Join a thread, giving up at `deadline`.
fn join_until(handle: JoinHandle<()>, name: &str, deadline: Instant) {
    let (tx, rx) = bounded(1);
    let joiner = std::thread::spawn(move || {
        let _ = tx.send(handle.join().is_ok());
    });

    let remaining = deadline.saturating_duration_since(Instant::now());
    match rx.recv_timeout(remaining.max(Duration::from_millis(1))) {
        Ok(true) => {
            debug!(thread = name, "Thread joined");
            let _ = joiner.join();
        }
        Ok(false) => {
            warn!(thread = name, "Thread panicked");
            let _ = joiner.join();
        }
        Err(_) => {
            warn!(thread = name, "Thread did not exit within timeout - detaching");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LoggingErrorHandler;

    #[test]
    fn test_counters_snapshot() {
        let counters = SchedulerCounters::default();
        counters.completed_executions.fetch_add(4, Ordering::Relaxed);
        counters.failed_executions.fetch_add(2, Ordering::Relaxed);
        counters.dropped_firings.fetch_add(1, Ordering::Relaxed);

        let stats = counters.snapshot(5, 3);
        assert_eq!(stats.worker_count, 5);
        assert_eq!(stats.scheduled_tasks, 3);
        assert_eq!(stats.completed_executions, 4);
        assert_eq!(stats.failed_executions, 2);
        assert_eq!(stats.dropped_firings, 1);
    }

    #[test]
    fn test_zero_pool_size_is_config_error() {
        let result = Scheduler::new(0, "event-scheduler-", LoggingErrorHandler);
        assert!(matches!(result, Err(SchedulerError::Config(_))));
    }

    #[test]
    fn test_workers_are_named_with_ordinals() {
        let scheduler = Scheduler::new(3, "unit-", LoggingErrorHandler).unwrap();
        assert_eq!(scheduler.worker_names(), ["unit-1", "unit-2", "unit-3"]);
        assert_eq!(scheduler.pool_size(), 3);
        assert_eq!(scheduler.state(), SchedulerState::Running);
        scheduler.shutdown();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[test]
    fn test_schedule_after_shutdown_fails() {
        let scheduler = Scheduler::new(1, "unit-", LoggingErrorHandler).unwrap();
        scheduler.shutdown();
        let result = scheduler.schedule_fn(|| Ok(()), Trigger::once(Duration::ZERO));
        assert!(matches!(result, Err(SchedulerError::Shutdown)));
    }

    #[test]
    fn test_arm_refused_after_shutdown_leaves_registry_clean() {
        let shared = Shared::new(SchedulerConfig::default(), Arc::new(LoggingErrorHandler));
        let entry = Arc::new(TaskEntry::new(
            1,
            "late".into(),
            Trigger::once(Duration::ZERO),
            Box::new(FnTask::new(|| Ok(()))),
        ));
        let now = Now::capture();
        assert!(shared.begin_shutdown());
        assert!(!shared.arm(Arc::clone(&entry), now.fire_at(now.instant)));
        assert!(shared.timers.lock().is_empty());

        // A task whose next firing is refused is dropped from the registry.
        shared.tasks.write().insert(entry.id, Arc::clone(&entry));
        let ctx = TriggerContext {
            scheduled: now.fire_at(now.instant),
            started: now.instant,
            completed: now.instant,
        };
        shared.reschedule(&entry, &ctx);
        assert!(shared.tasks.read().is_empty());
    }

    #[test]
    fn test_cancel_removes_task_from_registry() {
        let scheduler = Scheduler::new(1, "unit-", LoggingErrorHandler).unwrap();
        let trigger = Trigger::fixed_delay(Duration::from_secs(60))
            .unwrap()
            .with_initial_delay(Duration::from_secs(60));
        let handle = scheduler.schedule_fn(|| Ok(()), trigger).unwrap();
        assert_eq!(scheduler.stats().scheduled_tasks, 1);
        assert!(scheduler.cancel(&handle));
        assert_eq!(scheduler.stats().scheduled_tasks, 0);
        scheduler.shutdown();
    }
}
