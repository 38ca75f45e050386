//! Tasks and the handles returned when they are scheduled.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tracing::debug;

use crate::core::scheduler::Shared;
use crate::core::Trigger;

/// Identifier assigned to each scheduled task.
pub type TaskId = u64;

/// A unit of work run by the scheduler on every firing.
///
/// The body runs on a worker thread inside that worker's single-threaded
/// tokio runtime, so it may await timers and I/O. Returning an error or
/// panicking marks the execution as failed; the task keeps its schedule.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use event_scheduler::core::Task;
///
/// struct PurgeExpiredEvents;
///
/// #[async_trait]
/// impl Task for PurgeExpiredEvents {
///     async fn run(&self) -> anyhow::Result<()> {
///         // ...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Execute one run of the task.
    async fn run(&self) -> anyhow::Result<()>;
}

/// Adapter turning a synchronous closure into a [`Task`].
pub struct FnTask<F>(F);

impl<F> FnTask<F>
where
    F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
{
    /// Wrap a closure.
    pub const fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Task for FnTask<F>
where
    F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
{
    async fn run(&self) -> anyhow::Result<()> {
        (self.0)()
    }
}

/// Adapter turning a closure returning a future into a [`Task`].
pub struct AsyncFnTask<F>(F);

impl<F, Fut> AsyncFnTask<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    /// Wrap a closure.
    pub const fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> Task for AsyncFnTask<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn run(&self) -> anyhow::Result<()> {
        (self.0)().await
    }
}

/// Registration record shared by the scheduler internals and the handle.
pub(crate) struct TaskEntry {
    pub(crate) id: TaskId,
    pub(crate) name: String,
    pub(crate) trigger: Trigger,
    pub(crate) body: Box<dyn Task>,
    cancelled: AtomicBool,
    done: AtomicBool,
    executions: AtomicU64,
    failures: AtomicU64,
}

impl TaskEntry {
    pub(crate) fn new(id: TaskId, name: String, trigger: Trigger, body: Box<dyn Task>) -> Self {
        Self {
            id,
            name,
            trigger,
            body,
            cancelled: AtomicBool::new(false),
            done: AtomicBool::new(false),
            executions: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Returns true if this call performed the cancellation.
    pub(crate) fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn mark_done(&self) {
        self.done.store(true, Ordering::Release);
    }

    pub(crate) fn record_execution(&self) {
        self.executions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }
}

/// Handle to a scheduled task, used to cancel it and observe its progress.
///
/// Handles are cheap to clone; all clones refer to the same registration.
#[derive(Clone)]
pub struct TaskHandle {
    entry: Arc<TaskEntry>,
    scheduler: Weak<Shared>,
}

impl TaskHandle {
    pub(crate) fn new(entry: Arc<TaskEntry>, scheduler: Weak<Shared>) -> Self {
        Self { entry, scheduler }
    }

    /// Identifier of the task.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.entry.id
    }

    /// Name of the task.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.entry.name
    }

    /// The trigger the task was registered with.
    #[must_use]
    pub fn trigger(&self) -> &Trigger {
        &self.entry.trigger
    }

    /// Stop all future firings. An execution already running completes
    /// normally; a firing still waiting for a worker is discarded.
    ///
    /// Returns `false` if the task was already cancelled.
    pub fn cancel(&self) -> bool {
        if !self.entry.cancel() {
            return false;
        }
        if let Some(shared) = self.scheduler.upgrade() {
            shared.forget(self.entry.id);
        }
        debug!(task_id = self.entry.id, task = %self.entry.name, "Scheduled task cancelled");
        true
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.entry.is_cancelled()
    }

    /// Whether the trigger is exhausted (a one-shot task that has fired).
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.entry.done.load(Ordering::Acquire)
    }

    /// Number of completed executions, successful or not.
    #[must_use]
    pub fn execution_count(&self) -> u64 {
        self.entry.executions.load(Ordering::Relaxed)
    }

    /// Number of executions that failed.
    #[must_use]
    pub fn failure_count(&self) -> u64 {
        self.entry.failures.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.entry.id)
            .field("name", &self.entry.name)
            .field("cancelled", &self.is_cancelled())
            .field("done", &self.is_done())
            .finish()
    }
}
