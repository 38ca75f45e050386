//! Worker threads executing firings from the ready queue.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::Receiver;
use futures::FutureExt;
use tokio::runtime::Runtime;
use tracing::{debug, error};

use crate::core::task::TaskEntry;
use crate::core::{SchedulerError, TaskExecutionError, TriggerContext};

use super::dispatcher::Firing;
use super::Shared;

/// Spawn a worker thread.
///
/// Each worker owns a single-threaded tokio runtime in which task bodies are
/// driven, so an async body can await timers and I/O without a shared runtime.
pub(super) fn spawn_worker(
    name: String,
    ready_rx: Receiver<Firing>,
    shared: Arc<Shared>,
    dispatch: tracing::Dispatch,
) -> Result<JoinHandle<()>, SchedulerError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| SchedulerError::Spawn(format!("{name}: worker runtime: {e}")))?;

    let stack_size = shared.config.thread_stack_size;
    let worker = name.clone();
    thread::Builder::new()
        .name(name.clone())
        .stack_size(stack_size)
        .spawn(move || {
            tracing::dispatcher::with_default(&dispatch, || {
                run_worker(&worker, &rt, &ready_rx, &shared);
            });
        })
        .map_err(|e| SchedulerError::Spawn(format!("{name}: {e}")))
}

/// Worker loop. Blocks on the ready queue and exits once the dispatcher has
/// dropped its sender and the queue is drained.
fn run_worker(worker: &str, rt: &Runtime, ready_rx: &Receiver<Firing>, shared: &Shared) {
    debug!(worker = worker, "Worker thread started");

    for firing in ready_rx {
        shared.counters.queued_firings.fetch_sub(1, Ordering::Relaxed);

        if shared.is_shutdown() {
            debug!(
                worker = worker,
                task_id = firing.task.id,
                "Discarding queued firing on shutdown"
            );
            continue;
        }
        if firing.task.is_cancelled() {
            shared.forget(firing.task.id);
            continue;
        }

        execute(worker, rt, shared, &firing);
    }

    debug!(worker = worker, "Worker thread exiting");
}

/// Run one firing and reschedule its task. Errors and panics stop here.
fn execute(worker: &str, rt: &Runtime, shared: &Shared, firing: &Firing) {
    let task = &firing.task;
    shared.counters.active_executions.fetch_add(1, Ordering::Relaxed);

    let started = Instant::now();
    debug!(worker = worker, task_id = task.id, task = %task.name, "Executing scheduled task");

    let outcome = rt.block_on(AssertUnwindSafe(task.body.run()).catch_unwind());
    let completed = Instant::now();
    task.record_execution();

    match outcome {
        Ok(Ok(())) => {
            shared.counters.completed_executions.fetch_add(1, Ordering::Relaxed);
            debug!(
                worker = worker,
                task_id = task.id,
                elapsed_ms = u64::try_from((completed - started).as_millis()).unwrap_or(u64::MAX),
                "Scheduled task completed"
            );
        }
        Ok(Err(error)) => {
            let failure = TaskExecutionError::Failed {
                task_id: task.id,
                task_name: task.name.clone(),
                error,
            };
            report_failure(worker, shared, task, &failure);
        }
        Err(payload) => {
            let failure = TaskExecutionError::Panicked {
                task_id: task.id,
                task_name: task.name.clone(),
                message: panic_message(payload.as_ref()),
            };
            report_failure(worker, shared, task, &failure);
        }
    }

    shared.counters.active_executions.fetch_sub(1, Ordering::Relaxed);

    let ctx = TriggerContext {
        scheduled: firing.scheduled,
        started,
        completed,
    };
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| shared.reschedule(task, &ctx))) {
        error!(
            worker = worker,
            task_id = task.id,
            task = %task.name,
            panic = %panic_message(payload.as_ref()),
            "Rescheduling panicked, task retired"
        );
        task.mark_done();
        shared.forget(task.id);
    }
}

fn report_failure(
    worker: &str,
    shared: &Shared,
    task: &TaskEntry,
    failure: &TaskExecutionError,
) {
    shared.counters.failed_executions.fetch_add(1, Ordering::Relaxed);
    task.record_failure();
    error!(
        worker = worker,
        task_id = task.id,
        task = %task.name,
        error = %failure,
        "Scheduled task execution failed"
    );

    let handler = &shared.error_handler;
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler.handle_error(failure))) {
        error!(
            worker = worker,
            task_id = task.id,
            panic = %panic_message(payload.as_ref()),
            "Error handler panicked"
        );
    }
}

/// Render a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
