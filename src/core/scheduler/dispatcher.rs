//! Timer heap and the dispatcher thread that turns due timers into firings.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, warn};

use crate::config::OverflowPolicy;
use crate::core::task::TaskEntry;
use crate::core::SchedulerError;
use crate::util::clock::FireTime;

use super::Shared;

/// A task armed for a future firing.
pub(crate) struct TimerEntry {
    pub fire: FireTime,
    /// Tie-breaker so equal deadlines fire in arming order.
    pub seq: u64,
    pub task: Arc<TaskEntry>,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire.at == other.fire.at && self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    // Reversed: `BinaryHeap` is a max-heap and the earliest deadline must be on top.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .fire
            .at
            .cmp(&self.fire.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A due occurrence of a task, waiting for or running on a worker.
pub(crate) struct Firing {
    pub task: Arc<TaskEntry>,
    pub scheduled: FireTime,
}

/// Spawn the dispatcher thread.
pub(super) fn spawn_dispatcher(
    name: String,
    ready_tx: Sender<Firing>,
    ready_rx: Receiver<Firing>,
    shared: Arc<Shared>,
    dispatch: tracing::Dispatch,
) -> Result<JoinHandle<()>, SchedulerError> {
    thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            tracing::dispatcher::with_default(&dispatch, || {
                debug!("Dispatcher thread started");
                while let Some(due) = wait_for_due(&shared) {
                    for entry in due {
                        dispatch_due(&shared, &ready_tx, &ready_rx, entry);
                    }
                }
                debug!("Dispatcher thread exiting");
            });
        })
        .map_err(|e| SchedulerError::Spawn(format!("{name}: {e}")))
}

/// Block until at least one timer is due and pop every due timer, or return
/// `None` on shutdown.
fn wait_for_due(shared: &Shared) -> Option<Vec<TimerEntry>> {
    let mut timers = shared.timers.lock();
    loop {
        if shared.is_shutdown() {
            return None;
        }

        let now = Instant::now();
        match timers.peek().map(|top| top.fire.at) {
            None => shared.wakeup.wait(&mut timers),
            Some(at) if at <= now => {
                let mut due = Vec::new();
                while timers.peek().is_some_and(|top| top.fire.at <= now) {
                    if let Some(entry) = timers.pop() {
                        due.push(entry);
                    }
                }
                return Some(due);
            }
            Some(at) => {
                shared.wakeup.wait_until(&mut timers, at);
            }
        }
    }
}

/// Hand a due timer to the workers, applying the overflow policy.
fn dispatch_due(
    shared: &Shared,
    ready_tx: &Sender<Firing>,
    ready_rx: &Receiver<Firing>,
    entry: TimerEntry,
) {
    if entry.task.is_cancelled() {
        shared.forget(entry.task.id);
        return;
    }

    let firing = Firing {
        task: entry.task,
        scheduled: entry.fire,
    };

    // Counted before sending so a worker never decrements ahead of us.
    let queued = &shared.counters.queued_firings;
    queued.fetch_add(1, Ordering::Relaxed);

    match shared.config.overflow_policy {
        OverflowPolicy::Block => {
            if ready_tx.send(firing).is_err() {
                queued.fetch_sub(1, Ordering::Relaxed);
            }
        }
        OverflowPolicy::DropNewest => match ready_tx.try_send(firing) {
            Ok(()) => {}
            Err(TrySendError::Full(rejected)) => {
                queued.fetch_sub(1, Ordering::Relaxed);
                shared.counters.dropped_firings.fetch_add(1, Ordering::Relaxed);
                warn!(
                    task_id = rejected.task.id,
                    task = %rejected.task.name,
                    "Ready queue full, dropping newest firing"
                );
                shared.skip(&rejected);
            }
            Err(TrySendError::Disconnected(_)) => {
                queued.fetch_sub(1, Ordering::Relaxed);
            }
        },
        OverflowPolicy::DropOldest => {
            let mut pending = firing;
            loop {
                match ready_tx.try_send(pending) {
                    Ok(()) => break,
                    Err(TrySendError::Full(returned)) => {
                        pending = returned;
                        // A worker may have drained the queue meanwhile; retry either way.
                        if let Ok(evicted) = ready_rx.try_recv() {
                            queued.fetch_sub(1, Ordering::Relaxed);
                            shared.counters.dropped_firings.fetch_add(1, Ordering::Relaxed);
                            warn!(
                                task_id = evicted.task.id,
                                task = %evicted.task.name,
                                "Ready queue full, dropping oldest firing"
                            );
                            shared.skip(&evicted);
                        }
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        queued.fetch_sub(1, Ordering::Relaxed);
                        break;
                    }
                }
            }
        }
    }
}
