//! Core scheduling abstractions: tasks, triggers, error containment, and the scheduler.

pub mod error;
pub mod error_handler;
pub mod scheduler;
pub mod task;
pub mod trigger;

pub use error::{AppResult, SchedulerError, TaskExecutionError};
pub use error_handler::{ErrorHandler, LoggingErrorHandler};
pub use scheduler::{Scheduler, SchedulerState, SchedulerStats};
pub use task::{AsyncFnTask, FnTask, Task, TaskHandle, TaskId};
pub use trigger::{CronTrigger, Trigger, TriggerContext};
