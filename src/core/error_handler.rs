//! Error sinks for failed task executions.

use tracing::error;

use crate::core::TaskExecutionError;

/// Receives every failed task execution.
///
/// Called on the worker thread that ran the task, once per failing
/// execution. A panic raised here is caught and logged; it never takes the
/// worker down.
pub trait ErrorHandler: Send + Sync + 'static {
    /// Handle one failed execution.
    fn handle_error(&self, error: &TaskExecutionError);
}

impl<F> ErrorHandler for F
where
    F: Fn(&TaskExecutionError) + Send + Sync + 'static,
{
    fn handle_error(&self, error: &TaskExecutionError) {
        self(error);
    }
}

/// Logs the failure and lets the schedule continue.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingErrorHandler;

impl ErrorHandler for LoggingErrorHandler {
    fn handle_error(&self, error: &TaskExecutionError) {
        error!(
            task_id = error.task_id(),
            task = error.task_name(),
            panicked = error.is_panic(),
            error = %error,
            "Unexpected error occurred in scheduled task"
        );
    }
}
