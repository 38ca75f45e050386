//! Error types for scheduler operations.

use thiserror::Error;

use crate::core::task::TaskId;

/// Errors produced by the scheduler's own API.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Construction parameters were rejected.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// A trigger could not be built (zero interval, bad cron expression).
    #[error("invalid trigger: {0}")]
    InvalidTrigger(String),
    /// The scheduler has been shut down and accepts no new tasks.
    #[error("scheduler has been shut down")]
    Shutdown,
    /// A scheduler thread could not be started.
    #[error("failed to spawn thread: {0}")]
    Spawn(String),
}

/// Failure of a single task execution, contained at the worker boundary.
#[derive(Debug, Error)]
pub enum TaskExecutionError {
    /// The task body returned an error.
    #[error("task `{task_name}` (id {task_id}) failed: {error:#}")]
    Failed {
        /// Identifier of the failing task.
        task_id: TaskId,
        /// Name of the failing task.
        task_name: String,
        /// Error returned by the task body.
        error: anyhow::Error,
    },
    /// The task body panicked.
    #[error("task `{task_name}` (id {task_id}) panicked: {message}")]
    Panicked {
        /// Identifier of the failing task.
        task_id: TaskId,
        /// Name of the failing task.
        task_name: String,
        /// Panic payload rendered as text.
        message: String,
    },
}

impl TaskExecutionError {
    /// Identifier of the task whose execution failed.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        match self {
            Self::Failed { task_id, .. } | Self::Panicked { task_id, .. } => *task_id,
        }
    }

    /// Name of the task whose execution failed.
    #[must_use]
    pub fn task_name(&self) -> &str {
        match self {
            Self::Failed { task_name, .. } | Self::Panicked { task_name, .. } => task_name,
        }
    }

    /// Whether the failure was a panic rather than a returned error.
    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
