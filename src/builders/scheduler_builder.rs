//! Builder assembling a scheduler from configuration and collaborators.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{OverflowPolicy, SchedulerConfig};
use crate::core::{ErrorHandler, LoggingErrorHandler, Scheduler, SchedulerError};

/// Builds a [`Scheduler`].
///
/// Collaborators are passed in explicitly: the error handler receives every
/// failed execution, and the tracing dispatcher is installed on every
/// scheduler thread. When no dispatcher is given, the one active on the
/// calling thread at [`build`](Self::build) time is used.
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    dispatch: Option<tracing::Dispatch>,
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerBuilder {
    /// Builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(SchedulerConfig::default())
    }

    /// Builder starting from an existing configuration.
    #[must_use]
    pub fn from_config(config: SchedulerConfig) -> Self {
        Self {
            config,
            error_handler: None,
            dispatch: None,
        }
    }

    /// Number of worker threads.
    #[must_use]
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.config.pool_size = pool_size;
        self
    }

    /// Worker thread name prefix.
    #[must_use]
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    /// Ready queue capacity.
    #[must_use]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Behaviour when the ready queue is full.
    #[must_use]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.config.overflow_policy = policy;
        self
    }

    /// Shutdown grace period.
    #[must_use]
    pub fn await_termination(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_await_termination(timeout);
        self
    }

    /// Handler invoked once per failed execution. Defaults to
    /// [`LoggingErrorHandler`].
    #[must_use]
    pub fn error_handler(mut self, handler: impl ErrorHandler) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Tracing dispatcher used by the scheduler's threads.
    #[must_use]
    pub fn dispatch(mut self, dispatch: tracing::Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// The configuration as currently assembled.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Validate the configuration and start the scheduler.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::Config` if the configuration is invalid
    /// - `SchedulerError::Spawn` if a thread cannot be started
    pub fn build(self) -> Result<Scheduler, SchedulerError> {
        let error_handler = self
            .error_handler
            .unwrap_or_else(|| Arc::new(LoggingErrorHandler) as Arc<dyn ErrorHandler>);
        let dispatch = self
            .dispatch
            .unwrap_or_else(|| tracing::dispatcher::get_default(tracing::Dispatch::clone));
        Scheduler::start(self.config, error_handler, dispatch)
    }
}
