//! Scheduler configuration structures.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of worker threads.
pub const DEFAULT_POOL_SIZE: usize = 5;
/// Default worker thread name prefix.
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "event-scheduler-";
/// Default capacity of the ready queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
/// Default worker thread stack size.
pub const DEFAULT_THREAD_STACK_SIZE: usize = 2 * 1024 * 1024;
/// Default time allowed for workers to finish on shutdown.
pub const DEFAULT_AWAIT_TERMINATION_MS: u64 = 2_000;

const MIN_THREAD_STACK_SIZE: usize = 64 * 1024;
const ENV_PREFIX: &str = "EVENT_SCHEDULER_";

/// What the dispatcher does with a due firing when the ready queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued firing and enqueue the new one.
    #[default]
    DropOldest,
    /// Discard the new firing.
    DropNewest,
    /// Wait until a worker frees a slot.
    Block,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DropOldest => write!(f, "drop_oldest"),
            Self::DropNewest => write!(f, "drop_newest"),
            Self::Block => write!(f, "block"),
        }
    }
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop_oldest" | "drop-oldest" => Ok(Self::DropOldest),
            "drop_newest" | "drop-newest" => Ok(Self::DropNewest),
            "block" => Ok(Self::Block),
            other => Err(format!("unknown overflow policy `{other}`")),
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of worker threads.
    pub pool_size: usize,
    /// Worker threads are named `{thread_name_prefix}{ordinal}`, starting at 1.
    pub thread_name_prefix: String,
    /// Maximum number of firings waiting for a worker.
    pub queue_capacity: usize,
    /// Behaviour when the ready queue is full.
    pub overflow_policy: OverflowPolicy,
    /// Stack size of each worker thread in bytes.
    pub thread_stack_size: usize,
    /// Time allowed for workers to finish on shutdown, in milliseconds.
    pub await_termination_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
            thread_stack_size: DEFAULT_THREAD_STACK_SIZE,
            await_termination_ms: DEFAULT_AWAIT_TERMINATION_MS,
        }
    }
}

impl SchedulerConfig {
    /// Configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    #[must_use]
    pub const fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the ready queue capacity.
    #[must_use]
    pub const fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the overflow policy.
    #[must_use]
    pub const fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Set the worker thread stack size.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = bytes;
        self
    }

    /// Set the shutdown grace period.
    #[must_use]
    pub fn with_await_termination(mut self, timeout: Duration) -> Self {
        self.await_termination_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Shutdown grace period.
    #[must_use]
    pub const fn await_termination(&self) -> Duration {
        Duration::from_millis(self.await_termination_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.pool_size == 0 {
            return Err("pool_size must be greater than 0".into());
        }
        if self.queue_capacity == 0 {
            return Err("queue_capacity must be greater than 0".into());
        }
        if self.thread_name_prefix.is_empty() {
            return Err("thread_name_prefix must not be empty".into());
        }
        if self.thread_stack_size < MIN_THREAD_STACK_SIZE {
            return Err(format!(
                "thread_stack_size must be at least {MIN_THREAD_STACK_SIZE} bytes"
            ));
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate. Missing fields
    /// take their default values.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from `EVENT_SCHEDULER_*` environment variables,
    /// reading a `.env` file first if one exists.
    ///
    /// # Errors
    ///
    /// Returns a description of the first unparsable or invalid value.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from a key lookup using the same keys as
    /// [`from_env`](Self::from_env). Unset keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a description of the first unparsable or invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut cfg = Self::default();

        if let Some(v) = get("POOL_SIZE") {
            cfg.pool_size = parse_var("POOL_SIZE", &v)?;
        }
        if let Some(v) = get("THREAD_NAME_PREFIX") {
            cfg.thread_name_prefix = v;
        }
        if let Some(v) = get("QUEUE_CAPACITY") {
            cfg.queue_capacity = parse_var("QUEUE_CAPACITY", &v)?;
        }
        if let Some(v) = get("OVERFLOW_POLICY") {
            cfg.overflow_policy = parse_var("OVERFLOW_POLICY", &v)?;
        }
        if let Some(v) = get("THREAD_STACK_SIZE") {
            cfg.thread_stack_size = parse_var("THREAD_STACK_SIZE", &v)?;
        }
        if let Some(v) = get("AWAIT_TERMINATION_MS") {
            cfg.await_termination_ms = parse_var("AWAIT_TERMINATION_MS", &v)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| format!("{ENV_PREFIX}{name}=`{value}`: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = SchedulerConfig::default();
        assert_eq!(cfg.pool_size, 5);
        assert_eq!(cfg.thread_name_prefix, "event-scheduler-");
        assert_eq!(cfg.overflow_policy, OverflowPolicy::DropOldest);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_overflow_policy_round_trips_display() {
        for policy in [
            OverflowPolicy::DropOldest,
            OverflowPolicy::DropNewest,
            OverflowPolicy::Block,
        ] {
            assert_eq!(policy.to_string().parse::<OverflowPolicy>(), Ok(policy));
        }
        assert!("spill".parse::<OverflowPolicy>().is_err());
    }
}
