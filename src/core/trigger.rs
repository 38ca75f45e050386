//! Triggers decide when a scheduled task fires next.
//!
//! Supported trigger types:
//! - Fixed delay: the next run starts a fixed time after the previous run completed
//! - Fixed rate: runs start on a fixed period measured from the previous scheduled start
//! - Cron: calendar-based scheduling evaluated in UTC
//! - Once: a single run after a delay

use std::str::FromStr;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::core::SchedulerError;
use crate::util::clock::{FireTime, Now};

/// When a task should fire.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Fixed pause between the end of one run and the start of the next.
    FixedDelay {
        /// Pause after each completed run.
        delay: Duration,
        /// Delay before the first run.
        initial_delay: Duration,
    },
    /// Fixed period between consecutive scheduled starts.
    FixedRate {
        /// Period between scheduled starts.
        period: Duration,
        /// Delay before the first run.
        initial_delay: Duration,
    },
    /// Cron expression.
    Cron(CronTrigger),
    /// Single run after a delay.
    Once {
        /// Delay before the run.
        delay: Duration,
    },
}

/// Timing of the most recent execution, used to compute the next firing.
#[derive(Debug, Clone, Copy)]
pub struct TriggerContext {
    /// When the execution was scheduled to start.
    pub scheduled: FireTime,
    /// When a worker actually started it.
    pub started: Instant,
    /// When it finished.
    pub completed: Instant,
}

impl Trigger {
    /// Fixed-delay trigger without initial delay.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidTrigger` if `delay` is zero.
    pub fn fixed_delay(delay: Duration) -> Result<Self, SchedulerError> {
        if delay.is_zero() {
            return Err(SchedulerError::InvalidTrigger(
                "fixed delay must be greater than 0".into(),
            ));
        }
        Ok(Self::FixedDelay {
            delay,
            initial_delay: Duration::ZERO,
        })
    }

    /// Fixed-rate trigger without initial delay.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidTrigger` if `period` is zero.
    pub fn fixed_rate(period: Duration) -> Result<Self, SchedulerError> {
        if period.is_zero() {
            return Err(SchedulerError::InvalidTrigger(
                "fixed rate period must be greater than 0".into(),
            ));
        }
        Ok(Self::FixedRate {
            period,
            initial_delay: Duration::ZERO,
        })
    }

    /// Cron trigger (see [`CronTrigger::parse`]).
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidTrigger` if the expression does not parse.
    pub fn cron(expression: &str) -> Result<Self, SchedulerError> {
        CronTrigger::parse(expression).map(Self::Cron)
    }

    /// One-shot trigger.
    #[must_use]
    pub const fn once(delay: Duration) -> Self {
        Self::Once { delay }
    }

    /// Set the delay before the first run of a fixed-delay or fixed-rate
    /// trigger. Other triggers are returned unchanged.
    #[must_use]
    pub fn with_initial_delay(self, initial: Duration) -> Self {
        match self {
            Self::FixedDelay { delay, .. } => Self::FixedDelay {
                delay,
                initial_delay: initial,
            },
            Self::FixedRate { period, .. } => Self::FixedRate {
                period,
                initial_delay: initial,
            },
            other => other,
        }
    }

    /// Whether the trigger can fire more than once.
    #[must_use]
    pub const fn is_repeating(&self) -> bool {
        !matches!(self, Self::Once { .. })
    }

    /// First firing for a task registered at `now`, or `None` when the
    /// trigger never fires (a cron expression with no future match, or a
    /// delay beyond what the monotonic clock can represent).
    #[must_use]
    pub fn first_fire(&self, now: &Now) -> Option<FireTime> {
        match self {
            Self::FixedDelay { initial_delay, .. } | Self::FixedRate { initial_delay, .. } => {
                now.instant.checked_add(*initial_delay).map(|at| now.fire_at(at))
            }
            Self::Once { delay } => now.instant.checked_add(*delay).map(|at| now.fire_at(at)),
            Self::Cron(cron) => cron
                .next_after(now.wall)
                .and_then(|wall| now.fire_at_wall(wall)),
        }
    }

    /// Next firing after the execution described by `ctx`, or `None` when the
    /// trigger is exhausted. A next time that overflows the monotonic clock
    /// also exhausts the trigger.
    #[must_use]
    pub fn next_fire(&self, ctx: &TriggerContext, now: &Now) -> Option<FireTime> {
        match self {
            Self::FixedDelay { delay, .. } => {
                ctx.completed.checked_add(*delay).map(|at| now.fire_at(at))
            }
            Self::FixedRate { period, .. } => {
                let candidate = ctx.scheduled.at.checked_add(*period)?;
                // Overran the period: run again right away and re-anchor
                // instead of bursting through the missed slots.
                Some(now.fire_at(candidate.max(ctx.completed)))
            }
            Self::Cron(cron) => {
                let after = now.wall.max(ctx.scheduled.wall);
                cron.next_after(after).and_then(|wall| now.fire_at_wall(wall))
            }
            Self::Once { .. } => None,
        }
    }
}

/// Parsed cron schedule, evaluated in UTC.
#[derive(Debug, Clone)]
pub struct CronTrigger {
    expression: String,
    schedule: Schedule,
}

impl CronTrigger {
    /// Parse a cron expression.
    ///
    /// Standard 5-field expressions (`min hour dom month dow`) are accepted
    /// and run at second 0; 6- and 7-field expressions (leading seconds,
    /// optional trailing year) are passed through.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidTrigger` if the expression is empty or
    /// does not parse.
    pub fn parse(expression: &str) -> Result<Self, SchedulerError> {
        if expression.trim().is_empty() {
            return Err(SchedulerError::InvalidTrigger(
                "cron expression is empty".into(),
            ));
        }
        let normalized = normalize_cron(expression);
        let schedule = Schedule::from_str(&normalized).map_err(|e| {
            SchedulerError::InvalidTrigger(format!("cron `{expression}`: {e}"))
        })?;
        Ok(Self {
            expression: normalized,
            schedule,
        })
    }

    /// The normalized (6- or 7-field) expression.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First matching time strictly after `after`.
    #[must_use]
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }
}

/// Prepend a zero seconds field to 5-field cron expressions.
pub(crate) fn normalize_cron(expression: &str) -> String {
    let trimmed = expression.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    }
}
