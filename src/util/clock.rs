//! Clock helpers pairing monotonic deadlines with wall-clock time.
//!
//! Timers are armed on [`Instant`] so that wall-clock adjustments never make
//! the dispatcher fire early or late; cron expressions, however, are defined
//! on calendar time. [`Now`] captures both clocks at a single point so one can
//! be translated into the other.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// A firing time expressed on both clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireTime {
    /// Monotonic deadline the dispatcher waits for.
    pub at: Instant,
    /// Wall-clock time corresponding to `at`.
    pub wall: DateTime<Utc>,
}

/// Paired snapshot of the monotonic and wall clocks.
#[derive(Debug, Clone, Copy)]
pub struct Now {
    /// Monotonic reading.
    pub instant: Instant,
    /// Wall-clock reading taken at the same moment.
    pub wall: DateTime<Utc>,
}

impl Now {
    /// Read both clocks.
    #[must_use]
    pub fn capture() -> Self {
        Self {
            instant: Instant::now(),
            wall: Utc::now(),
        }
    }

    /// Firing time at a monotonic instant, with the wall time derived from
    /// its offset to this snapshot.
    #[must_use]
    pub fn fire_at(&self, at: Instant) -> FireTime {
        let wall = if at >= self.instant {
            self.wall
                .checked_add_signed(to_chrono(at - self.instant))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        } else {
            self.wall
                .checked_sub_signed(to_chrono(self.instant - at))
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        };
        FireTime { at, wall }
    }

    /// Firing time at a wall-clock instant. Times in the past map to this
    /// snapshot's monotonic reading; `None` if the monotonic clock cannot
    /// represent the deadline.
    #[must_use]
    pub fn fire_at_wall(&self, wall: DateTime<Utc>) -> Option<FireTime> {
        let ahead = (wall - self.wall).to_std().unwrap_or(Duration::ZERO);
        let at = self.instant.checked_add(ahead)?;
        Some(FireTime { at, wall })
    }
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_at_offsets_wall_clock() {
        let now = Now::capture();
        let fire = now.fire_at(now.instant + Duration::from_secs(90));
        assert_eq!(fire.wall - now.wall, chrono::Duration::seconds(90));
    }

    #[test]
    fn test_fire_at_wall_in_past_is_immediate() {
        let now = Now::capture();
        let fire = now.fire_at_wall(now.wall - chrono::Duration::seconds(5)).unwrap();
        assert_eq!(fire.at, now.instant);
    }

    #[test]
    fn test_fire_at_wall_in_future() {
        let now = Now::capture();
        let fire = now.fire_at_wall(now.wall + chrono::Duration::milliseconds(1500)).unwrap();
        assert_eq!(fire.at - now.instant, Duration::from_millis(1500));
    }
}
