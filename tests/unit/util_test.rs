//! Tests for utility functions

use std::time::Duration;

use event_scheduler::util::{init_tracing, FireTime, Now};

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
}

#[test]
fn test_fire_at_before_snapshot() {
    let now = Now::capture();
    let earlier = now.instant.checked_sub(Duration::from_secs(2));
    if let Some(earlier) = earlier {
        let fire: FireTime = now.fire_at(earlier);
        assert_eq!(now.wall - fire.wall, chrono::Duration::seconds(2));
    }
}
