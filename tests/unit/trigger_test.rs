//! Tests for trigger parsing and next-fire computation

use std::time::Duration;

use chrono::{TimeZone, Utc};
use event_scheduler::core::{CronTrigger, Trigger, TriggerContext};
use event_scheduler::util::Now;

#[test]
fn test_cron_five_field_weekly() {
    let cron = CronTrigger::parse("0 0 * * Mon").unwrap();
    // 2024-03-06 is a Wednesday.
    let after = Utc.with_ymd_and_hms(2024, 3, 6, 12, 0, 0).unwrap();
    assert_eq!(
        cron.next_after(after).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap()
    );
}

#[test]
fn test_cron_step_minutes() {
    let cron = CronTrigger::parse("*/15 * * * *").unwrap();
    let after = Utc.with_ymd_and_hms(2024, 3, 6, 12, 7, 30).unwrap();
    assert_eq!(
        cron.next_after(after).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 6, 12, 15, 0).unwrap()
    );
}

#[test]
fn test_cron_first_fire_is_in_future() {
    let trigger = Trigger::cron("*/2 * * * * *").unwrap();
    let now = Now::capture();
    let first = trigger.first_fire(&now).unwrap();
    assert!(first.wall > now.wall);
    assert!(first.at - now.instant <= Duration::from_secs(2));
}

#[test]
fn test_with_initial_delay_ignored_for_once() {
    let trigger =
        Trigger::once(Duration::from_millis(5)).with_initial_delay(Duration::from_secs(9));
    let now = Now::capture();
    assert_eq!(
        trigger.first_fire(&now).unwrap().at - now.instant,
        Duration::from_millis(5)
    );
}

#[test]
fn test_fixed_rate_keeps_cadence_for_short_runs() {
    let trigger = Trigger::fixed_rate(Duration::from_millis(100)).unwrap();
    let now = Now::capture();
    let mut scheduled = trigger.first_fire(&now).unwrap();

    for _ in 0..5 {
        let ctx = TriggerContext {
            scheduled,
            started: scheduled.at,
            completed: scheduled.at + Duration::from_millis(10),
        };
        let next = trigger.next_fire(&ctx, &now).unwrap();
        assert_eq!(next.at - scheduled.at, Duration::from_millis(100));
        scheduled = next;
    }
}
