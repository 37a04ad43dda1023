// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cadence_core::{Key, Schedule};
use chrono::TimeZone;

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, minute, 0).unwrap()
}

fn trigger() -> Trigger {
    Trigger::new(
        Key::in_default_group("t").unwrap(),
        Key::in_default_group("j").unwrap(),
        Schedule::once(),
        at(0),
    )
}

#[test]
fn changes_coalesce_to_earliest_candidate() {
    let signaler = ChannelSignaler::new();
    signaler.signal_scheduling_change(Some(at(5)));
    signaler.signal_scheduling_change(Some(at(2)));
    signaler.signal_scheduling_change(Some(at(9)));

    assert_eq!(signaler.take_change(), Some(Some(at(2))));
    assert_eq!(signaler.take_change(), None);
}

#[test]
fn unknown_candidate_wins() {
    let signaler = ChannelSignaler::new();
    signaler.signal_scheduling_change(Some(at(5)));
    signaler.signal_scheduling_change(None);
    signaler.signal_scheduling_change(Some(at(1)));

    assert_eq!(signaler.take_change(), Some(None));
}

#[tokio::test]
async fn change_before_wait_is_not_lost() {
    let signaler = ChannelSignaler::new();
    signaler.signal_scheduling_change(Some(at(1)));

    tokio::time::timeout(std::time::Duration::from_secs(1), signaler.changed())
        .await
        .unwrap();
}

#[tokio::test]
async fn store_notifications_become_events() {
    let signaler = ChannelSignaler::new();
    let mut events = signaler.subscribe();

    signaler.notify_trigger_listeners_misfired(&trigger());
    signaler.notify_scheduler_listeners_finalized(&trigger());

    let key = Key::in_default_group("t").unwrap();
    assert_eq!(
        events.recv().await.unwrap(),
        SchedulerEvent::TriggerMisfired {
            trigger: key.clone()
        }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        SchedulerEvent::TriggerFinalized { trigger: key }
    );
}
