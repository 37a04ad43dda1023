// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::key::Key;
use crate::trigger::Schedule;
use chrono::{Duration, TimeZone};
use proptest::prelude::*;

fn trigger(name: &str, offset_secs: i64, priority: i32) -> Trigger {
    let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    Trigger::new(
        Key::new(name, "g").unwrap(),
        Key::new("job", "g").unwrap(),
        Schedule::once(),
        start,
    )
    .with_priority(priority)
    .with_next_fire_time(start + Duration::seconds(offset_secs))
}

#[test]
fn earlier_fire_time_comes_first() {
    let mut index = TimeIndex::default();
    index.insert(&trigger("late", 20, 10));
    index.insert(&trigger("early", 10, 1));
    assert_eq!(index.pop_first().unwrap().key.name(), "early");
}

#[test]
fn higher_priority_breaks_fire_time_tie() {
    let mut index = TimeIndex::default();
    index.insert(&trigger("low", 10, 1));
    index.insert(&trigger("high", 10, 10));
    assert_eq!(index.pop_first().unwrap().key.name(), "high");
}

#[test]
fn key_breaks_full_tie() {
    let mut index = TimeIndex::default();
    index.insert(&trigger("b", 10, 5));
    index.insert(&trigger("a", 10, 5));
    assert_eq!(index.pop_first().unwrap().key.name(), "a");
}

#[test]
fn triggers_without_fire_time_are_not_indexed() {
    let mut index = TimeIndex::default();
    let mut t = trigger("t", 10, 5);
    t.next_fire_time = None;
    assert!(!index.insert(&t));
    assert_eq!(index.len(), 0);
}

#[test]
fn remove_uses_current_slot() {
    let mut index = TimeIndex::default();
    let t = trigger("t", 10, 5);
    index.insert(&t);
    assert_eq!(index.len(), 1);
    assert!(index.remove(&t));
    assert_eq!(index.len(), 0);
    assert!(!index.remove(&t));
}

proptest! {
    #[test]
    fn pops_in_slot_order(entries in proptest::collection::vec((0i64..50, 0i32..10), 1..40)) {
        let mut index = TimeIndex::default();
        for (i, (offset, priority)) in entries.iter().enumerate() {
            index.insert(&trigger(&format!("t{:03}", i), *offset, *priority));
        }
        let mut previous: Option<TimeSlot> = None;
        while let Some(slot) = index.pop_first() {
            if let Some(prev) = &previous {
                prop_assert!(prev.fire_time < slot.fire_time
                    || (prev.fire_time == slot.fire_time && prev.priority.0 > slot.priority.0)
                    || (prev.fire_time == slot.fire_time && prev.priority == slot.priority && prev.key < slot.key));
            }
            previous = Some(slot);
        }
    }
}
