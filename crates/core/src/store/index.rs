// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fire-time ordered index of waiting triggers

use crate::key::TriggerKey;
use crate::trigger::Trigger;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::BTreeSet;

/// Position of a trigger in the index
///
/// Orders by fire time ascending, then priority descending, then key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct TimeSlot {
    pub fire_time: DateTime<Utc>,
    pub priority: Reverse<i32>,
    pub key: TriggerKey,
}

impl TimeSlot {
    pub fn of(trigger: &Trigger) -> Option<Self> {
        Some(Self {
            fire_time: trigger.next_fire_time?,
            priority: Reverse(trigger.priority),
            key: trigger.key.clone(),
        })
    }
}

/// Sorted set of waiting triggers with a next fire time
///
/// Slots are derived from the trigger, so a trigger must be removed before
/// its fire time or priority changes.
#[derive(Debug, Default)]
pub(crate) struct TimeIndex {
    slots: BTreeSet<TimeSlot>,
}

impl TimeIndex {
    pub fn insert(&mut self, trigger: &Trigger) -> bool {
        match TimeSlot::of(trigger) {
            Some(slot) => self.slots.insert(slot),
            None => false,
        }
    }

    pub fn remove(&mut self, trigger: &Trigger) -> bool {
        match TimeSlot::of(trigger) {
            Some(slot) => self.slots.remove(&slot),
            None => false,
        }
    }

    pub fn pop_first(&mut self) -> Option<TimeSlot> {
        self.slots.pop_first()
    }

    pub fn first(&self) -> Option<&TimeSlot> {
        self.slots.first()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
