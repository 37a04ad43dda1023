// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-interval schedules

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration as StdDuration;

/// How many times a simple schedule repeats after its first firing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatCount {
    Indefinitely,
    Times(u32),
}

/// Fires at `start`, then every `repeat_interval`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimpleSchedule {
    #[serde(with = "humantime_serde")]
    pub repeat_interval: StdDuration,
    pub repeat_count: RepeatCount,
    #[serde(default)]
    pub times_triggered: u32,
}

impl SimpleSchedule {
    fn interval_millis(&self) -> i64 {
        i64::try_from(self.repeat_interval.as_millis()).unwrap_or(i64::MAX)
    }

    pub(super) fn fire_time_after(
        &self,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        after: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if let RepeatCount::Times(count) = self.repeat_count {
            if self.times_triggered > count || (count == 0 && after >= start) {
                return None;
            }
        }
        if end.is_some_and(|end| end <= after) {
            return None;
        }
        if after < start {
            return Some(start);
        }

        let interval = self.interval_millis();
        if interval < 1 {
            return None;
        }
        let fired = (after - start).num_milliseconds() / interval + 1;
        if let RepeatCount::Times(count) = self.repeat_count {
            if fired > i64::from(count) {
                return None;
            }
        }
        let time = start.checked_add_signed(Duration::milliseconds(fired.checked_mul(interval)?))?;
        if end.is_some_and(|end| end <= time) {
            return None;
        }
        Some(time)
    }

    /// Whole intervals between two fire times
    pub(super) fn times_fired_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> u32 {
        let interval = self.interval_millis();
        if interval < 1 {
            return 0;
        }
        let times = (to - from).num_milliseconds() / interval;
        u32::try_from(times.max(0)).unwrap_or(u32::MAX)
    }

    /// Restart counting with `repeat_count` lowered by the firings already spent
    pub(super) fn rebase_count(&mut self, missed: u32) {
        if let RepeatCount::Times(count) = self.repeat_count {
            if count != 0 {
                let spent = self.times_triggered.saturating_add(missed);
                self.repeat_count = RepeatCount::Times(count.saturating_sub(spent));
                self.times_triggered = 0;
            }
        }
    }
}
