// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Calendar-interval schedules
//!
//! Second, minute and hour steps are exact durations. Day and larger steps
//! are wall-clock arithmetic in the schedule's time zone, so a daily 09:00
//! stays at 09:00 across DST changes. Month steps are counted from the start
//! date and clamp to the end of shorter months without drifting.

use crate::zone;
use chrono::{DateTime, Datelike, Duration, Months, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

/// Fires every `interval` units starting at the trigger's start time
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalendarIntervalSchedule {
    pub unit: IntervalUnit,
    pub interval: u32,
    pub time_zone: Tz,
    #[serde(default)]
    pub times_triggered: u32,
}

impl CalendarIntervalSchedule {
    pub(super) fn fire_time_after(
        &self,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        after: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if end.is_some_and(|end| end <= after) {
            return None;
        }
        if after < start {
            return Some(start);
        }
        if self.interval == 0 {
            return None;
        }

        let time = match self.unit {
            IntervalUnit::Second => self.exact_step_after(start, after, 1),
            IntervalUnit::Minute => self.exact_step_after(start, after, 60),
            IntervalUnit::Hour => self.exact_step_after(start, after, 3600),
            IntervalUnit::Day => self.day_step_after(start, after, 1),
            IntervalUnit::Week => self.day_step_after(start, after, 7),
            IntervalUnit::Month => self.month_step_after(start, after, 1),
            IntervalUnit::Year => self.month_step_after(start, after, 12),
        }?;

        if end.is_some_and(|end| end <= time) {
            return None;
        }
        Some(time)
    }

    fn exact_step_after(
        &self,
        start: DateTime<Utc>,
        after: DateTime<Utc>,
        unit_seconds: i64,
    ) -> Option<DateTime<Utc>> {
        let step = i64::from(self.interval).checked_mul(unit_seconds)?.checked_mul(1000)?;
        let steps = (after - start).num_milliseconds() / step + 1;
        start.checked_add_signed(Duration::milliseconds(steps.checked_mul(step)?))
    }

    fn day_step_after(
        &self,
        start: DateTime<Utc>,
        after: DateTime<Utc>,
        unit_days: i64,
    ) -> Option<DateTime<Utc>> {
        let local_start = zone::to_local(&self.time_zone, start);
        let step = i64::from(self.interval) * unit_days;
        // Wall-clock days can differ from elapsed days by a DST shift; start
        // one step early and walk forward.
        let mut n = ((after - start).num_days() / step - 1).max(0);
        loop {
            let local = local_start.checked_add_signed(Duration::days(n.checked_mul(step)?))?;
            let candidate = self.resolve(local)?;
            if candidate > after {
                return Some(candidate);
            }
            n += 1;
        }
    }

    fn month_step_after(
        &self,
        start: DateTime<Utc>,
        after: DateTime<Utc>,
        unit_months: u32,
    ) -> Option<DateTime<Utc>> {
        let local_start = zone::to_local(&self.time_zone, start);
        let local_after = zone::to_local(&self.time_zone, after);
        let step = self.interval.checked_mul(unit_months)?;
        let elapsed = (local_after.year() - local_start.year()) * 12
            + local_after.month() as i32
            - local_start.month() as i32;
        let mut n = (u32::try_from(elapsed.max(0)).ok()? / step).saturating_sub(1);
        loop {
            let local = local_start.checked_add_months(Months::new(n.checked_mul(step)?))?;
            let candidate = self.resolve(local)?;
            if candidate > after {
                return Some(candidate);
            }
            n += 1;
        }
    }

    fn resolve(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        if local.year() > super::MAX_YEAR {
            return None;
        }
        Some(zone::resolve_local(&self.time_zone, local))
    }
}
