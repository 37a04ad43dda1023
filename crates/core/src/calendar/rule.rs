// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exclusion rules evaluated on local wall-clock time

use super::CalendarError;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Upper bound on days scanned by a single day-granular rule
const MAX_DAY_SCAN: u32 = 4 * 366;

/// Month and day-of-month, independent of year
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthDay {
    month: u32,
    day: u32,
}

impl MonthDay {
    pub fn new(month: u32, day: u32) -> Result<Self, CalendarError> {
        let max_day = match month {
            2 => 29,
            4 | 6 | 9 | 11 => 30,
            1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
            _ => {
                return Err(CalendarError::InvalidRule(format!(
                    "month {} out of range",
                    month
                )))
            }
        };
        if day == 0 || day > max_day {
            return Err(CalendarError::InvalidRule(format!(
                "day {} out of range for month {}",
                day, month
            )));
        }
        Ok(Self { month, day })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    fn of(date: NaiveDate) -> Self {
        Self {
            month: date.month(),
            day: date.day(),
        }
    }
}

/// What a single calendar level excludes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExclusionRule {
    /// Excludes nothing; useful as a chain root
    None,

    /// Specific dates
    Holiday { dates: BTreeSet<NaiveDate> },

    /// The same days every year
    Annual { days: BTreeSet<MonthDay> },

    /// Days of the month, 1 through 31
    Monthly { days: BTreeSet<u32> },

    /// Days of the week
    Weekly { weekdays: Vec<Weekday> },

    /// A time-of-day range, inclusive at both ends with millisecond precision
    ///
    /// With `invert` the range is the only included part of each day.
    Daily {
        start: NaiveTime,
        end: NaiveTime,
        invert: bool,
    },
}

impl ExclusionRule {
    pub fn holidays(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        ExclusionRule::Holiday {
            dates: dates.into_iter().collect(),
        }
    }

    pub fn annual(days: impl IntoIterator<Item = MonthDay>) -> Self {
        ExclusionRule::Annual {
            days: days.into_iter().collect(),
        }
    }

    pub fn monthly(days: impl IntoIterator<Item = u32>) -> Result<Self, CalendarError> {
        let days: BTreeSet<u32> = days.into_iter().collect();
        if let Some(bad) = days.iter().find(|d| !(1..=31).contains(*d)) {
            return Err(CalendarError::InvalidRule(format!(
                "day of month {} out of range",
                bad
            )));
        }
        if days.len() == 31 {
            return Err(CalendarError::InvalidRule(
                "monthly rule excludes every day".to_string(),
            ));
        }
        Ok(ExclusionRule::Monthly { days })
    }

    pub fn weekly(weekdays: impl IntoIterator<Item = Weekday>) -> Result<Self, CalendarError> {
        let mut weekdays: Vec<Weekday> = weekdays.into_iter().collect();
        weekdays.sort_by_key(|d| d.num_days_from_monday());
        weekdays.dedup();
        if weekdays.len() == 7 {
            return Err(CalendarError::InvalidRule(
                "weekly rule excludes every day".to_string(),
            ));
        }
        Ok(ExclusionRule::Weekly { weekdays })
    }

    /// Exclude `start..=end` each day
    pub fn daily(start: NaiveTime, end: NaiveTime) -> Result<Self, CalendarError> {
        Self::daily_range(start, end, false)
    }

    /// Include only `start..=end` each day
    pub fn daily_inverted(start: NaiveTime, end: NaiveTime) -> Result<Self, CalendarError> {
        Self::daily_range(start, end, true)
    }

    fn daily_range(start: NaiveTime, end: NaiveTime, invert: bool) -> Result<Self, CalendarError> {
        let start = truncate_millis(start);
        let end = truncate_millis(end);
        if start > end {
            return Err(CalendarError::InvalidRule(format!(
                "daily range start {} is after end {}",
                start, end
            )));
        }
        if !invert && start == NaiveTime::MIN && end == last_millisecond() {
            return Err(CalendarError::InvalidRule(
                "daily rule excludes the whole day".to_string(),
            ));
        }
        Ok(ExclusionRule::Daily { start, end, invert })
    }

    /// Whether this rule excludes the given local time
    pub fn excludes(&self, local: NaiveDateTime) -> bool {
        match self {
            ExclusionRule::Daily { start, end, invert } => {
                let time = truncate_millis(local.time());
                let in_range = *start <= time && time <= *end;
                in_range != *invert
            }
            _ => self.excludes_date(local.date()),
        }
    }

    fn excludes_date(&self, date: NaiveDate) -> bool {
        match self {
            ExclusionRule::None | ExclusionRule::Daily { .. } => false,
            ExclusionRule::Holiday { dates } => dates.contains(&date),
            ExclusionRule::Annual { days } => days.contains(&MonthDay::of(date)),
            ExclusionRule::Monthly { days } => days.contains(&date.day()),
            ExclusionRule::Weekly { weekdays } => weekdays.contains(&date.weekday()),
        }
    }

    /// Earliest local time `>= local` this rule does not exclude
    ///
    /// Returns `None` when the search runs off the end of the date range.
    pub fn next_included(&self, local: NaiveDateTime) -> Option<NaiveDateTime> {
        if !self.excludes(local) {
            return Some(local);
        }
        match self {
            ExclusionRule::None => Some(local),
            ExclusionRule::Daily { start, end, invert } => {
                let time = truncate_millis(local.time());
                if !*invert {
                    // Inside the excluded range: resume right after it
                    if *end == last_millisecond() {
                        start_of_next_day(local.date())
                    } else {
                        Some(local.date().and_time(*end + Duration::milliseconds(1)))
                    }
                } else if time < *start {
                    Some(local.date().and_time(*start))
                } else {
                    local
                        .date()
                        .succ_opt()
                        .map(|next| next.and_time(*start))
                }
            }
            _ => {
                let mut date = local.date();
                for _ in 0..MAX_DAY_SCAN {
                    date = date.succ_opt()?;
                    if !self.excludes_date(date) {
                        return Some(date.and_time(NaiveTime::MIN));
                    }
                }
                None
            }
        }
    }
}

fn start_of_next_day(date: NaiveDate) -> Option<NaiveDateTime> {
    date.succ_opt().map(|next| next.and_time(NaiveTime::MIN))
}

fn last_millisecond() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
}

fn truncate_millis(time: NaiveTime) -> NaiveTime {
    let nanos = time.nanosecond() / 1_000_000 * 1_000_000;
    time.with_nanosecond(nanos).unwrap_or(time)
}

#[cfg(test)]
#[path = "rule_tests.rs"]
mod tests;
