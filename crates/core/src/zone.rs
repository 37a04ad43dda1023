// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wall-clock to instant conversion in a time zone
//!
//! For fire times, local times inside a DST gap are shifted forward by the
//! length of the gap (02:30 in a 02:00-03:00 gap becomes 03:30). Calendar
//! searches want the first instant at or after a wall-clock time instead, so
//! there a gap time resolves to the transition itself (03:00). Local times
//! inside a fold resolve to the earliest instant, or the earliest one not
//! before a floor.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

/// Local wall-clock time of `instant` in `tz`
pub fn to_local(tz: &Tz, instant: DateTime<Utc>) -> NaiveDateTime {
    instant.with_timezone(tz).naive_local()
}

/// Resolve a wall-clock time to an instant
pub fn resolve_local(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => shift_past_gap(tz, local),
    }
}

/// Resolve a wall-clock time to the earliest instant that is `>= floor`
///
/// Inside a fold the later instant is chosen when the earlier one would
/// move backwards past `floor`. Inside a gap the result is the transition
/// instant, the first one whose wall-clock time is past `local`.
pub fn resolve_local_not_before(
    tz: &Tz,
    local: NaiveDateTime,
    floor: DateTime<Utc>,
) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, latest) => {
            let earliest = earliest.with_timezone(&Utc);
            if earliest >= floor {
                earliest
            } else {
                latest.with_timezone(&Utc)
            }
        }
        LocalResult::None => gap_transition(tz, local),
    }
}

fn utc_offset(tz: &Tz, instant: DateTime<Utc>) -> i64 {
    i64::from(
        tz.offset_from_utc_datetime(&instant.naive_utc())
            .fix()
            .local_minus_utc(),
    )
}

fn offset_before_gap(tz: &Tz, local: NaiveDateTime) -> i64 {
    let day_before = local - Duration::days(1);
    i64::from(tz.offset_from_utc_datetime(&day_before).fix().local_minus_utc())
}

// Interpret the local time with the offset in effect before the gap.
fn shift_past_gap(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    let utc = local - Duration::seconds(offset_before_gap(tz, local));
    DateTime::from_naive_utc_and_offset(utc, Utc)
}

// The instant the clocks jump forward over `local`.
//
// It lies at most one gap length before the shifted instant. Zone
// transitions fall on whole seconds, so bisect over seconds.
fn gap_transition(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    let shifted = shift_past_gap(tz, local);
    let offset_after = utc_offset(tz, shifted);
    let gap = offset_after - offset_before_gap(tz, local);
    if gap <= 0 {
        return shifted;
    }

    let mut before = shifted.timestamp() - gap - 1;
    let mut after = shifted.timestamp() + 1;
    while after - before > 1 {
        let mid = before + (after - before) / 2;
        let Some(instant) = DateTime::from_timestamp(mid, 0) else {
            return shifted;
        };
        if utc_offset(tz, instant) == offset_after {
            after = mid;
        } else {
            before = mid;
        }
    }
    DateTime::from_timestamp(after, 0).unwrap_or(shifted)
}

#[cfg(test)]
#[path = "zone_tests.rs"]
mod tests;
