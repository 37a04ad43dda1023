// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Triggers: when a job fires
//!
//! A [`Trigger`] carries the fields every kind shares plus a closed
//! [`Schedule`] variant. Fire-time computations are pure functions of the
//! trigger, an optional resolved calendar chain and, for misfires, the
//! current time. The store decides when to call them.

mod cron;
mod interval;
mod simple;

pub use self::cron::CronSchedule;
pub use interval::{CalendarIntervalSchedule, IntervalUnit};
pub use simple::{RepeatCount, SimpleSchedule};

use crate::calendar::CalendarChain;
use crate::job::JobDataMap;
use crate::key::{JobKey, TriggerKey};
use chrono::{DateTime, Datelike, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::time::Duration as StdDuration;
use thiserror::Error;

/// Priority given to triggers that do not set one
pub const DEFAULT_PRIORITY: i32 = 5;

/// Fire times past this year are treated as never
pub(crate) const MAX_YEAR: i32 = 2299;

/// Rejected trigger definitions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerError {
    #[error("invalid cron expression {expression:?}: {message}")]
    InvalidCron { expression: String, message: String },
    #[error("misfire instruction {instruction:?} is not valid for {kind} triggers")]
    InvalidMisfireInstruction {
        instruction: MisfireInstruction,
        kind: &'static str,
    },
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
}

/// What to do when a trigger's fire time passed while it could not fire
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MisfireInstruction {
    /// Pick the kind's default
    #[default]
    Smart,
    /// Never treated as misfired; late fire times fire in order
    IgnoreMisfires,
    FireNow,
    /// Skip to the next scheduled time after now
    DoNothing,
    RescheduleNowWithExistingCount,
    RescheduleNowWithRemainingCount,
    RescheduleNextWithRemainingCount,
    RescheduleNextWithExistingCount,
}

/// What the store does with a trigger after its job finishes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletedExecutionInstruction {
    NoOp,
    ReExecuteJob,
    SetTriggerComplete,
    DeleteTrigger,
    SetAllJobTriggersComplete,
    SetTriggerError,
    SetAllJobTriggersError,
}

/// Externally visible trigger state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerState {
    /// No such trigger
    None,
    Normal,
    Paused,
    Complete,
    Error,
    Blocked,
}

/// Kind-specific schedule
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    Simple(SimpleSchedule),
    Cron(CronSchedule),
    CalendarInterval(CalendarIntervalSchedule),
}

impl Schedule {
    /// Fire once at the start time
    pub fn once() -> Self {
        Self::simple(StdDuration::ZERO, RepeatCount::Times(0))
    }

    pub fn simple(repeat_interval: StdDuration, repeat_count: RepeatCount) -> Self {
        Schedule::Simple(SimpleSchedule {
            repeat_interval,
            repeat_count,
            times_triggered: 0,
        })
    }

    pub fn cron(expression: impl Into<String>, time_zone: Tz) -> Result<Self, TriggerError> {
        CronSchedule::new(expression, time_zone).map(Schedule::Cron)
    }

    pub fn calendar_interval(unit: IntervalUnit, interval: u32, time_zone: Tz) -> Self {
        Schedule::CalendarInterval(CalendarIntervalSchedule {
            unit,
            interval,
            time_zone,
            times_triggered: 0,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Schedule::Simple(_) => "simple",
            Schedule::Cron(_) => "cron",
            Schedule::CalendarInterval(_) => "calendar_interval",
        }
    }

    fn record_firing(&mut self) {
        match self {
            Schedule::Simple(s) => s.times_triggered = s.times_triggered.saturating_add(1),
            Schedule::CalendarInterval(c) => c.times_triggered = c.times_triggered.saturating_add(1),
            Schedule::Cron(_) => {}
        }
    }
}

/// A stored trigger
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub key: TriggerKey,
    pub job_key: JobKey,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub priority: i32,
    #[serde(default)]
    pub misfire_instruction: MisfireInstruction,
    #[serde(default)]
    pub calendar_name: Option<String>,
    #[serde(default)]
    pub job_data: JobDataMap,
    #[serde(default)]
    pub next_fire_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub previous_fire_time: Option<DateTime<Utc>>,
    pub schedule: Schedule,
    /// Reservation id assigned by the store when the trigger is acquired
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fire_instance_id: Option<u64>,
}

impl Trigger {
    pub fn new(
        key: TriggerKey,
        job_key: JobKey,
        schedule: Schedule,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            job_key,
            description: None,
            start_time,
            end_time: None,
            priority: DEFAULT_PRIORITY,
            misfire_instruction: MisfireInstruction::Smart,
            calendar_name: None,
            job_data: JobDataMap::new(),
            next_fire_time: None,
            previous_fire_time: None,
            schedule,
            fire_instance_id: None,
        }
    }

    pub fn with_end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_misfire_instruction(mut self, instruction: MisfireInstruction) -> Self {
        self.misfire_instruction = instruction;
        self
    }

    pub fn with_calendar(mut self, calendar_name: impl Into<String>) -> Self {
        self.calendar_name = Some(calendar_name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.job_data.insert(key.into(), value.into());
        self
    }

    /// Set the next fire time directly, bypassing first-fire computation
    pub fn with_next_fire_time(mut self, next_fire_time: DateTime<Utc>) -> Self {
        self.next_fire_time = Some(next_fire_time);
        self
    }

    /// Check the definition is internally consistent
    pub fn validate(&self) -> Result<(), TriggerError> {
        if self.end_time.is_some_and(|end| end < self.start_time) {
            return Err(TriggerError::InvalidSchedule(
                "end time is before start time".to_string(),
            ));
        }
        match &self.schedule {
            Schedule::Simple(s) => {
                if s.repeat_count != RepeatCount::Times(0) && s.repeat_interval.as_millis() < 1 {
                    return Err(TriggerError::InvalidSchedule(
                        "repeating simple schedule needs an interval of at least 1ms".to_string(),
                    ));
                }
            }
            Schedule::Cron(c) => {
                c.parse()?;
            }
            Schedule::CalendarInterval(c) => {
                if c.interval == 0 {
                    return Err(TriggerError::InvalidSchedule(
                        "calendar interval must be at least 1".to_string(),
                    ));
                }
            }
        }
        let valid = match self.misfire_instruction {
            MisfireInstruction::Smart
            | MisfireInstruction::IgnoreMisfires
            | MisfireInstruction::FireNow => true,
            MisfireInstruction::DoNothing => !matches!(self.schedule, Schedule::Simple(_)),
            MisfireInstruction::RescheduleNowWithExistingCount
            | MisfireInstruction::RescheduleNowWithRemainingCount
            | MisfireInstruction::RescheduleNextWithRemainingCount
            | MisfireInstruction::RescheduleNextWithExistingCount => {
                matches!(self.schedule, Schedule::Simple(_))
            }
        };
        if !valid {
            return Err(TriggerError::InvalidMisfireInstruction {
                instruction: self.misfire_instruction,
                kind: self.schedule.kind(),
            });
        }
        Ok(())
    }

    /// Next scheduled time strictly after `after`, ignoring calendars
    pub fn fire_time_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let next = match &self.schedule {
            Schedule::Simple(s) => s.fire_time_after(self.start_time, self.end_time, after),
            Schedule::Cron(c) => c.fire_time_after(self.start_time, self.end_time, after),
            Schedule::CalendarInterval(c) => {
                c.fire_time_after(self.start_time, self.end_time, after)
            }
        };
        next.filter(|t| t.year() <= MAX_YEAR)
    }

    /// Compute and store the first fire time
    pub fn compute_first_fire_time(
        &mut self,
        calendar: Option<&CalendarChain<'_>>,
    ) -> Option<DateTime<Utc>> {
        let first = match &self.schedule {
            Schedule::Cron(_) => self.fire_time_after(self.start_time - Duration::seconds(1)),
            _ if self.end_time.is_some_and(|end| end <= self.start_time) => None,
            _ => Some(self.start_time),
        };
        self.next_fire_time = self.skip_excluded(first, calendar);
        self.next_fire_time
    }

    /// Advance past the current fire time after a firing
    pub fn triggered(&mut self, calendar: Option<&CalendarChain<'_>>) {
        self.schedule.record_firing();
        self.previous_fire_time = self.next_fire_time;
        let next = self.next_fire_time.and_then(|t| self.fire_time_after(t));
        self.next_fire_time = self.skip_excluded(next, calendar);
    }

    /// Whether another fire time remains
    pub fn may_fire_again(&self) -> bool {
        self.next_fire_time.is_some()
    }

    /// The instruction `Smart` stands for on this trigger
    pub fn effective_misfire_instruction(&self) -> MisfireInstruction {
        match (self.misfire_instruction, &self.schedule) {
            (MisfireInstruction::Smart, Schedule::Simple(s)) => match s.repeat_count {
                RepeatCount::Times(0) => MisfireInstruction::FireNow,
                RepeatCount::Indefinitely => MisfireInstruction::RescheduleNextWithRemainingCount,
                RepeatCount::Times(_) => MisfireInstruction::RescheduleNowWithExistingCount,
            },
            (MisfireInstruction::Smart, _) => MisfireInstruction::FireNow,
            (instruction, _) => instruction,
        }
    }

    /// Apply the misfire instruction after the fire time was missed
    pub fn update_after_misfire(
        &mut self,
        calendar: Option<&CalendarChain<'_>>,
        now: DateTime<Utc>,
    ) {
        let mut instruction = self.effective_misfire_instruction();
        if instruction == MisfireInstruction::IgnoreMisfires {
            return;
        }
        if let Schedule::Simple(s) = &self.schedule {
            if instruction == MisfireInstruction::FireNow
                && s.repeat_count != RepeatCount::Times(0)
            {
                instruction = MisfireInstruction::RescheduleNowWithRemainingCount;
            }
        }

        match instruction {
            MisfireInstruction::FireNow => {
                self.next_fire_time = Some(now);
            }
            MisfireInstruction::DoNothing | MisfireInstruction::RescheduleNextWithExistingCount => {
                let next = self.fire_time_after(now);
                self.next_fire_time = self.skip_excluded(next, calendar);
            }
            MisfireInstruction::RescheduleNextWithRemainingCount => {
                let next = self.fire_time_after(now);
                let next = self.skip_excluded(next, calendar);
                if let (Some(next), Some(missed_from), Schedule::Simple(s)) =
                    (next, self.next_fire_time, &mut self.schedule)
                {
                    let missed = s.times_fired_between(missed_from, next);
                    s.times_triggered = s.times_triggered.saturating_add(missed);
                }
                self.next_fire_time = next;
            }
            MisfireInstruction::RescheduleNowWithExistingCount => {
                if let Schedule::Simple(s) = &mut self.schedule {
                    s.rebase_count(0);
                }
                self.reschedule_now(now);
            }
            MisfireInstruction::RescheduleNowWithRemainingCount => {
                if let (Some(missed_from), Schedule::Simple(s)) =
                    (self.next_fire_time, &mut self.schedule)
                {
                    let missed = s.times_fired_between(missed_from, now);
                    s.rebase_count(missed);
                }
                self.reschedule_now(now);
            }
            MisfireInstruction::Smart | MisfireInstruction::IgnoreMisfires => {}
        }
    }

    fn reschedule_now(&mut self, now: DateTime<Utc>) {
        if self.end_time.is_some_and(|end| end < now) {
            self.next_fire_time = None;
        } else {
            self.start_time = now;
            self.next_fire_time = Some(now);
        }
    }

    /// Recompute the next fire time after the trigger's calendar changed
    ///
    /// A recomputed time already more than `misfire_threshold` in the past is
    /// skipped.
    pub fn update_with_new_calendar(
        &mut self,
        calendar: Option<&CalendarChain<'_>>,
        now: DateTime<Utc>,
        misfire_threshold: StdDuration,
    ) {
        let from = self
            .previous_fire_time
            .unwrap_or(self.start_time - Duration::milliseconds(1));
        let mut next = self.skip_excluded(self.fire_time_after(from), calendar);
        let threshold = Duration::from_std(misfire_threshold).unwrap_or(Duration::MAX);
        if let Some(t) = next {
            if t < now && now - t >= threshold {
                next = self.skip_excluded(self.fire_time_after(t), calendar);
            }
        }
        self.next_fire_time = next;
    }

    /// Move `candidate` forward until the calendar includes it
    fn skip_excluded(
        &self,
        mut candidate: Option<DateTime<Utc>>,
        calendar: Option<&CalendarChain<'_>>,
    ) -> Option<DateTime<Utc>> {
        let Some(calendar) = calendar else {
            return candidate;
        };
        loop {
            let time = candidate?;
            if time.year() > MAX_YEAR {
                return None;
            }
            match calendar.next_included_time(time) {
                Ok(included) if included == time => return Some(time),
                Ok(included) => {
                    candidate = self.fire_time_after(included - Duration::milliseconds(1));
                }
                Err(e) => {
                    tracing::warn!(trigger = %self.key, error = %e, "no fire time left in calendar");
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
