// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! cadence-core: scheduling core for the cadence job scheduler
//!
//! This crate provides:
//! - Keys and matchers identifying jobs and triggers
//! - Trigger schedules (simple, cron, calendar interval) and misfire handling
//! - Exclusion calendars, chained through base calendars
//! - The `JobStore` contract and its in-memory implementation with JSON snapshots

pub mod calendar;
pub mod clock;
pub mod config;
pub mod error;
pub mod job;
pub mod key;
pub mod matcher;
pub mod signaler;
pub mod store;
pub mod trigger;
pub mod zone;

pub use calendar::{Calendar, CalendarChain, CalendarError, ExclusionRule, MonthDay};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::StoreConfig;
pub use error::{ObjectKind, StoreError};
pub use job::{JobDataMap, JobDetail};
pub use key::{JobKey, Key, KeyError, TriggerKey, DEFAULT_GROUP};
pub use matcher::{Matcher, StringOperator};
pub use signaler::{NoOpSignaler, SchedulerSignaler};
pub use store::{
    JobStore, RamJobStore, SnapshotError, StoreSnapshot, TriggerFiredBundle, TriggerFiredResult,
    RECOVERING_JOBS_GROUP,
};
pub use trigger::{
    CalendarIntervalSchedule, CompletedExecutionInstruction, CronSchedule, IntervalUnit,
    MisfireInstruction, RepeatCount, Schedule, SimpleSchedule, Trigger, TriggerError,
    TriggerState, DEFAULT_PRIORITY,
};

#[cfg(any(test, feature = "test-support"))]
pub use signaler::{RecordingSignaler, Signal};
