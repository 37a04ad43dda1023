// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job store: storage and reservation engine
//!
//! The [`JobStore`] trait is the contract the firing loop drives. It owns
//! jobs, triggers, calendars and pause state, and hands out reservations on
//! due triggers. [`RamJobStore`] is the in-memory implementation; it can be
//! saved to and restored from a JSON [`StoreSnapshot`].

mod index;
mod ram;
mod snapshot;

pub use ram::{FiredState, FiredTriggerRecord, InternalTriggerState, RamJobStore, StoredTrigger};
pub use snapshot::{SnapshotError, StoreSnapshot};

use crate::calendar::Calendar;
use crate::error::StoreError;
use crate::job::JobDetail;
use crate::key::{JobKey, TriggerKey};
use crate::matcher::Matcher;
use crate::signaler::SchedulerSignaler;
use crate::trigger::{CompletedExecutionInstruction, Trigger, TriggerState};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Group holding one-shot triggers that re-run interrupted jobs
pub const RECOVERING_JOBS_GROUP: &str = "RECOVERING_JOBS";

/// Everything a worker needs to run one firing
#[derive(Clone, Debug, PartialEq)]
pub struct TriggerFiredBundle {
    pub job: JobDetail,
    /// The trigger after it advanced past this firing
    pub trigger: Trigger,
    pub calendar: Option<Calendar>,
    /// The trigger re-runs a job interrupted by a crash
    pub is_recovering: bool,
    pub fire_time: DateTime<Utc>,
    pub scheduled_fire_time: Option<DateTime<Utc>>,
    pub prev_fire_time: Option<DateTime<Utc>>,
    pub next_fire_time: Option<DateTime<Utc>>,
}

/// Outcome of [`JobStore::trigger_fired`]
#[derive(Clone, Debug, PartialEq)]
pub enum TriggerFiredResult {
    Fired(Box<TriggerFiredBundle>),
    /// The job disallows concurrent execution and is running; the trigger
    /// waits until it finishes
    Blocked,
    /// The reservation is gone: released, paused, removed or replaced
    NotAcquired,
}

impl TriggerFiredResult {
    pub fn bundle(self) -> Option<TriggerFiredBundle> {
        match self {
            TriggerFiredResult::Fired(bundle) => Some(*bundle),
            _ => None,
        }
    }
}

/// Storage and reservation contract
///
/// Structural errors leave the store unchanged. Reservation races are
/// reported as values, never errors.
pub trait JobStore: Send + Sync {
    /// Install the signaler that receives store notifications
    fn initialize(&self, signaler: Arc<dyn SchedulerSignaler>);

    /// Release resources; the store stays usable for reads
    fn shutdown(&self);

    fn store_job(&self, job: JobDetail, replace_existing: bool) -> Result<(), StoreError>;

    /// Store a trigger, computing its first fire time when it has none
    fn store_trigger(&self, trigger: Trigger, replace_existing: bool) -> Result<(), StoreError>;

    fn store_job_and_trigger(&self, job: JobDetail, trigger: Trigger) -> Result<(), StoreError>;

    /// Store several jobs and their triggers; all or nothing
    fn store_jobs_and_triggers(
        &self,
        entries: Vec<(JobDetail, Vec<Trigger>)>,
        replace: bool,
    ) -> Result<(), StoreError>;

    /// Remove a job and its triggers
    fn remove_job(&self, key: &JobKey) -> bool;

    fn remove_jobs(&self, keys: &[JobKey]) -> bool;

    /// Remove a trigger; a non-durable job left without triggers goes too
    fn remove_trigger(&self, key: &TriggerKey) -> bool;

    fn remove_triggers(&self, keys: &[TriggerKey]) -> bool;

    /// Swap a trigger for another on the same job
    fn replace_trigger(&self, key: &TriggerKey, trigger: Trigger) -> Result<bool, StoreError>;

    fn retrieve_job(&self, key: &JobKey) -> Option<JobDetail>;

    fn retrieve_trigger(&self, key: &TriggerKey) -> Option<Trigger>;

    fn check_job_exists(&self, key: &JobKey) -> bool;

    fn check_trigger_exists(&self, key: &TriggerKey) -> bool;

    fn store_calendar(
        &self,
        name: &str,
        calendar: Calendar,
        replace_existing: bool,
        update_triggers: bool,
    ) -> Result<(), StoreError>;

    /// Fails while a trigger or another calendar references it
    fn remove_calendar(&self, name: &str) -> Result<bool, StoreError>;

    fn retrieve_calendar(&self, name: &str) -> Option<Calendar>;

    fn number_of_jobs(&self) -> usize;

    fn number_of_triggers(&self) -> usize;

    fn number_of_calendars(&self) -> usize;

    fn job_keys(&self, matcher: &Matcher) -> Vec<JobKey>;

    fn trigger_keys(&self, matcher: &Matcher) -> Vec<TriggerKey>;

    fn job_group_names(&self) -> Vec<String>;

    fn trigger_group_names(&self) -> Vec<String>;

    fn calendar_names(&self) -> Vec<String>;

    fn triggers_for_job(&self, key: &JobKey) -> Vec<Trigger>;

    fn trigger_state(&self, key: &TriggerKey) -> TriggerState;

    /// Return an errored trigger to service
    fn reset_trigger_from_error_state(&self, key: &TriggerKey) -> bool;

    fn pause_trigger(&self, key: &TriggerKey);

    /// Pause matching triggers; returns the affected groups
    fn pause_triggers(&self, matcher: &Matcher) -> Vec<String>;

    fn pause_job(&self, key: &JobKey);

    fn pause_jobs(&self, matcher: &Matcher) -> Vec<String>;

    fn resume_trigger(&self, key: &TriggerKey);

    fn resume_triggers(&self, matcher: &Matcher) -> Vec<String>;

    fn resume_job(&self, key: &JobKey);

    fn resume_jobs(&self, matcher: &Matcher) -> Vec<String>;

    fn paused_trigger_groups(&self) -> BTreeSet<String>;

    fn is_job_group_paused(&self, group: &str) -> bool;

    fn is_trigger_group_paused(&self, group: &str) -> bool;

    fn pause_all(&self);

    fn resume_all(&self);

    fn clear_all_scheduling_data(&self);

    /// Reserve up to `max_count` due triggers; never blocks
    fn acquire_next_triggers(
        &self,
        no_later_than: DateTime<Utc>,
        max_count: usize,
        time_window: Duration,
    ) -> Vec<Trigger>;

    /// Give back a reservation without firing
    fn release_acquired_trigger(&self, trigger: &Trigger);

    fn trigger_fired(&self, trigger: &Trigger) -> TriggerFiredResult;

    fn triggers_fired(&self, triggers: &[Trigger]) -> Vec<TriggerFiredResult>;

    /// Record that a fired job finished
    ///
    /// `job` carries the job data as left by the execution; it is written
    /// back when the stored job persists data after execution.
    fn triggered_job_complete(
        &self,
        trigger: &Trigger,
        job: &JobDetail,
        instruction: CompletedExecutionInstruction,
    );
}
