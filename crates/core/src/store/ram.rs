// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory job store
//!
//! All state sits behind one mutex, so every operation is atomic and
//! concurrent acquirers never see the same waiting trigger. Waiting triggers
//! with a next fire time live in a [`TimeIndex`]; a trigger is indexed iff
//! its state is [`InternalTriggerState::Waiting`] and it has a next fire
//! time.

use super::index::TimeIndex;
use super::snapshot::{SnapshotError, StoreSnapshot};
use super::{JobStore, TriggerFiredBundle, TriggerFiredResult, RECOVERING_JOBS_GROUP};
use crate::calendar::{Calendar, CalendarChain, CalendarError};
use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::error::{ObjectKind, StoreError};
use crate::job::JobDetail;
use crate::key::{JobKey, Key, TriggerKey};
use crate::matcher::Matcher;
use crate::signaler::{NoOpSignaler, SchedulerSignaler};
use crate::trigger::{
    CompletedExecutionInstruction, MisfireInstruction, Schedule, Trigger, TriggerState,
};
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration as StdDuration;

/// Store-side trigger state, finer than [`TriggerState`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternalTriggerState {
    Waiting,
    /// Reserved by an acquirer
    Acquired,
    Complete,
    Paused,
    /// Its job disallows concurrency and is executing
    Blocked,
    PausedBlocked,
    Error,
}

impl InternalTriggerState {
    pub fn public(self) -> TriggerState {
        match self {
            InternalTriggerState::Waiting | InternalTriggerState::Acquired => TriggerState::Normal,
            InternalTriggerState::Complete => TriggerState::Complete,
            InternalTriggerState::Paused | InternalTriggerState::PausedBlocked => {
                TriggerState::Paused
            }
            InternalTriggerState::Blocked => TriggerState::Blocked,
            InternalTriggerState::Error => TriggerState::Error,
        }
    }
}

/// A trigger and its store-side state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredTrigger {
    pub trigger: Trigger,
    pub state: InternalTriggerState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiredState {
    Acquired,
    Executing,
}

/// One outstanding reservation or execution
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FiredTriggerRecord {
    pub fire_instance_id: u64,
    pub trigger_key: TriggerKey,
    pub job_key: JobKey,
    pub state: FiredState,
    pub fired_at: DateTime<Utc>,
    pub scheduled_fire_time: Option<DateTime<Utc>>,
    pub priority: i32,
    pub requests_recovery: bool,
}

/// Per-call context handed to state operations
struct Env<'a> {
    now: DateTime<Utc>,
    misfire_threshold: StdDuration,
    signaler: &'a dyn SchedulerSignaler,
}

impl Env<'_> {
    /// Fire times before this instant have misfired
    fn misfire_time(&self) -> DateTime<Utc> {
        let threshold = Duration::from_std(self.misfire_threshold).unwrap_or(Duration::MAX);
        self.now
            .checked_sub_signed(threshold)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// A store notification waiting for the lock to be released
enum Notice {
    Misfired(Trigger),
    Finalized(Trigger),
    SchedulingChange(Option<DateTime<Utc>>),
}

/// Buffers notifications raised under the store lock
///
/// [`RamJobStore`] hands this to state operations and dispatches to the real
/// signaler once the lock is dropped, so signalers may call back into the
/// store.
#[derive(Default)]
struct PendingSignals {
    notices: Mutex<Vec<Notice>>,
}

impl PendingSignals {
    fn dispatch(self, signaler: &dyn SchedulerSignaler) {
        for notice in self.notices.into_inner() {
            match notice {
                Notice::Misfired(trigger) => signaler.notify_trigger_listeners_misfired(&trigger),
                Notice::Finalized(trigger) => {
                    signaler.notify_scheduler_listeners_finalized(&trigger)
                }
                Notice::SchedulingChange(candidate) => signaler.signal_scheduling_change(candidate),
            }
        }
    }
}

impl SchedulerSignaler for PendingSignals {
    fn notify_trigger_listeners_misfired(&self, trigger: &Trigger) {
        self.notices.lock().push(Notice::Misfired(trigger.clone()));
    }

    fn notify_scheduler_listeners_finalized(&self, trigger: &Trigger) {
        self.notices.lock().push(Notice::Finalized(trigger.clone()));
    }

    fn signal_scheduling_change(&self, candidate_next_fire_time: Option<DateTime<Utc>>) {
        self.notices
            .lock()
            .push(Notice::SchedulingChange(candidate_next_fire_time));
    }
}

fn resolve_chain<'a>(
    calendars: &'a BTreeMap<String, Calendar>,
    name: Option<&str>,
) -> Option<CalendarChain<'a>> {
    let name = name?;
    match CalendarChain::resolve(name, calendars) {
        Ok(chain) => Some(chain),
        Err(e) => {
            tracing::warn!(calendar = name, error = %e, "calendar chain does not resolve");
            None
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    jobs: BTreeMap<JobKey, JobDetail>,
    triggers: BTreeMap<TriggerKey, StoredTrigger>,
    triggers_by_job: BTreeMap<JobKey, BTreeSet<TriggerKey>>,
    calendars: BTreeMap<String, Calendar>,
    index: TimeIndex,
    paused_trigger_groups: BTreeSet<String>,
    paused_job_groups: BTreeSet<String>,
    blocked_jobs: BTreeSet<JobKey>,
    fired: BTreeMap<u64, FiredTriggerRecord>,
    next_fire_instance_id: u64,
}

impl StoreState {
    // --- index bookkeeping ---

    fn reindex(&mut self, key: &TriggerKey) {
        if let Some(entry) = self.triggers.get(key) {
            if entry.state == InternalTriggerState::Waiting {
                self.index.insert(&entry.trigger);
            }
        }
    }

    fn set_state(&mut self, key: &TriggerKey, state: InternalTriggerState) {
        let Some(entry) = self.triggers.get_mut(key) else {
            return;
        };
        if entry.state == InternalTriggerState::Waiting {
            self.index.remove(&entry.trigger);
        }
        if entry.state == InternalTriggerState::Acquired && state != InternalTriggerState::Acquired
        {
            self.fired
                .retain(|_, r| !(r.state == FiredState::Acquired && r.trigger_key == *key));
        }
        entry.state = state;
        if state == InternalTriggerState::Waiting {
            self.index.insert(&entry.trigger);
        }
    }

    fn trigger_keys_of_job(&self, job_key: &JobKey) -> Vec<TriggerKey> {
        self.triggers_by_job
            .get(job_key)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn trigger_keys_in_group(&self, group: &str) -> Vec<TriggerKey> {
        self.triggers
            .keys()
            .filter(|k| k.group() == group)
            .cloned()
            .collect()
    }

    fn job_keys_in_group(&self, group: &str) -> Vec<JobKey> {
        self.jobs
            .keys()
            .filter(|k| k.group() == group)
            .cloned()
            .collect()
    }

    fn next_fire_instance_id(&mut self) -> u64 {
        self.next_fire_instance_id += 1;
        self.next_fire_instance_id
    }

    // --- storage ---

    fn store_job(&mut self, job: JobDetail, replace_existing: bool) -> Result<(), StoreError> {
        if !replace_existing && self.jobs.contains_key(&job.key) {
            return Err(StoreError::ObjectAlreadyExists {
                kind: ObjectKind::Job,
                key: job.key.to_string(),
            });
        }
        tracing::debug!(job = %job.key, "job stored");
        self.jobs.insert(job.key.clone(), job);
        Ok(())
    }

    /// Validate a trigger and compute its first fire time; no mutation
    fn prepare_trigger(&self, mut trigger: Trigger) -> Result<Trigger, StoreError> {
        trigger
            .validate()
            .map_err(|source| StoreError::InvalidTrigger {
                key: trigger.key.clone(),
                source,
            })?;

        let chain = match trigger.calendar_name.as_deref() {
            Some(name) => {
                if !self.calendars.contains_key(name) {
                    return Err(StoreError::CalendarNotFound(name.to_string()));
                }
                Some(CalendarChain::resolve(name, &self.calendars)?)
            }
            None => None,
        };

        if trigger.next_fire_time.is_none()
            && trigger.previous_fire_time.is_none()
            && trigger.compute_first_fire_time(chain.as_ref()).is_none()
        {
            return Err(StoreError::TriggerWillNeverFire(trigger.key.clone()));
        }
        trigger.fire_instance_id = None;
        Ok(trigger)
    }

    /// Insert a prepared trigger whose key is free
    fn insert_trigger(&mut self, env: &Env<'_>, trigger: Trigger) {
        let key = trigger.key.clone();
        let job_key = trigger.job_key.clone();
        let paused = self.paused_trigger_groups.contains(key.group())
            || self.paused_job_groups.contains(job_key.group());
        let blocked = self.blocked_jobs.contains(&job_key);
        let state = match (paused, blocked) {
            (true, true) => InternalTriggerState::PausedBlocked,
            (true, false) => InternalTriggerState::Paused,
            (false, true) => InternalTriggerState::Blocked,
            (false, false) => InternalTriggerState::Waiting,
        };

        tracing::debug!(trigger = %key, job = %job_key, ?state, next_fire_time = ?trigger.next_fire_time, "trigger stored");
        let next_fire_time = trigger.next_fire_time;
        self.triggers_by_job
            .entry(job_key)
            .or_default()
            .insert(key.clone());
        self.triggers
            .insert(key.clone(), StoredTrigger { trigger, state });
        self.reindex(&key);

        if state == InternalTriggerState::Waiting {
            env.signaler.signal_scheduling_change(next_fire_time);
        }
    }

    fn store_trigger(
        &mut self,
        env: &Env<'_>,
        trigger: Trigger,
        replace_existing: bool,
    ) -> Result<(), StoreError> {
        if !replace_existing && self.triggers.contains_key(&trigger.key) {
            return Err(StoreError::ObjectAlreadyExists {
                kind: ObjectKind::Trigger,
                key: trigger.key.to_string(),
            });
        }
        if !self.jobs.contains_key(&trigger.job_key) {
            return Err(StoreError::JobNotFound(trigger.job_key.clone()));
        }
        let trigger = self.prepare_trigger(trigger)?;
        self.remove_trigger(&trigger.key, false);
        self.insert_trigger(env, trigger);
        Ok(())
    }

    fn store_jobs_and_triggers(
        &mut self,
        env: &Env<'_>,
        entries: Vec<(JobDetail, Vec<Trigger>)>,
        replace: bool,
    ) -> Result<(), StoreError> {
        // Validate everything before touching the maps
        let mut job_keys = HashSet::new();
        let mut trigger_keys = HashSet::new();
        let mut prepared = Vec::with_capacity(entries.len());
        for (job, triggers) in entries {
            if (!replace && self.jobs.contains_key(&job.key)) || !job_keys.insert(job.key.clone())
            {
                return Err(StoreError::ObjectAlreadyExists {
                    kind: ObjectKind::Job,
                    key: job.key.to_string(),
                });
            }
            let mut ready = Vec::with_capacity(triggers.len());
            for trigger in triggers {
                if (!replace && self.triggers.contains_key(&trigger.key))
                    || !trigger_keys.insert(trigger.key.clone())
                {
                    return Err(StoreError::ObjectAlreadyExists {
                        kind: ObjectKind::Trigger,
                        key: trigger.key.to_string(),
                    });
                }
                if trigger.job_key != job.key {
                    return Err(StoreError::TriggerJobMismatch {
                        trigger: trigger.key.clone(),
                        expected: job.key.clone(),
                        actual: trigger.job_key.clone(),
                    });
                }
                ready.push(self.prepare_trigger(trigger)?);
            }
            prepared.push((job, ready));
        }

        for (job, triggers) in prepared {
            self.store_job(job, true)?;
            for trigger in triggers {
                self.remove_trigger(&trigger.key, false);
                self.insert_trigger(env, trigger);
            }
        }
        Ok(())
    }

    fn remove_trigger(&mut self, key: &TriggerKey, delete_orphaned_job: bool) -> bool {
        let Some(entry) = self.triggers.remove(key) else {
            return false;
        };
        self.index.remove(&entry.trigger);
        if entry.state == InternalTriggerState::Acquired {
            self.fired
                .retain(|_, r| !(r.state == FiredState::Acquired && r.trigger_key == *key));
        }

        let job_key = entry.trigger.job_key;
        let orphaned = match self.triggers_by_job.get_mut(&job_key) {
            Some(keys) => {
                keys.remove(key);
                keys.is_empty()
            }
            None => true,
        };
        if orphaned {
            self.triggers_by_job.remove(&job_key);
            if delete_orphaned_job && self.jobs.get(&job_key).is_some_and(|job| !job.durable) {
                self.jobs.remove(&job_key);
                tracing::debug!(job = %job_key, "non-durable job removed with its last trigger");
            }
        }
        tracing::debug!(trigger = %key, "trigger removed");
        true
    }

    fn remove_job(&mut self, key: &JobKey) -> bool {
        let mut found = false;
        for trigger_key in self.trigger_keys_of_job(key) {
            found |= self.remove_trigger(&trigger_key, false);
        }
        found |= self.jobs.remove(key).is_some();
        self.blocked_jobs.remove(key);
        found
    }

    fn replace_trigger(
        &mut self,
        env: &Env<'_>,
        key: &TriggerKey,
        trigger: Trigger,
    ) -> Result<bool, StoreError> {
        let Some(old) = self.triggers.get(key) else {
            return Ok(false);
        };
        if old.trigger.job_key != trigger.job_key {
            return Err(StoreError::TriggerJobMismatch {
                trigger: trigger.key.clone(),
                expected: old.trigger.job_key.clone(),
                actual: trigger.job_key.clone(),
            });
        }
        if trigger.key != *key && self.triggers.contains_key(&trigger.key) {
            return Err(StoreError::ObjectAlreadyExists {
                kind: ObjectKind::Trigger,
                key: trigger.key.to_string(),
            });
        }
        let trigger = self.prepare_trigger(trigger)?;
        self.remove_trigger(key, false);
        self.insert_trigger(env, trigger);
        Ok(true)
    }

    // --- calendars ---

    fn store_calendar(
        &mut self,
        env: &Env<'_>,
        name: &str,
        calendar: Calendar,
        replace_existing: bool,
        update_triggers: bool,
    ) -> Result<(), StoreError> {
        let existed = self.calendars.contains_key(name);
        if existed && !replace_existing {
            return Err(StoreError::ObjectAlreadyExists {
                kind: ObjectKind::Calendar,
                key: name.to_string(),
            });
        }
        CalendarChain::from_root(name, &calendar, &self.calendars).map_err(|e| match e {
            CalendarError::Cycle(through) => StoreError::CyclicCalendarChain(through),
            CalendarError::MissingBase(base) => StoreError::CalendarNotFound(base),
            other => StoreError::Calendar(other),
        })?;
        self.calendars.insert(name.to_string(), calendar);
        tracing::debug!(calendar = name, replaced = existed, "calendar stored");

        if existed && update_triggers {
            let users: Vec<TriggerKey> = self
                .triggers
                .values()
                .filter(|e| e.trigger.calendar_name.as_deref() == Some(name))
                .map(|e| e.trigger.key.clone())
                .collect();
            let chain = resolve_chain(&self.calendars, Some(name));
            for key in users {
                let Some(entry) = self.triggers.get_mut(&key) else {
                    continue;
                };
                let indexed = self.index.remove(&entry.trigger);
                entry.trigger.update_with_new_calendar(
                    chain.as_ref(),
                    env.now,
                    env.misfire_threshold,
                );
                if indexed {
                    self.index.insert(&entry.trigger);
                }
            }
        }
        Ok(())
    }

    fn remove_calendar(&mut self, name: &str) -> Result<bool, StoreError> {
        if let Some(entry) = self
            .triggers
            .values()
            .find(|e| e.trigger.calendar_name.as_deref() == Some(name))
        {
            return Err(StoreError::CalendarInUse {
                name: name.to_string(),
                user: format!("trigger {}", entry.trigger.key),
            });
        }
        if let Some((other, _)) = self
            .calendars
            .iter()
            .find(|(other, cal)| other.as_str() != name && cal.base.as_deref() == Some(name))
        {
            return Err(StoreError::CalendarInUse {
                name: name.to_string(),
                user: format!("calendar {}", other),
            });
        }
        Ok(self.calendars.remove(name).is_some())
    }

    // --- queries ---

    fn trigger_keys(&self, matcher: &Matcher) -> Vec<TriggerKey> {
        self.triggers
            .keys()
            .filter(|k| matcher.is_match(k))
            .cloned()
            .collect()
    }

    fn job_keys(&self, matcher: &Matcher) -> Vec<JobKey> {
        self.jobs
            .keys()
            .filter(|k| matcher.is_match(k))
            .cloned()
            .collect()
    }

    fn trigger_group_names(&self) -> Vec<String> {
        let groups: BTreeSet<&str> = self.triggers.keys().map(|k| k.group()).collect();
        groups.into_iter().map(str::to_string).collect()
    }

    fn job_group_names(&self) -> Vec<String> {
        let groups: BTreeSet<&str> = self.jobs.keys().map(|k| k.group()).collect();
        groups.into_iter().map(str::to_string).collect()
    }

    // --- pause and resume ---

    fn pause_trigger(&mut self, key: &TriggerKey) {
        let Some(entry) = self.triggers.get(key) else {
            return;
        };
        let paused = match entry.state {
            InternalTriggerState::Complete
            | InternalTriggerState::Paused
            | InternalTriggerState::PausedBlocked => return,
            InternalTriggerState::Blocked => InternalTriggerState::PausedBlocked,
            _ => InternalTriggerState::Paused,
        };
        self.set_state(key, paused);
        tracing::debug!(trigger = %key, "trigger paused");
    }

    /// Groups a group-leaf matcher selects; `None` for any other matcher
    fn matched_groups(matcher: &Matcher, existing: Vec<String>) -> Option<Vec<String>> {
        if let Some(group) = matcher.exact_group() {
            return Some(vec![group.to_string()]);
        }
        match matcher {
            Matcher::Group {
                operator,
                compare_to,
            } => Some(
                existing
                    .into_iter()
                    .filter(|g| operator.evaluate(g, compare_to))
                    .collect(),
            ),
            _ => None,
        }
    }

    fn groups_of<'a>(keys: impl IntoIterator<Item = &'a Key>) -> Vec<String> {
        let groups: BTreeSet<&str> = keys.into_iter().map(|k| k.group()).collect();
        groups.into_iter().map(str::to_string).collect()
    }

    fn pause_triggers(&mut self, matcher: &Matcher) -> Vec<String> {
        let Some(groups) = Self::matched_groups(matcher, self.trigger_group_names()) else {
            let keys = self.trigger_keys(matcher);
            for key in &keys {
                self.pause_trigger(key);
            }
            return Self::groups_of(&keys);
        };
        for group in &groups {
            self.paused_trigger_groups.insert(group.clone());
            for key in self.trigger_keys_in_group(group) {
                self.pause_trigger(&key);
            }
        }
        groups
    }

    fn pause_job(&mut self, key: &JobKey) {
        for trigger_key in self.trigger_keys_of_job(key) {
            self.pause_trigger(&trigger_key);
        }
    }

    fn pause_jobs(&mut self, matcher: &Matcher) -> Vec<String> {
        let Some(groups) = Self::matched_groups(matcher, self.job_group_names()) else {
            let keys = self.job_keys(matcher);
            for key in &keys {
                self.pause_job(key);
            }
            return Self::groups_of(&keys);
        };
        for group in &groups {
            self.paused_job_groups.insert(group.clone());
            for key in self.job_keys_in_group(group) {
                self.pause_job(&key);
            }
        }
        groups
    }

    fn resume_trigger(&mut self, env: &Env<'_>, key: &TriggerKey) {
        let blocked_jobs = &self.blocked_jobs;
        let Some(entry) = self.triggers.get_mut(key) else {
            return;
        };
        if !matches!(
            entry.state,
            InternalTriggerState::Paused | InternalTriggerState::PausedBlocked
        ) {
            return;
        }
        if blocked_jobs.contains(&entry.trigger.job_key) {
            entry.state = InternalTriggerState::Blocked;
            tracing::debug!(trigger = %key, "trigger resumed into blocked job");
            return;
        }
        // Waiting but not yet indexed: apply any misfire first
        entry.state = InternalTriggerState::Waiting;
        self.apply_misfire(env, key);
        self.reindex(key);
        let next_fire_time = self
            .triggers
            .get(key)
            .and_then(|e| e.trigger.next_fire_time);
        tracing::debug!(trigger = %key, ?next_fire_time, "trigger resumed");
        env.signaler.signal_scheduling_change(next_fire_time);
    }

    fn resume_triggers(&mut self, env: &Env<'_>, matcher: &Matcher) -> Vec<String> {
        let keys = self.trigger_keys(matcher);
        for key in &keys {
            let job_group_paused = self
                .triggers
                .get(key)
                .is_some_and(|e| self.paused_job_groups.contains(e.trigger.job_key.group()));
            if !job_group_paused {
                self.resume_trigger(env, key);
            }
        }
        if let Some(group) = matcher.exact_group() {
            self.paused_trigger_groups.remove(group);
        } else if let Matcher::Group {
            operator,
            compare_to,
        } = matcher
        {
            self.paused_trigger_groups
                .retain(|g| !operator.evaluate(g, compare_to));
        }
        Self::groups_of(&keys)
    }

    fn resume_job(&mut self, env: &Env<'_>, key: &JobKey) {
        for trigger_key in self.trigger_keys_of_job(key) {
            self.resume_trigger(env, &trigger_key);
        }
    }

    fn resume_jobs(&mut self, env: &Env<'_>, matcher: &Matcher) -> Vec<String> {
        let mut groups: BTreeSet<String> = BTreeSet::new();
        if let Matcher::Group {
            operator,
            compare_to,
        } = matcher
        {
            let resumed: Vec<String> = self
                .paused_job_groups
                .iter()
                .filter(|g| operator.evaluate(g, compare_to))
                .cloned()
                .collect();
            for group in resumed {
                self.paused_job_groups.remove(&group);
                groups.insert(group);
            }
        }
        let keys = self.job_keys(matcher);
        for key in &keys {
            groups.insert(key.group().to_string());
            self.resume_job(env, key);
        }
        groups.into_iter().collect()
    }

    fn pause_all(&mut self) {
        for group in self.trigger_group_names() {
            self.pause_triggers(&Matcher::group_equals(group));
        }
    }

    fn resume_all(&mut self, env: &Env<'_>) {
        self.paused_job_groups.clear();
        self.resume_triggers(env, &Matcher::any_group());
    }

    fn reset_trigger_from_error_state(&mut self, key: &TriggerKey) -> bool {
        let Some(entry) = self.triggers.get(key) else {
            return false;
        };
        if entry.state != InternalTriggerState::Error {
            return false;
        }
        let state = if self.paused_trigger_groups.contains(key.group()) {
            InternalTriggerState::Paused
        } else {
            InternalTriggerState::Waiting
        };
        self.set_state(key, state);
        true
    }

    // --- firing ---

    /// Apply the misfire instruction if the trigger's fire time is too old
    ///
    /// The trigger must not be indexed. Returns true when the trigger was
    /// handled as a misfire and must not be acquired in this pass.
    fn apply_misfire(&mut self, env: &Env<'_>, key: &TriggerKey) -> bool {
        let calendars = &self.calendars;
        let Some(entry) = self.triggers.get_mut(key) else {
            return false;
        };
        let Some(scheduled) = entry.trigger.next_fire_time else {
            return false;
        };
        if scheduled >= env.misfire_time()
            || entry.trigger.misfire_instruction == MisfireInstruction::IgnoreMisfires
        {
            return false;
        }

        let chain = resolve_chain(calendars, entry.trigger.calendar_name.as_deref());
        env.signaler.notify_trigger_listeners_misfired(&entry.trigger);
        entry.trigger.update_after_misfire(chain.as_ref(), env.now);
        tracing::info!(
            trigger = %key,
            %scheduled,
            next_fire_time = ?entry.trigger.next_fire_time,
            "trigger misfired"
        );

        match entry.trigger.next_fire_time {
            None => {
                entry.state = InternalTriggerState::Complete;
                env.signaler
                    .notify_scheduler_listeners_finalized(&entry.trigger);
                tracing::debug!(trigger = %key, "trigger finalized after misfire");
                true
            }
            Some(next) => next != scheduled,
        }
    }

    /// Whether a non-concurrent job already has a reservation or execution
    fn job_is_busy(&self, job_key: &JobKey) -> bool {
        self.blocked_jobs.contains(job_key)
            || self
                .trigger_keys_of_job(job_key)
                .iter()
                .filter_map(|k| self.triggers.get(k))
                .any(|e| e.state == InternalTriggerState::Acquired)
    }

    fn acquire_next_triggers(
        &mut self,
        env: &Env<'_>,
        no_later_than: DateTime<Utc>,
        max_count: usize,
        time_window: StdDuration,
    ) -> Vec<Trigger> {
        let mut acquired: Vec<Trigger> = Vec::new();
        if max_count == 0 {
            return acquired;
        }
        let window = Duration::from_std(time_window).unwrap_or(Duration::MAX);
        let mut batch_end = no_later_than
            .checked_add_signed(window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let mut excluded: Vec<TriggerKey> = Vec::new();
        // Eligible again on the next pass, not this one
        let mut misfired: Vec<TriggerKey> = Vec::new();
        let mut acquired_jobs: HashSet<JobKey> = HashSet::new();

        while let Some(slot) = self.index.pop_first() {
            let key = slot.key;
            if self.apply_misfire(env, &key) {
                misfired.push(key);
                continue;
            }
            let Some(entry) = self.triggers.get(&key) else {
                continue;
            };
            let Some(next_fire_time) = entry.trigger.next_fire_time else {
                continue;
            };
            if next_fire_time > batch_end {
                self.index.insert(&entry.trigger);
                break;
            }

            let job_key = entry.trigger.job_key.clone();
            let priority = entry.trigger.priority;
            let Some(job) = self.jobs.get(&job_key) else {
                tracing::warn!(trigger = %key, job = %job_key, "trigger references missing job");
                excluded.push(key);
                continue;
            };
            let requests_recovery = job.requests_recovery;
            if job.concurrent_execution_disallowed {
                if acquired_jobs.contains(&job_key) || self.job_is_busy(&job_key) {
                    excluded.push(key);
                    continue;
                }
                acquired_jobs.insert(job_key.clone());
            }

            let id = self.next_fire_instance_id();
            let Some(entry) = self.triggers.get_mut(&key) else {
                continue;
            };
            entry.state = InternalTriggerState::Acquired;
            entry.trigger.fire_instance_id = Some(id);
            self.fired.insert(
                id,
                FiredTriggerRecord {
                    fire_instance_id: id,
                    trigger_key: key.clone(),
                    job_key,
                    state: FiredState::Acquired,
                    fired_at: env.now,
                    scheduled_fire_time: Some(next_fire_time),
                    priority,
                    requests_recovery,
                },
            );
            if acquired.is_empty() {
                batch_end = next_fire_time
                    .max(env.now)
                    .checked_add_signed(window)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
            }
            tracing::debug!(trigger = %key, fire_instance_id = id, %next_fire_time, "trigger acquired");
            acquired.push(entry.trigger.clone());
            if acquired.len() >= max_count {
                break;
            }
        }

        for key in excluded.iter().chain(&misfired) {
            self.reindex(key);
        }
        let rescheduled = misfired
            .iter()
            .filter_map(|k| self.triggers.get(k))
            .filter(|e| e.state == InternalTriggerState::Waiting)
            .filter_map(|e| e.trigger.next_fire_time)
            .min();
        if rescheduled.is_some() {
            env.signaler.signal_scheduling_change(rescheduled);
        }
        acquired
    }

    fn release_acquired_trigger(&mut self, trigger: &Trigger) {
        if let Some(id) = trigger.fire_instance_id {
            if self
                .fired
                .get(&id)
                .is_some_and(|r| r.state == FiredState::Acquired)
            {
                self.fired.remove(&id);
            }
        }
        let acquired = self.triggers.get(&trigger.key).is_some_and(|e| {
            e.state == InternalTriggerState::Acquired
                && e.trigger.fire_instance_id == trigger.fire_instance_id
        });
        if acquired {
            self.set_state(&trigger.key, InternalTriggerState::Waiting);
            tracing::debug!(trigger = %trigger.key, "reservation released");
        }
    }

    fn trigger_fired(&mut self, env: &Env<'_>, trigger: &Trigger) -> TriggerFiredResult {
        let key = &trigger.key;
        let acquired = self.triggers.get(key).is_some_and(|e| {
            e.state == InternalTriggerState::Acquired
                && e.trigger.fire_instance_id == trigger.fire_instance_id
        });
        if !acquired {
            if let Some(id) = trigger.fire_instance_id {
                if self
                    .fired
                    .get(&id)
                    .is_some_and(|r| r.state == FiredState::Acquired)
                {
                    self.fired.remove(&id);
                }
            }
            return TriggerFiredResult::NotAcquired;
        }

        let Some(entry) = self.triggers.get(key) else {
            return TriggerFiredResult::NotAcquired;
        };
        let calendar_name = entry.trigger.calendar_name.clone();
        let job = self.jobs.get(&entry.trigger.job_key).cloned();
        let calendar = calendar_name
            .as_deref()
            .map(|name| self.calendars.get(name).cloned());
        let (job, calendar) = match (job, calendar) {
            (Some(job), None) => (job, None),
            (Some(job), Some(Some(calendar))) => (job, Some(calendar)),
            _ => {
                tracing::warn!(trigger = %key, "job or calendar vanished; reservation dropped");
                self.set_state(key, InternalTriggerState::Waiting);
                return TriggerFiredResult::NotAcquired;
            }
        };

        if job.concurrent_execution_disallowed && self.blocked_jobs.contains(&job.key) {
            self.set_state(key, InternalTriggerState::Blocked);
            tracing::debug!(trigger = %key, job = %job.key, "job is executing; trigger blocked");
            return TriggerFiredResult::Blocked;
        }

        let chain = resolve_chain(&self.calendars, calendar_name.as_deref());
        let Some(entry) = self.triggers.get_mut(key) else {
            return TriggerFiredResult::NotAcquired;
        };
        let prev_fire_time = entry.trigger.previous_fire_time;
        entry.trigger.triggered(chain.as_ref());
        entry.state = InternalTriggerState::Waiting;
        let fired = entry.trigger.clone();

        if let Some(record) = fired.fire_instance_id.and_then(|id| self.fired.get_mut(&id)) {
            record.state = FiredState::Executing;
            record.fired_at = env.now;
            record.requests_recovery = job.requests_recovery;
        }

        if job.concurrent_execution_disallowed {
            for trigger_key in self.trigger_keys_of_job(&job.key) {
                match self.triggers.get(&trigger_key).map(|e| e.state) {
                    Some(InternalTriggerState::Waiting) => {
                        self.set_state(&trigger_key, InternalTriggerState::Blocked)
                    }
                    Some(InternalTriggerState::Paused) => {
                        self.set_state(&trigger_key, InternalTriggerState::PausedBlocked)
                    }
                    _ => {}
                }
            }
            self.blocked_jobs.insert(job.key.clone());
        } else {
            self.reindex(key);
        }

        tracing::debug!(
            trigger = %key,
            job = %job.key,
            next_fire_time = ?fired.next_fire_time,
            "trigger fired"
        );
        TriggerFiredResult::Fired(Box::new(TriggerFiredBundle {
            is_recovering: key.group() == RECOVERING_JOBS_GROUP,
            fire_time: env.now,
            scheduled_fire_time: fired.previous_fire_time,
            prev_fire_time,
            next_fire_time: fired.next_fire_time,
            job,
            trigger: fired,
            calendar,
        }))
    }

    fn unblock_job(&mut self, env: &Env<'_>, job_key: &JobKey) {
        self.blocked_jobs.remove(job_key);
        for trigger_key in self.trigger_keys_of_job(job_key) {
            match self.triggers.get(&trigger_key).map(|e| e.state) {
                Some(InternalTriggerState::Blocked) => {
                    self.set_state(&trigger_key, InternalTriggerState::Waiting)
                }
                Some(InternalTriggerState::PausedBlocked) => {
                    self.set_state(&trigger_key, InternalTriggerState::Paused)
                }
                _ => {}
            }
        }
        env.signaler.signal_scheduling_change(None);
    }

    fn set_all_job_triggers(&mut self, job_key: &JobKey, state: InternalTriggerState) {
        for trigger_key in self.trigger_keys_of_job(job_key) {
            self.set_state(&trigger_key, state);
        }
    }

    fn triggered_job_complete(
        &mut self,
        env: &Env<'_>,
        trigger: &Trigger,
        job: &JobDetail,
        instruction: CompletedExecutionInstruction,
    ) {
        match self.jobs.get_mut(&job.key) {
            Some(stored) => {
                if stored.persist_job_data_after_execution {
                    stored.job_data = job.job_data.clone();
                }
                if stored.concurrent_execution_disallowed {
                    self.unblock_job(env, &job.key);
                }
            }
            None => {
                self.blocked_jobs.remove(&job.key);
            }
        }
        if let Some(id) = trigger.fire_instance_id {
            self.fired.remove(&id);
        }

        let key = &trigger.key;
        let Some(entry) = self.triggers.get(key) else {
            return;
        };
        match instruction {
            CompletedExecutionInstruction::NoOp | CompletedExecutionInstruction::ReExecuteJob => {}
            CompletedExecutionInstruction::DeleteTrigger => {
                if trigger.next_fire_time.is_none() {
                    // Only delete if nothing rescheduled it during execution
                    if entry.trigger.next_fire_time.is_none() {
                        self.remove_trigger(key, true);
                    }
                } else {
                    self.remove_trigger(key, true);
                    env.signaler.signal_scheduling_change(None);
                }
            }
            CompletedExecutionInstruction::SetTriggerComplete => {
                self.set_state(key, InternalTriggerState::Complete);
                env.signaler.signal_scheduling_change(None);
            }
            CompletedExecutionInstruction::SetTriggerError => {
                tracing::warn!(trigger = %key, job = %job.key, "trigger set to error state");
                self.set_state(key, InternalTriggerState::Error);
                env.signaler.signal_scheduling_change(None);
            }
            CompletedExecutionInstruction::SetAllJobTriggersComplete => {
                self.set_all_job_triggers(&job.key, InternalTriggerState::Complete);
                env.signaler.signal_scheduling_change(None);
            }
            CompletedExecutionInstruction::SetAllJobTriggersError => {
                tracing::warn!(job = %job.key, "all triggers of job set to error state");
                self.set_all_job_triggers(&job.key, InternalTriggerState::Error);
                env.signaler.signal_scheduling_change(None);
            }
        }
    }

    // --- snapshots ---

    fn snapshot(&self, taken_at: DateTime<Utc>) -> StoreSnapshot {
        StoreSnapshot {
            version: StoreSnapshot::CURRENT_VERSION,
            taken_at,
            jobs: self.jobs.values().cloned().collect(),
            triggers: self.triggers.values().cloned().collect(),
            calendars: self.calendars.clone(),
            paused_trigger_groups: self.paused_trigger_groups.clone(),
            paused_job_groups: self.paused_job_groups.clone(),
            blocked_jobs: self.blocked_jobs.clone(),
            fired: self.fired.values().cloned().collect(),
            next_fire_instance_id: self.next_fire_instance_id,
        }
    }

    /// Rebuild from a snapshot taken before a restart
    ///
    /// Nothing survives a restart mid-flight: reservations are returned and
    /// blocks lifted. Executions interrupted for jobs that request recovery
    /// get a one-shot trigger in [`RECOVERING_JOBS_GROUP`].
    fn restore(env: &Env<'_>, snapshot: StoreSnapshot) -> Result<Self, StoreError> {
        let mut state = StoreState {
            jobs: snapshot
                .jobs
                .into_iter()
                .map(|job| (job.key.clone(), job))
                .collect(),
            calendars: snapshot.calendars,
            paused_trigger_groups: snapshot.paused_trigger_groups,
            paused_job_groups: snapshot.paused_job_groups,
            next_fire_instance_id: snapshot.next_fire_instance_id,
            ..StoreState::default()
        };

        for StoredTrigger { mut trigger, state: stored_state } in snapshot.triggers {
            if !state.jobs.contains_key(&trigger.job_key) {
                return Err(SnapshotError::InvalidFormat(format!(
                    "trigger {} references missing job {}",
                    trigger.key, trigger.job_key
                ))
                .into());
            }
            let restored = match stored_state {
                InternalTriggerState::Acquired | InternalTriggerState::Blocked => {
                    InternalTriggerState::Waiting
                }
                InternalTriggerState::PausedBlocked => InternalTriggerState::Paused,
                other => other,
            };
            trigger.fire_instance_id = None;
            let key = trigger.key.clone();
            state
                .triggers_by_job
                .entry(trigger.job_key.clone())
                .or_default()
                .insert(key.clone());
            state.triggers.insert(
                key.clone(),
                StoredTrigger {
                    trigger,
                    state: restored,
                },
            );
            state.reindex(&key);
        }

        for record in snapshot.fired {
            if record.state != FiredState::Executing
                || !record.requests_recovery
                || !state.jobs.contains_key(&record.job_key)
            {
                continue;
            }
            let trigger = recovery_trigger(&record)?;
            tracing::info!(
                job = %record.job_key,
                trigger = %trigger.key,
                "recovering interrupted execution"
            );
            let trigger = state.prepare_trigger(trigger)?;
            state.remove_trigger(&trigger.key, false);
            state.insert_trigger(env, trigger);
        }

        Ok(state)
    }
}

fn recovery_trigger(record: &FiredTriggerRecord) -> Result<Trigger, StoreError> {
    let name = format!(
        "recover_{}_{}",
        record.trigger_key, record.fire_instance_id
    );
    let key = Key::new(name, RECOVERING_JOBS_GROUP)
        .map_err(|e| SnapshotError::InvalidFormat(e.to_string()))?;
    let start = record.scheduled_fire_time.unwrap_or(record.fired_at);
    Ok(Trigger::new(key, record.job_key.clone(), Schedule::once(), start)
        .with_priority(record.priority)
        .with_misfire_instruction(MisfireInstruction::IgnoreMisfires)
        .with_data("recovering_trigger", record.trigger_key.to_string())
        .with_data("recovering_fire_time", record.fired_at.to_rfc3339()))
}

/// In-memory [`JobStore`]
pub struct RamJobStore<C: Clock = SystemClock> {
    state: Mutex<StoreState>,
    signaler: RwLock<Arc<dyn SchedulerSignaler>>,
    clock: C,
    config: StoreConfig,
}

impl RamJobStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock, StoreConfig::default())
    }
}

impl Default for RamJobStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RamJobStore<C> {
    pub fn with_clock(clock: C, config: StoreConfig) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            signaler: RwLock::new(Arc::new(NoOpSignaler)),
            clock,
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut StoreState, &Env<'_>) -> R) -> R {
        let pending = PendingSignals::default();
        let result = {
            let env = Env {
                now: self.clock.now(),
                misfire_threshold: self.config.misfire_threshold,
                signaler: &pending,
            };
            let mut state = self.state.lock();
            f(&mut state, &env)
        };
        let signaler = self.signaler.read().clone();
        pending.dispatch(signaler.as_ref());
        result
    }

    /// Internal state of a trigger, for diagnostics
    pub fn internal_state(&self, key: &TriggerKey) -> Option<InternalTriggerState> {
        self.state.lock().triggers.get(key).map(|e| e.state)
    }

    /// Outstanding reservations and executions
    pub fn fired_records(&self) -> Vec<FiredTriggerRecord> {
        self.state.lock().fired.values().cloned().collect()
    }

    /// Earliest next fire time among waiting triggers
    pub fn next_fire_time(&self) -> Option<DateTime<Utc>> {
        self.state.lock().index.first().map(|slot| slot.fire_time)
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let taken_at = self.clock.now();
        self.state.lock().snapshot(taken_at)
    }

    /// Write a snapshot to `path`
    pub fn save_snapshot(&self, path: &Path) -> Result<(), StoreError> {
        self.snapshot().save(path)?;
        Ok(())
    }

    /// Build a store from a snapshot
    pub fn restore(snapshot: StoreSnapshot, clock: C, config: StoreConfig) -> Result<Self, StoreError> {
        let store = Self::with_clock(clock, config);
        let restored = store.with_state(|_, env| StoreState::restore(env, snapshot))?;
        let waiting = restored.index.len();
        *store.state.lock() = restored;
        tracing::info!(waiting, "store restored from snapshot");
        Ok(store)
    }

    /// Build a store from a snapshot file
    pub fn load(path: &Path, clock: C, config: StoreConfig) -> Result<Self, StoreError> {
        let snapshot = StoreSnapshot::load(path)?;
        Self::restore(snapshot, clock, config)
    }
}

impl<C: Clock> JobStore for RamJobStore<C> {
    fn initialize(&self, signaler: Arc<dyn SchedulerSignaler>) {
        *self.signaler.write() = signaler;
    }

    fn shutdown(&self) {
        let state = self.state.lock();
        tracing::debug!(
            jobs = state.jobs.len(),
            triggers = state.triggers.len(),
            outstanding = state.fired.len(),
            "job store shut down"
        );
    }

    fn store_job(&self, job: JobDetail, replace_existing: bool) -> Result<(), StoreError> {
        self.with_state(|s, _| s.store_job(job, replace_existing))
    }

    fn store_trigger(&self, trigger: Trigger, replace_existing: bool) -> Result<(), StoreError> {
        self.with_state(|s, env| s.store_trigger(env, trigger, replace_existing))
    }

    fn store_job_and_trigger(&self, job: JobDetail, trigger: Trigger) -> Result<(), StoreError> {
        self.with_state(|s, env| s.store_jobs_and_triggers(env, vec![(job, vec![trigger])], false))
    }

    fn store_jobs_and_triggers(
        &self,
        entries: Vec<(JobDetail, Vec<Trigger>)>,
        replace: bool,
    ) -> Result<(), StoreError> {
        self.with_state(|s, env| s.store_jobs_and_triggers(env, entries, replace))
    }

    fn remove_job(&self, key: &JobKey) -> bool {
        self.with_state(|s, _| s.remove_job(key))
    }

    fn remove_jobs(&self, keys: &[JobKey]) -> bool {
        self.with_state(|s, _| {
            keys.iter()
                .fold(true, |all_found, key| s.remove_job(key) && all_found)
        })
    }

    fn remove_trigger(&self, key: &TriggerKey) -> bool {
        self.with_state(|s, _| s.remove_trigger(key, true))
    }

    fn remove_triggers(&self, keys: &[TriggerKey]) -> bool {
        self.with_state(|s, _| {
            keys.iter()
                .fold(true, |all_found, key| s.remove_trigger(key, true) && all_found)
        })
    }

    fn replace_trigger(&self, key: &TriggerKey, trigger: Trigger) -> Result<bool, StoreError> {
        self.with_state(|s, env| s.replace_trigger(env, key, trigger))
    }

    fn retrieve_job(&self, key: &JobKey) -> Option<JobDetail> {
        self.state.lock().jobs.get(key).cloned()
    }

    fn retrieve_trigger(&self, key: &TriggerKey) -> Option<Trigger> {
        self.state
            .lock()
            .triggers
            .get(key)
            .map(|e| e.trigger.clone())
    }

    fn check_job_exists(&self, key: &JobKey) -> bool {
        self.state.lock().jobs.contains_key(key)
    }

    fn check_trigger_exists(&self, key: &TriggerKey) -> bool {
        self.state.lock().triggers.contains_key(key)
    }

    fn store_calendar(
        &self,
        name: &str,
        calendar: Calendar,
        replace_existing: bool,
        update_triggers: bool,
    ) -> Result<(), StoreError> {
        self.with_state(|s, env| {
            s.store_calendar(env, name, calendar, replace_existing, update_triggers)
        })
    }

    fn remove_calendar(&self, name: &str) -> Result<bool, StoreError> {
        self.with_state(|s, _| s.remove_calendar(name))
    }

    fn retrieve_calendar(&self, name: &str) -> Option<Calendar> {
        self.state.lock().calendars.get(name).cloned()
    }

    fn number_of_jobs(&self) -> usize {
        self.state.lock().jobs.len()
    }

    fn number_of_triggers(&self) -> usize {
        self.state.lock().triggers.len()
    }

    fn number_of_calendars(&self) -> usize {
        self.state.lock().calendars.len()
    }

    fn job_keys(&self, matcher: &Matcher) -> Vec<JobKey> {
        self.state.lock().job_keys(matcher)
    }

    fn trigger_keys(&self, matcher: &Matcher) -> Vec<TriggerKey> {
        self.state.lock().trigger_keys(matcher)
    }

    fn job_group_names(&self) -> Vec<String> {
        self.state.lock().job_group_names()
    }

    fn trigger_group_names(&self) -> Vec<String> {
        self.state.lock().trigger_group_names()
    }

    fn calendar_names(&self) -> Vec<String> {
        self.state.lock().calendars.keys().cloned().collect()
    }

    fn triggers_for_job(&self, key: &JobKey) -> Vec<Trigger> {
        let state = self.state.lock();
        state
            .trigger_keys_of_job(key)
            .iter()
            .filter_map(|k| state.triggers.get(k))
            .map(|e| e.trigger.clone())
            .collect()
    }

    fn trigger_state(&self, key: &TriggerKey) -> TriggerState {
        self.state
            .lock()
            .triggers
            .get(key)
            .map_or(TriggerState::None, |e| e.state.public())
    }

    fn reset_trigger_from_error_state(&self, key: &TriggerKey) -> bool {
        self.with_state(|s, _| s.reset_trigger_from_error_state(key))
    }

    fn pause_trigger(&self, key: &TriggerKey) {
        self.with_state(|s, _| s.pause_trigger(key))
    }

    fn pause_triggers(&self, matcher: &Matcher) -> Vec<String> {
        self.with_state(|s, _| s.pause_triggers(matcher))
    }

    fn pause_job(&self, key: &JobKey) {
        self.with_state(|s, _| s.pause_job(key))
    }

    fn pause_jobs(&self, matcher: &Matcher) -> Vec<String> {
        self.with_state(|s, _| s.pause_jobs(matcher))
    }

    fn resume_trigger(&self, key: &TriggerKey) {
        self.with_state(|s, env| s.resume_trigger(env, key))
    }

    fn resume_triggers(&self, matcher: &Matcher) -> Vec<String> {
        self.with_state(|s, env| s.resume_triggers(env, matcher))
    }

    fn resume_job(&self, key: &JobKey) {
        self.with_state(|s, env| s.resume_job(env, key))
    }

    fn resume_jobs(&self, matcher: &Matcher) -> Vec<String> {
        self.with_state(|s, env| s.resume_jobs(env, matcher))
    }

    fn paused_trigger_groups(&self) -> BTreeSet<String> {
        self.state.lock().paused_trigger_groups.clone()
    }

    fn is_job_group_paused(&self, group: &str) -> bool {
        self.state.lock().paused_job_groups.contains(group)
    }

    fn is_trigger_group_paused(&self, group: &str) -> bool {
        self.state.lock().paused_trigger_groups.contains(group)
    }

    fn pause_all(&self) {
        self.with_state(|s, _| s.pause_all())
    }

    fn resume_all(&self) {
        self.with_state(|s, env| s.resume_all(env))
    }

    fn clear_all_scheduling_data(&self) {
        self.with_state(|s, _| {
            let next_fire_instance_id = s.next_fire_instance_id;
            *s = StoreState {
                next_fire_instance_id,
                ..StoreState::default()
            };
            tracing::info!("all scheduling data cleared");
        })
    }

    fn acquire_next_triggers(
        &self,
        no_later_than: DateTime<Utc>,
        max_count: usize,
        time_window: StdDuration,
    ) -> Vec<Trigger> {
        self.with_state(|s, env| s.acquire_next_triggers(env, no_later_than, max_count, time_window))
    }

    fn release_acquired_trigger(&self, trigger: &Trigger) {
        self.with_state(|s, _| s.release_acquired_trigger(trigger))
    }

    fn trigger_fired(&self, trigger: &Trigger) -> TriggerFiredResult {
        self.with_state(|s, env| s.trigger_fired(env, trigger))
    }

    fn triggers_fired(&self, triggers: &[Trigger]) -> Vec<TriggerFiredResult> {
        self.with_state(|s, env| triggers.iter().map(|t| s.trigger_fired(env, t)).collect())
    }

    fn triggered_job_complete(
        &self,
        trigger: &Trigger,
        job: &JobDetail,
        instruction: CompletedExecutionInstruction,
    ) {
        self.with_state(|s, env| s.triggered_job_complete(env, trigger, job, instruction))
    }
}

#[cfg(test)]
#[path = "ram_tests.rs"]
mod tests;
