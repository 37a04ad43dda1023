// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler facade and firing loop
//!
//! The loop reserves due triggers from the store, sleeps until the first
//! one is due and hands each firing to a worker task. Worker slots are
//! semaphore permits, so the loop never reserves more triggers than it can
//! run. A scheduling change for an earlier time releases the current batch
//! and starts over.

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::events::{ChannelSignaler, SchedulerEvent};
use crate::job::{completion_instruction, JobExecutionContext};
use crate::registry::JobRegistry;
use cadence_core::{
    Calendar, Clock, CompletedExecutionInstruction, JobDataMap, JobDetail, JobKey, JobStore, Key,
    Matcher, RamJobStore, Schedule, StoreError, SystemClock, Trigger, TriggerFiredBundle,
    TriggerFiredResult, TriggerKey, TriggerState,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Group of the one-shot triggers created by [`Scheduler::trigger_job`]
pub const MANUAL_TRIGGER_GROUP: &str = "MANUAL_TRIGGER";

/// An earlier scheduling change closer than this does not preempt a batch
const PREEMPT_MIN_LEAD: Duration = Duration::from_millis(50);

/// Lifecycle of a scheduler
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// Created or paused; nothing fires
    Standby,
    Running,
    /// Terminal
    Shutdown,
}

struct Shared<C: Clock> {
    config: SchedulerConfig,
    store: Arc<RamJobStore<C>>,
    registry: JobRegistry,
    signaler: Arc<ChannelSignaler>,
    workers: Arc<Semaphore>,
    state: watch::Sender<RunState>,
}

/// Runs jobs from a [`RamJobStore`] on the tokio runtime
pub struct Scheduler<C: Clock = SystemClock> {
    shared: Arc<Shared<C>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler<SystemClock> {
    /// Create a scheduler with its own store
    pub fn new(config: SchedulerConfig, registry: JobRegistry) -> Result<Self, SchedulerError> {
        let store = RamJobStore::with_clock(SystemClock, config.store.clone());
        Self::with_store(config, registry, Arc::new(store))
    }
}

impl<C: Clock> Scheduler<C> {
    /// Create a scheduler over an existing store, e.g. one restored from a
    /// snapshot
    pub fn with_store(
        config: SchedulerConfig,
        registry: JobRegistry,
        store: Arc<RamJobStore<C>>,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;
        let signaler = Arc::new(ChannelSignaler::new());
        store.initialize(signaler.clone());
        let (state, _) = watch::channel(RunState::Standby);
        let workers = Arc::new(Semaphore::new(config.thread_count));
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                store,
                registry,
                signaler,
                workers,
                state,
            }),
            task: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    pub fn store(&self) -> &Arc<RamJobStore<C>> {
        &self.shared.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.shared.signaler.subscribe()
    }

    pub fn run_state(&self) -> RunState {
        *self.shared.state.borrow()
    }

    pub fn is_started(&self) -> bool {
        self.run_state() == RunState::Running
    }

    pub fn is_shutdown(&self) -> bool {
        self.run_state() == RunState::Shutdown
    }

    // --- lifecycle ---

    /// Start firing triggers; must be called inside a tokio runtime
    pub fn start(&self) -> Result<(), SchedulerError> {
        self.ensure_open()?;
        {
            let mut task = self.task.lock();
            if task.is_none() {
                let runtime =
                    tokio::runtime::Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
                let receiver = self.shared.state.subscribe();
                *task = Some(runtime.spawn(run_loop(self.shared.clone(), receiver)));
            }
        }
        self.shared.state.send_replace(RunState::Running);
        self.shared.signaler.publish(SchedulerEvent::Started);
        tracing::info!(
            instance = %self.shared.config.instance_name,
            threads = self.shared.config.thread_count,
            "scheduler started"
        );
        Ok(())
    }

    /// Stop firing triggers; running jobs continue
    pub fn standby(&self) {
        if self.is_shutdown() {
            return;
        }
        self.shared.state.send_replace(RunState::Standby);
        self.shared.signaler.publish(SchedulerEvent::Standby);
        tracing::info!(instance = %self.shared.config.instance_name, "scheduler in standby");
    }

    /// Stop for good, optionally waiting for running jobs
    pub async fn shutdown(&self, wait_for_jobs: bool) {
        if self.shared.state.send_replace(RunState::Shutdown) == RunState::Shutdown {
            return;
        }
        self.shared.signaler.wake();

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "firing loop failed");
            }
        }
        if wait_for_jobs {
            let all = u32::try_from(self.shared.config.thread_count).unwrap_or(u32::MAX);
            // The semaphore is never closed
            if let Ok(permits) = self.shared.workers.acquire_many(all).await {
                drop(permits);
            }
        }

        self.shared.store.shutdown();
        self.shared.signaler.publish(SchedulerEvent::Shutdown);
        tracing::info!(instance = %self.shared.config.instance_name, "scheduler shut down");
    }

    fn ensure_open(&self) -> Result<(), SchedulerError> {
        if self.is_shutdown() {
            return Err(SchedulerError::Shutdown);
        }
        Ok(())
    }

    fn ensure_known(&self, job: &JobDetail) -> Result<(), SchedulerError> {
        if !self.shared.registry.contains(&job.job_type) {
            return Err(SchedulerError::UnknownJobType(job.job_type.clone()));
        }
        Ok(())
    }

    fn next_fire_time(&self, key: &TriggerKey) -> Option<DateTime<Utc>> {
        self.shared
            .store
            .retrieve_trigger(key)
            .and_then(|t| t.next_fire_time)
    }

    // --- jobs and triggers ---

    /// Store a job with its first trigger; returns the first fire time
    pub fn schedule_job(
        &self,
        job: JobDetail,
        trigger: Trigger,
    ) -> Result<Option<DateTime<Utc>>, SchedulerError> {
        self.ensure_open()?;
        self.ensure_known(&job)?;
        let key = trigger.key.clone();
        self.shared.store.store_job_and_trigger(job, trigger)?;
        Ok(self.next_fire_time(&key))
    }

    /// Add a trigger for a stored job; returns the first fire time
    pub fn schedule_trigger(
        &self,
        trigger: Trigger,
    ) -> Result<Option<DateTime<Utc>>, SchedulerError> {
        self.ensure_open()?;
        let key = trigger.key.clone();
        self.shared.store.store_trigger(trigger, false)?;
        Ok(self.next_fire_time(&key))
    }

    /// Store a job without triggers; it must be durable
    pub fn add_job(&self, job: JobDetail, replace: bool) -> Result<(), SchedulerError> {
        self.ensure_open()?;
        self.ensure_known(&job)?;
        if !job.durable && self.shared.store.triggers_for_job(&job.key).is_empty() {
            return Err(SchedulerError::JobNotDurable(job.key));
        }
        self.shared.store.store_job(job, replace)?;
        Ok(())
    }

    pub fn delete_job(&self, key: &JobKey) -> bool {
        self.shared.store.remove_job(key)
    }

    pub fn unschedule_job(&self, key: &TriggerKey) -> bool {
        self.shared.store.remove_trigger(key)
    }

    /// Replace a trigger; `None` when no trigger had that key
    pub fn reschedule_job(
        &self,
        key: &TriggerKey,
        trigger: Trigger,
    ) -> Result<Option<DateTime<Utc>>, SchedulerError> {
        self.ensure_open()?;
        let new_key = trigger.key.clone();
        if !self.shared.store.replace_trigger(key, trigger)? {
            return Ok(None);
        }
        Ok(self.next_fire_time(&new_key))
    }

    /// Fire a stored job now with extra data
    pub fn trigger_job(&self, key: &JobKey, data: JobDataMap) -> Result<TriggerKey, SchedulerError> {
        self.ensure_open()?;
        if !self.shared.store.check_job_exists(key) {
            return Err(StoreError::JobNotFound(key.clone()).into());
        }
        let name = format!("MT_{}", uuid::Uuid::new_v4().simple());
        let trigger_key = Key::new(name, MANUAL_TRIGGER_GROUP)?;
        let now = self.shared.store.clock().now();
        let mut trigger = Trigger::new(trigger_key.clone(), key.clone(), Schedule::once(), now);
        trigger.job_data = data;
        self.shared.store.store_trigger(trigger, false)?;
        tracing::debug!(job = %key, trigger = %trigger_key, "job triggered manually");
        Ok(trigger_key)
    }

    pub fn trigger_state(&self, key: &TriggerKey) -> TriggerState {
        self.shared.store.trigger_state(key)
    }

    // --- calendars ---

    pub fn add_calendar(
        &self,
        name: &str,
        calendar: Calendar,
        replace: bool,
        update_triggers: bool,
    ) -> Result<(), SchedulerError> {
        self.ensure_open()?;
        self.shared
            .store
            .store_calendar(name, calendar, replace, update_triggers)?;
        Ok(())
    }

    pub fn delete_calendar(&self, name: &str) -> Result<bool, SchedulerError> {
        Ok(self.shared.store.remove_calendar(name)?)
    }

    // --- pause and resume ---

    pub fn pause_trigger(&self, key: &TriggerKey) {
        self.shared.store.pause_trigger(key);
    }

    pub fn pause_triggers(&self, matcher: &Matcher) -> Vec<String> {
        self.shared.store.pause_triggers(matcher)
    }

    pub fn pause_job(&self, key: &JobKey) {
        self.shared.store.pause_job(key);
    }

    pub fn pause_jobs(&self, matcher: &Matcher) -> Vec<String> {
        self.shared.store.pause_jobs(matcher)
    }

    pub fn resume_trigger(&self, key: &TriggerKey) {
        self.shared.store.resume_trigger(key);
    }

    pub fn resume_triggers(&self, matcher: &Matcher) -> Vec<String> {
        self.shared.store.resume_triggers(matcher)
    }

    pub fn resume_job(&self, key: &JobKey) {
        self.shared.store.resume_job(key);
    }

    pub fn resume_jobs(&self, matcher: &Matcher) -> Vec<String> {
        self.shared.store.resume_jobs(matcher)
    }

    pub fn pause_all(&self) {
        self.shared.store.pause_all();
    }

    pub fn resume_all(&self) {
        self.shared.store.resume_all();
    }
}

impl<C: Clock> Drop for Scheduler<C> {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

// --- firing loop ---

async fn run_loop<C: Clock>(shared: Arc<Shared<C>>, mut state: watch::Receiver<RunState>) {
    tracing::debug!(instance = %shared.config.instance_name, "firing loop started");
    loop {
        let current = *state.borrow_and_update();
        match current {
            RunState::Shutdown => break,
            RunState::Standby => {
                if state.changed().await.is_err() {
                    break;
                }
                continue;
            }
            RunState::Running => {}
        }

        // Hold a worker slot for every trigger we reserve
        let first = tokio::select! {
            permit = shared.workers.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        };
        let mut permits = vec![first];
        while permits.len() < shared.config.batch_size {
            match shared.workers.clone().try_acquire_owned() {
                Ok(permit) => permits.push(permit),
                Err(_) => break,
            }
        }

        // Changes before this point are visible to the acquisition
        shared.signaler.take_change();
        let now = shared.store.clock().now();
        let idle_wait = chrono::Duration::from_std(shared.config.idle_wait_time)
            .unwrap_or(chrono::Duration::MAX);
        let no_later_than = now.checked_add_signed(idle_wait).unwrap_or(now);
        let triggers = shared.store.acquire_next_triggers(
            no_later_than,
            permits.len(),
            shared.config.batch_time_window,
        );

        if triggers.is_empty() {
            drop(permits);
            tokio::select! {
                _ = shared.signaler.changed() => {}
                _ = tokio::time::sleep(shared.config.idle_wait_time) => {}
                changed = state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
            continue;
        }

        let due = wait_until_due(&shared, &mut state, &triggers).await;
        if !due || *state.borrow() != RunState::Running {
            tracing::debug!(count = triggers.len(), "releasing reserved triggers");
            for trigger in &triggers {
                shared.store.release_acquired_trigger(trigger);
            }
            continue;
        }

        let results = shared.store.triggers_fired(&triggers);
        for ((trigger, result), permit) in triggers.iter().zip(results).zip(permits) {
            match result {
                TriggerFiredResult::Fired(bundle) => {
                    tokio::spawn(run_job(shared.clone(), *bundle, permit));
                }
                TriggerFiredResult::Blocked => {
                    tracing::debug!(trigger = %trigger.key, "job already running; firing deferred");
                    shared.signaler.publish(SchedulerEvent::JobBlocked {
                        trigger: trigger.key.clone(),
                    });
                }
                TriggerFiredResult::NotAcquired => {
                    tracing::debug!(trigger = %trigger.key, "reservation lost before firing");
                }
            }
        }
    }
    tracing::debug!(instance = %shared.config.instance_name, "firing loop stopped");
}

/// Sleep until the batch is due; false when it should be released instead
async fn wait_until_due<C: Clock>(
    shared: &Shared<C>,
    state: &mut watch::Receiver<RunState>,
    triggers: &[Trigger],
) -> bool {
    let Some(due) = triggers.iter().filter_map(|t| t.next_fire_time).min() else {
        return true;
    };
    loop {
        let now = shared.store.clock().now();
        let remaining = match (due - now).to_std() {
            Ok(remaining) if !remaining.is_zero() => remaining,
            _ => return true,
        };
        tokio::select! {
            _ = tokio::time::sleep(remaining) => return true,
            _ = shared.signaler.changed() => {
                if let Some(candidate) = shared.signaler.take_change() {
                    let earlier = candidate.map_or(true, |t| t < due);
                    if earlier && remaining > PREEMPT_MIN_LEAD {
                        return false;
                    }
                }
            }
            changed = state.changed() => {
                if changed.is_err() || *state.borrow() != RunState::Running {
                    return false;
                }
            }
        }
    }
}

async fn run_job<C: Clock>(
    shared: Arc<Shared<C>>,
    bundle: TriggerFiredBundle,
    _permit: OwnedSemaphorePermit,
) {
    let span = tracing::info_span!(
        "job.execute",
        job = %bundle.job.key,
        trigger = %bundle.trigger.key
    );
    execute(&shared, bundle).instrument(span).await;
}

async fn execute<C: Clock>(shared: &Shared<C>, bundle: TriggerFiredBundle) {
    let job_key = bundle.job.key.clone();
    let trigger_key = bundle.trigger.key.clone();

    let Some(job) = shared.registry.create(&bundle.job.job_type) else {
        tracing::error!(job_type = %bundle.job.job_type, "no job registered for type");
        let instruction = CompletedExecutionInstruction::SetAllJobTriggersError;
        shared
            .store
            .triggered_job_complete(&bundle.trigger, &bundle.job, instruction);
        shared.signaler.publish(SchedulerEvent::JobCompleted {
            job: job_key,
            trigger: trigger_key,
            instruction,
            error: Some(SchedulerError::UnknownJobType(bundle.job.job_type.clone()).to_string()),
            elapsed: Duration::ZERO,
        });
        return;
    };

    let mut ctx = JobExecutionContext::new(&bundle);
    loop {
        shared.signaler.publish(SchedulerEvent::JobStarted {
            job: job_key.clone(),
            trigger: trigger_key.clone(),
            fire_time: ctx.fire_time,
            scheduled_fire_time: ctx.scheduled_fire_time,
            refire_count: ctx.refire_count,
        });
        tracing::info!(refire_count = ctx.refire_count, "starting");

        let start = Instant::now();
        let result = job.execute(&mut ctx).await;
        let elapsed = start.elapsed();

        let error = match &result {
            Ok(()) => {
                tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "job completed");
                None
            }
            Err(e) => {
                tracing::error!(elapsed_ms = elapsed.as_millis() as u64, error = %e, "job failed");
                Some(e.to_string())
            }
        };

        let mut instruction = completion_instruction(&result, &bundle.trigger);
        if instruction == CompletedExecutionInstruction::ReExecuteJob {
            let shutting_down = *shared.state.borrow() == RunState::Shutdown;
            if !shutting_down {
                shared.signaler.publish(SchedulerEvent::JobCompleted {
                    job: job_key.clone(),
                    trigger: trigger_key.clone(),
                    instruction,
                    error,
                    elapsed,
                });
                ctx.refire_count += 1;
                continue;
            }
            instruction = completion_instruction(&Ok(()), &bundle.trigger);
        }

        shared
            .store
            .triggered_job_complete(&bundle.trigger, &ctx.job_detail, instruction);
        shared.signaler.publish(SchedulerEvent::JobCompleted {
            job: job_key,
            trigger: trigger_key,
            instruction,
            error,
            elapsed,
        });
        break;
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
