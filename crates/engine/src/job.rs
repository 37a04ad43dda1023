// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job implementations and their execution context

use async_trait::async_trait;
use cadence_core::{
    CompletedExecutionInstruction, JobDataMap, JobDetail, JobKey, Trigger, TriggerFiredBundle,
    TriggerKey,
};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Work run when a trigger fires
#[async_trait]
pub trait Job: Send + Sync {
    async fn execute(&self, ctx: &mut JobExecutionContext) -> Result<(), JobError>;
}

/// A failed execution and what to do about it
///
/// The flags are checked in order: refire, unschedule the firing trigger,
/// unschedule all of the job's triggers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct JobError {
    pub message: String,
    pub refire_immediately: bool,
    pub unschedule_firing_trigger: bool,
    pub unschedule_all_triggers: bool,
}

impl JobError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            refire_immediately: false,
            unschedule_firing_trigger: false,
            unschedule_all_triggers: false,
        }
    }

    /// Run the job again right away
    pub fn refire(mut self) -> Self {
        self.refire_immediately = true;
        self
    }

    pub fn unschedule_firing_trigger(mut self) -> Self {
        self.unschedule_firing_trigger = true;
        self
    }

    pub fn unschedule_all_triggers(mut self) -> Self {
        self.unschedule_all_triggers = true;
        self
    }
}

/// Map an execution outcome to what the store does with the trigger
pub fn completion_instruction(
    result: &Result<(), JobError>,
    trigger: &Trigger,
) -> CompletedExecutionInstruction {
    match result {
        Err(e) if e.refire_immediately => CompletedExecutionInstruction::ReExecuteJob,
        Err(e) if e.unschedule_firing_trigger => CompletedExecutionInstruction::SetTriggerComplete,
        Err(e) if e.unschedule_all_triggers => {
            CompletedExecutionInstruction::SetAllJobTriggersComplete
        }
        _ if !trigger.may_fire_again() => CompletedExecutionInstruction::DeleteTrigger,
        _ => CompletedExecutionInstruction::NoOp,
    }
}

/// What a running job sees
///
/// `merged_job_data` is the job's data overlaid with the trigger's. Changes
/// to `job_detail.job_data` are written back after execution when the job
/// persists its data.
#[derive(Debug, Clone)]
pub struct JobExecutionContext {
    pub job_detail: JobDetail,
    pub trigger: Trigger,
    pub merged_job_data: JobDataMap,
    pub fire_time: DateTime<Utc>,
    pub scheduled_fire_time: Option<DateTime<Utc>>,
    pub prev_fire_time: Option<DateTime<Utc>>,
    pub next_fire_time: Option<DateTime<Utc>>,
    pub is_recovering: bool,
    /// Times this firing has been re-run
    pub refire_count: u32,
    pub result: Option<serde_json::Value>,
}

impl JobExecutionContext {
    pub fn new(bundle: &TriggerFiredBundle) -> Self {
        let mut merged_job_data = bundle.job.job_data.clone();
        merged_job_data.extend(
            bundle
                .trigger
                .job_data
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        Self {
            job_detail: bundle.job.clone(),
            trigger: bundle.trigger.clone(),
            merged_job_data,
            fire_time: bundle.fire_time,
            scheduled_fire_time: bundle.scheduled_fire_time,
            prev_fire_time: bundle.prev_fire_time,
            next_fire_time: bundle.next_fire_time,
            is_recovering: bundle.is_recovering,
            refire_count: 0,
            result: None,
        }
    }

    pub fn job_key(&self) -> &JobKey {
        &self.job_detail.key
    }

    pub fn trigger_key(&self) -> &TriggerKey {
        &self.trigger.key
    }

    /// Job data that survives the execution when the job persists it
    pub fn job_data_mut(&mut self) -> &mut JobDataMap {
        &mut self.job_detail.job_data
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
