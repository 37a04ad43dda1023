// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Cadence scheduler runtime
//!
//! Drives a [`cadence_core::RamJobStore`] on tokio: a firing loop reserves
//! due triggers and a bounded pool of worker tasks runs the jobs.

mod config;
mod error;
mod events;
mod job;
mod registry;
mod scheduler;

pub use config::{ConfigError, SchedulerConfig};
pub use error::SchedulerError;
pub use events::{ChannelSignaler, SchedulerEvent, EVENT_CHANNEL_CAPACITY};
pub use job::{completion_instruction, Job, JobError, JobExecutionContext};
pub use registry::JobRegistry;
pub use scheduler::{RunState, Scheduler, MANUAL_TRIGGER_GROUP};
