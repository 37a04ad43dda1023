// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the scheduler

use crate::config::ConfigError;
use cadence_core::{JobKey, KeyError, StoreError};
use thiserror::Error;

/// Errors that can occur in the scheduler
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid key: {0}")]
    Key(#[from] KeyError),
    #[error("no job registered for type: {0}")]
    UnknownJobType(String),
    #[error("job {0} has no triggers and is not durable")]
    JobNotDurable(JobKey),
    #[error("scheduler has been shut down")]
    Shutdown,
    #[error("scheduler needs a tokio runtime")]
    NoRuntime,
}
