// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store errors

use crate::calendar::CalendarError;
use crate::key::{JobKey, TriggerKey};
use crate::store::SnapshotError;
use crate::trigger::TriggerError;
use thiserror::Error;

/// Kind of object named in [`StoreError::ObjectAlreadyExists`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Job,
    Trigger,
    Calendar,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectKind::Job => write!(f, "job"),
            ObjectKind::Trigger => write!(f, "trigger"),
            ObjectKind::Calendar => write!(f, "calendar"),
        }
    }
}

/// Errors from job store operations
///
/// Every error leaves the store unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} already exists: {key}")]
    ObjectAlreadyExists { kind: ObjectKind, key: String },
    #[error("job not found: {0}")]
    JobNotFound(JobKey),
    #[error("trigger not found: {0}")]
    TriggerNotFound(TriggerKey),
    #[error("calendar not found: {0}")]
    CalendarNotFound(String),
    #[error("calendar {name} is in use by {user}")]
    CalendarInUse { name: String, user: String },
    #[error("calendar chain has a cycle through {0}")]
    CyclicCalendarChain(String),
    #[error("trigger {0} will never fire")]
    TriggerWillNeverFire(TriggerKey),
    #[error("invalid trigger {key}: {source}")]
    InvalidTrigger {
        key: TriggerKey,
        #[source]
        source: TriggerError,
    },
    #[error("trigger {trigger} belongs to job {actual}, not {expected}")]
    TriggerJobMismatch {
        trigger: TriggerKey,
        expected: JobKey,
        actual: JobKey,
    },
    #[error("calendar error: {0}")]
    Calendar(#[from] CalendarError),
    #[error("persistence error: {0}")]
    Persistence(#[from] SnapshotError),
}
