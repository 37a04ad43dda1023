// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Point-in-time store snapshots
//!
//! A snapshot captures everything needed to rebuild a [`RamJobStore`]
//! (jobs, triggers with their internal state, calendars, pause state and
//! fired-trigger records). It is written as pretty JSON to a temporary file
//! and renamed into place.
//!
//! [`RamJobStore`]: super::RamJobStore

use super::ram::{FiredTriggerRecord, StoredTrigger};
use crate::calendar::Calendar;
use crate::job::JobDetail;
use crate::key::JobKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot not found: {0}")]
    NotFound(String),
    #[error("invalid snapshot format: {0}")]
    InvalidFormat(String),
}

/// Serializable copy of the whole store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub taken_at: DateTime<Utc>,
    pub jobs: Vec<JobDetail>,
    pub triggers: Vec<StoredTrigger>,
    pub calendars: BTreeMap<String, Calendar>,
    #[serde(default)]
    pub paused_trigger_groups: BTreeSet<String>,
    #[serde(default)]
    pub paused_job_groups: BTreeSet<String>,
    #[serde(default)]
    pub blocked_jobs: BTreeSet<JobKey>,
    #[serde(default)]
    pub fired: Vec<FiredTriggerRecord>,
    #[serde(default)]
    pub next_fire_instance_id: u64,
}

impl StoreSnapshot {
    /// Current version of the snapshot format
    pub const CURRENT_VERSION: u32 = 1;

    /// Write the snapshot to `path`, replacing any previous file atomically
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = path.with_extension("tmp");
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        fs::rename(&tmp_path, path)?;
        tracing::debug!(
            path = %path.display(),
            jobs = self.jobs.len(),
            triggers = self.triggers.len(),
            "snapshot saved"
        );
        Ok(())
    }

    /// Read a snapshot written by [`StoreSnapshot::save`]
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        if !path.exists() {
            return Err(SnapshotError::NotFound(path.display().to_string()));
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let snapshot: StoreSnapshot = serde_json::from_reader(reader)?;

        if snapshot.version != Self::CURRENT_VERSION {
            return Err(SnapshotError::InvalidFormat(format!(
                "unsupported version: {} (expected {})",
                snapshot.version,
                Self::CURRENT_VERSION
            )));
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
