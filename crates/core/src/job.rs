// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job definitions

use crate::key::JobKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered job data passed to each execution
pub type JobDataMap = BTreeMap<String, serde_json::Value>;

/// A stored job definition
///
/// `job_type` names the implementation the firing side resolves; the store
/// treats it as opaque.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobDetail {
    pub key: JobKey,
    pub job_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub job_data: JobDataMap,
    /// Kept when no trigger references it
    #[serde(default)]
    pub durable: bool,
    #[serde(default)]
    pub concurrent_execution_disallowed: bool,
    #[serde(default)]
    pub persist_job_data_after_execution: bool,
    /// Re-run after a crash that interrupted an execution
    #[serde(default)]
    pub requests_recovery: bool,
}

impl JobDetail {
    pub fn new(key: JobKey, job_type: impl Into<String>) -> Self {
        Self {
            key,
            job_type: job_type.into(),
            description: None,
            job_data: JobDataMap::new(),
            durable: false,
            concurrent_execution_disallowed: false,
            persist_job_data_after_execution: false,
            requests_recovery: false,
        }
    }

    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    pub fn disallow_concurrent_execution(mut self) -> Self {
        self.concurrent_execution_disallowed = true;
        self
    }

    pub fn persist_job_data_after_execution(mut self) -> Self {
        self.persist_job_data_after_execution = true;
        self
    }

    pub fn requests_recovery(mut self) -> Self {
        self.requests_recovery = true;
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
}
