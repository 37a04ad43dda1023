// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job type registry
//!
//! Maps the `job_type` string stored on a [`JobDetail`] to a factory that
//! builds the job. A fresh instance is built for every execution.
//!
//! [`JobDetail`]: cadence_core::JobDetail

use crate::job::Job;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type JobFactory = Arc<dyn Fn() -> Box<dyn Job> + Send + Sync>;

#[derive(Clone, Default)]
pub struct JobRegistry {
    factories: HashMap<String, JobFactory>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `job_type`, replacing any previous one
    pub fn register<F, J>(&mut self, job_type: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> J + Send + Sync + 'static,
        J: Job + 'static,
    {
        let build: JobFactory = Arc::new(move || Box::new(factory()) as Box<dyn Job>);
        self.factories.insert(job_type.into(), build);
        self
    }

    /// Builder form of [`JobRegistry::register`]
    pub fn with<F, J>(mut self, job_type: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> J + Send + Sync + 'static,
        J: Job + 'static,
    {
        self.register(job_type, factory);
        self
    }

    pub fn contains(&self, job_type: &str) -> bool {
        self.factories.contains_key(job_type)
    }

    pub fn create(&self, job_type: &str) -> Option<Box<dyn Job>> {
        self.factories.get(job_type).map(|factory| factory())
    }

    pub fn job_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRegistry")
            .field("job_types", &self.job_types())
            .finish()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
