// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler configuration
//!
//! Loaded from TOML. Every field has a default, so an empty document is a
//! valid configuration. Durations use humantime syntax (`"30s"`, `"250ms"`).

use cadence_core::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Firing loop and worker pool tuning
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub instance_name: String,
    /// Maximum number of jobs executing at once
    pub thread_count: usize,
    /// How far ahead the loop looks for due triggers when idle
    #[serde(with = "humantime_serde")]
    pub idle_wait_time: Duration,
    /// Maximum triggers acquired per pass
    pub batch_size: usize,
    /// Extra slack after the first trigger's fire time for batching
    #[serde(with = "humantime_serde")]
    pub batch_time_window: Duration,
    pub store: StoreConfig,
}

impl SchedulerConfig {
    pub const DEFAULT_INSTANCE_NAME: &'static str = "cadence";
    pub const DEFAULT_THREAD_COUNT: usize = 10;
    pub const DEFAULT_IDLE_WAIT_TIME: Duration = Duration::from_secs(30);

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SchedulerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), instance = %config.instance_name, "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_count == 0 {
            return Err(ConfigError::Invalid(
                "thread_count must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.idle_wait_time.is_zero() {
            return Err(ConfigError::Invalid(
                "idle_wait_time must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub fn with_batch(mut self, batch_size: usize, batch_time_window: Duration) -> Self {
        self.batch_size = batch_size;
        self.batch_time_window = batch_time_window;
        self
    }

    pub fn with_idle_wait_time(mut self, idle_wait_time: Duration) -> Self {
        self.idle_wait_time = idle_wait_time;
        self
    }

    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            instance_name: Self::DEFAULT_INSTANCE_NAME.to_string(),
            thread_count: Self::DEFAULT_THREAD_COUNT,
            idle_wait_time: Self::DEFAULT_IDLE_WAIT_TIME,
            batch_size: 1,
            batch_time_window: Duration::ZERO,
            store: StoreConfig::default(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
