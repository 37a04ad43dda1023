// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning for [`RamJobStore`](crate::store::RamJobStore)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How late a fire time may be before it counts as misfired
    #[serde(with = "humantime_serde")]
    pub misfire_threshold: Duration,
}

impl StoreConfig {
    pub const DEFAULT_MISFIRE_THRESHOLD: Duration = Duration::from_secs(5);

    pub fn with_misfire_threshold(mut self, threshold: Duration) -> Self {
        self.misfire_threshold = threshold;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            misfire_threshold: Self::DEFAULT_MISFIRE_THRESHOLD,
        }
    }
}
