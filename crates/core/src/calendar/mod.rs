// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Calendars: named exclusion predicates over instants
//!
//! A [`Calendar`] is one level: an [`ExclusionRule`] evaluated in the
//! calendar's time zone, plus the name of an optional base calendar. The
//! store keeps calendars in a registry keyed by name; a [`CalendarChain`]
//! resolves the base links and answers inclusion queries for the whole chain.

mod chain;
mod rule;

pub use chain::{CalendarChain, MAX_CHAIN_ITERATIONS};
pub use rule::{ExclusionRule, MonthDay};

use crate::zone;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from calendar construction and search
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("invalid calendar rule: {0}")]
    InvalidRule(String),
    #[error("unknown time zone: {0}")]
    UnknownTimeZone(String),
    #[error("base calendar not found: {0}")]
    MissingBase(String),
    #[error("calendar chain has a cycle through {0}")]
    Cycle(String),
    #[error("no included time at or after {from}")]
    NoIncludedTime { from: DateTime<Utc> },
}

/// One calendar level
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    #[serde(default)]
    pub description: Option<String>,
    pub time_zone: Tz,
    /// Name of the base calendar in the same registry
    #[serde(default)]
    pub base: Option<String>,
    pub rule: ExclusionRule,
}

impl Calendar {
    /// A calendar in UTC with no base
    pub fn new(rule: ExclusionRule) -> Self {
        Self {
            description: None,
            time_zone: Tz::UTC,
            base: None,
            rule,
        }
    }

    pub fn with_time_zone(mut self, time_zone: Tz) -> Self {
        self.time_zone = time_zone;
        self
    }

    /// Set the time zone by IANA name
    pub fn with_time_zone_name(self, name: &str) -> Result<Self, CalendarError> {
        let tz: Tz = name
            .parse()
            .map_err(|_| CalendarError::UnknownTimeZone(name.to_string()))?;
        Ok(self.with_time_zone(tz))
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether this level alone includes `instant`, ignoring the base
    pub fn includes_at_level(&self, instant: DateTime<Utc>) -> bool {
        !self
            .rule
            .excludes(zone::to_local(&self.time_zone, instant))
    }

    /// Earliest instant `>= instant` this level alone includes
    pub(crate) fn next_included_at_level(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = zone::to_local(&self.time_zone, instant);
        let next = self.rule.next_included(local)?;
        if next == local {
            return Some(instant);
        }
        Some(zone::resolve_local_not_before(
            &self.time_zone,
            next,
            instant,
        ))
    }
}

#[cfg(test)]
#[path = "calendar_tests.rs"]
mod tests;
