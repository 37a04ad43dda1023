// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity for jobs, triggers, and calendars
//!
//! A [`Key`] is an immutable `(name, group)` pair. The group falls back to
//! [`DEFAULT_GROUP`] when none is given. Keys order by group first, then name.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Group assigned to keys created without an explicit group
pub const DEFAULT_GROUP: &str = "DEFAULT";

/// Rejected key construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("key name cannot be empty")]
    EmptyName,
}

/// Immutable `(name, group)` identity
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawKey")]
pub struct Key {
    name: String,
    group: String,
}

/// Key of a stored job
pub type JobKey = Key;

/// Key of a stored trigger
pub type TriggerKey = Key;

#[derive(Deserialize)]
struct RawKey {
    name: String,
    #[serde(default)]
    group: Option<String>,
}

impl TryFrom<RawKey> for Key {
    type Error = KeyError;

    fn try_from(raw: RawKey) -> Result<Self, Self::Error> {
        Key::new(raw.name, raw.group.unwrap_or_default())
    }
}

impl Key {
    /// Create a key; an empty group becomes [`DEFAULT_GROUP`]
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Result<Self, KeyError> {
        let name = name.into();
        if name.is_empty() {
            return Err(KeyError::EmptyName);
        }
        let group = group.into();
        let group = if group.is_empty() {
            DEFAULT_GROUP.to_string()
        } else {
            group
        };
        Ok(Self { name, group })
    }

    /// Create a key in the default group
    pub fn in_default_group(name: impl Into<String>) -> Result<Self, KeyError> {
        Self::new(name, DEFAULT_GROUP)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> &str {
        &self.group
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.group
            .cmp(&other.group)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.name)
    }
}

/// Parses `group.name`; text without a dot is a name in the default group
impl FromStr for Key {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((group, name)) => Key::new(name, group),
            None => Key::in_default_group(s),
        }
    }
}

#[cfg(test)]
#[path = "key_tests.rs"]
mod tests;
