// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolved calendar chains

use super::{Calendar, CalendarError};
use chrono::{DateTime, Datelike, Utc};
use std::collections::{BTreeMap, HashSet};

/// Maximum level advances in one [`CalendarChain::next_included_time`] search
pub const MAX_CHAIN_ITERATIONS: usize = 1024;

/// Searches past this year give up
const MAX_YEAR: i32 = 2299;

/// A calendar and its resolved bases, outermost first
#[derive(Clone, Debug)]
pub struct CalendarChain<'a> {
    levels: Vec<&'a Calendar>,
}

impl<'a> CalendarChain<'a> {
    /// Resolve the chain rooted at a registered calendar
    pub fn resolve(
        name: &str,
        registry: &'a BTreeMap<String, Calendar>,
    ) -> Result<Self, CalendarError> {
        let root = registry
            .get(name)
            .ok_or_else(|| CalendarError::MissingBase(name.to_string()))?;
        Self::from_root(name, root, registry)
    }

    /// Resolve the chain for `root` as if it were registered under `name`
    ///
    /// Any link back to `name` is a cycle, even when the registry still holds
    /// an older calendar under that name.
    pub fn from_root(
        name: &str,
        root: &'a Calendar,
        registry: &'a BTreeMap<String, Calendar>,
    ) -> Result<Self, CalendarError> {
        let mut levels = vec![root];
        let mut seen: HashSet<&str> = HashSet::from([name]);
        let mut next = root.base.as_deref();

        while let Some(base_name) = next {
            if !seen.insert(base_name) {
                return Err(CalendarError::Cycle(base_name.to_string()));
            }
            let base = registry
                .get(base_name)
                .ok_or_else(|| CalendarError::MissingBase(base_name.to_string()))?;
            levels.push(base);
            next = base.base.as_deref();
        }

        Ok(Self { levels })
    }

    pub fn levels(&self) -> usize {
        self.levels.len()
    }

    /// Conjunction of every level
    pub fn is_time_included(&self, instant: DateTime<Utc>) -> bool {
        self.levels.iter().all(|level| level.includes_at_level(instant))
    }

    /// Earliest instant `>= from` that every level includes
    ///
    /// Each level jumps straight to its own next included time; the chain is
    /// re-checked from the top after any level moves the candidate.
    pub fn next_included_time(&self, from: DateTime<Utc>) -> Result<DateTime<Utc>, CalendarError> {
        let mut candidate = from;
        let mut advances = 0;

        'search: loop {
            for level in &self.levels {
                let next = level
                    .next_included_at_level(candidate)
                    .ok_or(CalendarError::NoIncludedTime { from })?;
                if next != candidate {
                    advances += 1;
                    if advances > MAX_CHAIN_ITERATIONS || next.year() > MAX_YEAR {
                        return Err(CalendarError::NoIncludedTime { from });
                    }
                    candidate = next;
                    continue 'search;
                }
            }
            return Ok(candidate);
        }
    }
}
