// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron-expression schedules

use super::TriggerError;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Fires on the instants a cron expression selects, evaluated in `time_zone`
///
/// Five-field expressions (minute precision) are accepted and get a leading
/// `0` seconds field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CronSchedule {
    pub expression: String,
    pub time_zone: Tz,
}

impl CronSchedule {
    pub fn new(expression: impl Into<String>, time_zone: Tz) -> Result<Self, TriggerError> {
        let schedule = Self {
            expression: expression.into(),
            time_zone,
        };
        schedule.parse()?;
        Ok(schedule)
    }

    pub(super) fn parse(&self) -> Result<::cron::Schedule, TriggerError> {
        let expression = normalize_expression(&self.expression);
        ::cron::Schedule::from_str(&expression).map_err(|e| TriggerError::InvalidCron {
            expression: self.expression.clone(),
            message: e.to_string(),
        })
    }

    pub(super) fn fire_time_after(
        &self,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        after: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let schedule = match self.parse() {
            Ok(schedule) => schedule,
            Err(e) => {
                tracing::warn!(error = %e, "cron expression no longer parses");
                return None;
            }
        };

        let after = if start > after {
            start - Duration::seconds(1)
        } else {
            after
        };
        if end.is_some_and(|end| after >= end) {
            return None;
        }

        let next = schedule
            .after(&after.with_timezone(&self.time_zone))
            .next()?
            .with_timezone(&Utc);
        if end.is_some_and(|end| next > end) {
            return None;
        }
        Some(next)
    }
}

fn normalize_expression(expression: &str) -> String {
    let trimmed = expression.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}
