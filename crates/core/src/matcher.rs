// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key matchers for selecting jobs and triggers
//!
//! Provides composable predicates over [`Key`]s. Leaf matchers compare the
//! name or group with a [`StringOperator`]; `And`, `Or` and `Not` combine
//! them. Matchers are plain values: equality and hashing are structural.

use crate::key::Key;
use serde::{Deserialize, Serialize};
use std::ops;

/// Comparison applied by a leaf matcher
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringOperator {
    Equals,
    StartsWith,
    EndsWith,
    Contains,
    /// Always matches
    Anything,
}

impl StringOperator {
    /// Apply the operator to `value` with `compare_to` as the operand
    pub fn evaluate(self, value: &str, compare_to: &str) -> bool {
        match self {
            StringOperator::Equals => value == compare_to,
            StringOperator::StartsWith => value.starts_with(compare_to),
            StringOperator::EndsWith => value.ends_with(compare_to),
            StringOperator::Contains => value.contains(compare_to),
            StringOperator::Anything => true,
        }
    }
}

/// A predicate over keys
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Matcher {
    /// Exactly one key
    Key { key: Key },

    /// Compare the key name
    Name {
        operator: StringOperator,
        compare_to: String,
    },

    /// Compare the key group
    Group {
        operator: StringOperator,
        compare_to: String,
    },

    /// Composite: both must match
    And {
        left: Box<Matcher>,
        right: Box<Matcher>,
    },

    /// Composite: either must match
    Or {
        left: Box<Matcher>,
        right: Box<Matcher>,
    },

    /// Composite: operand must not match
    Not { operand: Box<Matcher> },

    /// Matches every key
    Everything,
}

impl Matcher {
    pub fn key_equals(key: Key) -> Self {
        Matcher::Key { key }
    }

    pub fn everything() -> Self {
        Matcher::Everything
    }

    pub fn name(operator: StringOperator, compare_to: impl Into<String>) -> Self {
        Matcher::Name {
            operator,
            compare_to: compare_to.into(),
        }
    }

    pub fn group(operator: StringOperator, compare_to: impl Into<String>) -> Self {
        Matcher::Group {
            operator,
            compare_to: compare_to.into(),
        }
    }

    pub fn name_equals(name: impl Into<String>) -> Self {
        Self::name(StringOperator::Equals, name)
    }

    pub fn name_starts_with(prefix: impl Into<String>) -> Self {
        Self::name(StringOperator::StartsWith, prefix)
    }

    pub fn name_ends_with(suffix: impl Into<String>) -> Self {
        Self::name(StringOperator::EndsWith, suffix)
    }

    pub fn name_contains(fragment: impl Into<String>) -> Self {
        Self::name(StringOperator::Contains, fragment)
    }

    pub fn group_equals(group: impl Into<String>) -> Self {
        Self::group(StringOperator::Equals, group)
    }

    pub fn group_starts_with(prefix: impl Into<String>) -> Self {
        Self::group(StringOperator::StartsWith, prefix)
    }

    pub fn group_ends_with(suffix: impl Into<String>) -> Self {
        Self::group(StringOperator::EndsWith, suffix)
    }

    pub fn group_contains(fragment: impl Into<String>) -> Self {
        Self::group(StringOperator::Contains, fragment)
    }

    pub fn any_group() -> Self {
        Self::group(StringOperator::Anything, "")
    }

    pub fn and(self, other: Matcher) -> Self {
        Matcher::And {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn or(self, other: Matcher) -> Self {
        Matcher::Or {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn negate(self) -> Self {
        Matcher::Not {
            operand: Box::new(self),
        }
    }

    /// Evaluate the matcher against a key (pure function)
    pub fn is_match(&self, key: &Key) -> bool {
        match self {
            Matcher::Key { key: expected } => expected == key,
            Matcher::Name {
                operator,
                compare_to,
            } => operator.evaluate(key.name(), compare_to),
            Matcher::Group {
                operator,
                compare_to,
            } => operator.evaluate(key.group(), compare_to),
            Matcher::And { left, right } => left.is_match(key) && right.is_match(key),
            Matcher::Or { left, right } => left.is_match(key) || right.is_match(key),
            Matcher::Not { operand } => !operand.is_match(key),
            Matcher::Everything => true,
        }
    }

    /// The group this matcher pins down exactly, if it is a group-equals leaf
    pub fn exact_group(&self) -> Option<&str> {
        match self {
            Matcher::Group {
                operator: StringOperator::Equals,
                compare_to,
            } => Some(compare_to),
            _ => None,
        }
    }
}

impl ops::Not for Matcher {
    type Output = Matcher;

    fn not(self) -> Matcher {
        self.negate()
    }
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod tests;
