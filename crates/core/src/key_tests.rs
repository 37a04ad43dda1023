// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn empty_name_is_rejected() {
    assert_eq!(Key::new("", "g"), Err(KeyError::EmptyName));
}

#[test]
fn empty_group_falls_back_to_default() {
    let key = Key::new("job", "").unwrap();
    assert_eq!(key.group(), DEFAULT_GROUP);
    assert_eq!(key, Key::in_default_group("job").unwrap());
}

#[test]
fn keys_with_same_name_in_different_groups_differ() {
    let a = Key::new("job", "a").unwrap();
    let b = Key::new("job", "b").unwrap();
    assert_ne!(a, b);
}

#[parameterized(
    group_decides_first = { ("z", "a"), ("a", "b"), Ordering::Less },
    name_breaks_group_tie = { ("a", "g"), ("b", "g"), Ordering::Less },
    equal_keys = { ("a", "g"), ("a", "g"), Ordering::Equal },
    ordinal_case = { ("B", "g"), ("a", "g"), Ordering::Less },
)]
fn ordering_is_group_then_name(left: (&str, &str), right: (&str, &str), expected: Ordering) {
    let left = Key::new(left.0, left.1).unwrap();
    let right = Key::new(right.0, right.1).unwrap();
    assert_eq!(left.cmp(&right), expected);
}

#[test]
fn display_and_parse_agree() {
    let key = Key::new("nightly", "reports").unwrap();
    assert_eq!(key.to_string(), "reports.nightly");
    assert_eq!("reports.nightly".parse::<Key>().unwrap(), key);
    assert_eq!(
        "solo".parse::<Key>().unwrap(),
        Key::in_default_group("solo").unwrap()
    );
}

#[test]
fn deserialize_validates_name_and_defaults_group() {
    let key: Key = serde_json::from_str(r#"{"name":"job"}"#).unwrap();
    assert_eq!(key.group(), DEFAULT_GROUP);

    let err = serde_json::from_str::<Key>(r#"{"name":"","group":"g"}"#);
    assert!(err.is_err());
}
