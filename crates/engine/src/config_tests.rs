// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn empty_document_uses_defaults() {
    let config = SchedulerConfig::from_toml_str("").unwrap();
    assert_eq!(config, SchedulerConfig::default());
    assert_eq!(config.instance_name, "cadence");
    assert_eq!(config.thread_count, 10);
    assert_eq!(config.idle_wait_time, Duration::from_secs(30));
    assert_eq!(config.store.misfire_threshold, Duration::from_secs(5));
}

#[test]
fn parses_humantime_durations() {
    let config = SchedulerConfig::from_toml_str(
        r#"
        instance_name = "reports"
        thread_count = 4
        idle_wait_time = "2s"
        batch_size = 8
        batch_time_window = "250ms"

        [store]
        misfire_threshold = "1m"
        "#,
    )
    .unwrap();

    assert_eq!(config.instance_name, "reports");
    assert_eq!(config.thread_count, 4);
    assert_eq!(config.idle_wait_time, Duration::from_secs(2));
    assert_eq!(config.batch_size, 8);
    assert_eq!(config.batch_time_window, Duration::from_millis(250));
    assert_eq!(config.store.misfire_threshold, Duration::from_secs(60));
}

#[parameterized(
    no_workers = { "thread_count = 0" },
    no_batch = { "batch_size = 0" },
    no_idle_wait = { "idle_wait_time = \"0s\"" },
)]
fn rejects_invalid_values(content: &str) {
    let err = SchedulerConfig::from_toml_str(content).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)), "got {err}");
}

#[test]
fn rejects_malformed_duration() {
    let err = SchedulerConfig::from_toml_str("idle_wait_time = \"soon\"").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
}

#[test]
fn load_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cadence.toml");
    std::fs::write(&path, "thread_count = 2\n").unwrap();

    assert_eq!(SchedulerConfig::load(&path).unwrap().thread_count, 2);
    assert!(matches!(
        SchedulerConfig::load(&dir.path().join("missing.toml")),
        Err(ConfigError::Io(_))
    ));
}
