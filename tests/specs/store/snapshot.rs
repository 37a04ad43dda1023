//! Snapshot and restart specs
//!
//! A scheduler restarted from a saved snapshot keeps its schedule and
//! re-runs executions that were cut short, when the job asks for it.

use crate::prelude::*;
use cadence_core::{StoreConfig, RECOVERING_JOBS_GROUP};
use similar_asserts::assert_eq;

fn reload(path: &std::path::Path) -> Harness {
    let store = RamJobStore::load(path, SystemClock, StoreConfig::default()).unwrap();
    Harness::with_store(Harness::config(), Arc::new(store))
}

#[tokio::test]
async fn restart_resumes_the_schedule() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state/store.json");

    let mut first = Harness::new().start();
    first
        .scheduler
        .schedule_job(
            record_job("j").durable(),
            repeating("t", "j", Duration::from_millis(200), 5),
        )
        .unwrap();
    first.completed(1).await;
    first.scheduler.standby();
    first.scheduler.store().save_snapshot(&path).unwrap();
    first.stop().await;

    let mut second = reload(&path).start();
    assert!(second.scheduler.store().check_job_exists(&key("j")));
    second.completed(1).await;

    assert_eq!(second.run_triggers(), strings(&["t"]));
    second.stop().await;
}

#[tokio::test]
async fn interrupted_execution_is_recovered() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let mut first = Harness::new().start();
    first
        .scheduler
        .schedule_job(
            record_job("j")
                .durable()
                .requests_recovery()
                .with_data("hold_ms", 2_000),
            once_now("t", "j"),
        )
        .unwrap();
    first
        .until(|e| matches!(e, SchedulerEvent::JobStarted { .. }))
        .await;
    // Snapshot while the job is still running, as a crash would leave it
    first.scheduler.store().save_snapshot(&path).unwrap();
    first.scheduler.shutdown(false).await;

    let mut second = reload(&path).start();
    second.completed(1).await;

    let runs = second.runs();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].recovering);
    assert!(runs[0].trigger.starts_with("recover_"));
    assert_eq!(runs[0].data["recovering_trigger"], "DEFAULT.t");

    let recovery_left = second
        .scheduler
        .store()
        .trigger_keys(&cadence_core::Matcher::group_equals(RECOVERING_JOBS_GROUP));
    assert!(recovery_left.is_empty());

    second.stop().await;
}
