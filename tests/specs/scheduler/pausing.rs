//! Pause and resume specs

use crate::prelude::*;
use cadence_core::Matcher;
use similar_asserts::assert_eq;

const QUIET: Duration = Duration::from_millis(300);

#[tokio::test]
async fn paused_job_does_not_fire_until_resumed() {
    let h = Harness::new();
    h.scheduler
        .schedule_job(record_job("j"), once_now("t", "j"))
        .unwrap();
    h.scheduler.pause_job(&key("j"));

    let mut h = h.start();
    tokio::time::sleep(QUIET).await;
    assert!(h.runs().is_empty());
    assert_eq!(h.scheduler.trigger_state(&key("t")), TriggerState::Paused);

    h.scheduler.resume_job(&key("j"));
    h.completed(1).await;
    assert_eq!(h.run_triggers(), strings(&["t"]));

    h.stop().await;
}

#[tokio::test]
async fn triggers_added_to_a_paused_group_start_paused() {
    let mut h = Harness::new().start();
    let paused = h
        .scheduler
        .pause_triggers(&Matcher::group_equals("nightly"));
    assert_eq!(paused, strings(&["nightly"]));

    let trigger = Trigger::new(
        Key::new("t", "nightly").unwrap(),
        key("j"),
        Schedule::once(),
        chrono::Utc::now(),
    );
    h.scheduler.schedule_job(record_job("j"), trigger).unwrap();
    tokio::time::sleep(QUIET).await;

    let trigger_key = Key::new("t", "nightly").unwrap();
    assert_eq!(h.scheduler.trigger_state(&trigger_key), TriggerState::Paused);
    assert!(h.runs().is_empty());

    h.scheduler
        .resume_triggers(&Matcher::group_equals("nightly"));
    h.completed(1).await;
    assert_eq!(h.runs().len(), 1);

    h.stop().await;
}

#[tokio::test]
async fn pause_all_holds_everything() {
    let h = Harness::new();
    h.scheduler
        .store()
        .store_jobs_and_triggers(
            vec![
                (record_job("a"), vec![once_now("ta", "a")]),
                (record_job("b"), vec![once_now("tb", "b")]),
            ],
            false,
        )
        .unwrap();
    h.scheduler.pause_all();

    let mut h = h.start();
    tokio::time::sleep(QUIET).await;
    assert!(h.runs().is_empty());

    h.scheduler.resume_all();
    h.completed(2).await;
    let mut ran = h.run_triggers();
    ran.sort();
    assert_eq!(ran, strings(&["ta", "tb"]));

    h.stop().await;
}
