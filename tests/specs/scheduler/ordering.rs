//! Firing order specs
//!
//! With a single worker, due triggers run earliest first and, among equal
//! fire times, highest priority first.

use crate::prelude::*;
use chrono::Utc;
use similar_asserts::assert_eq;

fn single_worker() -> Harness {
    Harness::with_config(Harness::config().with_thread_count(1))
}

fn due(name: &str, seconds_ago: i64, priority: i32) -> Trigger {
    Trigger::new(
        key(name),
        key("j"),
        Schedule::once(),
        Utc::now() - chrono::Duration::seconds(seconds_ago),
    )
    .with_priority(priority)
}

#[tokio::test]
async fn equal_fire_times_run_by_priority() {
    let h = single_worker();
    let start = Utc::now() - chrono::Duration::seconds(1);
    let at = |name: &str, priority: i32| {
        Trigger::new(key(name), key("j"), Schedule::once(), start).with_priority(priority)
    };
    h.scheduler
        .store()
        .store_jobs_and_triggers(
            vec![(
                record_job("j"),
                vec![at("low", 1), at("high", 10), at("mid", 5)],
            )],
            false,
        )
        .unwrap();

    let mut h = h.start();
    h.completed(3).await;

    assert_eq!(h.run_triggers(), strings(&["high", "mid", "low"]));
    h.stop().await;
}

#[tokio::test]
async fn earlier_fire_time_beats_priority() {
    let h = single_worker();
    h.scheduler
        .store()
        .store_jobs_and_triggers(
            vec![(
                record_job("j"),
                vec![due("later", 1, 10), due("earlier", 2, 1)],
            )],
            false,
        )
        .unwrap();

    let mut h = h.start();
    h.completed(2).await;

    assert_eq!(h.run_triggers(), strings(&["earlier", "later"]));
    h.stop().await;
}

#[tokio::test]
async fn a_busy_worker_pool_delays_but_does_not_drop_firings() {
    let h = single_worker();
    let job = record_job("j").with_data("hold_ms", 100);
    h.scheduler
        .store()
        .store_jobs_and_triggers(
            vec![(job, vec![due("a", 0, 5), due("b", 0, 5), due("c", 0, 5)])],
            false,
        )
        .unwrap();

    let mut h = h.start();
    h.completed(3).await;

    let mut ran = h.run_triggers();
    ran.sort();
    assert_eq!(ran, strings(&["a", "b", "c"]));
    h.stop().await;
}
