//! Scheduler lifecycle specs
//!
//! Verify start/standby/shutdown transitions and what they allow.

use crate::prelude::*;
use cadence_engine::{RunState, SchedulerError};
use similar_asserts::assert_eq;

fn lifecycle_events(events: &mut tokio::sync::broadcast::Receiver<SchedulerEvent>) -> Vec<String> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            SchedulerEvent::Started => seen.push("started".to_string()),
            SchedulerEvent::Standby => seen.push("standby".to_string()),
            SchedulerEvent::Shutdown => seen.push("shutdown".to_string()),
            _ => {}
        }
    }
    seen
}

#[tokio::test]
async fn lifecycle_transitions_are_announced_in_order() {
    let mut h = Harness::new();

    h.scheduler.start().unwrap();
    h.scheduler.standby();
    h.scheduler.start().unwrap();
    h.scheduler.shutdown(true).await;

    assert_eq!(
        lifecycle_events(&mut h.events),
        strings(&["started", "standby", "started", "shutdown"])
    );
}

#[tokio::test]
async fn a_new_scheduler_waits_in_standby() {
    let h = Harness::new();
    h.scheduler
        .schedule_job(record_job("j"), once_now("t", "j"))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(h.scheduler.run_state(), RunState::Standby);
    assert!(h.runs().is_empty());
}

#[tokio::test]
async fn shutdown_is_final() {
    let h = Harness::new().start();
    h.scheduler.shutdown(false).await;
    // A second shutdown is a no-op
    h.scheduler.shutdown(true).await;

    assert!(h.scheduler.is_shutdown());
    assert!(matches!(h.scheduler.start(), Err(SchedulerError::Shutdown)));
    assert!(matches!(
        h.scheduler.add_job(record_job("j").durable(), false),
        Err(SchedulerError::Shutdown)
    ));
}

#[tokio::test]
async fn repeating_trigger_runs_every_repetition_then_goes_away() {
    let mut h = Harness::new().start();
    h.scheduler
        .schedule_job(
            record_job("j"),
            repeating("t", "j", Duration::from_millis(50), 2),
        )
        .unwrap();

    let done = h.completed(3).await;

    let instructions: Vec<_> = done
        .iter()
        .map(|e| match e {
            SchedulerEvent::JobCompleted { instruction, .. } => *instruction,
            other => panic!("unexpected event {other:?}"),
        })
        .collect();
    assert_eq!(
        instructions,
        vec![
            CompletedExecutionInstruction::NoOp,
            CompletedExecutionInstruction::NoOp,
            CompletedExecutionInstruction::DeleteTrigger,
        ]
    );
    assert_eq!(h.run_triggers(), strings(&["t", "t", "t"]));
    assert_eq!(h.scheduler.trigger_state(&key("t")), TriggerState::None);
    assert!(!h.scheduler.store().check_job_exists(&key("j")));

    h.stop().await;
}

#[tokio::test]
async fn manual_trigger_merges_data_over_the_job() {
    let mut h = Harness::new().start();
    h.scheduler
        .add_job(
            record_job("report")
                .durable()
                .with_data("format", "pdf")
                .with_data("pages", 3),
            false,
        )
        .unwrap();

    let mut data = JobDataMap::new();
    data.insert("format".into(), "csv".into());
    h.scheduler.trigger_job(&key("report"), data).unwrap();
    h.completed(1).await;

    let run = &h.runs()[0];
    assert_eq!(run.data["format"], "csv");
    assert_eq!(run.data["pages"], 3);
    assert!(h.scheduler.store().check_job_exists(&key("report")));

    h.stop().await;
}
