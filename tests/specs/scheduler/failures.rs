//! Job failure specs
//!
//! A failing job never takes the scheduler down; its error decides what
//! happens to the trigger.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[tokio::test]
async fn failed_job_is_reported_and_the_schedule_continues() {
    let mut h = Harness::new().start();
    h.scheduler
        .schedule_job(
            record_job("j").durable().with_data("fail", true),
            repeating("t", "j", Duration::from_millis(50), 1),
        )
        .unwrap();

    let done = h.completed(2).await;

    let errors: Vec<_> = done
        .iter()
        .map(|e| match e {
            SchedulerEvent::JobCompleted { error, .. } => error.clone(),
            other => panic!("unexpected event {other:?}"),
        })
        .collect();
    assert_eq!(errors, vec![Some("boom".to_string()), Some("boom".to_string())]);
    assert_eq!(h.runs().len(), 2);

    h.stop().await;
}

#[tokio::test]
async fn refire_request_reruns_the_same_firing() {
    let mut h = Harness::new().start();
    h.scheduler
        .schedule_job(
            record_job("j").with_data("refire", true),
            once_now("t", "j"),
        )
        .unwrap();

    h.until(|e| {
        matches!(
            e,
            SchedulerEvent::JobCompleted {
                instruction: CompletedExecutionInstruction::DeleteTrigger,
                ..
            }
        )
    })
    .await;

    let refires: Vec<u32> = h.runs().iter().map(|r| r.refire_count).collect();
    assert_eq!(refires, vec![0, 1]);

    h.stop().await;
}

#[tokio::test]
async fn unregistered_job_type_puts_its_triggers_in_error() {
    let mut h = Harness::new();
    // Bypass the scheduler's type check by writing to the store directly
    h.scheduler
        .store()
        .store_job_and_trigger(
            JobDetail::new(key("j"), "retired").durable(),
            once_now("t", "j"),
        )
        .unwrap();
    h.scheduler.start().unwrap();

    let done = h
        .until(|e| matches!(e, SchedulerEvent::JobCompleted { .. }))
        .await;

    assert!(matches!(
        done,
        SchedulerEvent::JobCompleted {
            instruction: CompletedExecutionInstruction::SetAllJobTriggersError,
            error: Some(_),
            ..
        }
    ));
    assert_eq!(h.scheduler.trigger_state(&key("t")), TriggerState::Error);
    assert!(h.runs().is_empty());

    h.stop().await;
}
