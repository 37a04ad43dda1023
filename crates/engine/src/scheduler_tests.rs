// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::job::{Job, JobError};
use async_trait::async_trait;
use cadence_core::RepeatCount;
use std::sync::atomic::{AtomicUsize, Ordering};

const WAIT: Duration = Duration::from_secs(5);

/// Counts executions and records the data each one saw
#[derive(Clone, Default)]
struct Tally {
    runs: Arc<AtomicUsize>,
    running: Arc<AtomicUsize>,
    max_running: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<JobDataMap>>>,
}

struct TallyJob {
    tally: Tally,
    hold: Duration,
    fail_first: bool,
}

#[async_trait]
impl Job for TallyJob {
    async fn execute(&self, ctx: &mut JobExecutionContext) -> Result<(), JobError> {
        let running = self.tally.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.tally.max_running.fetch_max(running, Ordering::SeqCst);
        self.tally.seen.lock().push(ctx.merged_job_data.clone());

        let count = ctx
            .job_detail
            .job_data
            .get("count")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);
        ctx.job_data_mut().insert("count".into(), (count + 1).into());

        if !self.hold.is_zero() {
            tokio::time::sleep(self.hold).await;
        }
        self.tally.running.fetch_sub(1, Ordering::SeqCst);
        self.tally.runs.fetch_add(1, Ordering::SeqCst);

        if self.fail_first && ctx.refire_count == 0 {
            return Err(JobError::new("flaky").refire());
        }
        Ok(())
    }
}

fn registry(tally: &Tally, hold: Duration, fail_first: bool) -> JobRegistry {
    let tally = tally.clone();
    JobRegistry::new().with("tally", move || TallyJob {
        tally: tally.clone(),
        hold,
        fail_first,
    })
}

fn config() -> SchedulerConfig {
    SchedulerConfig::default()
        .with_thread_count(4)
        .with_idle_wait_time(Duration::from_millis(100))
}

fn scheduler(tally: &Tally) -> Scheduler {
    Scheduler::new(config(), registry(tally, Duration::ZERO, false)).unwrap()
}

fn job(name: &str) -> JobDetail {
    JobDetail::new(Key::in_default_group(name).unwrap(), "tally")
}

fn once_now(name: &str, job: &str) -> Trigger {
    Trigger::new(
        Key::in_default_group(name).unwrap(),
        Key::in_default_group(job).unwrap(),
        Schedule::once(),
        Utc::now(),
    )
}

async fn wait_for(
    events: &mut broadcast::Receiver<SchedulerEvent>,
    mut pred: impl FnMut(&SchedulerEvent) -> bool,
) -> SchedulerEvent {
    tokio::time::timeout(WAIT, async {
        loop {
            let event = events.recv().await.unwrap();
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

async fn completions(events: &mut broadcast::Receiver<SchedulerEvent>, n: usize) {
    for _ in 0..n {
        wait_for(events, |e| matches!(e, SchedulerEvent::JobCompleted { .. })).await;
    }
}

#[tokio::test]
async fn fires_a_scheduled_job_and_cleans_up() {
    let tally = Tally::default();
    let sched = scheduler(&tally);
    let mut events = sched.subscribe();
    sched.start().unwrap();

    let first = sched.schedule_job(job("j"), once_now("t", "j")).unwrap();
    assert!(first.is_some());

    let event = wait_for(&mut events, |e| matches!(e, SchedulerEvent::JobCompleted { .. })).await;
    let SchedulerEvent::JobCompleted {
        instruction, error, ..
    } = event
    else {
        unreachable!()
    };
    assert_eq!(instruction, CompletedExecutionInstruction::DeleteTrigger);
    assert_eq!(error, None);
    assert_eq!(tally.runs.load(Ordering::SeqCst), 1);
    assert_eq!(sched.store().number_of_triggers(), 0);
    assert_eq!(sched.store().number_of_jobs(), 0);

    sched.shutdown(true).await;
}

#[tokio::test]
async fn scheduling_change_wakes_an_idle_loop() {
    let tally = Tally::default();
    let config = config().with_idle_wait_time(Duration::from_secs(30));
    let sched = Scheduler::new(config, registry(&tally, Duration::ZERO, false)).unwrap();
    let mut events = sched.subscribe();
    sched.start().unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    sched.schedule_job(job("j"), once_now("t", "j")).unwrap();
    completions(&mut events, 1).await;
    assert_eq!(tally.runs.load(Ordering::SeqCst), 1);

    sched.shutdown(true).await;
}

#[tokio::test]
async fn unknown_job_type_is_rejected() {
    let tally = Tally::default();
    let sched = scheduler(&tally);
    let job = JobDetail::new(Key::in_default_group("j").unwrap(), "missing");

    let err = sched.schedule_job(job, once_now("t", "j")).unwrap_err();
    assert!(matches!(err, SchedulerError::UnknownJobType(t) if t == "missing"));
}

#[tokio::test]
async fn add_job_requires_durability() {
    let tally = Tally::default();
    let sched = scheduler(&tally);

    let err = sched.add_job(job("j"), false).unwrap_err();
    assert!(matches!(err, SchedulerError::JobNotDurable(_)));
    sched.add_job(job("j").durable(), false).unwrap();
    assert!(sched.store().check_job_exists(&Key::in_default_group("j").unwrap()));
}

#[tokio::test]
async fn trigger_job_fires_now_with_extra_data() {
    let tally = Tally::default();
    let sched = scheduler(&tally);
    let mut events = sched.subscribe();
    sched
        .add_job(job("j").durable().with_data("from", "job"), false)
        .unwrap();
    sched.start().unwrap();

    let mut data = JobDataMap::new();
    data.insert("from".into(), "manual".into());
    let key = sched
        .trigger_job(&Key::in_default_group("j").unwrap(), data)
        .unwrap();
    assert_eq!(key.group(), MANUAL_TRIGGER_GROUP);

    completions(&mut events, 1).await;
    let seen = tally.seen.lock().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["from"], "manual");
    // Durable job outlives its one-shot trigger
    assert!(sched.store().check_job_exists(&Key::in_default_group("j").unwrap()));

    sched.shutdown(true).await;
}

#[tokio::test]
async fn trigger_job_needs_a_stored_job() {
    let tally = Tally::default();
    let sched = scheduler(&tally);
    let err = sched
        .trigger_job(&Key::in_default_group("nope").unwrap(), JobDataMap::new())
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Store(StoreError::JobNotFound(_))));
}

#[tokio::test]
async fn standby_holds_firings_until_restarted() {
    let tally = Tally::default();
    let sched = scheduler(&tally);
    let mut events = sched.subscribe();
    sched.start().unwrap();
    sched.standby();
    assert_eq!(sched.run_state(), RunState::Standby);

    sched.schedule_job(job("j"), once_now("t", "j")).unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(tally.runs.load(Ordering::SeqCst), 0);

    sched.start().unwrap();
    completions(&mut events, 1).await;
    assert_eq!(tally.runs.load(Ordering::SeqCst), 1);

    sched.shutdown(true).await;
}

#[tokio::test]
async fn refire_runs_the_job_again() {
    let tally = Tally::default();
    let sched = Scheduler::new(config(), registry(&tally, Duration::ZERO, true)).unwrap();
    let mut events = sched.subscribe();
    sched.start().unwrap();
    sched.schedule_job(job("j"), once_now("t", "j")).unwrap();

    let event = wait_for(&mut events, |e| {
        matches!(e, SchedulerEvent::JobStarted { refire_count: 1, .. })
    })
    .await;
    assert!(matches!(event, SchedulerEvent::JobStarted { .. }));
    let event = wait_for(&mut events, |e| {
        matches!(
            e,
            SchedulerEvent::JobCompleted {
                instruction: CompletedExecutionInstruction::DeleteTrigger,
                ..
            }
        )
    })
    .await;
    assert!(matches!(event, SchedulerEvent::JobCompleted { error: None, .. }));
    assert_eq!(tally.runs.load(Ordering::SeqCst), 2);

    sched.shutdown(true).await;
}

#[tokio::test]
async fn persisted_job_data_carries_between_runs() {
    let tally = Tally::default();
    let sched = scheduler(&tally);
    let mut events = sched.subscribe();
    sched.start().unwrap();

    let trigger = Trigger::new(
        Key::in_default_group("t").unwrap(),
        Key::in_default_group("j").unwrap(),
        Schedule::simple(Duration::from_millis(50), RepeatCount::Times(2)),
        Utc::now(),
    );
    sched
        .schedule_job(job("j").durable().persist_job_data_after_execution(), trigger)
        .unwrap();

    completions(&mut events, 3).await;
    let stored = sched
        .store()
        .retrieve_job(&Key::in_default_group("j").unwrap())
        .unwrap();
    assert_eq!(stored.job_data["count"], 3);

    sched.shutdown(true).await;
}

#[tokio::test]
async fn non_concurrent_job_runs_one_at_a_time() {
    let tally = Tally::default();
    let sched = Scheduler::new(
        config().with_batch(4, Duration::from_millis(100)),
        registry(&tally, Duration::from_millis(100), false),
    )
    .unwrap();
    let mut events = sched.subscribe();
    sched.start().unwrap();

    let jobs = vec![(
        job("j").disallow_concurrent_execution(),
        vec![once_now("t1", "j"), once_now("t2", "j")],
    )];
    sched.store().store_jobs_and_triggers(jobs, false).unwrap();

    completions(&mut events, 2).await;
    assert_eq!(tally.runs.load(Ordering::SeqCst), 2);
    assert_eq!(tally.max_running.load(Ordering::SeqCst), 1);

    sched.shutdown(true).await;
}

#[tokio::test]
async fn shutdown_waits_for_running_jobs() {
    let tally = Tally::default();
    let sched = Scheduler::new(config(), registry(&tally, Duration::from_millis(150), false))
        .unwrap();
    let mut events = sched.subscribe();
    sched.start().unwrap();
    sched.schedule_job(job("j"), once_now("t", "j")).unwrap();

    wait_for(&mut events, |e| matches!(e, SchedulerEvent::JobStarted { .. })).await;
    sched.shutdown(true).await;

    assert_eq!(tally.runs.load(Ordering::SeqCst), 1);
    assert!(sched.is_shutdown());
    assert!(matches!(sched.start(), Err(SchedulerError::Shutdown)));
    assert!(matches!(
        sched.schedule_job(job("k"), once_now("u", "k")),
        Err(SchedulerError::Shutdown)
    ));
}

#[test]
fn start_outside_a_runtime_fails() {
    let tally = Tally::default();
    let sched = scheduler(&tally);
    assert!(matches!(sched.start(), Err(SchedulerError::NoRuntime)));
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let tally = Tally::default();
    let result = Scheduler::new(
        config().with_thread_count(0),
        registry(&tally, Duration::ZERO, false),
    );
    assert!(matches!(result, Err(SchedulerError::Config(_))));
}
