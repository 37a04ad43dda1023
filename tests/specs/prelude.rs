//! Shared fixtures for the behavioral specs

#![allow(dead_code)]

pub use cadence_core::{
    CompletedExecutionInstruction, JobDataMap, JobDetail, JobKey, JobStore, Key, RamJobStore,
    RepeatCount, Schedule, SystemClock, Trigger, TriggerKey, TriggerState,
};
pub use cadence_engine::{
    Job, JobError, JobExecutionContext, JobRegistry, Scheduler, SchedulerConfig, SchedulerEvent,
};
pub use std::sync::Arc;
pub use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// How long to wait for something to happen before failing
pub const PATIENCE: Duration = Duration::from_secs(5);

/// One execution as the job saw it
#[derive(Clone, Debug, PartialEq)]
pub struct Run {
    pub trigger: String,
    pub refire_count: u32,
    pub recovering: bool,
    pub data: JobDataMap,
}

/// Job behavior chosen through job data
///
/// `fail` makes the job return an error, `refire` asks for an immediate
/// re-run on the first attempt, `hold_ms` keeps it busy.
struct RecordingJob {
    runs: Arc<Mutex<Vec<Run>>>,
}

#[async_trait]
impl Job for RecordingJob {
    async fn execute(&self, ctx: &mut JobExecutionContext) -> Result<(), JobError> {
        self.runs.lock().push(Run {
            trigger: ctx.trigger_key().name().to_string(),
            refire_count: ctx.refire_count,
            recovering: ctx.is_recovering,
            data: ctx.merged_job_data.clone(),
        });
        if let Some(ms) = ctx.merged_job_data.get("hold_ms").and_then(|v| v.as_u64()) {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        let flag = |name: &str| {
            ctx.merged_job_data.get(name) == Some(&serde_json::Value::Bool(true))
        };
        if flag("refire") && ctx.refire_count == 0 {
            return Err(JobError::new("try again").refire());
        }
        if flag("fail") {
            return Err(JobError::new("boom"));
        }
        Ok(())
    }
}

/// A running scheduler with a recording job type registered as "record"
pub struct Harness {
    pub scheduler: Scheduler,
    pub events: broadcast::Receiver<SchedulerEvent>,
    runs: Arc<Mutex<Vec<Run>>>,
}

impl Harness {
    pub fn config() -> SchedulerConfig {
        SchedulerConfig::default()
            .with_thread_count(4)
            .with_idle_wait_time(Duration::from_millis(100))
    }

    pub fn new() -> Self {
        Self::with_config(Self::config())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        let store = Arc::new(RamJobStore::with_clock(SystemClock, config.store.clone()));
        Self::with_store(config, store)
    }

    pub fn with_store(config: SchedulerConfig, store: Arc<RamJobStore>) -> Self {
        let runs = Arc::new(Mutex::new(Vec::new()));
        let factory_runs = Arc::clone(&runs);
        let registry = JobRegistry::new().with("record", move || RecordingJob {
            runs: Arc::clone(&factory_runs),
        });
        let scheduler = Scheduler::with_store(config, registry, store).unwrap();
        let events = scheduler.subscribe();
        Self {
            scheduler,
            events,
            runs,
        }
    }

    pub fn start(self) -> Self {
        self.scheduler.start().unwrap();
        self
    }

    pub fn runs(&self) -> Vec<Run> {
        self.runs.lock().clone()
    }

    pub fn run_triggers(&self) -> Vec<String> {
        self.runs().into_iter().map(|r| r.trigger).collect()
    }

    /// Wait for the next event matching `pred`
    pub async fn until(&mut self, pred: impl Fn(&SchedulerEvent) -> bool) -> SchedulerEvent {
        let events = &mut self.events;
        tokio::time::timeout(PATIENCE, async {
            loop {
                match events.recv().await {
                    Ok(event) if pred(&event) => return event,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
                }
            }
        })
        .await
        .expect("timed out waiting for scheduler event")
    }

    /// Wait for `n` executions to finish
    pub async fn completed(&mut self, n: usize) -> Vec<SchedulerEvent> {
        let mut done = Vec::with_capacity(n);
        for _ in 0..n {
            done.push(
                self.until(|e| matches!(e, SchedulerEvent::JobCompleted { .. }))
                    .await,
            );
        }
        done
    }

    pub async fn stop(self) {
        self.scheduler.shutdown(true).await;
    }
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn key(name: &str) -> Key {
    Key::in_default_group(name).unwrap()
}

pub fn record_job(name: &str) -> JobDetail {
    JobDetail::new(key(name), "record")
}

pub fn once_now(name: &str, job: &str) -> Trigger {
    Trigger::new(key(name), key(job), Schedule::once(), Utc::now())
}

pub fn repeating(name: &str, job: &str, every: Duration, repeats: u32) -> Trigger {
    Trigger::new(
        key(name),
        key(job),
        Schedule::simple(every, RepeatCount::Times(repeats)),
        Utc::now(),
    )
}
