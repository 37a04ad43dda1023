// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler events and the store-facing signaler

use cadence_core::{CompletedExecutionInstruction, JobKey, SchedulerSignaler, Trigger, TriggerKey};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

/// Capacity of the event channel; slow subscribers see `Lagged`
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Something listeners may want to know about
#[derive(Clone, Debug, PartialEq)]
pub enum SchedulerEvent {
    Started,
    Standby,
    Shutdown,
    TriggerMisfired {
        trigger: TriggerKey,
    },
    /// The trigger will never fire again
    TriggerFinalized {
        trigger: TriggerKey,
    },
    /// A due trigger waits because its job is already running
    JobBlocked {
        trigger: TriggerKey,
    },
    JobStarted {
        job: JobKey,
        trigger: TriggerKey,
        fire_time: DateTime<Utc>,
        scheduled_fire_time: Option<DateTime<Utc>>,
        refire_count: u32,
    },
    JobCompleted {
        job: JobKey,
        trigger: TriggerKey,
        instruction: CompletedExecutionInstruction,
        error: Option<String>,
        elapsed: Duration,
    },
}

/// Bridges store notifications to the firing loop and subscribers
///
/// Scheduling changes are coalesced into the earliest candidate time and a
/// stored `Notify` permit, so a change signaled while the loop is busy is
/// seen on its next wait.
#[derive(Debug)]
pub struct ChannelSignaler {
    events: broadcast::Sender<SchedulerEvent>,
    wakeup: Notify,
    /// `Some(None)` when a change has no known candidate time
    pending: Mutex<Option<Option<DateTime<Utc>>>>,
}

impl ChannelSignaler {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            events,
            wakeup: Notify::new(),
            pending: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.events.subscribe()
    }

    pub fn publish(&self, event: SchedulerEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Wake the firing loop without a scheduling change
    pub fn wake(&self) {
        self.wakeup.notify_one();
    }

    /// Wait until a change is signaled or the loop is woken
    pub async fn changed(&self) {
        self.wakeup.notified().await;
    }

    /// Take the coalesced change, if any
    pub fn take_change(&self) -> Option<Option<DateTime<Utc>>> {
        self.pending.lock().take()
    }
}

impl Default for ChannelSignaler {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerSignaler for ChannelSignaler {
    fn notify_trigger_listeners_misfired(&self, trigger: &Trigger) {
        self.publish(SchedulerEvent::TriggerMisfired {
            trigger: trigger.key.clone(),
        });
    }

    fn notify_scheduler_listeners_finalized(&self, trigger: &Trigger) {
        self.publish(SchedulerEvent::TriggerFinalized {
            trigger: trigger.key.clone(),
        });
    }

    fn signal_scheduling_change(&self, candidate_next_fire_time: Option<DateTime<Utc>>) {
        {
            let mut pending = self.pending.lock();
            *pending = Some(match (*pending, candidate_next_fire_time) {
                (Some(Some(a)), Some(b)) => Some(a.min(b)),
                (Some(None), _) | (_, None) => None,
                (None, Some(b)) => Some(b),
            });
        }
        self.wakeup.notify_one();
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
