// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Callbacks from the store to whoever drives it

use crate::trigger::Trigger;
use chrono::{DateTime, Utc};

/// Sink for store-side notifications
///
/// Called after the store lock is released, in the order the store raised
/// them, so implementations may call back into the store.
pub trait SchedulerSignaler: Send + Sync {
    /// A trigger missed its fire time and had its misfire instruction applied
    fn notify_trigger_listeners_misfired(&self, trigger: &Trigger);

    /// A trigger will never fire again
    fn notify_scheduler_listeners_finalized(&self, trigger: &Trigger);

    /// Something changed that may move the next fire time earlier
    fn signal_scheduling_change(&self, candidate_next_fire_time: Option<DateTime<Utc>>);
}

/// Signaler that drops every notification
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpSignaler;

impl SchedulerSignaler for NoOpSignaler {
    fn notify_trigger_listeners_misfired(&self, _trigger: &Trigger) {}

    fn notify_scheduler_listeners_finalized(&self, _trigger: &Trigger) {}

    fn signal_scheduling_change(&self, _candidate_next_fire_time: Option<DateTime<Utc>>) {}
}

#[cfg(any(test, feature = "test-support"))]
pub use recording::{RecordingSignaler, Signal};

#[cfg(any(test, feature = "test-support"))]
mod recording {
    use super::SchedulerSignaler;
    use crate::key::TriggerKey;
    use crate::trigger::Trigger;
    use chrono::{DateTime, Utc};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// A notification captured by [`RecordingSignaler`]
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum Signal {
        Misfired(TriggerKey),
        Finalized(TriggerKey),
        SchedulingChange(Option<DateTime<Utc>>),
    }

    /// Signaler that records every notification for assertions
    #[derive(Clone, Debug, Default)]
    pub struct RecordingSignaler {
        signals: Arc<Mutex<Vec<Signal>>>,
    }

    impl RecordingSignaler {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn signals(&self) -> Vec<Signal> {
            self.signals.lock().clone()
        }

        pub fn misfired(&self) -> Vec<TriggerKey> {
            self.signals
                .lock()
                .iter()
                .filter_map(|s| match s {
                    Signal::Misfired(key) => Some(key.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn finalized(&self) -> Vec<TriggerKey> {
            self.signals
                .lock()
                .iter()
                .filter_map(|s| match s {
                    Signal::Finalized(key) => Some(key.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn clear(&self) {
            self.signals.lock().clear();
        }
    }

    impl SchedulerSignaler for RecordingSignaler {
        fn notify_trigger_listeners_misfired(&self, trigger: &Trigger) {
            self.signals.lock().push(Signal::Misfired(trigger.key.clone()));
        }

        fn notify_scheduler_listeners_finalized(&self, trigger: &Trigger) {
            self.signals
                .lock()
                .push(Signal::Finalized(trigger.key.clone()));
        }

        fn signal_scheduling_change(&self, candidate_next_fire_time: Option<DateTime<Utc>>) {
            self.signals
                .lock()
                .push(Signal::SchedulingChange(candidate_next_fire_time));
        }
    }
}
