//! Per-owner timer registry.
//!
//! Every timeout, interval and background task a client schedules is
//! registered here when it starts and removed when it finishes or is
//! cleared. Dropping the set aborts whatever is still registered.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// Identifies one registered timer or task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

type Handles = Arc<Mutex<HashMap<TimerId, JoinHandle<()>>>>;

#[derive(Default)]
pub struct TimerSet {
    next_id: AtomicU64,
    handles: Handles,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` once after `delay`. The timer deregisters itself
    /// after firing.
    pub fn set_timeout(&self, delay: Duration, callback: impl FnOnce() + Send + 'static) -> TimerId {
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        })
    }

    /// Run `callback` every `period`, first after one full period.
    pub fn set_interval(&self, period: Duration, mut callback: impl FnMut() + Send + 'static) -> TimerId {
        self.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                callback();
            }
        })
    }

    /// Track a background task. It deregisters itself when it completes.
    pub fn spawn(&self, task: impl Future<Output = ()> + Send + 'static) -> TimerId {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handles = Arc::clone(&self.handles);

        // Registration happens under the lock, so a task that finishes
        // immediately still waits for its entry before removing it.
        let mut registered = self.handles.lock();
        let handle = tokio::spawn(async move {
            task.await;
            handles.lock().remove(&id);
        });
        registered.insert(id, handle);
        id
    }

    /// Cancel one timer. Returns `false` if it already fired or was cleared.
    pub fn clear(&self, id: TimerId) -> bool {
        match self.handles.lock().remove(&id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel everything still registered; returns how many were cancelled.
    pub fn clear_all(&self) -> usize {
        let drained: Vec<_> = self.handles.lock().drain().collect();
        for (_, handle) in &drained {
            handle.abort();
        }
        if !drained.is_empty() {
            debug!(count = drained.len(), "Cleared timers");
        }
        drained.len()
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.handles.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.lock().is_empty()
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.clear_all();
    }
}

impl fmt::Debug for TimerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerSet").field("active", &self.len()).finish()
    }
}
