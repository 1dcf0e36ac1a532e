//! Worker lifecycle tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Lifecycle states of an application worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WorkerState {
    /// Allocated, nothing injected yet.
    Constructed,
    /// Identity and paths injected.
    Configured,
    /// Running on its own thread, activating resolvers and bootstrapping.
    Activating,
    /// Entry object built, idling.
    Running,
    /// Worker thread has finished, normally or not.
    Terminated,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Constructed => "constructed",
            Self::Configured => "configured",
            Self::Activating => "activating",
            Self::Running => "running",
            Self::Terminated => "terminated",
        };
        f.write_str(label)
    }
}

/// Observer trait for worker state transitions.
///
/// Called on the thread performing the transition.
pub trait LifecycleObserver: Send + Sync {
    /// Called after `application` moved from `from` to `to`.
    fn on_transition(&self, application: &str, from: WorkerState, to: WorkerState);
}

#[derive(Debug)]
struct Status {
    state: WorkerState,
    entry_type: Option<&'static str>,
}

/// State shared between a worker thread and its handle.
pub(crate) struct StatusCell {
    status: Mutex<Status>,
    changed: Condvar,
    idle_cycles: AtomicU64,
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl StatusCell {
    pub(crate) fn new(observers: Vec<Arc<dyn LifecycleObserver>>) -> Self {
        Self {
            status: Mutex::new(Status {
                state: WorkerState::Configured,
                entry_type: None,
            }),
            changed: Condvar::new(),
            idle_cycles: AtomicU64::new(0),
            observers,
        }
    }

    pub(crate) fn state(&self) -> WorkerState {
        self.lock().state
    }

    pub(crate) fn entry_type(&self) -> Option<&'static str> {
        self.lock().entry_type
    }

    pub(crate) fn set_entry_type(&self, entry_type: &'static str) {
        self.lock().entry_type = Some(entry_type);
    }

    pub(crate) fn transition(&self, application: &str, next: WorkerState) {
        let prev = {
            let mut status = self.lock();
            let prev = status.state;
            status.state = next;
            prev
        };
        self.changed.notify_all();
        if prev == next {
            return;
        }
        tracing::debug!(app = application, from = %prev, to = %next, "worker state");
        for observer in &self.observers {
            observer.on_transition(application, prev, next);
        }
    }

    /// Block until `target` (or `Terminated`) is reached, or `timeout` elapses.
    pub(crate) fn wait_for(&self, target: WorkerState, timeout: Duration) -> WorkerState {
        let deadline = Instant::now() + timeout;
        let mut status = self.lock();
        while status.state < target && status.state != WorkerState::Terminated {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            status = self
                .changed
                .wait_timeout(status, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        status.state
    }

    pub(crate) fn tick(&self) -> u64 {
        self.idle_cycles.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn idle_cycles(&self) -> u64 {
        self.idle_cycles.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
