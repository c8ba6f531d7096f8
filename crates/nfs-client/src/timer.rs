//! Response timer.
//!
//! Tracks tasks that expect a bounded number of responses within a deadline.
//! Each response is handed to the task's callback; the task is removed when
//! the expected count is reached, when the deadline elapses (the callback then
//! sees [`TimerEvent::Timeout`] once), or when it is cancelled.
//!
//! Callbacks run with the task table unlocked, so they may add, cancel or
//! answer other tasks. Calls into one task's callback are serialised by a
//! per-task lock, so a callback must not hand a response to its own task.

use nfs_core::{NfsError, Result, TaskId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What a task callback is told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent<R> {
    /// One of the expected responses.
    Response(R),
    /// The deadline elapsed before all responses arrived.
    Timeout,
}

/// Per-task callback, called once per response and at most once on timeout.
pub type TaskCallback<R> = Box<dyn FnMut(TimerEvent<R>) + Send>;

type SharedCallback<R> = Arc<Mutex<TaskCallback<R>>>;

struct Task<R> {
    callback: SharedCallback<R>,
    remaining: usize,
    deadline: JoinHandle<()>,
}

struct TimerInner<R> {
    runtime: Handle,
    next_task_id: AtomicU64,
    tasks: Mutex<HashMap<TaskId, Task<R>>>,
}

/// Cheaply cloneable handle to a shared task table.
pub struct Timer<R> {
    inner: Arc<TimerInner<R>>,
}

impl<R> Clone for Timer<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn invoke<R>(callback: &SharedCallback<R>, event: TimerEvent<R>) {
    let mut guard = callback.lock();
    let callback: &mut (dyn FnMut(TimerEvent<R>) + Send) = &mut **guard;
    callback(event);
}

impl<R: Send + 'static> Timer<R> {
    /// Create a timer whose deadlines run on `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self {
            inner: Arc::new(TimerInner {
                runtime,
                next_task_id: AtomicU64::new(1),
                tasks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Allocate an id no earlier call returned.
    pub fn new_task_id(&self) -> TaskId {
        TaskId::new(self.inner.next_task_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register `callback` for `task_id`, expecting `expected_count` responses.
    ///
    /// An expected count of zero is treated as one. Re-registering a live id
    /// replaces the old task without notifying it.
    pub fn add_task(
        &self,
        timeout: Duration,
        callback: TaskCallback<R>,
        expected_count: usize,
        task_id: TaskId,
    ) {
        let weak = Arc::downgrade(&self.inner);
        let mut tasks = self.inner.tasks.lock();
        // Spawned under the lock so the deadline cannot observe the table
        // before the task is in it.
        let deadline = self.inner.runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            expire(weak, task_id);
        });
        let task = Task {
            callback: Arc::new(Mutex::new(callback)),
            remaining: expected_count.max(1),
            deadline,
        };
        if let Some(old) = tasks.insert(task_id, task) {
            warn!(task_id = %task_id, "replacing live timer task");
            old.deadline.abort();
        }
        debug!(
            task_id = %task_id,
            expected_count,
            timeout_ms = timeout.as_millis() as u64,
            "added timer task"
        );
    }

    /// Hand a response to the task's callback.
    ///
    /// Fails with [`NfsError::NoSuchElement`] if the task is unknown.
    pub fn add_response(&self, task_id: TaskId, response: R) -> Result<()> {
        let callback = {
            let mut tasks = self.inner.tasks.lock();
            let task = tasks.get_mut(&task_id).ok_or(NfsError::NoSuchElement)?;
            task.remaining -= 1;
            let callback = Arc::clone(&task.callback);
            if task.remaining == 0 {
                if let Some(task) = tasks.remove(&task_id) {
                    task.deadline.abort();
                }
                debug!(task_id = %task_id, "timer task received all responses");
            }
            callback
        };
        invoke(&callback, TimerEvent::Response(response));
        Ok(())
    }

    /// Drop a task without notifying its callback. Returns whether it was live.
    pub fn cancel_task(&self, task_id: TaskId) -> bool {
        let removed = self.inner.tasks.lock().remove(&task_id);
        match removed {
            Some(task) => {
                task.deadline.abort();
                debug!(task_id = %task_id, "cancelled timer task");
                true
            }
            None => false,
        }
    }

    /// Whether `task_id` is still waiting for responses.
    pub fn is_pending(&self, task_id: TaskId) -> bool {
        self.inner.tasks.lock().contains_key(&task_id)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.tasks.lock().len()
    }
}

fn expire<R>(inner: Weak<TimerInner<R>>, task_id: TaskId) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let removed = inner.tasks.lock().remove(&task_id);
    if let Some(task) = removed {
        debug!(task_id = %task_id, "timer task timed out");
        invoke(&task.callback, TimerEvent::Timeout);
    }
}
