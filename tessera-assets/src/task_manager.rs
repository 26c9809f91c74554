//! Worker pool that executes [`Task`]s, optionally gated on a dependency.
//!
//! Grounded on the same shape as `fyrox-core`'s task pool (a `futures` thread pool reached
//! through a thin wrapper), but layered with dependency gating built out of
//! [`crate::async_state::AsyncState`] continuations rather than polling: a task with a pending
//! dependency is handed to the pool only once that dependency's completion callback fires.

use crate::async_handle::Async;
use crate::async_state::{AsyncState, AsyncStatus};
use crate::task::{Task, TaskContext, TaskHnd};
use std::sync::Arc;
use tessera_core::task_pool::TaskPool;

/// Schedules [`Task`]s onto a background worker pool, gating execution on a dependency when
/// one is given. Cheap to clone; every clone shares the same pool.
#[derive(Clone)]
pub struct TaskManager {
    pool: Arc<TaskPool>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self {
            pool: Arc::new(TaskPool::new()),
        }
    }

    pub fn with_worker_count(count: usize) -> Self {
        Self {
            pool: Arc::new(TaskPool::with_pool_size(count)),
        }
    }

    /// Schedules `task` with no dependency; it becomes ready immediately.
    pub fn schedule(&self, task: Task) -> TaskHnd {
        self.schedule_after(task, Async::ready())
    }

    /// Schedules `task` to run only once `depends_on` reaches `Ok`. If `depends_on` reaches
    /// `Failed` instead, the runnable never runs and the returned handle resolves `Failed`.
    pub fn schedule_after(&self, task: Task, depends_on: Async) -> TaskHnd {
        let state = Arc::new(AsyncState::<i32>::new_pending());
        let handle = TaskHnd::from_state(state.clone());

        let manager = self.clone();
        let Task { name: _, runnable } = task;
        let run: Box<dyn FnOnce() + Send> = Box::new(move || {
            let ctx = TaskContext::new(manager);
            let code = runnable(ctx);
            if code == 0 {
                state.set_result(code);
            } else {
                state.set_failed();
            }
        });

        match depends_on.status() {
            AsyncStatus::Ok => self.spawn(run),
            AsyncStatus::Failed => handle.set_failed(),
            AsyncStatus::InProcess => {
                let pool = self.clone();
                let on_dep_failed = handle.clone();
                depends_on.add_completion(move |status| match status {
                    AsyncStatus::Ok => pool.spawn(run),
                    AsyncStatus::Failed => on_dep_failed.set_failed(),
                    AsyncStatus::InProcess => unreachable!(),
                });
            }
        }

        handle
    }

    fn spawn(&self, run: Box<dyn FnOnce() + Send>) {
        let pool = self.pool.clone();
        // Routed through the pool even though the future is immediately ready: this keeps
        // execution off the submitter's thread in every case, not just the gated one.
        pool.spawn_task(async move { run() });
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn schedule_runs_the_runnable() {
        let manager = TaskManager::new();
        let handle = manager.schedule(Task::new("noop", |_ctx| 0));
        assert_eq!(handle.wait(), Some(0));
    }

    #[test]
    fn nonzero_return_fails_the_handle() {
        let manager = TaskManager::new();
        let handle = manager.schedule(Task::new("boom", |_ctx| 1));
        handle.state().wait_completed();
        assert!(handle.is_failed());
    }

    #[test]
    fn gated_task_waits_for_dependency() {
        use crate::async_handle::AsyncResult;

        let manager = TaskManager::new();
        let dep = AsyncResult::<i32>::pending();
        let handle = manager.schedule_after(Task::new("gated", |_ctx| 0), dep.erase());
        assert!(!handle.is_completed());
        dep.set_result(0);
        assert_eq!(handle.wait(), Some(0));
    }

    #[test]
    fn failed_dependency_skips_the_runnable() {
        use crate::async_handle::AsyncResult;
        use std::sync::atomic::{AtomicBool, Ordering};

        let manager = TaskManager::new();
        let dep = AsyncResult::<i32>::pending();
        let ran = Arc::new(AtomicBool::new(false));
        let ran2 = ran.clone();
        let handle = manager.schedule_after(
            Task::new("skipped", move |_ctx| {
                ran2.store(true, Ordering::SeqCst);
                0
            }),
            dep.erase(),
        );
        dep.set_failed();
        handle.state().wait_completed();
        assert!(handle.is_failed());
        assert!(!ran.load(Ordering::SeqCst));
    }
}
