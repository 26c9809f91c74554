//! A [`Task`] binds a synchronous runnable to a name for diagnostics. Scheduling one on a
//! [`crate::task_manager::TaskManager`] returns a [`TaskHnd`] that reflects the runnable's
//! return code.

use crate::async_handle::AsyncResult;
use crate::task_manager::TaskManager;

/// Context handed to a running task. Carries the index of the worker thread running it and a
/// handle back to the manager so the runnable can schedule further sub-tasks (the shader
/// builder does this to compile modules in parallel).
#[derive(Clone)]
pub struct TaskContext {
    worker_id: usize,
    tasks: TaskManager,
}

impl TaskContext {
    pub(crate) fn new(tasks: TaskManager) -> Self {
        Self {
            worker_id: tessera_core::task_pool::current_worker_id(),
            tasks,
        }
    }

    /// Index of the pool worker this task is running on.
    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    pub fn tasks(&self) -> &TaskManager {
        &self.tasks
    }
}

/// `AsyncResult<i32>` produced by scheduling a [`Task`]: zero is success, non-zero is failure.
pub type TaskHnd = AsyncResult<i32>;

/// A unit of work for the worker pool. Returns `0` on success and any non-zero value on
/// failure; the pool turns that into the handle's terminal [`crate::async_state::AsyncStatus`].
pub struct Task {
    pub(crate) name: String,
    pub(crate) runnable: Box<dyn FnOnce(TaskContext) -> i32 + Send>,
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        runnable: impl FnOnce(TaskContext) -> i32 + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            runnable: Box::new(runnable),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
