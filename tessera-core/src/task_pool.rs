// Copyright (c) 2019-present the Tessera Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Background thread pool used to execute fire-and-forget futures off the calling thread.
//! Higher layers (the asset pipeline's task scheduler) build their own completion tracking
//! on top of this; the pool itself only knows how to run a future to completion somewhere
//! else.

use std::cell::Cell;
use std::future::Future;

thread_local! {
    // Set once, from `after_start`, before any task ever runs on this thread. Defaults to 0
    // on any thread that isn't a pool worker (the calling thread, a test's main thread).
    static WORKER_ID: Cell<usize> = const { Cell::new(0) };
}

/// The pool worker index the calling thread is running on. Only meaningful from inside a
/// future spawned on a [`TaskPool`]; callers outside the pool always see `0`.
pub fn current_worker_id() -> usize {
    WORKER_ID.with(Cell::get)
}

/// Thin wrapper around a `futures` thread pool. Kept separate from its callers so the
/// executor can be swapped without touching scheduling logic built on top of it.
pub struct TaskPool {
    thread_pool: futures::executor::ThreadPool,
}

impl TaskPool {
    /// Creates a pool sized to `hardware_concurrency - 1` (minimum 1), leaving the main
    /// thread free.
    pub fn new() -> Self {
        let size = std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1).max(1))
            .unwrap_or(1);
        Self::with_pool_size(size)
    }

    /// Creates a pool with an explicit worker count.
    pub fn with_pool_size(size: usize) -> Self {
        let thread_pool = futures::executor::ThreadPoolBuilder::new()
            .pool_size(size.max(1))
            .name_prefix("tessera-worker-")
            .after_start(|idx| WORKER_ID.with(|cell| cell.set(idx)))
            .create()
            .expect("failed to start the background task pool");
        Self { thread_pool }
    }

    /// Spawns `future` on the pool. Returns immediately; the future runs on one of the
    /// worker threads.
    pub fn spawn_task<Fut>(&self, future: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        use futures::task::SpawnExt;
        self.thread_pool
            .spawn(future)
            .expect("task pool executor is no longer accepting work");
    }
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::new()
    }
}
