//! Type-erased and typed handles over an [`AsyncState`], and the `join` combinator that
//! chains several of them into one.

use crate::async_state::{AsyncState, AsyncStatus, ChildState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

trait AnyAsync: Send + Sync {
    fn status(&self) -> AsyncStatus;
    fn add_child(&self, child: Arc<dyn ChildState>);
    fn add_completion(&self, cb: Box<dyn FnOnce(AsyncStatus) + Send>);
}

impl<T: Clone + Send + 'static> AnyAsync for AsyncState<T> {
    fn status(&self) -> AsyncStatus {
        AsyncState::status(self)
    }

    fn add_child(&self, child: Arc<dyn ChildState>) {
        AsyncState::add_child(self, child)
    }

    fn add_completion(&self, cb: Box<dyn FnOnce(AsyncStatus) + Send>) {
        self.add_on_completion(move |status, _| cb(status));
    }
}

/// Type-erased handle to an [`AsyncState`]. What dependencies and join inputs are made of:
/// every observer here cares about the status, none of them about the payload type.
#[derive(Clone)]
pub struct Async(Arc<dyn AnyAsync>);

impl Async {
    pub(crate) fn from_state<T: Clone + Send + 'static>(state: Arc<AsyncState<T>>) -> Self {
        Async(state)
    }

    /// A handle that is already resolved `Ok`. Used as the dependency gate for tasks that have
    /// nothing to wait on.
    pub fn ready() -> Self {
        Async::from_state(Arc::new(AsyncState::<()>::new_ok(())))
    }

    pub fn status(&self) -> AsyncStatus {
        self.0.status()
    }

    pub fn is_ok(&self) -> bool {
        self.status() == AsyncStatus::Ok
    }

    pub fn is_failed(&self) -> bool {
        self.status() == AsyncStatus::Failed
    }

    pub fn is_completed(&self) -> bool {
        self.status() != AsyncStatus::InProcess
    }

    pub fn add_child(&self, child: Arc<dyn ChildState>) {
        self.0.add_child(child)
    }

    pub fn add_completion(&self, cb: impl FnOnce(AsyncStatus) + Send + 'static) {
        self.0.add_completion(Box::new(cb))
    }

    pub fn wait_completed(&self) {
        while !self.is_completed() {
            std::thread::yield_now();
        }
    }

    /// Completes `Ok` once every handle in `deps` completes `Ok`; completes `Failed` as soon
    /// as the first one fails. An empty slice resolves immediately `Ok`.
    pub fn join(deps: &[Async]) -> Async {
        if deps.is_empty() {
            return Async::ready();
        }

        let target = Arc::new(AsyncState::<()>::new_pending());
        let join_state = Arc::new(JoinState {
            ok_count: AtomicUsize::new(0),
            fail_count: AtomicUsize::new(0),
            to_wait: deps.len(),
            target: target.clone(),
        });

        for dep in deps {
            dep.add_child(join_state.clone() as Arc<dyn ChildState>);
        }

        Async::from_state(target)
    }
}

struct JoinState {
    ok_count: AtomicUsize,
    fail_count: AtomicUsize,
    to_wait: usize,
    target: Arc<AsyncState<()>>,
}

impl ChildState for JoinState {
    fn notify(&self, status: AsyncStatus) {
        match status {
            AsyncStatus::Ok => {
                let reached = self.ok_count.fetch_add(1, Ordering::AcqRel) + 1;
                if reached == self.to_wait {
                    self.target.try_set_ok(());
                }
            }
            AsyncStatus::Failed => {
                if self.fail_count.fetch_add(1, Ordering::AcqRel) == 0 {
                    self.target.try_set_failed();
                }
            }
            AsyncStatus::InProcess => {}
        }
    }
}

/// Typed handle to an [`AsyncState<T>`]. The producer-facing counterpart of [`Async`]: callers
/// that issued the request get one of these back and can read the eventual `T`.
#[derive(Clone)]
pub struct AsyncResult<T: Clone + Send + 'static>(Arc<AsyncState<T>>);

impl<T: Clone + Send + 'static> AsyncResult<T> {
    pub fn from_state(state: Arc<AsyncState<T>>) -> Self {
        Self(state)
    }

    pub fn pending() -> Self {
        Self(Arc::new(AsyncState::new_pending()))
    }

    pub fn ready(value: T) -> Self {
        Self(Arc::new(AsyncState::new_ok(value)))
    }

    pub fn failed() -> Self {
        Self(Arc::new(AsyncState::new_failed()))
    }

    pub fn status(&self) -> AsyncStatus {
        self.0.status()
    }

    pub fn is_ok(&self) -> bool {
        self.0.is_ok()
    }

    pub fn is_failed(&self) -> bool {
        self.0.is_failed()
    }

    pub fn is_completed(&self) -> bool {
        self.0.is_completed()
    }

    pub fn result(&self) -> Option<T> {
        self.0.result()
    }

    pub fn set_result(&self, value: T) {
        self.0.set_result(value)
    }

    pub fn set_failed(&self) {
        self.0.set_failed()
    }

    pub fn add_on_completion(&self, cb: impl FnOnce(AsyncStatus, Option<T>) + Send + 'static) {
        self.0.add_on_completion(cb)
    }

    /// Erases the payload type, for use as a join input or a task dependency.
    pub fn erase(&self) -> Async {
        Async::from_state(self.0.clone())
    }

    /// Blocks the calling thread until completion and returns the result, if any.
    pub fn wait(&self) -> Option<T> {
        self.0.wait_completed();
        self.result()
    }

    pub(crate) fn state(&self) -> &Arc<AsyncState<T>> {
        &self.0
    }
}
