//! The completion primitive every asynchronous operation in the pipeline is built from: a
//! monotonic cell that transitions at most once from `InProcess` to a terminal status, draining
//! its observers exactly once at that moment.
//!
//! Modeled the way [`crate::manager`]'s request states and [`crate::task`]'s task handles are
//! modeled in the rest of the engine: a tagged state behind a short-lived lock, never a
//! `Future`/`Waker` pair, because the producer side runs on a worker thread that cannot suspend.

use parking_lot::Mutex;
use std::sync::Arc;

/// Status of an [`AsyncState`]. Transitions exactly once, `InProcess` -> `Ok` | `Failed`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AsyncStatus {
    InProcess,
    Ok,
    Failed,
}

/// A downstream state that wants to hear about this state's terminal transition. Used by
/// [`crate::async_handle::join`] to chain completion without borrowing a typed result.
pub trait ChildState: Send + Sync {
    fn notify(&self, status: AsyncStatus);
}

type CompletionCallback<T> = Box<dyn FnOnce(AsyncStatus, Option<T>) + Send>;

enum Inner<T> {
    InProcess {
        callbacks: Vec<CompletionCallback<T>>,
        children: Vec<Arc<dyn ChildState>>,
    },
    Ok(T),
    Failed,
}

impl<T> Inner<T> {
    fn status(&self) -> AsyncStatus {
        match self {
            Inner::InProcess { .. } => AsyncStatus::InProcess,
            Inner::Ok(_) => AsyncStatus::Ok,
            Inner::Failed => AsyncStatus::Failed,
        }
    }
}

/// Shared completion state of type `T`. Producers call [`AsyncState::set_result`] or
/// [`AsyncState::set_failed`] exactly once; any number of observers may register a callback or
/// a child state, before or after that happens.
pub struct AsyncState<T> {
    inner: Mutex<Inner<T>>,
}

impl<T: Clone + Send + 'static> AsyncState<T> {
    pub fn new_pending() -> Self {
        Self {
            inner: Mutex::new(Inner::InProcess {
                callbacks: Vec::new(),
                children: Vec::new(),
            }),
        }
    }

    pub fn new_ok(value: T) -> Self {
        Self {
            inner: Mutex::new(Inner::Ok(value)),
        }
    }

    pub fn new_failed() -> Self {
        Self {
            inner: Mutex::new(Inner::Failed),
        }
    }

    pub fn status(&self) -> AsyncStatus {
        self.inner.lock().status()
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

    /// Returns a clone of the result, if the state has completed `Ok`.
    pub fn result(&self) -> Option<T> {
        match &*self.inner.lock() {
            Inner::Ok(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Sets the terminal result. Calling this on an already-terminal state is a programmer
    /// error: the new value is silently dropped and debug builds trap.
    pub fn set_result(&self, value: T) {
        let transitioned = self.try_transition(Inner::Ok(value));
        debug_assert!(
            transitioned,
            "set_result called on an already-terminal AsyncState"
        );
    }

    /// Sets the terminal failure. Same one-shot contract as [`Self::set_result`].
    pub fn set_failed(&self) {
        let transitioned = self.try_transition(Inner::Failed);
        debug_assert!(
            transitioned,
            "set_failed called on an already-terminal AsyncState"
        );
    }

    /// Non-panicking variant used by combinators (`join`) that may legitimately race to
    /// complete the same state and must absorb the loser silently.
    pub(crate) fn try_set_ok(&self, value: T) -> bool {
        self.try_transition(Inner::Ok(value))
    }

    pub(crate) fn try_set_failed(&self) -> bool {
        self.try_transition(Inner::Failed)
    }

    /// Registers `cb` to run once the state reaches a terminal status. If it already has,
    /// `cb` runs synchronously, right here, with the terminal status.
    pub fn add_on_completion(&self, cb: impl FnOnce(AsyncStatus, Option<T>) + Send + 'static) {
        let mut guard = self.inner.lock();
        match &mut *guard {
            Inner::InProcess { callbacks, .. } => callbacks.push(Box::new(cb)),
            Inner::Ok(value) => {
                let value = value.clone();
                drop(guard);
                cb(AsyncStatus::Ok, Some(value));
            }
            Inner::Failed => {
                drop(guard);
                cb(AsyncStatus::Failed, None);
            }
        }
    }

    /// Registers a child to be notified of this state's terminal transition. Same
    /// already-terminal fast path as [`Self::add_on_completion`].
    pub fn add_child(&self, child: Arc<dyn ChildState>) {
        let mut guard = self.inner.lock();
        match &mut *guard {
            Inner::InProcess { children, .. } => children.push(child),
            Inner::Ok(_) => {
                drop(guard);
                child.notify(AsyncStatus::Ok);
            }
            Inner::Failed => {
                drop(guard);
                child.notify(AsyncStatus::Failed);
            }
        }
    }

    /// Spins until the state is terminal. Never call this from the worker pool thread that
    /// might be responsible for completing the state.
    pub fn wait_completed(&self) {
        while !self.is_completed() {
            std::thread::yield_now();
        }
    }

    fn try_transition(&self, terminal: Inner<T>) -> bool {
        let status = terminal.status();
        debug_assert_ne!(status, AsyncStatus::InProcess);

        let (callbacks, children) = {
            let mut guard = self.inner.lock();
            if !matches!(&*guard, Inner::InProcess { .. }) {
                return false;
            }
            match std::mem::replace(&mut *guard, terminal) {
                Inner::InProcess { callbacks, children } => (callbacks, children),
                _ => unreachable!(),
            }
        };

        for child in children {
            child.notify(status);
        }

        let value = if status == AsyncStatus::Ok {
            self.result()
        } else {
            None
        };
        for callback in callbacks {
            callback(status, value.clone());
        }

        true
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fresh_state_is_in_process() {
        let state = AsyncState::<i32>::new_pending();
        assert_eq!(state.status(), AsyncStatus::InProcess);
        assert_eq!(state.result(), None);
    }

    #[test]
    fn set_result_transitions_once_and_fires_callbacks() {
        let state = Arc::new(AsyncState::<i32>::new_pending());
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = seen.clone();
        state.add_on_completion(move |status, value| {
            assert_eq!(status, AsyncStatus::Ok);
            assert_eq!(value, Some(7));
            seen2.fetch_add(1, Ordering::SeqCst);
        });
        state.set_result(7);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(state.is_ok());
        assert_eq!(state.result(), Some(7));
    }

    #[test]
    fn late_registration_fires_synchronously() {
        let state = AsyncState::<i32>::new_ok(42);
        let observed = Arc::new(Mutex::new(None));
        let observed2 = observed.clone();
        state.add_on_completion(move |status, value| {
            *observed2.lock() = Some((status, value));
        });
        assert_eq!(*observed.lock(), Some((AsyncStatus::Ok, Some(42))));
    }

    #[test]
    fn failed_state_carries_no_result() {
        let state = AsyncState::<i32>::new_failed();
        assert!(state.is_failed());
        assert_eq!(state.result(), None);
    }
}
