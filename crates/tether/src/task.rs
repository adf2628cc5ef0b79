#![forbid(unsafe_code)]

//! Single-flight async-task state.
//!
//! [`AsyncTask`] tracks one logical operation through
//! `Idle -> Running -> Done | Failed`. [`AsyncTask::start`] hands back a
//! [`Completion`] tagged with the run it belongs to; resolving or
//! rejecting a completion from a superseded run is a silent no-op, so a
//! slow first request can never clobber the result of a retry started
//! after it.
//!
//! # Invariants
//!
//! - At most one run is live; `start` supersedes any earlier one.
//! - A completion settles its run at most once, and only while that run
//!   is still the live one.
//! - After `dispose`, every outstanding completion is inert.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tether_core::observable::Observable;

/// Where one logical operation currently stands.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TaskState<T, E> {
    Idle,
    Running,
    Done(T),
    Failed(E),
}

impl<T, E> TaskState<T, E> {
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// The success value, if settled successfully.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Done(v) => Some(v),
            _ => None,
        }
    }

    /// The error, if settled with a failure.
    #[must_use]
    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Tracks one restartable async operation.
pub struct AsyncTask<T, E>
where
    T: Clone + PartialEq + 'static,
    E: Clone + PartialEq + 'static,
{
    inner: Rc<RefCell<Inner<T, E>>>,
}

struct Inner<T, E>
where
    T: Clone + PartialEq + 'static,
    E: Clone + PartialEq + 'static,
{
    state: Observable<TaskState<T, E>>,
    epoch: u64,
    disposed: bool,
}

/// Settles the run it was minted by; inert once that run is superseded.
pub struct Completion<T, E>
where
    T: Clone + PartialEq + 'static,
    E: Clone + PartialEq + 'static,
{
    inner: Weak<RefCell<Inner<T, E>>>,
    epoch: u64,
}

impl<T, E> AsyncTask<T, E>
where
    T: Clone + PartialEq + 'static,
    E: Clone + PartialEq + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                state: Observable::new(TaskState::Idle),
                epoch: 0,
                disposed: false,
            })),
        }
    }

    /// The task's state.
    #[must_use]
    pub fn state(&self) -> Observable<TaskState<T, E>> {
        self.inner.borrow().state.clone()
    }

    /// Current state snapshot.
    #[must_use]
    pub fn current(&self) -> TaskState<T, E> {
        self.inner.borrow().state.get()
    }

    /// Begin a new run, superseding any earlier one, and return its
    /// completion handle.
    #[must_use]
    pub fn start(&self) -> Completion<T, E> {
        let (output, epoch) = {
            let mut inner = self.inner.borrow_mut();
            inner.epoch += 1;
            (inner.state.clone(), inner.epoch)
        };
        output.set(TaskState::Running);
        Completion {
            inner: Rc::downgrade(&self.inner),
            epoch,
        }
    }

    /// Return to `Idle`, superseding any live run.
    pub fn reset(&self) {
        let output = {
            let mut inner = self.inner.borrow_mut();
            if inner.disposed {
                return;
            }
            inner.epoch += 1;
            inner.state.clone()
        };
        output.set(TaskState::Idle);
    }

    /// Make every outstanding completion inert. Idempotent.
    pub fn dispose(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.disposed = true;
        inner.epoch += 1;
    }
}

impl<T, E> Default for AsyncTask<T, E>
where
    T: Clone + PartialEq + 'static,
    E: Clone + PartialEq + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> std::fmt::Debug for AsyncTask<T, E>
where
    T: Clone + PartialEq + std::fmt::Debug + 'static,
    E: Clone + PartialEq + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncTask")
            .field("state", &self.current())
            .finish()
    }
}

impl<T, E> Completion<T, E>
where
    T: Clone + PartialEq + 'static,
    E: Clone + PartialEq + 'static,
{
    /// Settle the run successfully. No-op if superseded or disposed.
    pub fn resolve(self, value: T) {
        self.settle(TaskState::Done(value));
    }

    /// Settle the run with a failure. No-op if superseded or disposed.
    pub fn reject(self, error: E) {
        self.settle(TaskState::Failed(error));
    }

    /// Whether this completion still belongs to the live run.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner.upgrade().is_some_and(|rc| {
            let inner = rc.borrow();
            !inner.disposed && inner.epoch == self.epoch
        })
    }

    fn settle(self, state: TaskState<T, E>) {
        let Some(rc) = self.inner.upgrade() else {
            return;
        };
        let output = {
            let inner = rc.borrow();
            if inner.disposed || inner.epoch != self.epoch {
                return;
            }
            inner.state.clone()
        };
        output.set(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type StringTask = AsyncTask<String, String>;

    #[test]
    fn starts_idle() {
        let task = StringTask::new();
        assert_eq!(task.current(), TaskState::Idle);
    }

    #[test]
    fn resolve_moves_running_to_done() {
        let task = StringTask::new();
        let completion = task.start();
        assert!(task.current().is_running());

        completion.resolve("body".to_owned());
        assert_eq!(task.current().value().map(String::as_str), Some("body"));
    }

    #[test]
    fn reject_moves_running_to_failed() {
        let task = StringTask::new();
        task.start().reject("timeout".to_owned());
        assert_eq!(task.current().error().map(String::as_str), Some("timeout"));
    }

    #[test]
    fn superseded_completion_is_dropped() {
        let task = StringTask::new();
        let first = task.start();
        let second = task.start();
        assert!(!first.is_live());

        // The slow first request lands after the retry already settled.
        second.resolve("fresh".to_owned());
        first.resolve("stale".to_owned());
        assert_eq!(task.current().value().map(String::as_str), Some("fresh"));
    }

    #[test]
    fn stale_rejection_cannot_fail_a_newer_run() {
        let task = StringTask::new();
        let first = task.start();
        let second = task.start();

        first.reject("stale error".to_owned());
        assert!(task.current().is_running());
        second.resolve("ok".to_owned());
        assert_eq!(task.current().value().map(String::as_str), Some("ok"));
    }

    #[test]
    fn reset_supersedes_the_live_run() {
        let task = StringTask::new();
        let completion = task.start();
        task.reset();
        assert_eq!(task.current(), TaskState::Idle);

        completion.resolve("late".to_owned());
        assert_eq!(task.current(), TaskState::Idle);
    }

    #[test]
    fn dispose_makes_completions_inert() {
        let task = StringTask::new();
        let completion = task.start();
        task.dispose();
        task.dispose();

        assert!(!completion.is_live());
        completion.resolve("late".to_owned());
        assert!(task.current().is_running(), "state frozen at dispose time");
    }

    #[test]
    fn restart_after_settle_runs_again() {
        let task = StringTask::new();
        task.start().resolve("one".to_owned());
        let second = task.start();
        assert!(task.current().is_running());
        second.resolve("two".to_owned());
        assert_eq!(task.current().value().map(String::as_str), Some("two"));
    }
}
