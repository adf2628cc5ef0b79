#![forbid(unsafe_code)]

//! Manual-clock timer driver.
//!
//! [`SimTimers`] implements [`TimerService`] against a virtual clock that
//! only moves when the test calls [`SimTimers::advance`]. Due callbacks
//! fire in `(due_time, schedule_order)` order, with the clock set to each
//! callback's due time while it runs — so a callback that schedules a new
//! timer sees a consistent "now".
//!
//! # Invariants
//!
//! 1. Callbacks never run during `schedule` or `cancel`, only inside
//!    `advance`.
//! 2. The internal borrow is released before a callback runs, so callbacks
//!    may freely schedule and cancel.
//! 3. `cancel` of an unknown, already-fired, or already-cancelled id is a
//!    no-op.

use std::cell::RefCell;
use std::rc::Rc;

use tether_core::timer::{TimerId, TimerService};

struct Entry {
    due: u64,
    seq: u64,
    id: TimerId,
    callback: Box<dyn FnOnce()>,
}

struct TimersInner {
    now: u64,
    next_seq: u64,
    queue: Vec<Entry>,
}

/// Deterministic [`TimerService`] with a manually advanced clock.
#[derive(Clone)]
pub struct SimTimers {
    inner: Rc<RefCell<TimersInner>>,
}

impl SimTimers {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(TimersInner {
                now: 0,
                next_seq: 0,
                queue: Vec::new(),
            })),
        }
    }

    /// Move the clock forward by `ms`, firing every timer that comes due,
    /// in due-time order (schedule order breaks ties).
    ///
    /// `advance(0)` fires timers scheduled with a zero delay.
    pub fn advance(&self, ms: u64) {
        let target = self.inner.borrow().now + ms;
        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                let due_index = inner
                    .queue
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.due <= target)
                    .min_by_key(|(_, e)| (e.due, e.seq))
                    .map(|(i, _)| i);
                match due_index {
                    Some(i) => {
                        let entry = inner.queue.swap_remove(i);
                        // Callbacks observe their own due time as "now".
                        inner.now = inner.now.max(entry.due);
                        Some(entry.callback)
                    }
                    None => {
                        inner.now = target;
                        None
                    }
                }
            };
            match next {
                Some(callback) => callback(),
                None => break,
            }
        }
    }

    /// Number of timers currently scheduled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.borrow().queue.len()
    }
}

impl Default for SimTimers {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerService for SimTimers {
    fn schedule(&self, delay_ms: u64, callback: Box<dyn FnOnce()>) -> TimerId {
        let mut inner = self.inner.borrow_mut();
        let id = TimerId::next();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let due = inner.now + delay_ms;
        inner.queue.push(Entry {
            due,
            seq,
            id,
            callback,
        });
        id
    }

    fn cancel(&self, id: TimerId) {
        self.inner.borrow_mut().queue.retain(|e| e.id != id);
    }

    fn now_ms(&self) -> u64 {
        self.inner.borrow().now
    }
}

impl std::fmt::Debug for SimTimers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("SimTimers")
            .field("now", &inner.now)
            .field("pending", &inner.queue.len())
            .finish()
    }
}
