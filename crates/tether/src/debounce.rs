#![forbid(unsafe_code)]

//! Debounced value.
//!
//! [`Debounced<T>`] republishes the most recently written value once the
//! input has been quiet for `delay_ms`. Every write cancels and replaces
//! the single pending timer, so a burst of writes produces one output
//! change carrying the last value of the burst.
//!
//! A zero delay still goes through the timer service — the publish lands
//! one scheduled turn later, never inside `set` itself.

use std::cell::RefCell;
use std::rc::Rc;

use tether_core::observable::Observable;
use tether_core::timer::TimerService;

use crate::dimension::FlushTimer;

/// A value whose output trails its input by a quiet period.
pub struct Debounced<T: Clone + PartialEq + 'static> {
    inner: Rc<RefCell<Inner<T>>>,
}

struct Inner<T: Clone + PartialEq + 'static> {
    timers: Rc<dyn TimerService>,
    delay_ms: u64,
    staged: Option<T>,
    flush: FlushTimer,
    output: Observable<T>,
    disposed: bool,
}

impl<T: Clone + PartialEq + 'static> Debounced<T> {
    /// Create with an initial value, published immediately.
    #[must_use]
    pub fn new(timers: Rc<dyn TimerService>, delay_ms: u64, initial: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                timers,
                delay_ms,
                staged: None,
                flush: FlushTimer::default(),
                output: Observable::new(initial),
                disposed: false,
            })),
        }
    }

    /// Write a new input value, restarting the quiet period.
    pub fn set(&self, value: T) {
        let (timers, delay_ms, epoch) = {
            let mut inner = self.inner.borrow_mut();
            if inner.disposed {
                return;
            }
            inner.staged = Some(value);
            let timers = Rc::clone(&inner.timers);
            let epoch = inner.flush.replace(timers.as_ref());
            (timers, inner.delay_ms, epoch)
        };
        let weak = Rc::downgrade(&self.inner);
        let id = timers.schedule(
            delay_ms,
            Box::new(move || {
                if let Some(rc) = weak.upgrade() {
                    Inner::on_flush(&rc, epoch);
                }
            }),
        );
        self.inner.borrow_mut().flush.armed(id);
    }

    /// The debounced output.
    #[must_use]
    pub fn output(&self) -> Observable<T> {
        self.inner.borrow().output.clone()
    }

    /// Current debounced value (not the staged input).
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().output.get()
    }

    /// Cancel any pending publish and stop reacting to `set`. Idempotent.
    pub fn dispose(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.disposed {
            return;
        }
        inner.disposed = true;
        inner.staged = None;
        let timers = Rc::clone(&inner.timers);
        inner.flush.cancel(timers.as_ref());
    }
}

impl<T: Clone + PartialEq + 'static> Drop for Debounced<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T: Clone + PartialEq + 'static> Inner<T> {
    fn on_flush(rc: &Rc<RefCell<Inner<T>>>, epoch: u64) {
        let publish = {
            let mut inner = rc.borrow_mut();
            if inner.disposed || !inner.flush.try_fire(epoch) {
                None
            } else {
                inner.staged.take()
            }
        };
        if let Some(value) = publish {
            let output = rc.borrow().output.clone();
            output.set(value);
        }
    }
}

impl<T: Clone + PartialEq + std::fmt::Debug + 'static> std::fmt::Debug for Debounced<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Debounced")
            .field("value", &inner.output.get())
            .field("delay_ms", &inner.delay_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_harness::SimTimers;

    fn debounced(delay: u64) -> (Debounced<&'static str>, SimTimers) {
        let timers = SimTimers::new();
        let d = Debounced::new(Rc::new(timers.clone()), delay, "initial");
        (d, timers)
    }

    #[test]
    fn publishes_after_quiet_period() {
        let (d, timers) = debounced(500);
        d.set("typed");

        timers.advance(499);
        assert_eq!(d.get(), "initial");
        timers.advance(1);
        assert_eq!(d.get(), "typed");
    }

    #[test]
    fn burst_collapses_to_last_value() {
        let (d, timers) = debounced(500);
        d.set("t");
        timers.advance(100);
        d.set("te");
        timers.advance(100);
        d.set("test");

        timers.advance(499);
        assert_eq!(d.get(), "initial", "quiet period restarts on each write");
        timers.advance(1);
        assert_eq!(d.get(), "test");
    }

    #[test]
    fn burst_notifies_once() {
        let (d, timers) = debounced(200);
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let _sub = d.output().subscribe(move |_| *c.borrow_mut() += 1);

        d.set("a");
        d.set("b");
        d.set("c");
        timers.advance(200);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn zero_delay_is_still_deferred() {
        let (d, timers) = debounced(0);
        d.set("now");
        assert_eq!(d.get(), "initial", "set never publishes synchronously");
        timers.advance(0);
        assert_eq!(d.get(), "now");
    }

    #[test]
    fn dispose_cancels_pending_publish() {
        let (d, timers) = debounced(100);
        d.set("pending");
        d.dispose();
        d.dispose();

        timers.advance(1000);
        assert_eq!(d.get(), "initial");
        assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn set_after_dispose_is_ignored() {
        let (d, timers) = debounced(100);
        d.dispose();
        d.set("late");
        timers.advance(1000);
        assert_eq!(d.get(), "initial");
    }
}
