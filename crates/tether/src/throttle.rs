#![forbid(unsafe_code)]

//! Throttled value.
//!
//! [`Throttled<T>`] limits how often its output may change: at most once
//! per `delay_ms` window. A write outside the window publishes immediately
//! (leading edge); a write inside the window schedules one publication of
//! the latest value for the end of the window (trailing edge). Both edges
//! are individually configurable; further writes inside the window replace
//! the trailing timer and its staged value.

use std::cell::RefCell;
use std::rc::Rc;

use tether_core::observable::Observable;
use tether_core::timer::TimerService;

use crate::dimension::FlushTimer;

/// Which edges of the throttle window publish.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Publish immediately when a write arrives outside the window.
    pub leading: bool,
    /// Publish the latest value at the end of a busy window.
    pub trailing: bool,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            leading: true,
            trailing: true,
        }
    }
}

/// A value whose output changes at most once per window.
pub struct Throttled<T: Clone + PartialEq + 'static> {
    inner: Rc<RefCell<Inner<T>>>,
}

struct Inner<T: Clone + PartialEq + 'static> {
    timers: Rc<dyn TimerService>,
    delay_ms: u64,
    config: ThrottleConfig,
    last_published_at: u64,
    staged: Option<T>,
    flush: FlushTimer,
    output: Observable<T>,
    disposed: bool,
}

impl<T: Clone + PartialEq + 'static> Throttled<T> {
    /// Create with an initial value; the window starts closed, so the
    /// first write inside `delay_ms` of construction is trailing-edge.
    #[must_use]
    pub fn new(
        timers: Rc<dyn TimerService>,
        delay_ms: u64,
        config: ThrottleConfig,
        initial: T,
    ) -> Self {
        let now = timers.now_ms();
        Self {
            inner: Rc::new(RefCell::new(Inner {
                timers,
                delay_ms,
                config,
                last_published_at: now,
                staged: None,
                flush: FlushTimer::default(),
                output: Observable::new(initial),
                disposed: false,
            })),
        }
    }

    /// Write a new input value.
    pub fn set(&self, value: T) {
        enum Plan<T> {
            Drop,
            Publish(T),
            Trail { delay_ms: u64 },
        }

        let plan = {
            let mut inner = self.inner.borrow_mut();
            if inner.disposed {
                return;
            }
            let timers = Rc::clone(&inner.timers);
            let now = timers.now_ms();
            let elapsed = now - inner.last_published_at;
            // Any earlier trailing publication is superseded by this write.
            inner.flush.cancel(timers.as_ref());
            inner.staged = None;

            if elapsed >= inner.delay_ms {
                if inner.config.leading {
                    inner.last_published_at = now;
                    Plan::Publish(value)
                } else {
                    Plan::Drop
                }
            } else if inner.config.trailing {
                inner.staged = Some(value);
                Plan::Trail {
                    delay_ms: inner.delay_ms - elapsed,
                }
            } else {
                Plan::Drop
            }
        };

        match plan {
            Plan::Drop => {}
            Plan::Publish(value) => {
                let output = self.inner.borrow().output.clone();
                output.set(value);
            }
            Plan::Trail { delay_ms } => {
                let (timers, epoch) = {
                    let mut inner = self.inner.borrow_mut();
                    let timers = Rc::clone(&inner.timers);
                    let epoch = inner.flush.replace(timers.as_ref());
                    (timers, epoch)
                };
                let weak = Rc::downgrade(&self.inner);
                let id = timers.schedule(
                    delay_ms,
                    Box::new(move || {
                        if let Some(rc) = weak.upgrade() {
                            Inner::on_trailing(&rc, epoch);
                        }
                    }),
                );
                self.inner.borrow_mut().flush.armed(id);
            }
        }
    }

    /// The throttled output.
    #[must_use]
    pub fn output(&self) -> Observable<T> {
        self.inner.borrow().output.clone()
    }

    /// Current throttled value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().output.get()
    }

    /// Cancel any pending trailing publish and stop reacting to `set`.
    /// Idempotent.
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

impl<T: Clone + PartialEq + 'static> Drop for Throttled<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T: Clone + PartialEq + 'static> Inner<T> {
    fn on_trailing(rc: &Rc<RefCell<Inner<T>>>, epoch: u64) {
        let publish = {
            let mut inner = rc.borrow_mut();
            if inner.disposed || !inner.flush.try_fire(epoch) {
                None
            } else {
                let now = inner.timers.now_ms();
                inner.last_published_at = now;
                inner.staged.take()
            }
        };
        if let Some(value) = publish {
            let output = rc.borrow().output.clone();
            output.set(value);
        }
    }
}

impl<T: Clone + PartialEq + std::fmt::Debug + 'static> std::fmt::Debug for Throttled<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Throttled")
            .field("value", &inner.output.get())
            .field("delay_ms", &inner.delay_ms)
            .field("config", &inner.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_harness::SimTimers;

    fn throttled(delay: u64, config: ThrottleConfig) -> (Throttled<i32>, SimTimers) {
        let timers = SimTimers::new();
        let t = Throttled::new(Rc::new(timers.clone()), delay, config, 0);
        (t, timers)
    }

    #[test]
    fn leading_write_outside_window_publishes_now() {
        let (t, timers) = throttled(100, ThrottleConfig::default());
        timers.advance(100);
        t.set(1);
        assert_eq!(t.get(), 1);
    }

    #[test]
    fn writes_inside_window_trail_with_latest() {
        let (t, timers) = throttled(100, ThrottleConfig::default());
        timers.advance(100);
        t.set(1); // leading publish, window opens
        timers.advance(10);
        t.set(2);
        timers.advance(10);
        t.set(3);

        assert_eq!(t.get(), 1, "window is busy");
        timers.advance(80); // window closes at 100ms after the leading publish
        assert_eq!(t.get(), 3, "trailing edge publishes the latest value");
    }

    #[test]
    fn trailing_publish_reopens_the_window() {
        let (t, timers) = throttled(100, ThrottleConfig::default());
        timers.advance(100);
        t.set(1);
        timers.advance(50);
        t.set(2);
        timers.advance(50); // trailing publish of 2 at t=200

        assert_eq!(t.get(), 2);
        timers.advance(10);
        t.set(3);
        assert_eq!(t.get(), 2, "new window opened by the trailing publish");
        timers.advance(90);
        assert_eq!(t.get(), 3);
    }

    #[test]
    fn leading_only_drops_mid_window_writes() {
        let config = ThrottleConfig {
            leading: true,
            trailing: false,
        };
        let (t, timers) = throttled(100, config);
        timers.advance(100);
        t.set(1);
        timers.advance(10);
        t.set(2);

        timers.advance(1000);
        assert_eq!(t.get(), 1, "no trailing publication");
        assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn trailing_only_never_publishes_immediately() {
        let config = ThrottleConfig {
            leading: false,
            trailing: true,
        };
        let (t, timers) = throttled(100, config);
        // Inside the construction window: trails.
        t.set(1);
        timers.advance(10);
        t.set(2);
        assert_eq!(t.get(), 0, "leading edge disabled");
        timers.advance(90);
        assert_eq!(t.get(), 2);

        // Outside any window: with the leading edge disabled the write is
        // dropped and does not open a window.
        timers.advance(500);
        t.set(3);
        timers.advance(1000);
        assert_eq!(t.get(), 2);
    }

    #[test]
    fn window_starts_closed_at_construction() {
        let (t, timers) = throttled(100, ThrottleConfig::default());
        t.set(1);
        assert_eq!(t.get(), 0, "write right after construction trails");
        timers.advance(100);
        assert_eq!(t.get(), 1);
    }

    #[test]
    fn dispose_cancels_trailing_publish() {
        let (t, timers) = throttled(100, ThrottleConfig::default());
        t.set(1);
        t.dispose();
        timers.advance(1000);
        assert_eq!(t.get(), 0);
        assert_eq!(timers.pending(), 0);
    }
}
