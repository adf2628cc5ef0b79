#![forbid(unsafe_code)]

//! Scroll-position tracking with sampled throttling.
//!
//! [`ScrollTracker`] reads the initial position synchronously, then
//! samples: the first scroll event after an idle period arms a timer of
//! `sample_ms`; further events while it is pending are ignored; when it
//! fires, the tracker re-reads the source and publishes only if the
//! offsets actually moved. High-frequency scroll streams therefore cost
//! one read per sample window, and the published position is the one
//! current at sampling time, not the one from the event that armed it.

use std::cell::RefCell;
use std::rc::Rc;

use tether_core::inputs::{ScrollOffsets, ScrollSource};
use tether_core::observable::Observable;
use tether_core::observer::ObserverGuard;
use tether_core::timer::TimerService;

use crate::dimension::FlushTimer;

/// Scroll offsets plus per-axis progress through the scrollable range.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollPosition {
    pub x: f64,
    pub y: f64,
    /// 0.0..=1.0 through the scrollable range; 0.0 when nothing scrolls.
    pub progress_x: f64,
    pub progress_y: f64,
}

impl ScrollPosition {
    fn from_offsets(offsets: ScrollOffsets) -> Self {
        let ratio = |value: f64, max: f64| if max > 0.0 { value / max } else { 0.0 };
        Self {
            x: offsets.x,
            y: offsets.y,
            progress_x: ratio(offsets.x, offsets.max_x),
            progress_y: ratio(offsets.y, offsets.max_y),
        }
    }
}

/// Tracks the scroll position of one scrollable target.
pub struct ScrollTracker {
    inner: Rc<RefCell<Inner>>,
}

struct Inner {
    source: Rc<dyn ScrollSource>,
    timers: Rc<dyn TimerService>,
    sample_ms: u64,
    sampler: FlushTimer,
    sampling: bool,
    last_offsets: ScrollOffsets,
    output: Observable<ScrollPosition>,
    guard: Option<ObserverGuard>,
    disposed: bool,
}

impl ScrollTracker {
    /// Default sample window, matching common scroll-throttle practice.
    pub const DEFAULT_SAMPLE_MS: u64 = 100;

    /// Create and immediately publish the source's current position.
    #[must_use]
    pub fn new(
        source: Rc<dyn ScrollSource>,
        timers: Rc<dyn TimerService>,
        sample_ms: u64,
    ) -> Self {
        let initial = source.current();
        let inner = Rc::new(RefCell::new(Inner {
            source: Rc::clone(&source),
            timers,
            sample_ms,
            sampler: FlushTimer::default(),
            sampling: false,
            last_offsets: initial,
            output: Observable::new(ScrollPosition::from_offsets(initial)),
            guard: None,
            disposed: false,
        }));

        let weak = Rc::downgrade(&inner);
        let guard = source.subscribe(Rc::new(move || {
            if let Some(rc) = weak.upgrade() {
                Inner::on_scroll(&rc);
            }
        }));
        inner.borrow_mut().guard = Some(guard);

        Self { inner }
    }

    /// The tracked position.
    #[must_use]
    pub fn output(&self) -> Observable<ScrollPosition> {
        self.inner.borrow().output.clone()
    }

    /// Current position.
    #[must_use]
    pub fn current(&self) -> ScrollPosition {
        self.inner.borrow().output.get()
    }

    /// Stop sampling and unsubscribe. Idempotent; also runs on drop.
    pub fn dispose(&self) {
        let old_guard = {
            let mut inner = self.inner.borrow_mut();
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            inner.sampling = false;
            let timers = Rc::clone(&inner.timers);
            inner.sampler.cancel(timers.as_ref());
            inner.guard.take()
        };
        drop(old_guard);
    }
}

impl Drop for ScrollTracker {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for ScrollTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ScrollTracker")
            .field("position", &inner.output.get())
            .field("sample_ms", &inner.sample_ms)
            .finish()
    }
}

impl Inner {
    fn on_scroll(rc: &Rc<RefCell<Inner>>) {
        let (timers, sample_ms, epoch) = {
            let mut inner = rc.borrow_mut();
            if inner.disposed || inner.sampling {
                return;
            }
            inner.sampling = true;
            let timers = Rc::clone(&inner.timers);
            let epoch = inner.sampler.replace(timers.as_ref());
            (timers, inner.sample_ms, epoch)
        };
        let weak = Rc::downgrade(rc);
        let id = timers.schedule(
            sample_ms,
            Box::new(move || {
                if let Some(rc) = weak.upgrade() {
                    Inner::on_sample(&rc, epoch);
                }
            }),
        );
        rc.borrow_mut().sampler.armed(id);
    }

    fn on_sample(rc: &Rc<RefCell<Inner>>, epoch: u64) {
        let publish = {
            let mut inner = rc.borrow_mut();
            if inner.disposed || !inner.sampler.try_fire(epoch) {
                return;
            }
            inner.sampling = false;
            let offsets = inner.source.current();
            if offsets.x == inner.last_offsets.x && offsets.y == inner.last_offsets.y {
                None
            } else {
                inner.last_offsets = offsets;
                Some(ScrollPosition::from_offsets(offsets))
            }
        };
        if let Some(position) = publish {
            let output = rc.borrow().output.clone();
            output.set(position);
        }
    }
}
