#![forbid(unsafe_code)]

//! Single-target dimension tracker.
//!
//! Binds one caller-owned [`TargetHandle`] to one geometry snapshot.
//! While an element is attached, exactly one observation subscription is
//! open for it; each change batch publishes its first record, either
//! synchronously (`debounce_ms == 0`) or after a coalescing debounce
//! window.
//!
//! # Invariants
//!
//! 1. At most one subscription and at most one pending timer exist per
//!    tracker at any time.
//! 2. The subscription is torn down and reopened iff the attachment
//!    transitions between absent and present, the attached element's
//!    identity changes, or the tracker is disposed — never per render or
//!    per batch.
//! 3. After `dispose()` (or detach), no timer fires and no batch is
//!    applied; late callbacks are rejected by epoch checks.
//! 4. Teardown is idempotent.
//!
//! # Failure Modes
//!
//! None reportable: an absent element is a steady state that yields no
//! subscription and a `None` snapshot, not an error.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::trace;

use tether_core::element::ElementRef;
use tether_core::geometry::{BoxModel, Dimensions};
use tether_core::observable::Observable;
use tether_core::observer::{BatchSink, DimensionChange, DimensionSource, ObserverGuard};
use tether_core::timer::TimerService;

use super::{FlushTimer, TrackerConfig};

/// Tracks the dimensions of a single attachable element.
///
/// Construct with [`DimensionTracker::new`], hand the [`TargetHandle`] to
/// whoever owns the real element, read (or subscribe to) the output via
/// [`DimensionTracker::output`]. Dropping the tracker disposes it.
pub struct DimensionTracker {
    inner: Rc<RefCell<Inner>>,
}

/// Caller-facing handle for binding a real element to the tracker's slot.
///
/// Holds the tracker weakly: once the tracker is disposed or dropped,
/// attach/detach become no-ops.
#[derive(Clone)]
pub struct TargetHandle {
    inner: Weak<RefCell<Inner>>,
}

struct Inner {
    config: TrackerConfig,
    source: Rc<dyn DimensionSource>,
    timers: Rc<dyn TimerService>,
    element: Option<ElementRef>,
    /// Memoized subscription key; re-subscription happens iff this changes.
    sub_key: Option<(ElementRef, BoxModel)>,
    guard: Option<ObserverGuard>,
    /// Liveness epoch for batch sinks; bumped on every re-subscription.
    sub_epoch: u64,
    staged: Option<Dimensions>,
    flush: FlushTimer,
    output: Observable<Option<Dimensions>>,
    disposed: bool,
}

enum BatchAction {
    Ignore,
    Publish(Dimensions),
    Arm(u64),
}

impl DimensionTracker {
    /// Create a tracker bound to an observation source and timer service.
    ///
    /// The output starts as `None` and stays `None` until the first change
    /// batch for an attached element is flushed.
    #[must_use]
    pub fn new(
        source: Rc<dyn DimensionSource>,
        timers: Rc<dyn TimerService>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                config,
                source,
                timers,
                element: None,
                sub_key: None,
                guard: None,
                sub_epoch: 0,
                staged: None,
                flush: FlushTimer::default(),
                output: Observable::new(None),
                disposed: false,
            })),
        }
    }

    /// The handle through which the caller attaches the real element.
    #[must_use]
    pub fn handle(&self) -> TargetHandle {
        TargetHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// The reactive snapshot output. `None` until the first flush.
    #[must_use]
    pub fn output(&self) -> Observable<Option<Dimensions>> {
        self.inner.borrow().output.clone()
    }

    /// Latest snapshot, if any batch has flushed.
    #[must_use]
    pub fn current(&self) -> Option<Dimensions> {
        self.inner.borrow().output.get()
    }

    /// Tear down: cancel any pending flush, close the subscription.
    ///
    /// Idempotent; also runs on drop. The output observable keeps its last
    /// value but will never change again.
    pub fn dispose(&self) {
        Inner::teardown(&self.inner);
    }
}

impl Drop for DimensionTracker {
    fn drop(&mut self) {
        Inner::teardown(&self.inner);
    }
}

impl std::fmt::Debug for DimensionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("DimensionTracker")
            .field("element", &inner.element)
            .field("subscribed", &inner.guard.is_some())
            .field("disposed", &inner.disposed)
            .finish()
    }
}

impl TargetHandle {
    /// Bind `element` to the tracker's slot, re-subscribing if its
    /// identity differs from the current attachment.
    pub fn attach(&self, element: ElementRef) {
        if let Some(inner) = self.inner.upgrade() {
            Inner::set_element(&inner, Some(element));
        }
    }

    /// Unbind the slot, closing the subscription and cancelling any
    /// pending flush.
    pub fn detach(&self) {
        if let Some(inner) = self.inner.upgrade() {
            Inner::set_element(&inner, None);
        }
    }

    /// The currently attached element, if any.
    #[must_use]
    pub fn attached(&self) -> Option<ElementRef> {
        self.inner.upgrade().and_then(|inner| inner.borrow().element)
    }
}

impl std::fmt::Debug for TargetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetHandle")
            .field("attached", &self.attached())
            .finish()
    }
}

impl Inner {
    fn set_element(rc: &Rc<RefCell<Inner>>, element: Option<ElementRef>) {
        let changed = {
            let mut inner = rc.borrow_mut();
            if inner.disposed {
                return;
            }
            inner.element = element;
            let key = element.map(|el| (el, inner.config.box_model));
            if key == inner.sub_key {
                false
            } else {
                inner.sub_key = key;
                true
            }
        };
        if changed {
            Self::resubscribe(rc);
        }
    }

    /// Replace the subscription to match the current attachment. The old
    /// guard (and any pending flush) is dead before the new subscription
    /// can deliver anything.
    fn resubscribe(rc: &Rc<RefCell<Inner>>) {
        let (old_guard, subscribe_to) = {
            let mut inner = rc.borrow_mut();
            inner.sub_epoch += 1;
            inner.staged = None;
            let timers = Rc::clone(&inner.timers);
            inner.flush.cancel(timers.as_ref());
            (inner.guard.take(), inner.element)
        };
        drop(old_guard);

        let Some(element) = subscribe_to else {
            trace!("dimension tracker unsubscribed (no element)");
            return;
        };

        let (source, box_model, epoch) = {
            let inner = rc.borrow();
            (
                Rc::clone(&inner.source),
                inner.config.box_model,
                inner.sub_epoch,
            )
        };
        let weak = Rc::downgrade(rc);
        let sink: BatchSink = Rc::new(move |batch: &[DimensionChange]| {
            if let Some(rc) = weak.upgrade() {
                Inner::on_batch(&rc, epoch, batch);
            }
        });
        let guard = source.subscribe(&[element], box_model, sink);
        trace!(element = %element, "dimension subscription opened");
        rc.borrow_mut().guard = Some(guard);
    }

    fn on_batch(rc: &Rc<RefCell<Inner>>, epoch: u64, batch: &[DimensionChange]) {
        let action = {
            let mut inner = rc.borrow_mut();
            if inner.disposed || epoch != inner.sub_epoch {
                trace!("dropping batch from superseded subscription");
                BatchAction::Ignore
            } else {
                match batch.first() {
                    None => BatchAction::Ignore,
                    Some(record) => {
                        if inner.config.debounce_ms == 0 {
                            BatchAction::Publish(record.content_rect)
                        } else {
                            inner.staged = Some(record.content_rect);
                            BatchAction::Arm(inner.config.debounce_ms)
                        }
                    }
                }
            }
        };
        match action {
            BatchAction::Ignore => {}
            BatchAction::Publish(rect) => {
                let output = rc.borrow().output.clone();
                output.set(Some(rect));
            }
            BatchAction::Arm(delay_ms) => Self::arm_flush(rc, delay_ms),
        }
    }

    fn arm_flush(rc: &Rc<RefCell<Inner>>, delay_ms: u64) {
        let (timers, epoch) = {
            let mut inner = rc.borrow_mut();
            let timers = Rc::clone(&inner.timers);
            let epoch = inner.flush.replace(timers.as_ref());
            (timers, epoch)
        };
        let weak = Rc::downgrade(rc);
        let id = timers.schedule(
            delay_ms,
            Box::new(move || {
                if let Some(rc) = weak.upgrade() {
                    Inner::on_flush(&rc, epoch);
                }
            }),
        );
        rc.borrow_mut().flush.armed(id);
    }

    fn on_flush(rc: &Rc<RefCell<Inner>>, epoch: u64) {
        let publish = {
            let mut inner = rc.borrow_mut();
            if inner.disposed || !inner.flush.try_fire(epoch) {
                trace!("dropping stale flush timer");
                None
            } else {
                inner.staged.take()
            }
        };
        if let Some(rect) = publish {
            let output = rc.borrow().output.clone();
            output.set(Some(rect));
        }
    }

    fn teardown(rc: &Rc<RefCell<Inner>>) {
        let old_guard = {
            let mut inner = rc.borrow_mut();
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            inner.sub_epoch += 1;
            inner.staged = None;
            let timers = Rc::clone(&inner.timers);
            inner.flush.cancel(timers.as_ref());
            inner.guard.take()
        };
        drop(old_guard);
        trace!("dimension tracker disposed");
    }
}
