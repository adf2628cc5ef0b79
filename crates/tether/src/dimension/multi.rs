#![forbid(unsafe_code)]

//! Multi-target dimension tracker.
//!
//! Owns a fixed number of slots, each independently attachable through a
//! [`SlotHandle`]. One shared subscription covers every attached element;
//! incoming batches are demultiplexed by element identity into a snapshot
//! array whose index `i` always mirrors slot `i`.
//!
//! # Invariants
//!
//! 1. The snapshot array has exactly `count` entries at every observable
//!    point; entry `i` only ever holds data for slot `i`'s attached
//!    element.
//! 2. One subscription for the whole slot set, replaced iff the attached
//!    *set* changes (size or membership); an empty set holds none.
//! 3. Records are resolved to an index against the attachments current at
//!    batch-processing time, never a cached index; unresolvable records
//!    are skipped.
//! 4. One shared debounce timer and one staged index→snapshot map; a new
//!    batch inside the window replaces the timer and merges its records
//!    last-write-wins per index. The fire applies the whole stage in one
//!    update.
//! 5. Entries without new data in a flush keep their previous value.
//!
//! # Failure Modes
//!
//! None reportable. A record for an element no longer attached anywhere is
//! silently skipped; an element attached to two slots resolves to the
//! lowest index.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use tracing::trace;

use tether_core::element::ElementRef;
use tether_core::geometry::{BoxModel, Dimensions};
use tether_core::observable::Observable;
use tether_core::observer::{BatchSink, DimensionChange, DimensionSource, ObserverGuard};
use tether_core::timer::TimerService;

use super::{FlushTimer, TrackerConfig};

/// Tracks the dimensions of a fixed-size set of attachable slots.
///
/// The slot count is fixed at construction; tracking a different count
/// means disposing this tracker and constructing a new one.
pub struct MultiDimensionTracker {
    inner: Rc<RefCell<Inner>>,
}

/// Caller-facing handle for one slot of a [`MultiDimensionTracker`].
#[derive(Clone)]
pub struct SlotHandle {
    inner: Weak<RefCell<Inner>>,
    index: usize,
}

struct Inner {
    config: TrackerConfig,
    source: Rc<dyn DimensionSource>,
    timers: Rc<dyn TimerService>,
    slots: Vec<Option<ElementRef>>,
    /// Identity → lowest slot index, rebuilt on every attachment change so
    /// batch resolution always sees the current attachments.
    index_of: AHashMap<ElementRef, usize>,
    /// Memoized subscription key: the attached set (sorted by identity)
    /// plus the box model.
    sub_key: Option<(Vec<ElementRef>, BoxModel)>,
    guard: Option<ObserverGuard>,
    sub_epoch: u64,
    staged: AHashMap<usize, Dimensions>,
    flush: FlushTimer,
    output: Observable<Vec<Option<Dimensions>>>,
    disposed: bool,
}

enum BatchAction {
    Ignore,
    Apply(Vec<(usize, Dimensions)>),
    Arm(u64),
}

impl MultiDimensionTracker {
    /// Create a tracker with `count` empty slots.
    #[must_use]
    pub fn new(
        count: usize,
        source: Rc<dyn DimensionSource>,
        timers: Rc<dyn TimerService>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                config,
                source,
                timers,
                slots: vec![None; count],
                index_of: AHashMap::new(),
                sub_key: None,
                guard: None,
                sub_epoch: 0,
                staged: AHashMap::new(),
                flush: FlushTimer::default(),
                output: Observable::new(vec![None; count]),
                disposed: false,
            })),
        }
    }

    /// Number of slots, fixed for the tracker's lifetime.
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.borrow().slots.len()
    }

    /// Handle for slot `index`, or `None` out of range.
    #[must_use]
    pub fn handle(&self, index: usize) -> Option<SlotHandle> {
        (index < self.count()).then(|| SlotHandle {
            inner: Rc::downgrade(&self.inner),
            index,
        })
    }

    /// Handles for every slot, in slot order.
    #[must_use]
    pub fn handles(&self) -> Vec<SlotHandle> {
        (0..self.count())
            .map(|index| SlotHandle {
                inner: Rc::downgrade(&self.inner),
                index,
            })
            .collect()
    }

    /// The reactive snapshot array, index-aligned with the slots.
    #[must_use]
    pub fn output(&self) -> Observable<Vec<Option<Dimensions>>> {
        self.inner.borrow().output.clone()
    }

    /// Current snapshot array.
    #[must_use]
    pub fn snapshots(&self) -> Vec<Option<Dimensions>> {
        self.inner.borrow().output.get()
    }

    /// Tear down: cancel any pending flush, close the subscription.
    /// Idempotent; also runs on drop.
    pub fn dispose(&self) {
        Inner::teardown(&self.inner);
    }
}

impl Drop for MultiDimensionTracker {
    fn drop(&mut self) {
        Inner::teardown(&self.inner);
    }
}

impl std::fmt::Debug for MultiDimensionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("MultiDimensionTracker")
            .field("count", &inner.slots.len())
            .field("attached", &inner.index_of.len())
            .field("subscribed", &inner.guard.is_some())
            .field("disposed", &inner.disposed)
            .finish()
    }
}

impl SlotHandle {
    /// This handle's slot index.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Bind `element` to this slot.
    pub fn attach(&self, element: ElementRef) {
        if let Some(inner) = self.inner.upgrade() {
            Inner::set_slot(&inner, self.index, Some(element));
        }
    }

    /// Unbind this slot. Its snapshot entry keeps the last known value.
    pub fn detach(&self) {
        if let Some(inner) = self.inner.upgrade() {
            Inner::set_slot(&inner, self.index, None);
        }
    }

    /// The element currently attached to this slot, if any.
    #[must_use]
    pub fn attached(&self) -> Option<ElementRef> {
        self.inner
            .upgrade()
            .and_then(|inner| inner.borrow().slots[self.index])
    }
}

impl std::fmt::Debug for SlotHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotHandle")
            .field("index", &self.index)
            .field("attached", &self.attached())
            .finish()
    }
}

impl Inner {
    fn rebuild_index(&mut self) {
        self.index_of.clear();
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(el) = slot {
                // Lowest index wins if an element occupies two slots.
                self.index_of.entry(*el).or_insert(i);
            }
        }
    }

    fn set_slot(rc: &Rc<RefCell<Inner>>, index: usize, element: Option<ElementRef>) {
        let set_changed = {
            let mut inner = rc.borrow_mut();
            if inner.disposed || inner.slots[index] == element {
                return;
            }
            inner.slots[index] = element;
            inner.rebuild_index();

            let mut attached: Vec<ElementRef> =
                inner.slots.iter().flatten().copied().collect();
            attached.sort_by_key(|el| el.id());
            attached.dedup();
            let key = (!attached.is_empty()).then(|| (attached, inner.config.box_model));
            if key == inner.sub_key {
                false
            } else {
                inner.sub_key = key;
                true
            }
        };
        if set_changed {
            Self::resubscribe(rc);
        }
    }

    fn resubscribe(rc: &Rc<RefCell<Inner>>) {
        let (old_guard, targets) = {
            let mut inner = rc.borrow_mut();
            inner.sub_epoch += 1;
            inner.staged.clear();
            let timers = Rc::clone(&inner.timers);
            inner.flush.cancel(timers.as_ref());
            let targets: Vec<ElementRef> = inner.slots.iter().flatten().copied().collect();
            (inner.guard.take(), targets)
        };
        drop(old_guard);

        if targets.is_empty() {
            trace!("multi dimension tracker unsubscribed (no attachments)");
            return;
        }

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
        let guard = source.subscribe(&targets, box_model, sink);
        trace!(targets = targets.len(), "dimension subscription opened");
        rc.borrow_mut().guard = Some(guard);
    }

    fn on_batch(rc: &Rc<RefCell<Inner>>, epoch: u64, batch: &[DimensionChange]) {
        let action = {
            let mut inner = rc.borrow_mut();
            if inner.disposed || epoch != inner.sub_epoch {
                trace!("dropping batch from superseded subscription");
                BatchAction::Ignore
            } else {
                // Resolve against the attachments as they are *now*; a
                // record whose target has been detached since delivery was
                // scheduled simply resolves to nothing.
                let resolved: Vec<(usize, Dimensions)> = batch
                    .iter()
                    .filter_map(|record| {
                        inner
                            .index_of
                            .get(&record.target)
                            .map(|&i| (i, record.content_rect))
                    })
                    .collect();
                if resolved.is_empty() {
                    BatchAction::Ignore
                } else if inner.config.debounce_ms == 0 {
                    BatchAction::Apply(resolved)
                } else {
                    for (index, rect) in resolved {
                        inner.staged.insert(index, rect);
                    }
                    BatchAction::Arm(inner.config.debounce_ms)
                }
            }
        };
        match action {
            BatchAction::Ignore => {}
            BatchAction::Apply(entries) => Self::apply(rc, &entries),
            BatchAction::Arm(delay_ms) => Self::arm_flush(rc, delay_ms),
        }
    }

    /// Write `entries` into the snapshot array in one update; untouched
    /// indices keep their previous value.
    fn apply(rc: &Rc<RefCell<Inner>>, entries: &[(usize, Dimensions)]) {
        let output = rc.borrow().output.clone();
        let mut snapshots = output.get();
        for &(index, rect) in entries {
            snapshots[index] = Some(rect);
        }
        output.set(snapshots);
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
        let staged = {
            let mut inner = rc.borrow_mut();
            if inner.disposed || !inner.flush.try_fire(epoch) {
                trace!("dropping stale flush timer");
                return;
            }
            std::mem::take(&mut inner.staged)
        };
        let entries: Vec<(usize, Dimensions)> = staged.into_iter().collect();
        if !entries.is_empty() {
            Self::apply(rc, &entries);
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
            inner.staged.clear();
            let timers = Rc::clone(&inner.timers);
            inner.flush.cancel(timers.as_ref());
            inner.guard.take()
        };
        drop(old_guard);
        trace!("multi dimension tracker disposed");
    }
}
