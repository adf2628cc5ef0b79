#![forbid(unsafe_code)]

//! Scripted dimension-observation driver.
//!
//! [`SimDimensions`] implements [`DimensionSource`]; tests push change
//! batches with [`SimDimensions::emit`] and they are delivered to every
//! open subscription, filtered to the targets that subscription observes
//! (a real observer never reports elements it was not asked about).
//!
//! Subscription bookkeeping is observable — [`subscriptions_opened`] and
//! [`active_subscriptions`] — so tests can assert that a tracker closes
//! and reopens its subscription exactly when it should and not, say, once
//! per delivered batch.
//!
//! [`subscriptions_opened`]: SimDimensions::subscriptions_opened
//! [`active_subscriptions`]: SimDimensions::active_subscriptions

use std::cell::RefCell;
use std::rc::Rc;

use tether_core::element::ElementRef;
use tether_core::geometry::BoxModel;
use tether_core::observer::{BatchSink, DimensionChange, DimensionSource, ObserverGuard};

struct ActiveSub {
    id: u64,
    targets: Vec<ElementRef>,
    box_model: BoxModel,
    sink: BatchSink,
}

struct DimensionsInner {
    next_id: u64,
    opened: u64,
    subs: Vec<ActiveSub>,
}

/// Deterministic [`DimensionSource`] driven by explicit `emit` calls.
#[derive(Clone)]
pub struct SimDimensions {
    inner: Rc<RefCell<DimensionsInner>>,
}

impl SimDimensions {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(DimensionsInner {
                next_id: 0,
                opened: 0,
                subs: Vec::new(),
            })),
        }
    }

    /// Deliver one change batch.
    ///
    /// Each open subscription receives the records whose target it
    /// observes, in the order given. Subscriptions observing none of the
    /// targets receive nothing (no empty-batch deliveries).
    pub fn emit(&self, records: &[DimensionChange]) {
        // Snapshot the sinks first: a sink may resubscribe or close while
        // handling the batch.
        let deliveries: Vec<(BatchSink, Vec<DimensionChange>)> = self
            .inner
            .borrow()
            .subs
            .iter()
            .filter_map(|sub| {
                let relevant: Vec<DimensionChange> = records
                    .iter()
                    .filter(|r| sub.targets.contains(&r.target))
                    .copied()
                    .collect();
                if relevant.is_empty() {
                    None
                } else {
                    Some((Rc::clone(&sub.sink), relevant))
                }
            })
            .collect();
        for (sink, batch) in deliveries {
            sink(&batch);
        }
    }

    /// Total number of subscriptions ever opened.
    #[must_use]
    pub fn subscriptions_opened(&self) -> u64 {
        self.inner.borrow().opened
    }

    /// Number of currently open subscriptions.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.inner.borrow().subs.len()
    }

    /// Targets observed by the most recently opened, still-active
    /// subscription, if any.
    #[must_use]
    pub fn last_active_targets(&self) -> Option<Vec<ElementRef>> {
        self.inner
            .borrow()
            .subs
            .last()
            .map(|s| s.targets.clone())
    }

    /// Box model of the most recently opened, still-active subscription.
    #[must_use]
    pub fn last_active_box_model(&self) -> Option<BoxModel> {
        self.inner.borrow().subs.last().map(|s| s.box_model)
    }
}

impl Default for SimDimensions {
    fn default() -> Self {
        Self::new()
    }
}

impl DimensionSource for SimDimensions {
    fn subscribe(
        &self,
        targets: &[ElementRef],
        box_model: BoxModel,
        sink: BatchSink,
    ) -> ObserverGuard {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.opened += 1;
            inner.subs.push(ActiveSub {
                id,
                targets: targets.to_vec(),
                box_model,
                sink,
            });
            id
        };
        let weak = Rc::downgrade(&self.inner);
        ObserverGuard::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().subs.retain(|s| s.id != id);
            }
        })
    }
}

impl std::fmt::Debug for SimDimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("SimDimensions")
            .field("opened", &inner.opened)
            .field("active", &inner.subs.len())
            .finish()
    }
}
