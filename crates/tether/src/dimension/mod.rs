#![forbid(unsafe_code)]

//! Element dimension tracking.
//!
//! Two trackers share the same machinery:
//!
//! - [`DimensionTracker`]: one target, one geometry snapshot.
//! - [`MultiDimensionTracker`]: a fixed set of slots observed through one
//!   shared subscription, demultiplexed by element identity into an
//!   index-aligned snapshot array.
//!
//! Both hold at most one observation subscription and at most one pending
//! flush timer at any time. The subscription is replaced wholesale when
//! its key — the attached elements plus the box model — changes, and never
//! otherwise. A new change batch arriving inside the debounce window
//! cancels and replaces the pending timer, so one flush publishes the
//! latest staged data for the whole window.
//!
//! Every timer and subscription callback captures the epoch it was created
//! under and checks it against the tracker's current epoch before touching
//! state. A callback from a superseded subscription or timer — or one
//! arriving after disposal — is dropped without effect.

mod multi;
mod single;

pub use multi::{MultiDimensionTracker, SlotHandle};
pub use single::{DimensionTracker, TargetHandle};

use tether_core::geometry::BoxModel;
use tether_core::timer::{TimerId, TimerService};

/// Configuration shared by both dimension trackers.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrackerConfig {
    /// Which box of the observed element to measure.
    pub box_model: BoxModel,
    /// Debounce window in milliseconds; 0 publishes synchronously per
    /// batch.
    pub debounce_ms: u64,
}

impl TrackerConfig {
    /// Config with a debounce window and the default box model.
    #[must_use]
    pub fn debounced(debounce_ms: u64) -> Self {
        Self {
            box_model: BoxModel::default(),
            debounce_ms,
        }
    }
}

/// The single pending flush timer of a tracker, with its liveness epoch.
///
/// Arming goes through [`FlushTimer::replace`] (cancel whatever is
/// pending, mint the epoch the new callback must present) followed by
/// [`FlushTimer::armed`] once the service returns the id. The firing
/// callback calls [`FlushTimer::try_fire`]; a stale epoch means the timer
/// was replaced or cancelled after the callback was already committed, and
/// the flush must not happen.
#[derive(Debug, Default)]
pub(crate) struct FlushTimer {
    pending: Option<TimerId>,
    epoch: u64,
}

impl FlushTimer {
    /// Cancel any pending timer and mint the epoch for its replacement.
    pub(crate) fn replace(&mut self, timers: &dyn TimerService) -> u64 {
        if let Some(id) = self.pending.take() {
            timers.cancel(id);
        }
        self.epoch += 1;
        self.epoch
    }

    /// Record the id of the timer just scheduled.
    pub(crate) fn armed(&mut self, id: TimerId) {
        self.pending = Some(id);
    }

    /// Accept or reject a firing callback carrying `epoch`.
    pub(crate) fn try_fire(&mut self, epoch: u64) -> bool {
        if epoch == self.epoch && self.pending.is_some() {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Cancel any pending timer and invalidate outstanding callbacks.
    pub(crate) fn cancel(&mut self, timers: &dyn TimerService) {
        if let Some(id) = self.pending.take() {
            timers.cancel(id);
        }
        self.epoch += 1;
    }
}
