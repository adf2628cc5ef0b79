#![forbid(unsafe_code)]

//! Boundary to the external dimension-observation primitive.
//!
//! The real observer (a browser `ResizeObserver`, a layout engine, a test
//! driver) lives behind [`DimensionSource`]. It delivers change batches —
//! slices of [`DimensionChange`] records — to the sink at times of its own
//! choosing, at most one batch per layout pass. Records within a batch may
//! arrive in any order and may omit targets that did not change.
//!
//! # Invariants
//!
//! 1. A subscription delivers batches only between `subscribe` and the
//!    close of its [`ObserverGuard`].
//! 2. Closing is idempotent: explicit [`ObserverGuard::close`] and drop
//!    may both run, in any order, exactly one close takes effect.
//! 3. Batches are delivered in arrival order, one at a time, on the same
//!    single-threaded event queue as everything else.

use std::rc::Rc;

use crate::element::ElementRef;
use crate::geometry::{BoxModel, Dimensions};

/// One per-target record inside a change batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DimensionChange {
    /// The element this record measures.
    pub target: ElementRef,
    /// Geometry of the configured box at the time of the change.
    pub content_rect: Dimensions,
}

/// Callback receiving change batches from a [`DimensionSource`].
pub type BatchSink = Rc<dyn Fn(&[DimensionChange])>;

/// External dimension-observation primitive.
///
/// Implementations push batches into the sink for the subscribed targets
/// until the returned guard closes. The library opens at most one
/// subscription per tracker at any time and replaces it wholesale when its
/// target set or box model changes.
pub trait DimensionSource {
    /// Start observing `targets` under `box_model`, delivering batches to
    /// `sink`. Returns the guard that stops delivery.
    fn subscribe(
        &self,
        targets: &[ElementRef],
        box_model: BoxModel,
        sink: BatchSink,
    ) -> ObserverGuard;
}

/// RAII guard for one active observation subscription.
///
/// Stops delivery when closed; closing twice (or closing and then
/// dropping) is a no-op the second time.
pub struct ObserverGuard {
    close: Option<Box<dyn FnOnce()>>,
}

impl ObserverGuard {
    /// Wrap the teardown action of a subscription.
    #[must_use]
    pub fn new(close: impl FnOnce() + 'static) -> Self {
        Self {
            close: Some(Box::new(close)),
        }
    }

    /// A guard with no teardown action, for sources that need none.
    #[must_use]
    pub fn noop() -> Self {
        Self { close: None }
    }

    /// Stop delivery now. Idempotent.
    pub fn close(&mut self) {
        if let Some(close) = self.close.take() {
            close();
        }
    }
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ObserverGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverGuard")
            .field("open", &self.close.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn guard_close_is_idempotent() {
        let closed = Rc::new(Cell::new(0));
        let c = Rc::clone(&closed);
        let mut guard = ObserverGuard::new(move || c.set(c.get() + 1));

        guard.close();
        guard.close();
        assert_eq!(closed.get(), 1);

        drop(guard);
        assert_eq!(closed.get(), 1, "drop after close must not re-close");
    }

    #[test]
    fn guard_closes_on_drop() {
        let closed = Rc::new(Cell::new(false));
        let c = Rc::clone(&closed);
        {
            let _guard = ObserverGuard::new(move || c.set(true));
        }
        assert!(closed.get());
    }

    #[test]
    fn noop_guard_is_inert() {
        let mut guard = ObserverGuard::noop();
        guard.close();
    }
}
