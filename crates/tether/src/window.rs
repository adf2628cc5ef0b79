#![forbid(unsafe_code)]

//! Viewport-size tracking.
//!
//! [`WindowSizeTracker`] reads the current size synchronously at
//! construction and republishes on every resize event. The underlying
//! [`Observable`] deduplicates, so a resize event carrying the same size
//! does not notify subscribers.

use std::cell::RefCell;
use std::rc::Rc;

use tether_core::inputs::{WindowSize, WindowSource};
use tether_core::observable::Observable;
use tether_core::observer::ObserverGuard;

/// Tracks the viewport size.
pub struct WindowSizeTracker {
    output: Observable<WindowSize>,
    guard: RefCell<Option<ObserverGuard>>,
}

impl WindowSizeTracker {
    /// Create and immediately publish the source's current size.
    #[must_use]
    pub fn new(source: Rc<dyn WindowSource>) -> Self {
        let output = Observable::new(source.current());
        let sink_output = output.clone();
        let guard = source.subscribe(Rc::new(move |size| {
            sink_output.set(size);
        }));
        Self {
            output,
            guard: RefCell::new(Some(guard)),
        }
    }

    /// The tracked size.
    #[must_use]
    pub fn output(&self) -> Observable<WindowSize> {
        self.output.clone()
    }

    /// Current size.
    #[must_use]
    pub fn current(&self) -> WindowSize {
        self.output.get()
    }

    /// Unsubscribe from resize events. Idempotent; also runs on drop.
    pub fn dispose(&self) {
        drop(self.guard.borrow_mut().take());
    }
}

impl std::fmt::Debug for WindowSizeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowSizeTracker")
            .field("size", &self.output.get())
            .finish()
    }
}
