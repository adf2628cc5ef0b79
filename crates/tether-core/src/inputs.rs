#![forbid(unsafe_code)]

//! Boundaries to the remaining external signal sources.
//!
//! Each trait models one browser-ish collaborator at its seam: scroll
//! offsets, viewport size, media-query matching, pointer presses, and a
//! string key-value preference store. All follow the same shape as
//! [`DimensionSource`](crate::observer::DimensionSource): a synchronous
//! read of the current state where one exists, plus `subscribe` returning
//! an idempotent [`ObserverGuard`].

use std::rc::Rc;

use crate::element::ElementRef;
use crate::observer::ObserverGuard;

/// Scroll offsets of a scrollable target, with the maximum scrollable
/// range so progress can be derived.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollOffsets {
    pub x: f64,
    pub y: f64,
    /// Maximum scrollable distance on each axis; 0 when nothing scrolls.
    pub max_x: f64,
    pub max_y: f64,
}

/// External scroll-event source for one scrollable target.
pub trait ScrollSource {
    /// Current offsets, read synchronously.
    fn current(&self) -> ScrollOffsets;

    /// Deliver a notification after each scroll event. The event carries
    /// no payload; consumers re-read [`ScrollSource::current`] when they
    /// sample.
    fn subscribe(&self, sink: Rc<dyn Fn()>) -> ObserverGuard;
}

/// Viewport dimensions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindowSize {
    pub width: f64,
    pub height: f64,
}

/// External viewport-resize source.
pub trait WindowSource {
    /// Current viewport size, read synchronously.
    fn current(&self) -> WindowSize;

    /// Deliver the new size after each resize event.
    fn subscribe(&self, sink: Rc<dyn Fn(WindowSize)>) -> ObserverGuard;
}

/// External media-query evaluator (`matchMedia` equivalent).
pub trait MediaSource {
    /// Whether `query` currently matches, read synchronously.
    fn matches(&self, query: &str) -> bool;

    /// Deliver the new match state whenever `query` flips.
    fn subscribe(&self, query: &str, sink: Rc<dyn Fn(bool)>) -> ObserverGuard;
}

/// One pointer press as seen by the outside-click detector.
///
/// `path` is the hit path from the pressed element up to the root, so
/// containment ("did the press land inside element E?") is membership of
/// `E` in the path.
#[derive(Clone, Debug, PartialEq)]
pub struct PointerEvent {
    pub path: Vec<ElementRef>,
}

impl PointerEvent {
    /// Whether the press landed on `element` or one of its descendants.
    #[must_use]
    pub fn hits(&self, element: ElementRef) -> bool {
        self.path.contains(&element)
    }
}

/// External pointer-press source (mousedown/touchstart equivalent).
pub trait PointerSource {
    /// Deliver every press anywhere in the document.
    fn subscribe(&self, sink: Rc<dyn Fn(&PointerEvent)>) -> ObserverGuard;
}

/// String key-value preference store (localStorage equivalent).
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}
