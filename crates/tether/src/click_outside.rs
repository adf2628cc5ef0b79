#![forbid(unsafe_code)]

//! Outside-press detection.
//!
//! [`OutsideClickDetector`] watches one optional target element and runs a
//! handler for every pointer press whose hit path does not contain the
//! target. With no target attached every press is outside, so nothing
//! fires; this mirrors a detector created before its element exists.

use std::cell::RefCell;
use std::rc::Rc;

use tether_core::element::ElementRef;
use tether_core::inputs::{PointerEvent, PointerSource};
use tether_core::observer::ObserverGuard;

/// Runs a handler when a press lands outside the watched element.
pub struct OutsideClickDetector {
    inner: Rc<RefCell<Inner>>,
}

struct Inner {
    target: Option<ElementRef>,
    handler: Rc<dyn Fn(&PointerEvent)>,
    guard: Option<ObserverGuard>,
    disposed: bool,
}

impl OutsideClickDetector {
    /// Subscribe to the pointer source; the detector is inert until a
    /// target is attached.
    #[must_use]
    pub fn new(source: Rc<dyn PointerSource>, handler: Rc<dyn Fn(&PointerEvent)>) -> Self {
        let inner = Rc::new(RefCell::new(Inner {
            target: None,
            handler,
            guard: None,
            disposed: false,
        }));

        let weak = Rc::downgrade(&inner);
        let guard = source.subscribe(Rc::new(move |event: &PointerEvent| {
            if let Some(rc) = weak.upgrade() {
                Inner::on_press(&rc, event);
            }
        }));
        inner.borrow_mut().guard = Some(guard);

        Self { inner }
    }

    /// Attach the element whose inside is exempt from the handler.
    pub fn set_target(&self, target: Option<ElementRef>) {
        self.inner.borrow_mut().target = target;
    }

    /// Currently watched element.
    #[must_use]
    pub fn target(&self) -> Option<ElementRef> {
        self.inner.borrow().target
    }

    /// Unsubscribe and stop firing. Idempotent; also runs on drop.
    pub fn dispose(&self) {
        let old_guard = {
            let mut inner = self.inner.borrow_mut();
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            inner.guard.take()
        };
        drop(old_guard);
    }
}

impl std::fmt::Debug for OutsideClickDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutsideClickDetector")
            .field("target", &self.inner.borrow().target)
            .finish()
    }
}

impl Inner {
    fn on_press(rc: &Rc<RefCell<Inner>>, event: &PointerEvent) {
        let handler = {
            let inner = rc.borrow();
            if inner.disposed {
                return;
            }
            match inner.target {
                Some(target) if !event.hits(target) => Some(Rc::clone(&inner.handler)),
                _ => None,
            }
        };
        if let Some(handler) = handler {
            handler(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_harness::SimPointer;

    fn detector(pointer: &SimPointer) -> (OutsideClickDetector, Rc<RefCell<u32>>) {
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let detector = OutsideClickDetector::new(
            Rc::new(pointer.clone()),
            Rc::new(move |_| *c.borrow_mut() += 1),
        );
        (detector, count)
    }

    #[test]
    fn press_outside_fires_the_handler() {
        let pointer = SimPointer::new();
        let (detector, count) = detector(&pointer);
        let menu = ElementRef::new();
        let elsewhere = ElementRef::new();
        detector.set_target(Some(menu));

        pointer.press(&[elsewhere]);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn press_inside_does_not_fire() {
        let pointer = SimPointer::new();
        let (detector, count) = detector(&pointer);
        let menu = ElementRef::new();
        let child = ElementRef::new();
        detector.set_target(Some(menu));

        // Path runs from the pressed node up to the root.
        pointer.press(&[child, menu]);
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn without_a_target_nothing_fires() {
        let pointer = SimPointer::new();
        let (_detector, count) = detector(&pointer);
        pointer.press(&[ElementRef::new()]);
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn detaching_the_target_makes_it_inert_again() {
        let pointer = SimPointer::new();
        let (detector, count) = detector(&pointer);
        let menu = ElementRef::new();
        detector.set_target(Some(menu));
        detector.set_target(None);

        pointer.press(&[ElementRef::new()]);
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn dispose_stops_firing() {
        let pointer = SimPointer::new();
        let (detector, count) = detector(&pointer);
        detector.set_target(Some(ElementRef::new()));
        detector.dispose();
        detector.dispose();

        pointer.press(&[ElementRef::new()]);
        assert_eq!(*count.borrow(), 0);
    }
}
