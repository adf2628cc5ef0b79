#![forbid(unsafe_code)]

//! Scripted drivers for the input boundaries: scroll, window size, media
//! queries, pointer presses, and an in-memory preference store.
//!
//! All follow the same pattern as [`SimDimensions`](crate::SimDimensions):
//! `Rc<RefCell<..>>` state, sinks registered by `subscribe` and removed by
//! the guard, and explicit mutator methods that both update the state and
//! notify — with the borrow released before any sink runs.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tether_core::element::ElementRef;
use tether_core::inputs::{
    MediaSource, PointerEvent, PointerSource, PreferenceStore, ScrollOffsets, ScrollSource,
    WindowSize, WindowSource,
};
use tether_core::observer::ObserverGuard;

fn remove_sink<T: 'static>(sinks: &Rc<RefCell<Vec<(u64, T)>>>, id: u64) -> ObserverGuard {
    let weak = Rc::downgrade(sinks);
    ObserverGuard::new(move || {
        if let Some(sinks) = weak.upgrade() {
            sinks.borrow_mut().retain(|(sid, _)| *sid != id);
        }
    })
}

// ---------------------------------------------------------------------------
// SimScroll
// ---------------------------------------------------------------------------

/// Scripted [`ScrollSource`].
#[derive(Clone)]
pub struct SimScroll {
    offsets: Rc<RefCell<ScrollOffsets>>,
    sinks: Rc<RefCell<Vec<(u64, Rc<dyn Fn()>)>>>,
    next_id: Rc<RefCell<u64>>,
}

impl SimScroll {
    #[must_use]
    pub fn new(offsets: ScrollOffsets) -> Self {
        Self {
            offsets: Rc::new(RefCell::new(offsets)),
            sinks: Rc::new(RefCell::new(Vec::new())),
            next_id: Rc::new(RefCell::new(0)),
        }
    }

    /// Update the offsets and fire one scroll event.
    pub fn scroll_to(&self, x: f64, y: f64) {
        {
            let mut offsets = self.offsets.borrow_mut();
            offsets.x = x;
            offsets.y = y;
        }
        let sinks: Vec<Rc<dyn Fn()>> =
            self.sinks.borrow().iter().map(|(_, s)| Rc::clone(s)).collect();
        for sink in sinks {
            sink();
        }
    }

    /// Change the scrollable range without firing an event.
    pub fn set_range(&self, max_x: f64, max_y: f64) {
        let mut offsets = self.offsets.borrow_mut();
        offsets.max_x = max_x;
        offsets.max_y = max_y;
    }
}

impl ScrollSource for SimScroll {
    fn current(&self) -> ScrollOffsets {
        *self.offsets.borrow()
    }

    fn subscribe(&self, sink: Rc<dyn Fn()>) -> ObserverGuard {
        let id = {
            let mut next = self.next_id.borrow_mut();
            *next += 1;
            *next
        };
        self.sinks.borrow_mut().push((id, sink));
        remove_sink(&self.sinks, id)
    }
}

// ---------------------------------------------------------------------------
// SimWindow
// ---------------------------------------------------------------------------

/// Scripted [`WindowSource`].
#[derive(Clone)]
pub struct SimWindow {
    size: Rc<RefCell<WindowSize>>,
    sinks: Rc<RefCell<Vec<(u64, Rc<dyn Fn(WindowSize)>)>>>,
    next_id: Rc<RefCell<u64>>,
}

impl SimWindow {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: Rc::new(RefCell::new(WindowSize { width, height })),
            sinks: Rc::new(RefCell::new(Vec::new())),
            next_id: Rc::new(RefCell::new(0)),
        }
    }

    /// Resize the viewport and fire one resize event.
    pub fn resize(&self, width: f64, height: f64) {
        let size = WindowSize { width, height };
        *self.size.borrow_mut() = size;
        let sinks: Vec<Rc<dyn Fn(WindowSize)>> =
            self.sinks.borrow().iter().map(|(_, s)| Rc::clone(s)).collect();
        for sink in sinks {
            sink(size);
        }
    }
}

impl WindowSource for SimWindow {
    fn current(&self) -> WindowSize {
        *self.size.borrow()
    }

    fn subscribe(&self, sink: Rc<dyn Fn(WindowSize)>) -> ObserverGuard {
        let id = {
            let mut next = self.next_id.borrow_mut();
            *next += 1;
            *next
        };
        self.sinks.borrow_mut().push((id, sink));
        remove_sink(&self.sinks, id)
    }
}

// ---------------------------------------------------------------------------
// SimMedia
// ---------------------------------------------------------------------------

type MediaSink = (u64, String, Rc<dyn Fn(bool)>);

/// Scripted [`MediaSource`]: a set of query strings that currently match.
#[derive(Clone)]
pub struct SimMedia {
    matching: Rc<RefCell<Vec<String>>>,
    sinks: Rc<RefCell<Vec<MediaSink>>>,
    next_id: Rc<RefCell<u64>>,
}

impl SimMedia {
    #[must_use]
    pub fn new() -> Self {
        Self {
            matching: Rc::new(RefCell::new(Vec::new())),
            sinks: Rc::new(RefCell::new(Vec::new())),
            next_id: Rc::new(RefCell::new(0)),
        }
    }

    /// Set whether `query` matches, notifying that query's subscribers on
    /// an actual flip.
    pub fn set_matches(&self, query: &str, matches: bool) {
        let flipped = {
            let mut matching = self.matching.borrow_mut();
            let had = matching.iter().any(|q| q == query);
            if matches && !had {
                matching.push(query.to_owned());
                true
            } else if !matches && had {
                matching.retain(|q| q != query);
                true
            } else {
                false
            }
        };
        if !flipped {
            return;
        }
        let sinks: Vec<Rc<dyn Fn(bool)>> = self
            .sinks
            .borrow()
            .iter()
            .filter(|(_, q, _)| q == query)
            .map(|(_, _, s)| Rc::clone(s))
            .collect();
        for sink in sinks {
            sink(matches);
        }
    }
}

impl Default for SimMedia {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaSource for SimMedia {
    fn matches(&self, query: &str) -> bool {
        self.matching.borrow().iter().any(|q| q == query)
    }

    fn subscribe(&self, query: &str, sink: Rc<dyn Fn(bool)>) -> ObserverGuard {
        let id = {
            let mut next = self.next_id.borrow_mut();
            *next += 1;
            *next
        };
        self.sinks.borrow_mut().push((id, query.to_owned(), sink));
        let weak = Rc::downgrade(&self.sinks);
        ObserverGuard::new(move || {
            if let Some(sinks) = weak.upgrade() {
                sinks.borrow_mut().retain(|(sid, _, _)| *sid != id);
            }
        })
    }
}

// ---------------------------------------------------------------------------
// SimPointer
// ---------------------------------------------------------------------------

/// Scripted [`PointerSource`].
#[derive(Clone)]
pub struct SimPointer {
    sinks: Rc<RefCell<Vec<(u64, Rc<dyn Fn(&PointerEvent)>)>>>,
    next_id: Rc<RefCell<u64>>,
}

impl SimPointer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sinks: Rc::new(RefCell::new(Vec::new())),
            next_id: Rc::new(RefCell::new(0)),
        }
    }

    /// Fire one press whose hit path (target upward) is `path`.
    pub fn press(&self, path: &[ElementRef]) {
        let event = PointerEvent {
            path: path.to_vec(),
        };
        let sinks: Vec<Rc<dyn Fn(&PointerEvent)>> =
            self.sinks.borrow().iter().map(|(_, s)| Rc::clone(s)).collect();
        for sink in sinks {
            sink(&event);
        }
    }
}

impl Default for SimPointer {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerSource for SimPointer {
    fn subscribe(&self, sink: Rc<dyn Fn(&PointerEvent)>) -> ObserverGuard {
        let id = {
            let mut next = self.next_id.borrow_mut();
            *next += 1;
            *next
        };
        self.sinks.borrow_mut().push((id, sink));
        remove_sink(&self.sinks, id)
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory [`PreferenceStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    map: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.map.borrow_mut().insert(key.to_owned(), value.to_owned());
    }
}
