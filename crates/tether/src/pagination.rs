#![forbid(unsafe_code)]

//! Page-window arithmetic over a changing item count.
//!
//! [`Pager`] is pure state: no timers, no external sources. Pages are
//! 1-based; `page_size` is clamped to at least 1; the page count is the
//! ceiling of `total / page_size` and never below 1, so an empty
//! collection still has page 1. Every mutation re-clamps the current page
//! into range.

use std::cell::RefCell;

use tether_core::observable::Observable;

/// A pagination snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageState {
    /// Current page, 1-based, always within `1..=pages`.
    pub page: usize,
    /// Items per page, at least 1.
    pub page_size: usize,
    /// Total item count.
    pub total: usize,
    /// Page count, at least 1.
    pub pages: usize,
}

impl PageState {
    fn new(page: usize, page_size: usize, total: usize) -> Self {
        let page_size = page_size.max(1);
        let pages = total.div_ceil(page_size).max(1);
        Self {
            page: page.clamp(1, pages),
            page_size,
            total,
            pages,
        }
    }

    /// Index of the first item on this page.
    #[must_use]
    pub fn offset(&self) -> usize {
        (self.page - 1) * self.page_size
    }
}

/// Tracks the current page over a changing total.
pub struct Pager {
    output: Observable<PageState>,
    // Serializes read-modify-write against re-entrant subscribers.
    state: RefCell<PageState>,
}

impl Pager {
    #[must_use]
    pub fn new(page_size: usize, total: usize) -> Self {
        let state = PageState::new(1, page_size, total);
        Self {
            output: Observable::new(state),
            state: RefCell::new(state),
        }
    }

    /// The pagination snapshot.
    #[must_use]
    pub fn output(&self) -> Observable<PageState> {
        self.output.clone()
    }

    /// Current snapshot.
    #[must_use]
    pub fn current(&self) -> PageState {
        *self.state.borrow()
    }

    /// Jump to `page`, clamped into range.
    pub fn set_page(&self, page: usize) {
        self.update(|s| PageState::new(page, s.page_size, s.total));
    }

    /// Change the page size and return to page 1.
    pub fn set_page_size(&self, page_size: usize) {
        self.update(|s| PageState::new(1, page_size, s.total));
    }

    /// Update the item count, keeping the current page where it still
    /// exists and clamping it down where it does not.
    pub fn set_total(&self, total: usize) {
        self.update(|s| PageState::new(s.page, s.page_size, total));
    }

    /// Advance one page; no-op on the last page.
    pub fn next_page(&self) {
        self.update(|s| PageState::new(s.page + 1, s.page_size, s.total));
    }

    /// Go back one page; no-op on the first page.
    pub fn prev_page(&self) {
        self.update(|s| PageState::new(s.page.saturating_sub(1), s.page_size, s.total));
    }

    /// Return to page 1.
    pub fn reset(&self) {
        self.set_page(1);
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        let s = self.current();
        s.page < s.pages
    }

    #[must_use]
    pub fn has_prev(&self) -> bool {
        self.current().page > 1
    }

    fn update(&self, f: impl FnOnce(PageState) -> PageState) {
        let next = {
            let mut state = self.state.borrow_mut();
            let next = f(*state);
            *state = next;
            next
        };
        self.output.set(next);
    }
}

impl std::fmt::Debug for Pager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pager").field("state", &self.current()).finish()
    }
}
