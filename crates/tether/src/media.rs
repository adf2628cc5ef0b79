#![forbid(unsafe_code)]

//! Media-query tracking.
//!
//! [`MediaQueryTracker`] evaluates one query string synchronously at
//! construction, then follows the source's flip notifications. The query
//! string travels with the match state so consumers observing several
//! trackers can tell the outputs apart.

use std::cell::RefCell;
use std::rc::Rc;

use tether_core::inputs::MediaSource;
use tether_core::observable::Observable;
use tether_core::observer::ObserverGuard;

/// The match state of one media query.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MediaState {
    pub matches: bool,
    pub query: String,
}

/// Tracks whether one media query matches.
pub struct MediaQueryTracker {
    output: Observable<MediaState>,
    guard: RefCell<Option<ObserverGuard>>,
}

impl MediaQueryTracker {
    /// Create and immediately publish the query's current match state.
    #[must_use]
    pub fn new(source: Rc<dyn MediaSource>, query: &str) -> Self {
        let output = Observable::new(MediaState {
            matches: source.matches(query),
            query: query.to_owned(),
        });
        let sink_output = output.clone();
        let sink_query = query.to_owned();
        let guard = source.subscribe(
            query,
            Rc::new(move |matches| {
                sink_output.set(MediaState {
                    matches,
                    query: sink_query.clone(),
                });
            }),
        );
        Self {
            output,
            guard: RefCell::new(Some(guard)),
        }
    }

    /// The tracked match state.
    #[must_use]
    pub fn output(&self) -> Observable<MediaState> {
        self.output.clone()
    }

    /// Whether the query currently matches.
    #[must_use]
    pub fn matches(&self) -> bool {
        self.output.get().matches
    }

    /// Unsubscribe from flip notifications. Idempotent; also runs on drop.
    pub fn dispose(&self) {
        drop(self.guard.borrow_mut().take());
    }
}

impl std::fmt::Debug for MediaQueryTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaQueryTracker")
            .field("state", &self.output.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_harness::SimMedia;

    const NARROW: &str = "(max-width: 768px)";

    #[test]
    fn initial_state_is_evaluated_synchronously() {
        let media = SimMedia::new();
        media.set_matches(NARROW, true);
        let tracker = MediaQueryTracker::new(Rc::new(media), NARROW);
        assert!(tracker.matches());
        assert_eq!(tracker.output().get().query, NARROW);
    }

    #[test]
    fn flips_update_the_output() {
        let media = SimMedia::new();
        let tracker = MediaQueryTracker::new(Rc::new(media.clone()), NARROW);
        assert!(!tracker.matches());

        media.set_matches(NARROW, true);
        assert!(tracker.matches());
        media.set_matches(NARROW, false);
        assert!(!tracker.matches());
    }

    #[test]
    fn other_queries_do_not_interfere() {
        let media = SimMedia::new();
        let tracker = MediaQueryTracker::new(Rc::new(media.clone()), NARROW);
        media.set_matches("(prefers-color-scheme: dark)", true);
        assert!(!tracker.matches());
    }

    #[test]
    fn dispose_stops_updates() {
        let media = SimMedia::new();
        let tracker = MediaQueryTracker::new(Rc::new(media.clone()), NARROW);
        tracker.dispose();
        tracker.dispose();

        media.set_matches(NARROW, true);
        assert!(!tracker.matches());
    }
}
