//! End-to-end dimension-tracking scenarios driven entirely through the
//! deterministic harness: scripted observation batches, a manual clock,
//! and explicit attach/detach ordering.

use std::cell::RefCell;
use std::rc::Rc;

use tether::dimension::{DimensionTracker, MultiDimensionTracker, TrackerConfig};
use tether::{BoxModel, DimensionChange, Dimensions, ElementRef};
use tether_harness::{SimDimensions, SimTimers};

fn rect(w: f64, h: f64) -> Dimensions {
    Dimensions::from_origin_size(0.0, 0.0, w, h)
}

fn change(target: ElementRef, d: Dimensions) -> DimensionChange {
    DimensionChange {
        target,
        content_rect: d,
    }
}

fn single(config: TrackerConfig) -> (DimensionTracker, SimDimensions, SimTimers) {
    let source = SimDimensions::new();
    let timers = SimTimers::new();
    let tracker = DimensionTracker::new(Rc::new(source.clone()), Rc::new(timers.clone()), config);
    (tracker, source, timers)
}

fn multi(count: usize, config: TrackerConfig) -> (MultiDimensionTracker, SimDimensions, SimTimers) {
    let source = SimDimensions::new();
    let timers = SimTimers::new();
    let tracker = MultiDimensionTracker::new(
        count,
        Rc::new(source.clone()),
        Rc::new(timers.clone()),
        config,
    );
    (tracker, source, timers)
}

// ===== Single target, immediate mode =====

#[test]
fn mount_resize_unmount() {
    let (tracker, source, _timers) = single(TrackerConfig::default());
    let el = ElementRef::new();
    let handle = tracker.handle();

    handle.attach(el);
    assert_eq!(tracker.current(), None, "nothing until the first batch");

    source.emit(&[change(el, rect(300.0, 150.0))]);
    assert_eq!(tracker.current(), Some(rect(300.0, 150.0)));

    source.emit(&[change(el, rect(400.0, 150.0))]);
    assert_eq!(tracker.current(), Some(rect(400.0, 150.0)));

    handle.detach();
    assert_eq!(source.active_subscriptions(), 0);
    assert_eq!(
        tracker.current(),
        Some(rect(400.0, 150.0)),
        "last snapshot survives unmount"
    );
}

#[test]
fn rerenders_do_not_churn_the_subscription() {
    let (tracker, source, _timers) = single(TrackerConfig::default());
    let el = ElementRef::new();
    let handle = tracker.handle();

    // The host re-runs its render loop; the attachment is unchanged.
    for _ in 0..10 {
        handle.attach(el);
    }
    assert_eq!(source.subscriptions_opened(), 1);

    // Replacing the element is a real change.
    let replacement = ElementRef::new();
    handle.attach(replacement);
    assert_eq!(source.subscriptions_opened(), 2);
    assert_eq!(source.last_active_targets(), Some(vec![replacement]));
}

// ===== Single target, debounced =====

#[test]
fn resize_burst_collapses_to_one_publication() {
    let (tracker, source, timers) = single(TrackerConfig::debounced(200));
    let el = ElementRef::new();
    tracker.handle().attach(el);

    let publications = Rc::new(RefCell::new(Vec::new()));
    let p = Rc::clone(&publications);
    let _sub = tracker.output().subscribe(move |v| p.borrow_mut().push(*v));

    // A drag-resize burst: batches every 50ms, well inside the window.
    for w in [100.0, 120.0, 140.0, 160.0] {
        source.emit(&[change(el, rect(w, 50.0))]);
        timers.advance(50);
    }
    assert!(publications.borrow().is_empty(), "window keeps sliding");

    timers.advance(150); // 200ms after the last batch
    assert_eq!(*publications.borrow(), vec![Some(rect(160.0, 50.0))]);
}

#[test]
fn quiet_gap_between_bursts_publishes_twice() {
    let (tracker, source, timers) = single(TrackerConfig::debounced(100));
    let el = ElementRef::new();
    tracker.handle().attach(el);

    source.emit(&[change(el, rect(1.0, 1.0))]);
    timers.advance(100);
    assert_eq!(tracker.current(), Some(rect(1.0, 1.0)));

    source.emit(&[change(el, rect(2.0, 2.0))]);
    timers.advance(100);
    assert_eq!(tracker.current(), Some(rect(2.0, 2.0)));
}

#[test]
fn late_flush_after_teardown_never_lands() {
    let (tracker, source, timers) = single(TrackerConfig::debounced(100));
    let el = ElementRef::new();
    tracker.handle().attach(el);

    source.emit(&[change(el, rect(1.0, 1.0))]);
    tracker.dispose();

    // Even if the clock moves past the window, the staged data is gone and
    // the timer was cancelled.
    timers.advance(1000);
    assert_eq!(tracker.current(), None);
    assert_eq!(timers.pending(), 0);
}

#[test]
fn element_swap_inside_window_drops_the_stale_stage() {
    let (tracker, source, timers) = single(TrackerConfig::debounced(100));
    let handle = tracker.handle();
    let first = ElementRef::new();
    let second = ElementRef::new();

    handle.attach(first);
    source.emit(&[change(first, rect(1.0, 1.0))]);

    // Swap before the flush: the staged snapshot belonged to `first` and
    // must not be published for `second`.
    handle.attach(second);
    timers.advance(1000);
    assert_eq!(tracker.current(), None);

    source.emit(&[change(second, rect(2.0, 2.0))]);
    timers.advance(100);
    assert_eq!(tracker.current(), Some(rect(2.0, 2.0)));
}

// ===== Multiple targets =====

#[test]
fn grid_of_panels_tracks_independently() {
    let (tracker, source, _timers) = multi(3, TrackerConfig::default());
    let handles = tracker.handles();
    let panels: Vec<ElementRef> = (0..3).map(|_| ElementRef::new()).collect();
    for (handle, panel) in handles.iter().zip(&panels) {
        handle.attach(*panel);
    }
    assert_eq!(source.active_subscriptions(), 1, "one shared subscription");

    // One layout pass resizes everything at once.
    source.emit(&[
        change(panels[2], rect(30.0, 30.0)),
        change(panels[0], rect(10.0, 10.0)),
        change(panels[1], rect(20.0, 20.0)),
    ]);
    assert_eq!(
        tracker.snapshots(),
        vec![
            Some(rect(10.0, 10.0)),
            Some(rect(20.0, 20.0)),
            Some(rect(30.0, 30.0)),
        ],
        "records land by identity, not delivery order"
    );
}

#[test]
fn partially_attached_grid_leaves_gaps() {
    let (tracker, source, _timers) = multi(3, TrackerConfig::default());
    let a = ElementRef::new();
    let c = ElementRef::new();
    tracker.handle(0).unwrap().attach(a);
    tracker.handle(2).unwrap().attach(c);

    source.emit(&[change(a, rect(1.0, 1.0)), change(c, rect(3.0, 3.0))]);
    assert_eq!(
        tracker.snapshots(),
        vec![Some(rect(1.0, 1.0)), None, Some(rect(3.0, 3.0))]
    );
}

#[test]
fn debounced_grid_flushes_the_union_of_the_window() {
    let (tracker, source, timers) = multi(2, TrackerConfig::debounced(100));
    let handles = tracker.handles();
    let a = ElementRef::new();
    let b = ElementRef::new();
    handles[0].attach(a);
    handles[1].attach(b);

    let publications = Rc::new(RefCell::new(0));
    let p = Rc::clone(&publications);
    let _sub = tracker.output().subscribe(move |_| *p.borrow_mut() += 1);

    source.emit(&[change(a, rect(1.0, 1.0))]);
    timers.advance(40);
    source.emit(&[change(b, rect(2.0, 2.0))]);
    timers.advance(40);
    source.emit(&[change(a, rect(9.0, 9.0))]);
    timers.advance(100);

    assert_eq!(*publications.borrow(), 1, "the whole window is one update");
    assert_eq!(
        tracker.snapshots(),
        vec![Some(rect(9.0, 9.0)), Some(rect(2.0, 2.0))]
    );
}

#[test]
fn record_for_a_detached_element_is_skipped() {
    let (tracker, source, _timers) = multi(2, TrackerConfig::default());
    let handles = tracker.handles();
    let a = ElementRef::new();
    let b = ElementRef::new();
    handles[0].attach(a);
    handles[1].attach(b);
    source.emit(&[change(a, rect(1.0, 1.0))]);

    handles[0].detach();
    // `a` is no longer observed; its record reaches nobody and slot 0
    // keeps its last known value.
    source.emit(&[change(a, rect(7.0, 7.0)), change(b, rect(2.0, 2.0))]);
    assert_eq!(
        tracker.snapshots(),
        vec![Some(rect(1.0, 1.0)), Some(rect(2.0, 2.0))]
    );
}

// ===== Box model plumbing =====

#[test]
fn border_box_request_reaches_the_source() {
    let config = TrackerConfig {
        box_model: BoxModel::Border,
        debounce_ms: 0,
    };
    let (tracker, source, _timers) = single(config);
    tracker.handle().attach(ElementRef::new());
    assert_eq!(source.last_active_box_model(), Some(BoxModel::Border));

    let (multi_tracker, multi_source, _t) = multi(1, config);
    multi_tracker.handle(0).unwrap().attach(ElementRef::new());
    assert_eq!(multi_source.last_active_box_model(), Some(BoxModel::Border));
}

// ===== Lifecycle edges =====

#[test]
fn drop_closes_everything() {
    let (tracker, source, timers) = single(TrackerConfig::debounced(100));
    let el = ElementRef::new();
    tracker.handle().attach(el);
    source.emit(&[change(el, rect(1.0, 1.0))]);

    drop(tracker);
    assert_eq!(source.active_subscriptions(), 0);
    assert_eq!(timers.pending(), 0);
}

#[test]
fn handles_outlive_the_tracker_harmlessly() {
    let (tracker, source, _timers) = multi(2, TrackerConfig::default());
    let handles = tracker.handles();
    drop(tracker);

    handles[0].attach(ElementRef::new());
    handles[1].detach();
    assert_eq!(source.active_subscriptions(), 0);
    assert_eq!(handles[0].attached(), None);
}

#[test]
fn two_trackers_share_one_source() {
    let source = SimDimensions::new();
    let timers = SimTimers::new();
    let first = DimensionTracker::new(
        Rc::new(source.clone()),
        Rc::new(timers.clone()),
        TrackerConfig::default(),
    );
    let second = DimensionTracker::new(
        Rc::new(source.clone()),
        Rc::new(timers.clone()),
        TrackerConfig::default(),
    );
    let a = ElementRef::new();
    let b = ElementRef::new();
    first.handle().attach(a);
    second.handle().attach(b);

    source.emit(&[change(a, rect(1.0, 1.0)), change(b, rect(2.0, 2.0))]);
    assert_eq!(first.current(), Some(rect(1.0, 1.0)));
    assert_eq!(second.current(), Some(rect(2.0, 2.0)));

    first.dispose();
    source.emit(&[change(a, rect(9.0, 9.0)), change(b, rect(3.0, 3.0))]);
    assert_eq!(first.current(), Some(rect(1.0, 1.0)));
    assert_eq!(second.current(), Some(rect(3.0, 3.0)));
}
