#![forbid(unsafe_code)]

//! Single-threaded reactive value cell with change notification.
//!
//! [`Observable<T>`] wraps a value in shared ownership (`Rc<RefCell<..>>`)
//! and notifies subscriber callbacks whenever the value actually changes.
//! [`Subscription`] is the RAII guard returned by
//! [`Observable::subscribe`]; dropping it removes the callback.
//!
//! Every hook in this library exposes its output as an `Observable`, so a
//! consumer can either poll with [`Observable::get`] on each render or react
//! to pushes via [`Observable::subscribe`].
//!
//! # Invariants
//!
//! 1. The version increments exactly once per mutation that changes the
//!    value.
//! 2. Subscribers are notified in registration order.
//! 3. Setting a value equal to the current value is a no-op: no version
//!    bump, no notifications.
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.
//! 5. Cloning an `Observable` shares the underlying cell; all clones see
//!    the same value and version.
//!
//! # Failure Modes
//!
//! - A subscriber callback that panics propagates to whoever triggered the
//!   `set`.
//! - Re-entrant `set` from inside a subscriber callback is permitted (no
//!   borrow is held while callbacks run), but subscribers registered after
//!   the re-entrant caller observe only the newest value.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A shared, version-tracked value with subscriber notification.
///
/// Single-threaded by design: the whole library runs as discrete turns on
/// one event queue, so `Rc`/`RefCell` suffice and no locking exists.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

struct ObservableInner<T> {
    value: T,
    version: u64,
    subscribers: Vec<Weak<SubscriberFn<T>>>,
}

type SubscriberFn<T> = dyn Fn(&T);

/// RAII guard for an [`Observable`] subscription.
///
/// Holds the strong reference to the callback; the observable itself only
/// keeps a `Weak`, so dropping the guard unregisters the callback (it is
/// skipped and pruned on the next notification).
pub struct Subscription {
    _callback: Rc<dyn std::any::Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish()
    }
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create a new observable holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Run `f` with a reference to the current value, without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Monotonic change counter. Bumps exactly once per effective `set`.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Replace the value, notifying subscribers if it changed.
    ///
    /// Equal values are a no-op (no version bump, no notifications).
    pub fn set(&self, value: T) {
        let callbacks: Vec<Rc<SubscriberFn<T>>> = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
            // Prune dead subscribers while collecting live ones, so the
            // borrow is released before any callback runs.
            inner.subscribers.retain(|weak| weak.strong_count() > 0);
            inner
                .subscribers
                .iter()
                .filter_map(std::rc::Weak::upgrade)
                .collect()
        };
        let current = self.inner.borrow().value.clone();
        for callback in callbacks {
            callback(&current);
        }
    }

    /// Register `callback` to run after every effective change.
    ///
    /// The callback fires in registration order relative to other
    /// subscribers and stays active until the returned [`Subscription`] is
    /// dropped.
    #[must_use]
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let callback: Rc<SubscriberFn<T>> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&callback));
        Subscription {
            _callback: Rc::new(callback),
        }
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug + Clone + PartialEq + 'static> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.inner.borrow().value)
            .field("version", &self.inner.borrow().version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn get_returns_current_value() {
        let obs = Observable::new(42);
        assert_eq!(obs.get(), 42);
        obs.set(7);
        assert_eq!(obs.get(), 7);
    }

    #[test]
    fn with_borrows_without_clone() {
        let obs = Observable::new(String::from("hi"));
        let len = obs.with(String::len);
        assert_eq!(len, 2);
    }

    #[test]
    fn set_equal_value_is_noop() {
        let obs = Observable::new(5);
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        let _sub = obs.subscribe(move |_| f.set(f.get() + 1));

        obs.set(5);
        assert_eq!(obs.version(), 0);
        assert_eq!(fired.get(), 0);

        obs.set(6);
        assert_eq!(obs.version(), 1);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn subscribers_fire_in_registration_order() {
        let obs = Observable::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));

        let o1 = Rc::clone(&order);
        let _s1 = obs.subscribe(move |_| o1.borrow_mut().push(1));
        let o2 = Rc::clone(&order);
        let _s2 = obs.subscribe(move |_| o2.borrow_mut().push(2));
        let o3 = Rc::clone(&order);
        let _s3 = obs.subscribe(move |_| o3.borrow_mut().push(3));

        obs.set(1);
        assert_eq!(*order.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn dropped_subscription_stops_callbacks() {
        let obs = Observable::new(0);
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        let sub = obs.subscribe(move |_| f.set(f.get() + 1));

        obs.set(1);
        assert_eq!(fired.get(), 1);

        drop(sub);
        obs.set(2);
        assert_eq!(fired.get(), 1, "callback must not fire after drop");
    }

    #[test]
    fn clones_share_the_cell() {
        let a = Observable::new(1);
        let b = a.clone();
        b.set(9);
        assert_eq!(a.get(), 9);
        assert_eq!(a.version(), b.version());
    }

    #[test]
    fn callback_sees_new_value() {
        let obs = Observable::new(0);
        let seen = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        let _sub = obs.subscribe(move |v| s.set(*v));
        obs.set(77);
        assert_eq!(seen.get(), 77);
    }

    #[test]
    fn version_counts_effective_changes_only() {
        let obs = Observable::new(0);
        obs.set(1);
        obs.set(1);
        obs.set(2);
        assert_eq!(obs.version(), 2);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn version_equals_effective_transitions(values in proptest::collection::vec(0i32..4, 0..64)) {
                let obs = Observable::new(0i32);
                let mut expected = 0u64;
                let mut current = 0i32;
                for v in values {
                    obs.set(v);
                    if v != current {
                        expected += 1;
                        current = v;
                    }
                }
                prop_assert_eq!(obs.version(), expected);
                prop_assert_eq!(obs.get(), current);
            }
        }
    }
}
