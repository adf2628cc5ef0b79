#![forbid(unsafe_code)]

//! Boundary to the external timer service.
//!
//! Debounce and throttle never block; the only "waiting" in the library is
//! a callback scheduled through [`TimerService`]. The service owns the
//! clock, so [`TimerService::now_ms`] is also the library's only notion of
//! the current time — which keeps every time-dependent hook deterministic
//! under a manual-clock driver.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for unique timer identities.
static TIMER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identity of one scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl TimerId {
    /// Mint a fresh timer identity. Drivers call this from `schedule`.
    #[must_use]
    pub fn next() -> Self {
        Self(TIMER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw identity value.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// External timer service (`setTimeout`/`clearTimeout` equivalent).
pub trait TimerService {
    /// Run `callback` once, `delay_ms` milliseconds from now.
    fn schedule(&self, delay_ms: u64, callback: Box<dyn FnOnce()>) -> TimerId;

    /// Cancel a scheduled callback. Idempotent; safe after firing.
    fn cancel(&self, id: TimerId);

    /// Milliseconds elapsed on the service's clock.
    fn now_ms(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_ids_are_unique() {
        assert_ne!(TimerId::next(), TimerId::next());
    }
}
