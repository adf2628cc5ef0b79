#![forbid(unsafe_code)]

//! Opaque element identity.
//!
//! The library never inspects real on-screen elements; it only needs a
//! stable identity to demultiplex change records and hit paths. An
//! [`ElementRef`] is that identity: a cheap `Copy` handle minted from a
//! process-wide counter, compared and hashed by value.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for unique element identities.
static ELEMENT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque reference to an on-screen element.
///
/// Equality is identity: two `ElementRef`s are the same element iff they
/// were minted by the same [`ElementRef::new`] call (or copied from it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef(u64);

impl ElementRef {
    /// Mint a fresh, unique element identity.
    #[must_use]
    pub fn new() -> Self {
        Self(ELEMENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw identity value.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl Default for ElementRef {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "element#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_refs_are_unique() {
        let a = ElementRef::new();
        let b = ElementRef::new();
        assert_ne!(a, b);
    }

    #[test]
    fn copies_are_identical() {
        let a = ElementRef::new();
        let b = a;
        assert_eq!(a, b);
        assert_eq!(a.id(), b.id());
    }
}
