#![forbid(unsafe_code)]

//! Deterministic in-memory drivers for every external boundary the tether
//! hooks consume.
//!
//! Nothing here touches a real browser, clock, or input device: time moves
//! only when a test calls [`SimTimers::advance`], and signals fire only
//! when a test calls the driver's mutator (`emit`, `scroll_to`, `resize`,
//! `set_matches`, `press`). That makes every hook scenario — including
//! debounce races and teardown ordering — reproducible turn by turn.
//!
//! These drivers are also a reference for wiring the boundary traits to a
//! real platform.

pub mod dimensions;
pub mod inputs;
pub mod timers;

pub use dimensions::SimDimensions;
pub use inputs::{MemoryStore, SimMedia, SimPointer, SimScroll, SimWindow};
pub use timers::SimTimers;
