#![forbid(unsafe_code)]

//! Core types for the tether hook library.
//!
//! This crate carries no hook logic of its own. It provides:
//!
//! - [`Observable`]: the single-threaded reactive cell every hook uses as
//!   its output, with RAII [`Subscription`]s.
//! - Value types: [`Dimensions`], [`BoxModel`], [`ElementRef`],
//!   [`ScrollOffsets`], [`WindowSize`], [`PointerEvent`].
//! - Boundary traits for the external collaborators the hooks consume:
//!   [`DimensionSource`], [`TimerService`], [`ScrollSource`],
//!   [`WindowSource`], [`MediaSource`], [`PointerSource`],
//!   [`PreferenceStore`].
//!
//! Everything is single-threaded and event-driven: sources push into sink
//! callbacks as discrete turns, timers are scheduled callbacks, nothing
//! blocks. Deterministic in-memory drivers for all of these boundaries
//! live in `tether-harness`.

pub mod element;
pub mod geometry;
pub mod inputs;
pub mod observable;
pub mod observer;
pub mod timer;

pub use element::ElementRef;
pub use geometry::{BoxModel, Dimensions};
pub use inputs::{
    MediaSource, PointerEvent, PointerSource, PreferenceStore, ScrollOffsets, ScrollSource,
    WindowSize, WindowSource,
};
pub use observable::{Observable, Subscription};
pub use observer::{BatchSink, DimensionChange, DimensionSource, ObserverGuard};
pub use timer::{TimerId, TimerService};
