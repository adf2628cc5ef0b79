#![forbid(unsafe_code)]

//! Hook-style state trackers over external signal sources.
//!
//! Each tracker owns its resources explicitly: construction subscribes to
//! the boundary traits it needs ([`tether_core`]'s `DimensionSource`,
//! `TimerService`, and friends), outputs flow through
//! [`Observable`](tether_core::observable::Observable), and `dispose` (or
//! drop) tears everything down idempotently. Nothing here assumes a
//! particular UI framework; hosts implement the boundary traits and drive
//! the timers.
//!
//! - [`dimension`]: element-size tracking, single- and multi-target, with
//!   debounced publication. The heart of the crate.
//! - [`Debounced`] / [`Throttled`]: rate-limited values.
//! - [`ScrollTracker`], [`WindowSizeTracker`], [`MediaQueryTracker`]:
//!   sampled or event-driven environment state.
//! - [`ThemeManager`]: persisted theme preference with system fallback.
//! - [`OutsideClickDetector`]: presses outside a watched element.
//! - [`Pager`]: pure pagination arithmetic.
//! - [`query`]: query-string parsing.
//! - [`AsyncTask`]: single-flight async operation state.
//!
//! # Architecture
//!
//! Everything is single-threaded and cooperative: `Rc<RefCell<..>>` state,
//! `Weak` captures in every timer and subscription callback, no locks.
//! Callbacks carry the epoch of the subscription or timer that created
//! them and are dropped when a newer epoch has superseded it, so late
//! firings after a reconfiguration or disposal never touch fresh state.
//!
//! State mutation and output notification are strictly separated: a
//! tracker decides what to publish while holding its `RefCell` borrow,
//! releases the borrow, and only then notifies, so subscribers may
//! re-enter the tracker freely.

pub mod click_outside;
pub mod debounce;
pub mod dimension;
pub mod media;
pub mod pagination;
pub mod query;
pub mod scroll;
pub mod task;
pub mod theme;
pub mod throttle;
pub mod window;

pub use click_outside::OutsideClickDetector;
pub use debounce::Debounced;
pub use dimension::{
    DimensionTracker, MultiDimensionTracker, SlotHandle, TargetHandle, TrackerConfig,
};
pub use media::{MediaQueryTracker, MediaState};
pub use pagination::{PageState, Pager};
pub use query::{ParamValue, Params, QueryParseError, parse_query, parse_url_query};
pub use scroll::{ScrollPosition, ScrollTracker};
pub use task::{AsyncTask, Completion, TaskState};
pub use theme::{
    DARK_SCHEME_QUERY, ResolvedTheme, ThemeConfig, ThemeManager, ThemePreference,
};
pub use throttle::{ThrottleConfig, Throttled};
pub use window::WindowSizeTracker;

// Re-exported so downstream code can name the boundary types without a
// separate tether-core dependency.
pub use tether_core::element::ElementRef;
pub use tether_core::geometry::{BoxModel, Dimensions};
pub use tether_core::inputs::{
    MediaSource, PointerEvent, PointerSource, PreferenceStore, ScrollOffsets, ScrollSource,
    WindowSize, WindowSource,
};
pub use tether_core::observable::{Observable, Subscription};
pub use tether_core::observer::{BatchSink, DimensionChange, DimensionSource, ObserverGuard};
pub use tether_core::timer::{TimerId, TimerService};
