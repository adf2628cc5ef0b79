#![forbid(unsafe_code)]

//! Geometry value types reported by the dimension-observation boundary.

/// Which box of a measured element the geometry refers to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoxModel {
    /// The content box (padding and border excluded). The default.
    #[default]
    Content,
    /// The border box (padding and border included).
    Border,
    /// The content box in device pixels.
    DevicePixelContent,
}

/// One immutable geometry snapshot of an observed element.
///
/// Captured atomically from a single change record and replaced wholesale;
/// never mutated field-by-field. Two snapshots compare equal iff every
/// field matches.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
    pub top: f64,
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub x: f64,
    pub y: f64,
}

impl Dimensions {
    /// Build a snapshot from an origin and extent, deriving the edges.
    ///
    /// Convenience for drivers and tests; real observation sources usually
    /// report all eight fields directly.
    #[must_use]
    pub fn from_origin_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            top: y,
            left: x,
            right: x + width,
            bottom: y + height,
            x,
            y,
        }
    }
}
