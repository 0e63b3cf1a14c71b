//! Geographic value types shared by every service boundary.
//!
//! These are pure data: structural equality, no behavior. Conversion to
//! and from whatever native map-SDK types a presentation layer uses is
//! the adapter's job, not this crate's.

/// A point on the globe in decimal degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Coordinate {
    /// Latitude in decimal degrees (positive north)
    pub latitude: f64,
    /// Longitude in decimal degrees (positive east)
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate from latitude and longitude
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// The extent of a map viewport, in decimal degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Span {
    /// North-south extent of the viewport
    pub latitude_delta: f64,
    /// East-west extent of the viewport
    pub longitude_delta: f64,
}

impl Span {
    /// Create a span from latitude and longitude deltas
    #[must_use]
    pub const fn new(latitude_delta: f64, longitude_delta: f64) -> Self {
        Self {
            latitude_delta,
            longitude_delta,
        }
    }
}

/// A map viewport: a center coordinate plus the visible extent.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Region {
    /// Center of the viewport
    pub center: Coordinate,
    /// Visible extent around the center
    pub span: Span,
}

impl Region {
    /// Create a region from a center and span
    #[must_use]
    pub const fn new(center: Coordinate, span: Span) -> Self {
        Self { center, span }
    }

    /// Placeholder viewport shown before any real region is known
    /// (lower Manhattan).
    #[must_use]
    pub const fn mock() -> Self {
        Self::new(Coordinate::new(40.7, -74.0), Span::new(0.075, 0.075))
    }
}
