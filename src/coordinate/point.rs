//! Point structures for geographic and projected coordinates

/// A point in the service's native (projected) coordinate system
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// X coordinate (easting)
    pub x: f64,
    /// Y coordinate (northing)
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

/// A geographic point in WGS84 longitude/latitude
///
/// Kept as a distinct type from [`Point`] so geographic coordinates can
/// never be fed into an operation expecting native service units without
/// an explicit transformation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    /// Longitude in decimal degrees
    pub lon: f64,
    /// Latitude in decimal degrees
    pub lat: f64,
}

impl GeoPoint {
    /// Create a new geographic point
    pub fn new(lon: f64, lat: f64) -> Self {
        GeoPoint { lon, lat }
    }
}
