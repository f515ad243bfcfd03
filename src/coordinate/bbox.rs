//! Bounding rectangle structures for defining export regions

use std::fmt;

use super::point::Point;
use crate::errors::{ExportError, ExportResult};

/// A bounding rectangle in the service's native coordinate system
///
/// Tagged with the wkid of the reference system it is expressed in.
/// Invariant: `min_x < max_x` and `min_y < max_y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum X coordinate
    pub min_x: f64,
    /// Minimum Y coordinate
    pub min_y: f64,
    /// Maximum X coordinate
    pub max_x: f64,
    /// Maximum Y coordinate
    pub max_y: f64,
    /// Well-known id of the reference system the coordinates are in
    pub wkid: u32,
}

impl BoundingBox {
    /// Create a new bounding box
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64, wkid: u32) -> Self {
        BoundingBox { min_x, min_y, max_x, max_y, wkid }
    }

    /// Create a bounding box from two corners, normalizing min/max ordering
    ///
    /// Axis direction can flip under projection, so transformed corners are
    /// not guaranteed to arrive in min/max order.
    pub fn from_corners(a: Point, b: Point, wkid: u32) -> Self {
        BoundingBox {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
            wkid,
        }
    }

    /// Create a square bounding box around a point
    ///
    /// `buffer` is the half-side, in the same units as the point.
    pub fn from_point_buffer(center: &Point, buffer: f64, wkid: u32) -> Self {
        BoundingBox {
            min_x: center.x - buffer,
            min_y: center.y - buffer,
            max_x: center.x + buffer,
            max_y: center.y + buffer,
            wkid,
        }
    }

    /// Get the width of the bounding box in native units
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Get the height of the bounding box in native units
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Get the center point of the bounding box
    pub fn center(&self) -> Point {
        Point::new(
            self.min_x + self.width() / 2.0,
            self.min_y + self.height() / 2.0,
        )
    }

    /// Intersect with another bounding box in the same reference system
    ///
    /// Returns `None` when the rectangles do not overlap. A shared edge
    /// counts as empty; a degenerate rectangle is useless downstream.
    pub fn intersect(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let min_x = self.min_x.max(other.min_x);
        let min_y = self.min_y.max(other.min_y);
        let max_x = self.max_x.min(other.max_x);
        let max_y = self.max_y.min(other.max_y);

        if min_x < max_x && min_y < max_y {
            Some(BoundingBox::new(min_x, min_y, max_x, max_y, self.wkid))
        } else {
            None
        }
    }

    /// Format as the comma-joined `minx,miny,maxx,maxy` string the
    /// exportImage endpoint expects
    pub fn to_param(&self) -> String {
        format!("{},{},{},{}", self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}] (wkid {})",
               self.min_x, self.min_y, self.max_x, self.max_y, self.wkid)
    }
}

/// A geographic extent in WGS84 longitude/latitude
///
/// Distinct from [`BoundingBox`] so a geographic rectangle cannot be
/// consumed where native service coordinates are expected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoExtent {
    /// Minimum longitude in decimal degrees
    pub min_lon: f64,
    /// Minimum latitude in decimal degrees
    pub min_lat: f64,
    /// Maximum longitude in decimal degrees
    pub max_lon: f64,
    /// Maximum latitude in decimal degrees
    pub max_lat: f64,
}

impl GeoExtent {
    /// Create a new geographic extent
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        GeoExtent { min_lon, min_lat, max_lon, max_lat }
    }

    /// Parse an extent from four CLI values (minLon minLat maxLon maxLat)
    pub fn from_values(values: &[&str]) -> ExportResult<Self> {
        if values.len() != 4 {
            return Err(ExportError::Parse(
                "Bounding box must have 4 values: minLon minLat maxLon maxLat".to_string()));
        }

        let mut parsed = [0.0f64; 4];
        for (i, value) in values.iter().enumerate() {
            parsed[i] = value.trim().parse::<f64>()
                .map_err(|_| ExportError::Parse(format!("Invalid bbox value: {}", value)))?;
        }

        if parsed[0] >= parsed[2] || parsed[1] >= parsed[3] {
            return Err(ExportError::Parse(format!(
                "Degenerate bbox: min must be less than max in {},{},{},{}",
                parsed[0], parsed[1], parsed[2], parsed[3])));
        }

        Ok(GeoExtent::new(parsed[0], parsed[1], parsed[2], parsed[3]))
    }
}
