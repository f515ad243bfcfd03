//! Coordinate handling for geospatial data
//!
//! This module provides structures and functionality for handling
//! geographic input areas, native bounding rectangles, reference system
//! resolution, and the transformations between them.

mod bbox;
mod point;
mod transform;
mod crs;
mod resolver;

// Re-export key types
pub use self::bbox::{BoundingBox, GeoExtent};
pub use self::point::{GeoPoint, Point};
pub use self::transform::CoordinateTransformer;
pub use self::crs::SpatialRef;
pub use self::resolver::{AreaResolver, BufferUnit};
