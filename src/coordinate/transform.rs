//! Coordinate transformation via the proj engine
//!
//! All transforms go from WGS84 geographic coordinates into the service's
//! native reference system. The output side of the pipeline never
//! reprojects, so the reverse direction is not implemented.

use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use super::bbox::{BoundingBox, GeoExtent};
use super::crs::SpatialRef;
use super::point::{GeoPoint, Point};
use crate::errors::{ExportError, ExportResult};

/// Transformer for converting geographic coordinates to native service units
pub struct CoordinateTransformer;

impl CoordinateTransformer {
    /// Create a new transformer
    pub fn new() -> Self {
        CoordinateTransformer
    }

    /// Transform a WGS84 point into the target reference system
    pub fn to_native(&self, point: &GeoPoint, target: &SpatialRef) -> ExportResult<Point> {
        let source = Proj::from_proj_string(wgs84_proj_string()?)
            .map_err(|e| ExportError::Configuration(format!(
                "Invalid WGS84 projection definition: {:?}", e)))?;
        let dest = Proj::from_proj_string(target.proj_string())
            .map_err(|e| ExportError::Configuration(format!(
                "Invalid projection definition for wkid {}: {:?}", target.wkid, e)))?;

        // proj expects geographic coordinates in radians
        let mut coords = (point.lon.to_radians(), point.lat.to_radians(), 0.0);
        transform(&source, &dest, &mut coords)
            .map_err(|e| ExportError::Configuration(format!(
                "Projection of ({}, {}) to wkid {} failed: {:?}",
                point.lon, point.lat, target.wkid, e)))?;

        if target.is_geographic() {
            Ok(Point::new(coords.0.to_degrees(), coords.1.to_degrees()))
        } else {
            Ok(Point::new(coords.0, coords.1))
        }
    }

    /// Transform a WGS84 extent into a native bounding box
    ///
    /// Both corners are transformed and the result is normalized to
    /// min/max form, since axis ordering can invert under projection.
    pub fn extent_to_native(&self, extent: &GeoExtent, target: &SpatialRef) -> ExportResult<BoundingBox> {
        let lower = self.to_native(&GeoPoint::new(extent.min_lon, extent.min_lat), target)?;
        let upper = self.to_native(&GeoPoint::new(extent.max_lon, extent.max_lat), target)?;
        Ok(BoundingBox::from_corners(lower, upper, target.wkid))
    }
}

impl Default for CoordinateTransformer {
    fn default() -> Self {
        Self::new()
    }
}

/// The WGS84 proj definition from the EPSG database
fn wgs84_proj_string() -> ExportResult<&'static str> {
    crs_definitions::from_code(4326)
        .map(|def| def.proj4)
        .ok_or_else(|| ExportError::Configuration(
            "WGS84 missing from the EPSG database".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_to_wgs84() {
        let transformer = CoordinateTransformer::new();
        let target = SpatialRef::from_wkid(4326).unwrap();
        let result = transformer.to_native(&GeoPoint::new(-112.07, 33.45), &target).unwrap();
        assert!((result.x - -112.07).abs() < 1e-9);
        assert!((result.y - 33.45).abs() < 1e-9);
    }

    #[test]
    fn test_wgs84_to_web_mercator_origin() {
        let transformer = CoordinateTransformer::new();
        let target = SpatialRef::from_wkid(3857).unwrap();
        let result = transformer.to_native(&GeoPoint::new(0.0, 0.0), &target).unwrap();
        assert!(result.x.abs() < 1e-6);
        assert!(result.y.abs() < 1e-6);
    }

    #[test]
    fn test_wgs84_to_web_mercator_known_point() {
        let transformer = CoordinateTransformer::new();
        let target = SpatialRef::from_wkid(3857).unwrap();
        // 90 degrees east is a quarter of the mercator world width
        let result = transformer.to_native(&GeoPoint::new(90.0, 0.0), &target).unwrap();
        assert!((result.x - 10_018_754.17).abs() < 1.0);
    }

    #[test]
    fn test_extent_normalized() {
        let transformer = CoordinateTransformer::new();
        let target = SpatialRef::from_wkid(3857).unwrap();
        let extent = GeoExtent::new(-112.075, 33.445, -112.065, 33.455);
        let bbox = transformer.extent_to_native(&extent, &target).unwrap();
        assert!(bbox.min_x < bbox.max_x);
        assert!(bbox.min_y < bbox.max_y);
        assert_eq!(bbox.wkid, 3857);
    }
}
