//! Area resolution: caller-supplied geographic areas to native rectangles
//!
//! Converts a WGS84 bounding box or a buffered point into a rectangle in
//! the service's native reference system, clipped to the service's declared
//! coverage. The clip is mandatory: tile requests outside coverage come
//! back as garbage imagery or server errors.

use log::{debug, info};

use super::bbox::{BoundingBox, GeoExtent};
use super::crs::SpatialRef;
use super::point::GeoPoint;
use super::transform::CoordinateTransformer;
use crate::errors::{ExportError, ExportResult};

/// Fallback meters-per-unit when the reference system does not expose one
///
/// State plane deployments are overwhelmingly foot-based, so assume feet.
const ASSUMED_UNIT_TO_METER: f64 = 0.3048;

/// Unit in which a point buffer distance is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUnit {
    /// Ground meters, converted via the reference system's unit factor
    Meters,
    /// Already in the service's native linear units
    ServiceUnits,
}

/// Resolves caller areas into clipped native bounding rectangles
pub struct AreaResolver {
    spatial_ref: SpatialRef,
    service_extent: Option<BoundingBox>,
    transformer: CoordinateTransformer,
}

impl AreaResolver {
    /// Create a resolver for a service's reference system and coverage
    pub fn new(spatial_ref: SpatialRef, service_extent: Option<BoundingBox>) -> Self {
        AreaResolver {
            spatial_ref,
            service_extent,
            transformer: CoordinateTransformer::new(),
        }
    }

    /// Resolve a WGS84 extent to a clipped native rectangle
    pub fn resolve_extent(&self, extent: &GeoExtent) -> ExportResult<BoundingBox> {
        let native = self.transformer.extent_to_native(extent, &self.spatial_ref)?;
        debug!("Transformed extent to native: {}", native);
        self.clip(native)
    }

    /// Resolve a buffered WGS84 point to a clipped native rectangle
    ///
    /// Builds a square of side 2x buffer centered on the point's native
    /// coordinates.
    pub fn resolve_point(&self, point: &GeoPoint, buffer: f64, unit: BufferUnit) -> ExportResult<BoundingBox> {
        if buffer <= 0.0 {
            return Err(ExportError::Parse(format!(
                "Buffer distance must be positive, got {}", buffer)));
        }

        let buffer_native = self.buffer_in_service_units(buffer, unit);
        let center = self.transformer.to_native(point, &self.spatial_ref)?;
        let native = BoundingBox::from_point_buffer(&center, buffer_native, self.spatial_ref.wkid);
        debug!("Buffered point to native rectangle: {}", native);
        self.clip(native)
    }

    /// Convert a buffer distance into the service's native linear units
    pub fn buffer_in_service_units(&self, buffer: f64, unit: BufferUnit) -> f64 {
        match unit {
            BufferUnit::ServiceUnits => buffer,
            BufferUnit::Meters => {
                let per_unit = self.spatial_ref.meters_per_unit().unwrap_or_else(|| {
                    info!("Reference system wkid {} has no linear unit factor, assuming feet",
                          self.spatial_ref.wkid);
                    ASSUMED_UNIT_TO_METER
                });
                buffer / per_unit
            }
        }
    }

    /// Clip a native rectangle to the service's declared coverage
    fn clip(&self, bbox: BoundingBox) -> ExportResult<BoundingBox> {
        let Some(extent) = &self.service_extent else {
            return Ok(bbox);
        };

        match bbox.intersect(extent) {
            Some(clipped) => {
                if clipped != bbox {
                    info!("Clipped requested area to service coverage: {}", clipped);
                }
                Ok(clipped)
            }
            None => Err(ExportError::OutOfExtent(bbox)),
        }
    }
}
